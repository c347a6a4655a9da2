//! Filtering: the auxiliary full-text index and the index-or-scan view builder.
//!
//! The full-text index is advisory. It only ever answers bare free-text queries, every
//! hit it returns is re-checked with the query evaluator, and when it has nothing to say
//! (still loading, no hits, failed) the filter falls back to parsing and evaluating every
//! line. The linear scan alone is always correct.

pub mod filter;
pub mod fts;

pub use filter::FilteredView;
pub use fts::SearchIndex;
