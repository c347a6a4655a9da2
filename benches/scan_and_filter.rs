use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use loglens::file_handler::{LineIndex, LineStore};
use loglens::parser::JsonParser;
use loglens::{EngineConfig, LogEngine, LogParser, Query};
use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;
use tokio::runtime::Runtime;

fn create_test_file(size_kb: usize, json: bool) -> NamedTempFile {
    let mut temp_file = NamedTempFile::new().expect("Failed to create temp file");
    let target_size = size_kb * 1024;
    let mut current_size = 0;
    let mut line_num = 0;

    while current_size < target_size {
        let level = match line_num % 20 {
            0 => "ERROR",
            1..=3 => "WARN",
            _ => "INFO",
        };
        let log_line = if json {
            format!(
                "{{\"timestamp\":\"2024-09-02T10:{:02}:{:02}Z\",\"level\":\"{}\",\"message\":\"Request {} processed\",\"user\":{{\"id\":{}}}}}\n",
                (line_num / 60) % 60,
                line_num % 60,
                level,
                line_num,
                line_num % 1000
            )
        } else {
            format!(
                "[2024-09-02 10:{:02}:{:02}] {}: Request {} processed user_{}\n",
                (line_num / 60) % 60,
                line_num % 60,
                level,
                line_num,
                line_num % 1000
            )
        };

        temp_file.write_all(log_line.as_bytes()).unwrap();
        current_size += log_line.len();
        line_num += 1;
    }

    temp_file.flush().unwrap();
    temp_file
}

fn size_label(size_kb: usize) -> String {
    if size_kb < 1024 {
        format!("{}KB", size_kb)
    } else {
        format!("{}MB", size_kb / 1024)
    }
}

fn bench_line_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("line_scan");
    group.sample_size(10);
    group.measurement_time(Duration::from_secs(5));

    for &size_kb in &[500, 5000, 50000] {
        let temp_file = create_test_file(size_kb, false);
        let store = LineStore::open(temp_file.path()).unwrap();

        group.bench_with_input(
            BenchmarkId::new("scan", size_label(size_kb)),
            &store,
            |b, store| {
                b.iter(|| {
                    let index = LineIndex::scan(store.mapped_bytes(), 10 << 20, None, None);
                    black_box(index.map(|i| i.indexed_line_count()))
                });
            },
        );
    }

    group.finish();
}

fn bench_filter(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("filter");
    group.sample_size(10);
    group.measurement_time(Duration::from_secs(5));

    let config = EngineConfig {
        search_index: false,
        ..EngineConfig::default()
    };

    for &(size_kb, json) in &[(5000, false), (5000, true)] {
        let temp_file = create_test_file(size_kb, json);
        let engine = rt.block_on(async {
            let mut engine = LogEngine::new(config.clone());
            engine.open(temp_file.path()).await.unwrap();
            engine
        });
        let label = format!(
            "{}_{}",
            if json { "json" } else { "text" },
            size_label(size_kb)
        );

        for query in ["error", "level:WARN processed", "level:ERROR OR user.id:>990"] {
            group.bench_with_input(BenchmarkId::new(query, &label), &engine, |b, eng| {
                b.iter(|| {
                    rt.block_on(async { eng.set_filter(query).await.unwrap() });
                    black_box(eng.line_count())
                });
            });
        }
    }

    group.finish();
}

fn bench_query_eval(c: &mut Criterion) {
    let mut group = c.benchmark_group("query_eval");
    let entry = JsonParser.parse(
        0,
        r#"{"level":"Warn","message":"database slow","status":503,"labels":{"app":"api"}}"#
            .to_string(),
    );

    for text in [
        "database",
        "level:Error OR level:Warn database",
        "status:>=500 NOT labels.app:web",
    ] {
        let query = Query::parse(text);
        group.bench_function(text, |b| b.iter(|| black_box(query.is_match(&entry))));
    }

    group.finish();
}

criterion_group!(benches, bench_line_scan, bench_filter, bench_query_eval);
criterion_main!(benches);
