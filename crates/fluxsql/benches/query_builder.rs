use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use fluxsql::{Connection, ConnectionConfig, DialectKind, QueryBuilder, Value};
use std::sync::Arc;

fn connection(protect: bool) -> Arc<Connection> {
    Connection::new(
        ConnectionConfig::new(DialectKind::MySql)
            .with_prefix("app_")
            .with_protect_identifiers(protect),
    )
}

/// SELECT col0, col1, ... FROM app_t AS t WHERE t.col0 = 0 AND t.col1 = 1 ...
fn build_select(conn: &Arc<Connection>, n: usize) -> QueryBuilder {
    let mut qb = conn.table("t t");
    qb.preserve(true);
    for i in 0..n {
        qb.select(&format!("t.col{i}"));
        qb.where_(&format!("t.col{i}"), i as i64).unwrap();
    }
    qb
}

fn bench_compile(c: &mut Criterion) {
    let mut group = c.benchmark_group("query_builder/compile");
    let conn = connection(false);

    for n in [1, 5, 10, 50, 100] {
        let mut qb = build_select(&conn, n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| black_box(qb.sql().unwrap()));
        });
    }

    group.finish();
}

fn bench_build_and_compile_escaped(c: &mut Criterion) {
    let mut group = c.benchmark_group("query_builder/build_and_compile_escaped");
    let conn = connection(true);

    for n in [1, 5, 10, 50] {
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            b.iter(|| {
                let qb = build_select(&conn, n);
                black_box(qb.into_sql().unwrap());
            });
        });
    }

    group.finish();
}

fn bench_in_list(c: &mut Criterion) {
    let mut group = c.benchmark_group("query_builder/in_list");
    let conn = connection(false);

    for n in [5, 20, 100, 500] {
        let values: Vec<i64> = (0..n).collect();
        group.bench_with_input(BenchmarkId::from_parameter(n), &values, |b, values| {
            b.iter(|| {
                let mut qb = conn.table("t");
                qb.where_in("id", values.iter().copied()).unwrap();
                black_box(qb.sql().unwrap());
            });
        });
    }

    group.finish();
}

fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("query_builder/insert");
    let conn = connection(true);

    for n in [1, 10, 50] {
        let row: Vec<(String, Value)> = (0..n)
            .map(|i| (format!("col{i}"), Value::from(format!("value {i}"))))
            .collect();
        group.bench_with_input(BenchmarkId::from_parameter(n), &row, |b, row| {
            b.iter(|| {
                let mut qb = conn.table("t");
                qb.insert(row.iter().cloned()).unwrap();
                black_box(qb.sql().unwrap());
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_compile,
    bench_build_and_compile_escaped,
    bench_in_list,
    bench_insert
);
criterion_main!(benches);
