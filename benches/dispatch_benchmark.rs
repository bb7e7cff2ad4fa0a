//! Benchmarks for argument mapping and override resolution
//!
//! Run with: cargo bench

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use std::sync::Arc;

use async_trait::async_trait;
use dbfunc::mapper::{CallInfo, map_arguments};
use dbfunc::registry::{FunctionError, Invocation, Outcome, SpecificFunction, resolve};
use dbfunc::traits::{OperationSet, SortOrdered, SupportsOperation};
use dbfunc::types::{OperationName, Value};

struct Override {
    provider: String,
    order: i32,
    ops: OperationSet,
}

impl SortOrdered for Override {
    fn sort_order(&self) -> i32 {
        self.order
    }
}

impl SupportsOperation for Override {
    fn supports_operation(&self, operation: &OperationName) -> bool {
        self.ops.contains(operation)
    }
}

#[async_trait]
impl SpecificFunction for Override {
    fn provider_name(&self) -> &str {
        &self.provider
    }

    async fn execute(&self, _: &Invocation<'_>) -> Result<Outcome, FunctionError> {
        Ok(Outcome::Declined)
    }
}

/// Registry of `n` overrides spread over two providers, each supporting four operations.
fn create_overrides(n: usize) -> Vec<Arc<dyn SpecificFunction>> {
    (0..n)
        .map(|i| {
            let provider = if i % 2 == 0 { "postgres" } else { "mssql" };
            let ops = (0..4).map(|j| format!("Operation{}", (i + j) % 64));
            Arc::new(Override {
                provider: provider.to_owned(),
                order: (n - i) as i32,
                ops: OperationSet::new(ops),
            }) as Arc<dyn SpecificFunction>
        })
        .collect()
}

fn bench_map_arguments(c: &mut Criterion) {
    let mut group = c.benchmark_group("map_arguments");

    for &n in &[2usize, 8, 32] {
        let names: Vec<String> = (0..n / 2).map(|i| format!("param_{i}")).collect();
        let names: Vec<&str> = names.iter().map(String::as_str).collect();
        let info = CallInfo::named(&names);

        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            b.iter(|| {
                let values: Vec<Value> = (0..n as i64).map(Value::Integer).collect();
                black_box(map_arguments(&info, values))
            });
        });
    }

    group.finish();
}

fn bench_resolve(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve");
    let operation = OperationName::new("operation17");

    for &n in &[8usize, 64, 512] {
        let overrides = create_overrides(n);

        group.bench_with_input(BenchmarkId::from_parameter(n), &overrides, |b, overrides| {
            b.iter(|| black_box(resolve(overrides.clone(), "postgres", &operation)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_map_arguments, bench_resolve);
criterion_main!(benches);
