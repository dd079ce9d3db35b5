//! Benchmarks for result processing and batch fan-out
//!
//! This benchmark measures:
//! - Classification plus aggregation of raw outcomes
//! - Flattening, cleanup and sorting overhead
//! - Batch dispatch through the gate against an in-process transport

use async_trait::async_trait;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::sync::Arc;

use base_api_client::results::process;
use base_api_client::transport::{PreparedRequest, Transport, TransportError};
use base_api_client::{
    ApiClient, CallRequest, ClientConfig, Method, ProcessOptions, RawOutcome, ResponseEnvelope,
};

fn json_outcome(i: usize, body: serde_json::Value) -> RawOutcome {
    let envelope = ResponseEnvelope::new(Method::Get, format!("http://bench/{}", i), 200)
        .with_header("content-type", "application/json")
        .with_body(body.to_string());
    RawOutcome::response(format!("req-{}", i), 1, envelope)
}

fn create_outcomes(calls: usize, items_per_call: usize) -> Vec<RawOutcome> {
    (0..calls)
        .map(|i| {
            if i % 10 == 9 {
                let envelope = ResponseEnvelope::new(Method::Get, format!("http://bench/{}", i), 404)
                    .with_header("content-type", "application/json")
                    .with_body(r#"{"error":"not found"}"#);
                return RawOutcome::response(format!("req-{}", i), 1, envelope);
            }
            let items: Vec<_> = (0..items_per_call)
                .map(|j| {
                    serde_json::json!({
                        "id": i * items_per_call + j,
                        "score": (j * 7919) % 101,
                        "name": format!("item-{}", j),
                        "note": null,
                    })
                })
                .collect();
            json_outcome(i, serde_json::json!({ "items": items, "total": items_per_call }))
        })
        .collect()
}

fn bench_process(c: &mut Criterion) {
    let mut group = c.benchmark_group("process_results");

    for calls in [10usize, 100, 500] {
        let outcomes = create_outcomes(calls, 20);
        group.throughput(Throughput::Elements(calls as u64));

        group.bench_with_input(BenchmarkId::new("plain", calls), &outcomes, |b, o| {
            b.iter(|| process(black_box(o), &ProcessOptions::new()))
        });

        let full = ProcessOptions::new()
            .with_data_key("items")
            .with_cleanup(true)
            .with_sort_field("score")
            .with_sort_order("desc");
        group.bench_with_input(BenchmarkId::new("flatten_clean_sort", calls), &outcomes, |b, o| {
            b.iter(|| process(black_box(o), &full))
        });
    }

    group.finish();
}

struct InstantTransport;

#[async_trait]
impl Transport for InstantTransport {
    async fn send(&self, request: &PreparedRequest) -> Result<ResponseEnvelope, TransportError> {
        Ok(ResponseEnvelope::new(request.method, request.url.clone(), 200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"ok":true}"#))
    }
}

fn bench_batch(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let client = ApiClient::builder(ClientConfig::new("http://bench").unwrap())
        .transport(Arc::new(InstantTransport))
        .build()
        .unwrap();

    let mut group = c.benchmark_group("execute_batch");
    for calls in [16usize, 256] {
        group.throughput(Throughput::Elements(calls as u64));
        group.bench_function(BenchmarkId::from_parameter(calls), |b| {
            b.to_async(&runtime).iter(|| async {
                let requests = (0..calls)
                    .map(|i| CallRequest::get(format!("/{}", i)))
                    .collect();
                client.execute_batch(requests).await.unwrap()
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_process, bench_batch);
criterion_main!(benches);
