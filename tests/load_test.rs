//! Concurrency test for the inventory service.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use inventory_service::workflow::DataResponse;

mod common;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_each_get_unique_hit() {
    let svc = common::TestService::start().await;
    // Widen the interleaving window between steps.
    svc.backends.store.set_delay(Duration::from_millis(5));

    let concurrency = 20;
    let requests_per_task = 10;
    let total_requests = concurrency * requests_per_task;

    let start = Instant::now();
    let mut tasks = Vec::new();
    for _ in 0..concurrency {
        let client = svc.client.clone();
        let url = svc.url("/data");
        tasks.push(tokio::spawn(async move {
            let mut hits = Vec::new();
            for _ in 0..requests_per_task {
                let res = client.get(&url).send().await.unwrap();
                assert!(res.status().is_success());
                let body: DataResponse = res.json().await.unwrap();
                hits.push(body.hits);
            }
            hits
        }));
    }

    let mut all_hits = Vec::new();
    for task in tasks {
        all_hits.extend(task.await.unwrap());
    }
    let duration = start.elapsed();

    all_hits.sort_unstable();
    let expected: Vec<i64> = (1..=total_requests as i64).collect();
    assert_eq!(all_hits, expected, "every request sees a distinct hit");

    assert_eq!(svc.backends.counter.value("hits"), total_requests as i64);
    assert_eq!(svc.backends.store.records().len(), total_requests);

    let mut published: Vec<i64> = svc.backends.queue.messages().iter().map(|m| m.hits).collect();
    published.sort_unstable();
    assert_eq!(published, expected);

    let logs = svc.logs.entries();
    assert_eq!(logs.len(), total_requests);
    let trace_ids: HashSet<_> = logs.iter().map(|l| l.trace_id.clone()).collect();
    assert_eq!(trace_ids.len(), total_requests, "one trace per request");

    println!("\n--- Load Test Results ---");
    println!("Total Requests: {}", total_requests);
    println!("Concurrency:    {}", concurrency);
    println!("Total Duration: {:?}", duration);
    println!(
        "Requests/sec:   {:.2}",
        total_requests as f64 / duration.as_secs_f64()
    );
    println!("-------------------------\n");

    svc.stop();
}
