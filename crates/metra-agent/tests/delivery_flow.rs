use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::Router;
use metra_agent::client::{DeliveryClient, DeliveryError};
use metra_agent::scheduler::Scheduler;
use metra_collector::Collector;
use metra_common::retry::RetryPolicy;
use metra_common::{codec, sign, Metric};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

async fn spawn_app(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn fast_policy(attempts: u32) -> RetryPolicy {
    RetryPolicy::new(attempts, Duration::from_millis(1), Duration::from_millis(1))
}

fn client(addr: SocketAddr, policy: RetryPolicy) -> DeliveryClient {
    DeliveryClient::new(format!("http://{addr}"), None, false, policy).unwrap()
}

/// Fails the first `fail_first` requests with a 500, then accepts.
#[derive(Clone)]
struct FlakyState {
    attempts: Arc<AtomicU32>,
    fail_first: u32,
}

async fn flaky_updates(State(state): State<FlakyState>) -> (StatusCode, &'static str) {
    let n = state.attempts.fetch_add(1, Ordering::SeqCst) + 1;
    if n <= state.fail_first {
        (StatusCode::INTERNAL_SERVER_ERROR, "boom")
    } else {
        (StatusCode::OK, r#"{"status":"ok"}"#)
    }
}

fn flaky_app(fail_first: u32) -> (Router, Arc<AtomicU32>) {
    let attempts = Arc::new(AtomicU32::new(0));
    let state = FlakyState {
        attempts: attempts.clone(),
        fail_first,
    };
    let app = Router::new()
        .route("/updates", post(flaky_updates))
        .route("/update", post(flaky_updates))
        .with_state(state);
    (app, attempts)
}

#[tokio::test]
async fn send_succeeds_on_nth_attempt_with_exactly_n_requests() {
    let (app, attempts) = flaky_app(2);
    let addr = spawn_app(app).await;
    let client = client(addr, fast_policy(3));

    client
        .send_batch(&[Metric::gauge("Alloc", 22.2)])
        .await
        .unwrap();

    assert_eq!(attempts.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn send_gives_up_after_exactly_the_attempt_budget() {
    let (app, attempts) = flaky_app(u32::MAX);
    let addr = spawn_app(app).await;
    let client = client(addr, fast_policy(4));

    let err = client
        .send_batch(&[Metric::gauge("Alloc", 22.2)])
        .await
        .unwrap_err();

    assert!(matches!(err, DeliveryError::RetriesExhausted(_)));
    assert!(err.to_string().contains("after 4 attempts"));
    assert_eq!(attempts.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn connection_refused_is_retried_then_terminal() {
    // Bind and immediately drop to get a port nobody listens on.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = client(addr, fast_policy(2));
    let err = client
        .send_one(&Metric::counter("hits", 1))
        .await
        .unwrap_err();
    assert!(matches!(err, DeliveryError::RetriesExhausted(_)));
}

#[tokio::test]
async fn invalid_metric_is_rejected_before_any_request() {
    let (app, attempts) = flaky_app(0);
    let addr = spawn_app(app).await;
    let client = client(addr, fast_policy(3));

    let broken = Metric {
        id: "x".to_string(),
        kind: metra_common::MetricKind::Gauge,
        value: None,
        delta: None,
    };
    let err = client.send_one(&broken).await.unwrap_err();

    assert!(matches!(err, DeliveryError::Invalid(_)));
    assert_eq!(attempts.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn signed_gzip_body_decodes_to_the_original_bytes() {
    #[derive(Clone, Default)]
    struct Seen {
        verified: Arc<AtomicU32>,
    }

    async fn updates(
        State(seen): State<Seen>,
        headers: HeaderMap,
        body: Bytes,
    ) -> (StatusCode, &'static str) {
        let plain = codec::decompress(&body).unwrap();
        let batch: Vec<Metric> = serde_json::from_slice(&plain).unwrap();
        assert_eq!(batch, vec![Metric::gauge("Alloc", 22.2)]);

        let signature = headers[sign::SIGNATURE_HEADER].to_str().unwrap();
        assert!(sign::verify(&plain, "k1", signature));

        seen.verified.fetch_add(1, Ordering::SeqCst);
        (StatusCode::OK, r#"{"status":"ok"}"#)
    }

    let seen = Seen::default();
    let app = Router::new()
        .route("/updates", post(updates))
        .with_state(seen.clone());
    let addr = spawn_app(app).await;

    let client = DeliveryClient::new(
        format!("http://{addr}"),
        Some("k1".to_string()),
        true,
        fast_policy(1),
    )
    .unwrap();
    client
        .send_batch(&[Metric::gauge("Alloc", 22.2)])
        .await
        .unwrap();

    assert_eq!(seen.verified.load(Ordering::SeqCst), 1);
}

// ── Scheduler flows ──

struct FakeCollector {
    gauges: Vec<(&'static str, f64)>,
}

impl Collector for FakeCollector {
    fn name(&self) -> &str {
        "fake"
    }

    fn collect(&mut self) -> anyhow::Result<HashMap<String, f64>> {
        Ok(self
            .gauges
            .iter()
            .map(|(name, value)| (name.to_string(), *value))
            .collect())
    }
}

/// Records every accepted metric id; `/update` rejects the id "bad".
#[derive(Clone, Default)]
struct Recording {
    ids: Arc<Mutex<Vec<String>>>,
    batch_posts: Arc<AtomicU32>,
}

async fn recording_update(
    State(state): State<Recording>,
    body: Bytes,
) -> (StatusCode, &'static str) {
    let metric: Metric = serde_json::from_slice(&body).unwrap();
    if metric.id == "bad" {
        return (StatusCode::INTERNAL_SERVER_ERROR, "rejected");
    }
    state.ids.lock().unwrap().push(metric.id);
    (StatusCode::OK, r#"{"status":"ok"}"#)
}

async fn recording_updates(
    State(state): State<Recording>,
    body: Bytes,
) -> (StatusCode, &'static str) {
    let batch: Vec<Metric> = serde_json::from_slice(&body).unwrap();
    state.batch_posts.fetch_add(1, Ordering::SeqCst);
    let mut ids = state.ids.lock().unwrap();
    for metric in batch {
        ids.push(metric.id);
    }
    (StatusCode::OK, r#"{"status":"ok"}"#)
}

fn recording_app() -> (Router, Recording) {
    let state = Recording::default();
    let app = Router::new()
        .route("/update", post(recording_update))
        .route("/updates", post(recording_updates))
        .with_state(state.clone());
    (app, state)
}

async fn run_scheduler_for(
    scheduler: Scheduler,
    collectors: Vec<Box<dyn Collector>>,
    client: DeliveryClient,
    runtime: Duration,
) {
    let cancel = CancellationToken::new();
    let stopper = cancel.clone();
    let handle = tokio::spawn(async move {
        scheduler
            .run(collectors, Arc::new(client), cancel)
            .await;
    });

    tokio::time::sleep(runtime).await;
    stopper.cancel();
    handle.await.unwrap();
}

#[tokio::test]
async fn per_metric_mode_delivers_the_rest_of_a_batch_past_a_failure() {
    let (app, state) = recording_app();
    let addr = spawn_app(app).await;

    let collectors: Vec<Box<dyn Collector>> = vec![Box::new(FakeCollector {
        gauges: vec![("bad", 1.0), ("good", 2.0)],
    })];
    let scheduler = Scheduler::new(
        Duration::from_millis(10),
        Duration::from_millis(30),
        false,
        2,
    );
    run_scheduler_for(
        scheduler,
        collectors,
        client(addr, fast_policy(1)),
        Duration::from_millis(120),
    )
    .await;

    let ids = state.ids.lock().unwrap();
    assert!(ids.iter().any(|id| id == "good"));
    assert!(ids.iter().any(|id| id == "PollCount"));
    assert!(!ids.iter().any(|id| id == "bad"));
}

#[tokio::test]
async fn batched_report_carries_gauges_and_poll_count() {
    let (app, state) = recording_app();
    let addr = spawn_app(app).await;

    let collectors: Vec<Box<dyn Collector>> = vec![Box::new(FakeCollector {
        gauges: vec![("Alloc", 22.2)],
    })];
    let scheduler = Scheduler::new(
        Duration::from_millis(10),
        Duration::from_millis(25),
        true,
        1,
    );
    run_scheduler_for(
        scheduler,
        collectors,
        client(addr, fast_policy(1)),
        Duration::from_millis(120),
    )
    .await;

    let ids = state.ids.lock().unwrap();
    assert!(ids.iter().any(|id| id == "Alloc"));
    assert!(ids.iter().any(|id| id == "PollCount"));
    assert!(state.batch_posts.load(Ordering::SeqCst) >= 1);
}

#[tokio::test]
async fn shutdown_before_any_report_tick_flushes_exactly_once() {
    let (app, state) = recording_app();
    let addr = spawn_app(app).await;

    let collectors: Vec<Box<dyn Collector>> = vec![Box::new(FakeCollector {
        gauges: vec![("Alloc", 22.2)],
    })];
    // Report interval far beyond the test runtime: the only delivery can
    // be the drain flush.
    let scheduler = Scheduler::new(
        Duration::from_millis(5),
        Duration::from_secs(60),
        true,
        1,
    );
    run_scheduler_for(
        scheduler,
        collectors,
        client(addr, fast_policy(1)),
        Duration::from_millis(60),
    )
    .await;

    assert_eq!(state.batch_posts.load(Ordering::SeqCst), 1);
    let ids = state.ids.lock().unwrap();
    assert!(ids.iter().any(|id| id == "Alloc"));
}
