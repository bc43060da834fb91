//! Integration tests for the alert API endpoints

use alert_api::{create_router, AppState};
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;
use tracker_lib::{
    alerts::{AlertJobConfig, ALERT_KEY_PATTERN},
    feed::{FeedError, OfferFeed, StaticFeed},
    health::components,
    models::{Availability, Commitment, DatasetDocument, GpuOffer, PriceHistory},
    notify::{EmailMessage, MemoryNotifier, Notifier, NotifyError},
    store::{MemoryStore, SubscriptionStore},
};

fn offer(id: &str, model: &str, price: f64) -> GpuOffer {
    GpuOffer {
        id: id.to_string(),
        provider: "Lambda Labs".to_string(),
        provider_logo: None,
        instance_name: "gpu_1x".to_string(),
        model: model.to_string(),
        gpu_count: 1,
        vram: 80.0,
        cpu: 26,
        ram: 200.0,
        price_per_hour: price,
        region: "us-east-1".to_string(),
        commitment: Commitment::OnDemand,
        availability: Availability::High,
        link: format!("https://lambdalabs.com/{}", id),
        last_updated: "2024-05-01T06:00:00Z".to_string(),
    }
}

struct TestApp {
    router: Router,
    state: Arc<AppState>,
    store: Arc<MemoryStore>,
    notifier: Arc<MemoryNotifier>,
}

async fn setup_test_app() -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let notifier = Arc::new(MemoryNotifier::new());
    let feed = StaticFeed::new(vec![offer("h100", "H100", 1.5), offer("a100", "A100", 1.1)]);

    let state = Arc::new(AppState::new(
        Arc::new(feed),
        Some(store.clone() as Arc<dyn SubscriptionStore>),
        Some(notifier.clone() as Arc<dyn Notifier>),
        AlertJobConfig::default(),
    ));
    state.register_components().await;
    state.health_registry.set_ready(true).await;

    TestApp {
        router: create_router(state.clone()),
        state,
        store,
        notifier,
    }
}

fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_subscribe_accepts_valid_request() {
    let app = setup_test_app().await;

    let response = app
        .router
        .oneshot(post_json(
            "/api/subscribe",
            r#"{"email":"ops@example.com","alertType":"price-drop","model":"H100","targetPrice":2}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["ok"], true);
    assert_eq!(body["message"], "Alert registered. Check your email for confirmation.");
    assert_eq!(body["stored"], "done");
    assert_eq!(body["processed"], true);

    assert_eq!(app.store.scan(ALERT_KEY_PATTERN).await.unwrap().len(), 1);
    assert_eq!(app.notifier.sent().len(), 1);
}

#[tokio::test]
async fn test_subscribe_rejects_bad_input() {
    let app = setup_test_app().await;

    let cases = [
        ("{not json", "Invalid JSON"),
        (r#"{"email":"nope","alertType":"price-drop"}"#, "Invalid email address"),
        (r#"{"email":"ops@example.com"}"#, "alertType is required"),
    ];
    for (body, message) in cases {
        let response = app
            .router
            .clone()
            .oneshot(post_json("/api/subscribe", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"], message);
    }
    assert!(app.store.is_empty().await);
}

#[tokio::test]
async fn test_subscribe_without_dependencies_still_succeeds() {
    let state = Arc::new(AppState::new(
        Arc::new(StaticFeed::default()),
        None,
        None,
        AlertJobConfig::default(),
    ));
    let response = create_router(state)
        .oneshot(post_json(
            "/api/subscribe",
            r#"{"email":"ops@example.com","alertType":"availability"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["ok"], true);
    assert_eq!(body["processed"], false);
    assert_eq!(body["confirmation"], "skipped");
}

#[tokio::test]
async fn test_subscribe_method_handling() {
    let app = setup_test_app().await;

    let preflight = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method("OPTIONS")
                .uri("/api/subscribe")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert!(preflight.status().is_success());
    assert_eq!(
        preflight.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "*"
    );

    let wrong = app.router.oneshot(get("/api/subscribe")).await.unwrap();
    assert_eq!(wrong.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(json_body(wrong).await["error"], "Method not allowed");
}

#[tokio::test]
async fn test_check_alerts_runs_job() {
    let app = setup_test_app().await;

    app.router
        .clone()
        .oneshot(post_json(
            "/api/subscribe",
            r#"{"email":"ops@example.com","alertType":"price-drop","model":"H100","targetPrice":2}"#,
        ))
        .await
        .unwrap();

    let response = app.router.clone().oneshot(get("/api/check-alerts")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["ok"], true);
    assert_eq!(body["checked"], 1);
    assert_eq!(body["triggered"], 1);
    assert_eq!(body["skipped"], 0);
    assert!(body["timestamp"].is_string());

    // Confirmation plus the alert itself
    assert_eq!(app.notifier.sent().len(), 2);

    let again = app.router.oneshot(get("/api/check-alerts")).await.unwrap();
    let body = json_body(again).await;
    assert_eq!(body["triggered"], 0);
    assert_eq!(body["skipped"], 1);
    assert_eq!(app.notifier.sent().len(), 2);

    let health = app.state.health_registry.health().await;
    assert_eq!(health.last_job.map(|j| j.checked), Some(1));
}

/// Delivery that takes a while, so overlapping job runs interleave
#[derive(Default)]
struct SlowNotifier {
    inner: MemoryNotifier,
}

#[async_trait]
impl Notifier for SlowNotifier {
    async fn send(&self, message: &EmailMessage) -> Result<(), NotifyError> {
        tokio::time::sleep(Duration::from_millis(50)).await;
        self.inner.send(message).await
    }
}

async fn setup_slow_app() -> (Arc<AppState>, Router, Arc<SlowNotifier>) {
    let notifier = Arc::new(SlowNotifier::default());
    let state = Arc::new(AppState::new(
        Arc::new(StaticFeed::new(vec![offer("h100", "H100", 1.5)])),
        Some(Arc::new(MemoryStore::new()) as Arc<dyn SubscriptionStore>),
        Some(notifier.clone() as Arc<dyn Notifier>),
        AlertJobConfig::default(),
    ));
    state.register_components().await;
    let router = create_router(state.clone());

    let response = router
        .clone()
        .oneshot(post_json(
            "/api/subscribe",
            r#"{"email":"ops@example.com","alertType":"price-drop","model":"H100","targetPrice":2}"#,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(notifier.inner.sent().len(), 1);

    (state, router, notifier)
}

#[tokio::test]
async fn test_overlapping_job_runs_send_one_alert() {
    let (state, _router, notifier) = setup_slow_app().await;

    let (first, second) = tokio::join!(state.run_alert_job(), state.run_alert_job());
    let (first, second) = (first.unwrap(), second.unwrap());

    assert_eq!(first.triggered + second.triggered, 1);
    assert_eq!(first.skipped + second.skipped, 1);
    // Confirmation plus exactly one alert
    assert_eq!(notifier.inner.sent().len(), 2);
}

#[tokio::test]
async fn test_concurrent_check_alerts_requests_send_one_alert() {
    let (_state, router, notifier) = setup_slow_app().await;

    let (first, second) = tokio::join!(
        router.clone().oneshot(get("/api/check-alerts")),
        router.clone().oneshot(get("/api/check-alerts")),
    );
    let first = first.unwrap();
    let second = second.unwrap();
    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(second.status(), StatusCode::OK);

    let (first, second) = (json_body(first).await, json_body(second).await);
    let triggered = first["triggered"].as_u64().unwrap() + second["triggered"].as_u64().unwrap();
    assert_eq!(triggered, 1);
    assert_eq!(notifier.inner.sent().len(), 2);
}

#[tokio::test]
async fn test_check_alerts_rejects_post() {
    let app = setup_test_app().await;
    let response = app
        .router
        .oneshot(post_json("/api/check-alerts", "{}"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_check_alerts_missing_config() {
    let state = Arc::new(AppState::new(
        Arc::new(StaticFeed::default()),
        Some(Arc::new(MemoryStore::new()) as Arc<dyn SubscriptionStore>),
        None,
        AlertJobConfig::default(),
    ));
    let response = create_router(state)
        .oneshot(get("/api/check-alerts"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json_body(response).await["error"], "Missing env vars");
}

struct DownFeed;

#[async_trait]
impl OfferFeed for DownFeed {
    async fn fetch_offers(&self) -> Result<DatasetDocument, FeedError> {
        Err(FeedError::Status {
            url: "https://gpu-tracker.dev/gpu-data.json".to_string(),
            status: 502,
        })
    }

    async fn fetch_history(&self) -> Option<PriceHistory> {
        None
    }
}

#[tokio::test]
async fn test_feed_failure_is_500_and_unhealthy() {
    let state = Arc::new(AppState::new(
        Arc::new(DownFeed),
        Some(Arc::new(MemoryStore::new()) as Arc<dyn SubscriptionStore>),
        Some(Arc::new(MemoryNotifier::new()) as Arc<dyn Notifier>),
        AlertJobConfig::default(),
    ));
    state.register_components().await;
    let router = create_router(state.clone());

    let response = router.clone().oneshot(get("/api/check-alerts")).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(json_body(response).await["error"]
        .as_str()
        .unwrap()
        .contains("502"));

    let health = router.oneshot(get("/healthz")).await.unwrap();
    assert_eq!(health.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = json_body(health).await;
    assert_eq!(body["components"][components::FEED]["status"], "unhealthy");
    assert_eq!(body["last_job"]["ok"], false);
}

#[tokio::test]
async fn test_healthz_degraded_when_unconfigured() {
    let state = Arc::new(AppState::new(
        Arc::new(StaticFeed::default()),
        None,
        None,
        AlertJobConfig::default(),
    ));
    state.register_components().await;

    let response = create_router(state).oneshot(get("/healthz")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["components"][components::STORE]["status"], "degraded");
}

#[tokio::test]
async fn test_readyz_tracks_initialization() {
    let state = Arc::new(AppState::new(
        Arc::new(StaticFeed::default()),
        None,
        None,
        AlertJobConfig::default(),
    ));
    let router = create_router(state.clone());

    let response = router.clone().oneshot(get("/readyz")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    state.health_registry.set_ready(true).await;
    let response = router.oneshot(get("/readyz")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["ready"], true);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let app = setup_test_app().await;
    app.router
        .clone()
        .oneshot(post_json(
            "/api/subscribe",
            r#"{"email":"ops@example.com","alertType":"new-low"}"#,
        ))
        .await
        .unwrap();

    let response = app.router.oneshot(get("/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("gpu_tracker_subscriptions_created_total"));
}
