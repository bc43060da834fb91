//! HTTP API for alert subscriptions, the alert job, health checks and metrics

use crate::config::AlertApiConfig;
use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::State,
    http::{header, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};
use tracker_lib::{
    alerts::{AlertJob, AlertJobConfig, JobError, JobSummary, SubscriptionService},
    feed::{HttpFeed, OfferFeed},
    health::{components, ComponentStatus, HealthRegistry, LastJobRun},
    notify::{Notifier, ResendNotifier},
    observability::{render_metrics, StructuredLogger, TrackerMetrics},
    store::{RestKvStore, StoreError, SubscriptionStore},
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub health_registry: HealthRegistry,
    pub metrics: TrackerMetrics,
    pub logger: StructuredLogger,
    pub subscriptions: SubscriptionService,
    feed: Arc<dyn OfferFeed>,
    store: Option<Arc<dyn SubscriptionStore>>,
    notifier: Option<Arc<dyn Notifier>>,
    job_config: AlertJobConfig,
    /// Held for the whole of one alert job run
    job_lock: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(
        feed: Arc<dyn OfferFeed>,
        store: Option<Arc<dyn SubscriptionStore>>,
        notifier: Option<Arc<dyn Notifier>>,
        job_config: AlertJobConfig,
    ) -> Self {
        let logger = StructuredLogger::new("alert-api");
        Self {
            health_registry: HealthRegistry::new(),
            metrics: TrackerMetrics::new(),
            subscriptions: SubscriptionService::new(store.clone(), notifier.clone())
                .with_logger(logger.clone()),
            logger,
            feed,
            store,
            notifier,
            job_config,
            job_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Wire the HTTP feed, KV store and email client described by `config`
    pub fn from_config(config: &AlertApiConfig) -> Result<Self> {
        let feed = HttpFeed::new(&config.gpu_data_url, config.price_history_url.as_deref())
            .context("invalid dataset feed configuration")?;

        let store = match RestKvStore::from_settings(
            config.kv_rest_api_url.as_deref(),
            config.kv_rest_api_token.as_deref(),
        ) {
            Ok(store) => Some(Arc::new(store) as Arc<dyn SubscriptionStore>),
            Err(StoreError::NotConfigured) => None,
            Err(e) => return Err(e).context("invalid KV store configuration"),
        };

        let notifier = match config.resend_api_key.as_deref().filter(|k| !k.is_empty()) {
            Some(key) => Some(Arc::new(
                ResendNotifier::new(key, config.alert_from_address.clone())
                    .context("failed to build email client")?,
            ) as Arc<dyn Notifier>),
            None => None,
        };

        Ok(Self::new(Arc::new(feed), store, notifier, config.job_config()))
    }

    /// Register components; unconfigured dependencies start degraded
    pub async fn register_components(&self) {
        self.health_registry.register(components::FEED).await;
        if self.store.is_some() {
            self.health_registry.register(components::STORE).await;
        } else {
            self.health_registry
                .set_degraded(components::STORE, "KV store not configured")
                .await;
        }
        if self.notifier.is_some() {
            self.health_registry.register(components::NOTIFIER).await;
        } else {
            self.health_registry
                .set_degraded(components::NOTIFIER, "Email delivery not configured")
                .await;
        }
    }

    /// Run the alert job once and record the outcome in the health registry.
    ///
    /// Runs from the schedule and from `/api/check-alerts` are serialized: a
    /// run that arrives while another is in flight waits for it, then sees the
    /// `lastTriggered` stamps it wrote.
    pub async fn run_alert_job(&self) -> Result<JobSummary, JobError> {
        let _running = self.job_lock.lock().await;
        let result = match AlertJob::from_parts(
            self.feed.clone(),
            self.store.clone(),
            self.notifier.clone(),
            self.job_config.clone(),
        ) {
            Ok(job) => job.with_logger(self.logger.clone()).run().await,
            Err(e) => {
                self.logger.log_job_failed(&e.to_string());
                Err(e)
            }
        };

        match &result {
            Ok(summary) => {
                self.health_registry.set_healthy(components::FEED).await;
                self.health_registry.set_healthy(components::STORE).await;
                self.health_registry
                    .record_job(LastJobRun {
                        ok: true,
                        checked: summary.checked,
                        triggered: summary.triggered,
                        error: None,
                        timestamp: summary.timestamp.clone(),
                    })
                    .await;
            }
            Err(e) => {
                match e {
                    JobError::Feed(inner) => {
                        self.health_registry
                            .set_unhealthy(components::FEED, inner.to_string())
                            .await
                    }
                    JobError::Store(inner) => {
                        self.health_registry
                            .set_unhealthy(components::STORE, inner.to_string())
                            .await
                    }
                    JobError::MissingConfig => {}
                }
                self.health_registry
                    .record_job(LastJobRun {
                        ok: false,
                        checked: 0,
                        triggered: 0,
                        error: Some(e.to_string()),
                        timestamp: chrono::Utc::now().to_rfc3339(),
                    })
                    .await;
            }
        }
        result
    }
}

fn error_body(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

async fn subscribe(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    match state.subscriptions.subscribe_json(&body).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(e) => error_body(StatusCode::BAD_REQUEST, e.to_string()),
    }
}

async fn subscribe_preflight() -> impl IntoResponse {
    (
        StatusCode::NO_CONTENT,
        [
            (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
            (header::ACCESS_CONTROL_ALLOW_METHODS, "POST, OPTIONS"),
            (header::ACCESS_CONTROL_ALLOW_HEADERS, "Content-Type"),
        ],
    )
}

async fn subscribe_method_not_allowed() -> Response {
    error_body(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
}

/// Run the alert job; intended for a daily scheduler
async fn check_alerts(State(state): State<Arc<AppState>>) -> Response {
    match state.run_alert_job().await {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(e) => error_body(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

async fn check_alerts_method_not_allowed() -> impl IntoResponse {
    (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
}

/// Health check response - returns 200 if healthy, 503 if unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy => StatusCode::OK,
        ComponentStatus::Degraded => StatusCode::OK, // Still operational
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness check response - returns 200 if ready, 503 if not ready
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> Response {
    match render_metrics() {
        Ok(buffer) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            buffer,
        )
            .into_response(),
        Err(e) => {
            warn!(error = %e, "Failed to encode metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    let subscribe_routes = Router::new()
        .route(
            "/api/subscribe",
            post(subscribe)
                .options(subscribe_preflight)
                .fallback(subscribe_method_not_allowed),
        )
        .layer(cors_layer());

    Router::new()
        .route(
            "/api/check-alerts",
            get(check_alerts).fallback(check_alerts_method_not_allowed),
        )
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .merge(subscribe_routes)
        .with_state(state)
}

/// Start the API server; returns when `shutdown` resolves
pub async fn serve(
    port: u16,
    state: Arc<AppState>,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
