//! Scheduled alert job
//!
//! One run loads the dataset and every stored subscription, evaluates each
//! subscription independently and notifies the triggered ones. A dataset or
//! key-listing failure aborts the run before any notification is sent.

use super::matcher::{evaluate, Decision, MatchContext, NewLowPolicy, SuppressReason};
use super::ALERT_KEY_PATTERN;
use crate::feed::{FeedError, OfferFeed};
use crate::models::{AlertSubscription, GpuOffer};
use crate::notify::{alert_email, Notifier};
use crate::observability::{StructuredLogger, TrackerMetrics};
use crate::store::{StoreError, SubscriptionStore};
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use futures_util::{stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("Missing env vars")]
    MissingConfig,

    #[error("Failed to fetch GPU data: {0}")]
    Feed(#[from] FeedError),

    #[error("Failed to list subscriptions: {0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone)]
pub struct AlertJobConfig {
    pub cooldown: Duration,
    /// Subscriptions evaluated concurrently
    pub max_concurrency: usize,
    pub new_low_policy: NewLowPolicy,
    /// Base URL for the compare link in alert emails
    pub site_url: String,
}

impl Default for AlertJobConfig {
    fn default() -> Self {
        Self {
            cooldown: Duration::hours(super::matcher::DEFAULT_COOLDOWN_HOURS),
            max_concurrency: 8,
            new_low_policy: NewLowPolicy::TargetOnly,
            site_url: "https://gpu-tracker.dev".to_string(),
        }
    }
}

/// Result of one job run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSummary {
    pub ok: bool,
    /// Subscriptions successfully loaded and evaluated
    pub checked: usize,
    pub triggered: usize,
    /// Suppressed by the cooldown window
    pub skipped: usize,
    /// Evaluated without a relevant offer or without the predicate firing
    pub unmatched: usize,
    /// Keys that could not be read or parsed
    pub malformed: usize,
    /// Triggered but the notification failed to send
    pub failed: usize,
    pub timestamp: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Triggered,
    Suppressed(SuppressReason),
    DeliveryFailed,
    Malformed,
}

pub struct AlertJob {
    feed: Arc<dyn OfferFeed>,
    store: Arc<dyn SubscriptionStore>,
    notifier: Arc<dyn Notifier>,
    config: AlertJobConfig,
    metrics: TrackerMetrics,
    logger: StructuredLogger,
}

impl AlertJob {
    pub fn new(
        feed: Arc<dyn OfferFeed>,
        store: Arc<dyn SubscriptionStore>,
        notifier: Arc<dyn Notifier>,
        config: AlertJobConfig,
    ) -> Self {
        Self {
            feed,
            store,
            notifier,
            config,
            metrics: TrackerMetrics::new(),
            logger: StructuredLogger::new("alert-job"),
        }
    }

    /// Build a job from optional dependencies; the store and notifier are required
    pub fn from_parts(
        feed: Arc<dyn OfferFeed>,
        store: Option<Arc<dyn SubscriptionStore>>,
        notifier: Option<Arc<dyn Notifier>>,
        config: AlertJobConfig,
    ) -> Result<Self, JobError> {
        match (store, notifier) {
            (Some(store), Some(notifier)) => Ok(Self::new(feed, store, notifier, config)),
            _ => Err(JobError::MissingConfig),
        }
    }

    pub fn with_logger(mut self, logger: StructuredLogger) -> Self {
        self.logger = logger;
        self
    }

    pub async fn run(&self) -> Result<JobSummary, JobError> {
        self.run_at(Utc::now()).await
    }

    /// Run the job with `now` as the evaluation and `lastTriggered` time
    pub async fn run_at(&self, now: DateTime<Utc>) -> Result<JobSummary, JobError> {
        let started = Instant::now();
        let result = self.execute(now).await;
        let elapsed = started.elapsed().as_secs_f64();

        self.metrics.observe_job(result.is_ok(), elapsed);
        match &result {
            Ok(summary) => {
                self.metrics.add_job_counts(
                    summary.checked as u64,
                    summary.triggered as u64,
                    summary.skipped as u64,
                    summary.malformed as u64,
                );
                self.logger.log_job_completed(
                    summary.checked,
                    summary.triggered,
                    summary.skipped,
                    summary.failed,
                    elapsed,
                );
            }
            Err(e) => self.logger.log_job_failed(&e.to_string()),
        }
        result
    }

    async fn execute(&self, now: DateTime<Utc>) -> Result<JobSummary, JobError> {
        let (keys, document) = tokio::join!(
            self.store.scan(ALERT_KEY_PATTERN),
            self.feed.fetch_offers()
        );
        let document = document?;
        let keys = keys?;

        self.logger
            .log_dataset_loaded(document.data.len(), &document.last_updated);
        self.metrics.set_dataset_offers(document.data.len());

        let history = match self.config.new_low_policy {
            NewLowPolicy::HistoricalLow => self.feed.fetch_history().await,
            NewLowPolicy::TargetOnly => None,
        };
        let ctx = MatchContext {
            now,
            cooldown: self.config.cooldown,
            policy: self.config.new_low_policy,
            history: history.as_ref(),
        };
        let offers = document.data.as_slice();

        debug!(keys = keys.len(), offers = offers.len(), "Evaluating subscriptions");

        let outcomes: Vec<Outcome> = stream::iter(keys)
            .map(|key| self.process(key, offers, &ctx))
            .buffer_unordered(self.config.max_concurrency.max(1))
            .collect()
            .await;

        let mut summary = JobSummary {
            ok: true,
            timestamp: now.to_rfc3339_opts(SecondsFormat::Millis, true),
            ..Default::default()
        };
        for outcome in outcomes {
            match outcome {
                Outcome::Malformed => {
                    summary.malformed += 1;
                    continue;
                }
                Outcome::Triggered => summary.triggered += 1,
                Outcome::Suppressed(SuppressReason::Cooldown) => summary.skipped += 1,
                Outcome::Suppressed(_) => summary.unmatched += 1,
                Outcome::DeliveryFailed => summary.failed += 1,
            }
            summary.checked += 1;
        }
        Ok(summary)
    }

    async fn load(&self, key: &str) -> Result<AlertSubscription, String> {
        let raw = self
            .store
            .get(key)
            .await
            .map_err(|e| e.to_string())?
            .ok_or_else(|| "key vanished before it could be read".to_string())?;
        serde_json::from_str(&raw).map_err(|e| e.to_string())
    }

    /// Decide, notify, then record the trigger; the write always follows this
    /// subscription's own decision
    async fn process(&self, key: String, offers: &[GpuOffer], ctx: &MatchContext<'_>) -> Outcome {
        let mut sub = match self.load(&key).await {
            Ok(sub) => sub,
            Err(e) => {
                self.logger.log_record_malformed(&key, &e);
                return Outcome::Malformed;
            }
        };

        let offer = match evaluate(&sub, offers, ctx) {
            Decision::Triggered(offer) => offer,
            Decision::Suppressed(reason) => {
                self.logger.log_alert_suppressed(&key, reason.as_str());
                return Outcome::Suppressed(reason);
            }
        };

        let message = alert_email(&sub, offer, &self.config.site_url);
        if let Err(e) = self.notifier.send(&message).await {
            self.metrics.inc_delivery_failures();
            self.logger.log_delivery_failed(&key, &e.to_string());
            return Outcome::DeliveryFailed;
        }
        self.logger
            .log_alert_triggered(&key, &offer.id, offer.price_per_hour);

        sub.last_triggered = Some(ctx.now);
        match serde_json::to_string(&sub) {
            Ok(value) => {
                if let Err(e) = self.store.put(&key, &value).await {
                    warn!(key = %key, error = %e, "Alert sent but lastTriggered was not saved");
                }
            }
            Err(e) => warn!(key = %key, error = %e, "Could not encode subscription"),
        }
        Outcome::Triggered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::StaticFeed;
    use crate::models::{
        AlertConditions, AlertType, Availability, Commitment, DatasetDocument, PriceHistory,
    };
    use crate::notify::MemoryNotifier;
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 2, 6, 0, 0).unwrap()
    }

    fn offer(id: &str, model: &str, price: f64, availability: Availability) -> GpuOffer {
        GpuOffer {
            id: id.to_string(),
            provider: "RunPod".to_string(),
            provider_logo: None,
            instance_name: String::new(),
            model: model.to_string(),
            gpu_count: 1,
            vram: 80.0,
            cpu: 0,
            ram: 0.0,
            price_per_hour: price,
            region: "EU".to_string(),
            commitment: Commitment::OnDemand,
            availability,
            link: format!("https://runpod.io/{}", id),
            last_updated: String::new(),
        }
    }

    fn subscription(model: &str, target: Option<f64>) -> AlertSubscription {
        AlertSubscription {
            email: "ops@example.com".to_string(),
            alert_type: AlertType::PriceDrop,
            model: model.to_string(),
            provider: "any".to_string(),
            target_price: target,
            conditions: AlertConditions::default(),
            created_at: now() - Duration::days(1),
            last_triggered: None,
        }
    }

    async fn put(store: &MemoryStore, key: &str, sub: &AlertSubscription) {
        store
            .put(key, &serde_json::to_string(sub).unwrap())
            .await
            .unwrap();
    }

    fn job(store: Arc<MemoryStore>, notifier: Arc<MemoryNotifier>) -> AlertJob {
        let feed = StaticFeed::new(vec![
            offer("h100-a", "H100", 1.50, Availability::High),
            offer("a100-a", "A100", 1.10, Availability::Medium),
        ]);
        AlertJob::new(Arc::new(feed), store, notifier, AlertJobConfig::default())
    }

    #[tokio::test]
    async fn test_run_counts_and_marks_triggered() {
        let store = Arc::new(MemoryStore::new());
        put(&store, "alert:a:price-drop:H100:1", &subscription("H100", Some(2.0))).await;
        put(&store, "alert:b:price-drop:H100:2", &subscription("H100", Some(1.0))).await;
        let mut cooling = subscription("A100", Some(2.0));
        cooling.last_triggered = Some(now() - Duration::hours(2));
        put(&store, "alert:c:price-drop:A100:3", &cooling).await;
        store.put("alert:d:price-drop:any:4", "{not json").await.unwrap();
        store.put("session:x", "{}").await.unwrap();

        let notifier = Arc::new(MemoryNotifier::new());
        let summary = job(store.clone(), notifier.clone()).run_at(now()).await.unwrap();

        assert!(summary.ok);
        assert_eq!(summary.checked, 3);
        assert_eq!(summary.triggered, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.unmatched, 1);
        assert_eq!(summary.malformed, 1);
        assert_eq!(notifier.sent().len(), 1);
        assert!(notifier.sent()[0].subject.contains("H100 at $1.5000/hr"));

        let raw = store.get("alert:a:price-drop:H100:1").await.unwrap().unwrap();
        let saved: AlertSubscription = serde_json::from_str(&raw).unwrap();
        assert_eq!(saved.last_triggered, Some(now()));
    }

    #[tokio::test]
    async fn test_second_run_is_suppressed_by_cooldown() {
        let store = Arc::new(MemoryStore::new());
        put(&store, "alert:a:price-drop:H100:1", &subscription("H100", Some(2.0))).await;
        let notifier = Arc::new(MemoryNotifier::new());
        let job = job(store, notifier.clone());

        let first = job.run_at(now()).await.unwrap();
        let second = job.run_at(now() + Duration::minutes(1)).await.unwrap();

        assert_eq!(first.triggered, 1);
        assert_eq!(second.triggered, 0);
        assert_eq!(second.skipped, 1);
        assert_eq!(notifier.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_delivery_failure_leaves_subscription_untouched() {
        let store = Arc::new(MemoryStore::new());
        put(&store, "alert:a:price-drop:H100:1", &subscription("H100", Some(2.0))).await;
        let notifier = Arc::new(MemoryNotifier::failing());

        let summary = job(store.clone(), notifier).run_at(now()).await.unwrap();
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.triggered, 0);

        let raw = store.get("alert:a:price-drop:H100:1").await.unwrap().unwrap();
        let saved: AlertSubscription = serde_json::from_str(&raw).unwrap();
        assert!(saved.last_triggered.is_none());
    }

    struct DownFeed;

    #[async_trait]
    impl OfferFeed for DownFeed {
        async fn fetch_offers(&self) -> Result<DatasetDocument, FeedError> {
            Err(FeedError::Status {
                url: "https://gpu-tracker.dev/gpu-data.json".to_string(),
                status: 503,
            })
        }

        async fn fetch_history(&self) -> Option<PriceHistory> {
            None
        }
    }

    #[tokio::test]
    async fn test_feed_failure_aborts_without_notifying() {
        let store = Arc::new(MemoryStore::new());
        put(&store, "alert:a:price-drop:H100:1", &subscription("H100", Some(2.0))).await;
        let notifier = Arc::new(MemoryNotifier::new());

        let job = AlertJob::new(
            Arc::new(DownFeed),
            store,
            notifier.clone(),
            AlertJobConfig::default(),
        );
        let err = job.run_at(now()).await.unwrap_err();
        assert!(matches!(err, JobError::Feed(_)));
        assert!(notifier.sent().is_empty());
    }

    #[test]
    fn test_missing_dependencies() {
        let feed: Arc<dyn OfferFeed> = Arc::new(StaticFeed::default());
        let store: Arc<dyn SubscriptionStore> = Arc::new(MemoryStore::new());
        let result = AlertJob::from_parts(feed, Some(store), None, AlertJobConfig::default());
        assert!(matches!(result, Err(JobError::MissingConfig)));
    }
}
