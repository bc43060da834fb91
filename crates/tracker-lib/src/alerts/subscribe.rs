//! Subscription requests
//!
//! Validation failures are reported to the caller. Persisting the record and
//! sending the confirmation are best-effort: their failure, or a missing
//! store or notifier, never fails an accepted request. The response says
//! which side effects actually happened.

use super::subscription_key;
use crate::models::{AlertConditions, AlertSubscription, AlertType, ANY};
use crate::notify::{confirmation_email, Notifier};
use crate::observability::{StructuredLogger, TrackerMetrics};
use crate::store::SubscriptionStore;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, OnceLock};

pub const ACCEPTED_MESSAGE: &str = "Alert registered. Check your email for confirmation.";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubscribeError {
    #[error("Invalid JSON")]
    InvalidJson,

    #[error("Invalid email address")]
    InvalidEmail,

    #[error("alertType is required")]
    MissingAlertType,

    #[error("Unknown alertType '{0}'")]
    UnknownAlertType(String),
}

/// Body of a subscription request
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribeRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub alert_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditions: Option<AlertConditions>,
}

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"))
}

pub fn is_valid_email(email: &str) -> bool {
    email_pattern().is_match(email)
}

impl SubscribeRequest {
    pub fn from_json(body: &[u8]) -> Result<Self, SubscribeError> {
        serde_json::from_slice(body).map_err(|_| SubscribeError::InvalidJson)
    }

    /// Validate and turn the request into a stored record
    pub fn into_subscription(self, now: DateTime<Utc>) -> Result<AlertSubscription, SubscribeError> {
        let email = self
            .email
            .filter(|e| is_valid_email(e))
            .ok_or(SubscribeError::InvalidEmail)?;
        let alert_type = match self.alert_type.as_deref() {
            None | Some("") => return Err(SubscribeError::MissingAlertType),
            Some(raw) => {
                AlertType::parse(raw).ok_or_else(|| SubscribeError::UnknownAlertType(raw.to_string()))?
            }
        };

        Ok(AlertSubscription {
            email,
            alert_type,
            model: self.model.unwrap_or_else(|| ANY.to_string()),
            provider: self.provider.unwrap_or_else(|| ANY.to_string()),
            target_price: self.target_price,
            conditions: self.conditions.unwrap_or_default(),
            created_at: now,
            last_triggered: None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SideEffectStatus {
    Done,
    Skipped,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscribeResponse {
    pub ok: bool,
    pub message: String,
    pub stored: SideEffectStatus,
    pub confirmation: SideEffectStatus,
    /// Both side effects completed
    pub processed: bool,
}

#[derive(Clone)]
pub struct SubscriptionService {
    store: Option<Arc<dyn SubscriptionStore>>,
    notifier: Option<Arc<dyn Notifier>>,
    metrics: TrackerMetrics,
    logger: StructuredLogger,
}

impl SubscriptionService {
    pub fn new(
        store: Option<Arc<dyn SubscriptionStore>>,
        notifier: Option<Arc<dyn Notifier>>,
    ) -> Self {
        Self {
            store,
            notifier,
            metrics: TrackerMetrics::new(),
            logger: StructuredLogger::new("subscribe"),
        }
    }

    pub fn with_logger(mut self, logger: StructuredLogger) -> Self {
        self.logger = logger;
        self
    }

    pub async fn subscribe_json(&self, body: &[u8]) -> Result<SubscribeResponse, SubscribeError> {
        let request = SubscribeRequest::from_json(body)?;
        self.subscribe(request, Utc::now()).await
    }

    pub async fn subscribe(
        &self,
        request: SubscribeRequest,
        now: DateTime<Utc>,
    ) -> Result<SubscribeResponse, SubscribeError> {
        let sub = request.into_subscription(now)?;
        let key = subscription_key(&sub, now);

        let (stored, confirmation) = tokio::join!(self.persist(&key, &sub), self.confirm(&sub));

        self.metrics.inc_subscriptions_created();
        self.logger
            .log_subscription_created(&key, sub.alert_type.as_str(), &sub.model);

        Ok(SubscribeResponse {
            ok: true,
            message: ACCEPTED_MESSAGE.to_string(),
            stored,
            confirmation,
            processed: stored == SideEffectStatus::Done && confirmation == SideEffectStatus::Done,
        })
    }

    async fn persist(&self, key: &str, sub: &AlertSubscription) -> SideEffectStatus {
        let Some(store) = &self.store else {
            self.logger.log_side_effect_skipped("store");
            return SideEffectStatus::Skipped;
        };
        let result = match serde_json::to_string(sub) {
            Ok(value) => store.put(key, &value).await.map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };
        match result {
            Ok(()) => SideEffectStatus::Done,
            Err(e) => {
                self.metrics.inc_side_effect_failures("store");
                self.logger.log_side_effect_failed("store", &e);
                SideEffectStatus::Failed
            }
        }
    }

    async fn confirm(&self, sub: &AlertSubscription) -> SideEffectStatus {
        let Some(notifier) = &self.notifier else {
            self.logger.log_side_effect_skipped("confirmation");
            return SideEffectStatus::Skipped;
        };
        match notifier.send(&confirmation_email(sub)).await {
            Ok(()) => SideEffectStatus::Done,
            Err(e) => {
                self.metrics.inc_side_effect_failures("confirmation");
                self.logger.log_side_effect_failed("confirmation", &e.to_string());
                SideEffectStatus::Failed
            }
        }
    }
}
