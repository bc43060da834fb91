//! Alert subscriptions: creation, matching and the scheduled notification job

pub mod job;
pub mod matcher;
pub mod subscribe;

pub use job::{AlertJob, AlertJobConfig, JobError, JobSummary};
pub use matcher::{
    cheapest_match, evaluate, in_cooldown, is_relevant, Decision, MatchContext, NewLowPolicy,
    SuppressReason, DEFAULT_COOLDOWN_HOURS,
};
pub use subscribe::{
    SideEffectStatus, SubscribeError, SubscribeRequest, SubscribeResponse, SubscriptionService,
};

use crate::models::AlertSubscription;
use chrono::{DateTime, Utc};

/// Store keys of every subscription
pub const ALERT_KEY_PATTERN: &str = "alert:*";

/// `alert:{email}:{alertType}:{model}:{createdMillis}`
pub fn subscription_key(sub: &AlertSubscription, created: DateTime<Utc>) -> String {
    format!(
        "alert:{}:{}:{}:{}",
        sub.email,
        sub.alert_type.as_str(),
        sub.model,
        created.timestamp_millis()
    )
}
