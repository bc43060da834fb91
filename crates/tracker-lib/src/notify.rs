//! Email notifications
//!
//! Delivery goes through the Resend HTTP API. Templates render the
//! subscription confirmation and the triggered-alert message.

use crate::models::{AlertSubscription, GpuOffer};
use async_trait::async_trait;
use html_escape::{encode_double_quoted_attribute, encode_text};
use reqwest::Client;
use serde::Serialize;
use std::sync::Mutex;
use std::time::Duration;

pub const RESEND_API_URL: &str = "https://api.resend.com";
pub const DEFAULT_FROM_ADDRESS: &str = "GPU Tracker <alerts@gpu-tracker.dev>";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("email delivery is not configured")]
    NotConfigured,

    #[error("email request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("email API returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<(), NotifyError>;
}

#[derive(Serialize)]
struct ResendPayload<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
}

pub struct ResendNotifier {
    client: Client,
    endpoint: String,
    api_key: String,
    from: String,
}

impl ResendNotifier {
    pub fn new(api_key: impl Into<String>, from: impl Into<String>) -> Result<Self, NotifyError> {
        Self::with_base_url(RESEND_API_URL, api_key, from)
    }

    pub fn with_base_url(
        base_url: &str,
        api_key: impl Into<String>,
        from: impl Into<String>,
    ) -> Result<Self, NotifyError> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(NotifyError::NotConfigured);
        }
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            endpoint: format!("{}/emails", base_url.trim_end_matches('/')),
            api_key,
            from: from.into(),
        })
    }
}

#[async_trait]
impl Notifier for ResendNotifier {
    async fn send(&self, message: &EmailMessage) -> Result<(), NotifyError> {
        let payload = ResendPayload {
            from: &self.from,
            to: [message.to.as_str()],
            subject: &message.subject,
            html: &message.html,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(NotifyError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

/// Notifier that records messages instead of sending them
#[derive(Debug, Default)]
pub struct MemoryNotifier {
    sent: Mutex<Vec<EmailMessage>>,
    failing: bool,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Notifier whose every send fails with HTTP 500
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            failing: true,
        }
    }

    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Notifier for MemoryNotifier {
    async fn send(&self, message: &EmailMessage) -> Result<(), NotifyError> {
        if self.failing {
            return Err(NotifyError::Status {
                status: 500,
                body: "delivery disabled".to_string(),
            });
        }
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(message.clone());
        }
        Ok(())
    }
}

/// `/gpu/<slug>` path segment: lowercase, whitespace runs become `-`
pub fn model_slug(model: &str) -> String {
    model
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
        .to_lowercase()
}

pub fn confirmation_email(sub: &AlertSubscription) -> EmailMessage {
    let model = sub.model_target().unwrap_or("any GPU");
    let provider = sub
        .provider_target()
        .map(|p| format!(" on {}", p))
        .unwrap_or_default();
    let price = sub
        .target_price
        .filter(|p| *p > 0.0)
        .map(|p| format!(" below ${}/hr", p))
        .unwrap_or_default();
    let label = sub.alert_type.label();
    let conditions = sub.conditions.describe();

    let summary = if price.is_empty() {
        format!("triggers a <strong>{}</strong> alert", label)
    } else {
        format!("drops <strong>{}</strong>", encode_text(&price))
    };

    let mut details = format!(
        "<div>Type: {}</div>\n<div>Model: {}</div>\n",
        label,
        encode_text(model)
    );
    if let Some(p) = sub.provider_target() {
        details.push_str(&format!("<div>Provider: {}</div>\n", encode_text(p)));
    }
    if let Some(target) = sub.target_price.filter(|p| *p > 0.0) {
        details.push_str(&format!("<div>Target price: ${}/hr</div>\n", target));
    }
    if !conditions.is_empty() {
        details.push_str(&format!("<div>Conditions: {}</div>\n", encode_text(&conditions)));
    }

    let html = format!(
        "<div style=\"font-family: monospace;\">\n\
         <h2>GPU Tracker Alert Set</h2>\n\
         <p>You'll be notified when <strong>{}{}</strong> {}.</p>\n\
         {}\
         <p>To unsubscribe, reply with \"unsubscribe\".</p>\n\
         </div>",
        encode_text(model),
        encode_text(&provider),
        summary,
        details
    );

    EmailMessage {
        to: sub.email.clone(),
        subject: format!("Alert set: {} — {}{}{}", label, model, provider, price),
        html,
    }
}

/// Message for a triggered alert: model, provider, price, deep links and the
/// conditions that matched
pub fn alert_email(sub: &AlertSubscription, offer: &GpuOffer, site_url: &str) -> EmailMessage {
    let model = sub.model_target().unwrap_or(&offer.model);
    let price = format!("${:.4}/hr", offer.price_per_hour);
    let compare_url = format!(
        "{}/gpu/{}",
        site_url.trim_end_matches('/'),
        model_slug(model)
    );

    let mut matched = vec![sub.alert_type.label().to_string()];
    if let Some(target) = sub.target_price.filter(|p| *p > 0.0) {
        matched.push(format!("target ${}/hr", target));
    }
    let conditions = sub.conditions.describe();
    if !conditions.is_empty() {
        matched.push(conditions);
    }

    let html = format!(
        "<div style=\"font-family: monospace;\">\n\
         <h2>Price Alert Triggered</h2>\n\
         <p>Your alert condition for <strong>{model}</strong> has been met.</p>\n\
         <p><strong>{price}</strong> {provider} · {commitment}</p>\n\
         <div>Model: {offer_model}</div>\n\
         <div>Provider: {provider}</div>\n\
         <div>VRAM: {vram}GB</div>\n\
         <div>Availability: {availability}</div>\n\
         <div>Matched: {matched}</div>\n\
         <p><a href=\"{link}\">Rent This GPU Now</a></p>\n\
         <p><a href=\"{compare}\">Compare all {model} prices</a></p>\n\
         <p>You set this alert on {created}. Reply \"unsubscribe\" to stop alerts.</p>\n\
         </div>",
        model = encode_text(model),
        price = price,
        provider = encode_text(&offer.provider),
        commitment = offer.commitment.as_str(),
        offer_model = encode_text(&offer.model),
        vram = offer.vram,
        availability = offer.availability.as_str(),
        matched = encode_text(&matched.join(" · ")),
        link = encode_double_quoted_attribute(&offer.link),
        compare = encode_double_quoted_attribute(&compare_url),
        created = sub.created_at.format("%Y-%m-%d"),
    );

    EmailMessage {
        to: sub.email.clone(),
        subject: format!(
            "🟢 Alert triggered: {} at {} — {}",
            model, price, offer.provider
        ),
        html,
    }
}
