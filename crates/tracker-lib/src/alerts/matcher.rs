//! Per-subscription trigger decision
//!
//! A subscription moves from evaluated to either suppressed or triggered.
//! The cooldown check runs first so a recently notified subscription is
//! never re-notified, whatever the current prices are.

use crate::history::is_at_or_below_history;
use crate::models::{AlertSubscription, AlertType, Availability, GpuOffer, PriceHistory};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Cooldown between two notifications for the same subscription
pub const DEFAULT_COOLDOWN_HOURS: i64 = 23;

/// How `new-low` subscriptions decide whether to fire
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NewLowPolicy {
    /// Fire when the cheapest match is at or below the target, or always without a target
    #[default]
    TargetOnly,
    /// As `TargetOnly`, and the price must also be at or below the recorded historical minimum
    HistoricalLow,
}

impl FromStr for NewLowPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "target-only" => Ok(NewLowPolicy::TargetOnly),
            "historical-low" => Ok(NewLowPolicy::HistoricalLow),
            other => Err(format!(
                "unknown new-low policy '{}', expected target-only or historical-low",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SuppressReason {
    /// Notified within the cooldown window
    Cooldown,
    /// Nothing in the dataset matches the subscription's filters
    NoRelevantOffers,
    /// The cheapest match does not satisfy the alert type's predicate
    ConditionNotMet,
}

impl SuppressReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SuppressReason::Cooldown => "cooldown",
            SuppressReason::NoRelevantOffers => "no-relevant-offers",
            SuppressReason::ConditionNotMet => "condition-not-met",
        }
    }
}

impl fmt::Display for SuppressReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Decision<'a> {
    Triggered(&'a GpuOffer),
    Suppressed(SuppressReason),
}

/// Inputs shared by every evaluation in one job run
#[derive(Debug, Clone, Copy)]
pub struct MatchContext<'a> {
    pub now: DateTime<Utc>,
    pub cooldown: Duration,
    pub policy: NewLowPolicy,
    pub history: Option<&'a PriceHistory>,
}

impl<'a> MatchContext<'a> {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now,
            cooldown: Duration::hours(DEFAULT_COOLDOWN_HOURS),
            policy: NewLowPolicy::default(),
            history: None,
        }
    }
}

pub fn in_cooldown(sub: &AlertSubscription, now: DateTime<Utc>, cooldown: Duration) -> bool {
    sub.last_triggered
        .map(|last| now - last < cooldown)
        .unwrap_or(false)
}

/// Whether `offer` passes the subscription's model, provider and condition filters
pub fn is_relevant(sub: &AlertSubscription, offer: &GpuOffer) -> bool {
    if sub.model_target().is_some_and(|m| offer.model != m) {
        return false;
    }
    if sub.provider_target().is_some_and(|p| offer.provider != p) {
        return false;
    }

    let conditions = &sub.conditions;
    if let Some(models) = conditions.models.as_ref().filter(|m| !m.is_empty()) {
        if !models.iter().any(|m| *m == offer.model) {
            return false;
        }
    }
    if let Some(providers) = conditions.providers.as_ref().filter(|p| !p.is_empty()) {
        if !providers.iter().any(|p| *p == offer.provider) {
            return false;
        }
    }
    if conditions.max_price().is_some_and(|max| offer.price_per_hour > max) {
        return false;
    }
    if conditions.min_vram().is_some_and(|min| offer.vram < min) {
        return false;
    }
    if conditions.only_stable() && offer.commitment.is_spot() {
        return false;
    }
    if conditions.only_high_avail() && offer.availability != Availability::High {
        return false;
    }
    true
}

/// Lowest-priced relevant offer; the first one encountered wins ties
pub fn cheapest_match<'a>(sub: &AlertSubscription, offers: &'a [GpuOffer]) -> Option<&'a GpuOffer> {
    offers
        .iter()
        .filter(|offer| is_relevant(sub, offer))
        .fold(None, |best: Option<&GpuOffer>, offer| match best {
            Some(b) if b.price_per_hour <= offer.price_per_hour => Some(b),
            _ => Some(offer),
        })
}

fn predicate_fires(sub: &AlertSubscription, cheapest: &GpuOffer, ctx: &MatchContext<'_>) -> bool {
    let price = cheapest.price_per_hour;
    match sub.alert_type {
        AlertType::PriceDrop => sub.target_price.is_some_and(|t| t > 0.0 && price <= t),
        AlertType::NewLow => {
            let under_target = sub.target_price.map_or(true, |t| price <= t);
            match ctx.policy {
                NewLowPolicy::TargetOnly => under_target,
                NewLowPolicy::HistoricalLow => {
                    under_target
                        && ctx
                            .history
                            .and_then(|h| is_at_or_below_history(h, &cheapest.model, price))
                            .unwrap_or(false)
                }
            }
        }
        AlertType::Availability | AlertType::BackInStock => cheapest.availability.is_in_stock(),
    }
}

pub fn evaluate<'a>(
    sub: &AlertSubscription,
    offers: &'a [GpuOffer],
    ctx: &MatchContext<'_>,
) -> Decision<'a> {
    if in_cooldown(sub, ctx.now, ctx.cooldown) {
        return Decision::Suppressed(SuppressReason::Cooldown);
    }

    let Some(cheapest) = cheapest_match(sub, offers) else {
        return Decision::Suppressed(SuppressReason::NoRelevantOffers);
    };

    if predicate_fires(sub, cheapest, ctx) {
        Decision::Triggered(cheapest)
    } else {
        Decision::Suppressed(SuppressReason::ConditionNotMet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AlertConditions, Commitment, DaySnapshot, ModelSnapshot};
    use chrono::TimeZone;
    use std::collections::HashMap;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 2, 6, 0, 0).unwrap()
    }

    fn offer(
        id: &str,
        provider: &str,
        model: &str,
        price: f64,
        commitment: Commitment,
        availability: Availability,
    ) -> GpuOffer {
        GpuOffer {
            id: id.to_string(),
            provider: provider.to_string(),
            provider_logo: None,
            instance_name: String::new(),
            model: model.to_string(),
            gpu_count: 1,
            vram: 80.0,
            cpu: 0,
            ram: 0.0,
            price_per_hour: price,
            region: "us-east".to_string(),
            commitment,
            availability,
            link: format!("https://example.com/{}", id),
            last_updated: String::new(),
        }
    }

    fn dataset() -> Vec<GpuOffer> {
        vec![
            offer("lambda-h100", "Lambda Labs", "H100", 2.49, Commitment::OnDemand, Availability::Medium),
            offer("vast-h100", "Vast.ai", "H100", 1.50, Commitment::Spot, Availability::High),
            offer("runpod-h100", "RunPod", "H100", 1.99, Commitment::OnDemand, Availability::Low),
            offer("aws-a100", "AWS", "A100", 3.10, Commitment::OnDemand, Availability::OutOfStock),
        ]
    }

    fn subscription(alert_type: AlertType, model: &str, target: Option<f64>) -> AlertSubscription {
        AlertSubscription {
            email: "ops@example.com".to_string(),
            alert_type,
            model: model.to_string(),
            provider: "any".to_string(),
            target_price: target,
            conditions: AlertConditions::default(),
            created_at: now() - Duration::days(3),
            last_triggered: None,
        }
    }

    fn history(h100_min: f64) -> PriceHistory {
        let mut models = HashMap::new();
        models.insert(
            "H100".to_string(),
            ModelSnapshot { min: h100_min, avg: 2.5, p25: 2.0, p75: 3.0, count: 12 },
        );
        PriceHistory {
            generated: "2024-05-01".to_string(),
            snapshots: vec![DaySnapshot { date: "2024-05-01".to_string(), models }],
        }
    }

    #[test]
    fn test_price_drop_above_target_not_triggered() {
        let offers = dataset();
        let sub = subscription(AlertType::PriceDrop, "H100", Some(1.00));
        assert_eq!(
            evaluate(&sub, &offers, &MatchContext::new(now())),
            Decision::Suppressed(SuppressReason::ConditionNotMet)
        );
    }

    #[test]
    fn test_price_drop_at_target_triggers_cheapest() {
        let offers = dataset();
        let sub = subscription(AlertType::PriceDrop, "H100", Some(1.50));
        match evaluate(&sub, &offers, &MatchContext::new(now())) {
            Decision::Triggered(o) => assert_eq!(o.id, "vast-h100"),
            other => panic!("unexpected {:?}", other),
        }

        let no_target = subscription(AlertType::PriceDrop, "H100", None);
        assert_eq!(
            evaluate(&no_target, &offers, &MatchContext::new(now())),
            Decision::Suppressed(SuppressReason::ConditionNotMet)
        );
    }

    #[test]
    fn test_cooldown_suppresses_before_matching() {
        let offers = dataset();
        let mut sub = subscription(AlertType::PriceDrop, "H100", Some(5.0));
        sub.last_triggered = Some(now() - Duration::hours(1));
        assert_eq!(
            evaluate(&sub, &offers, &MatchContext::new(now())),
            Decision::Suppressed(SuppressReason::Cooldown)
        );

        sub.last_triggered = Some(now() - Duration::hours(23));
        assert!(matches!(
            evaluate(&sub, &offers, &MatchContext::new(now())),
            Decision::Triggered(_)
        ));
    }

    #[test]
    fn test_no_relevant_offers() {
        let offers = dataset();
        let sub = subscription(AlertType::Availability, "B200", None);
        assert_eq!(
            evaluate(&sub, &offers, &MatchContext::new(now())),
            Decision::Suppressed(SuppressReason::NoRelevantOffers)
        );
    }

    #[test]
    fn test_relevance_conditions() {
        let offers = dataset();
        let mut sub = subscription(AlertType::PriceDrop, "H100", Some(3.0));

        sub.conditions.only_stable = Some(true);
        assert_eq!(cheapest_match(&sub, &offers).map(|o| o.id.as_str()), Some("runpod-h100"));

        sub.conditions.only_high_avail = Some(true);
        assert_eq!(cheapest_match(&sub, &offers), None);

        let mut listed = subscription(AlertType::PriceDrop, "any", Some(3.0));
        listed.conditions.providers = Some(vec!["Lambda Labs".to_string()]);
        assert_eq!(cheapest_match(&listed, &offers).map(|o| o.id.as_str()), Some("lambda-h100"));

        let mut capped = subscription(AlertType::PriceDrop, "any", Some(3.0));
        capped.conditions.max_price = Some(0.0);
        capped.conditions.min_vram = Some(-1.0);
        assert_eq!(cheapest_match(&capped, &offers).map(|o| o.id.as_str()), Some("vast-h100"));

        capped.conditions.max_price = Some(1.0);
        assert_eq!(cheapest_match(&capped, &offers), None);
    }

    #[test]
    fn test_availability_uses_cheapest_match() {
        let offers = dataset();
        let sub = subscription(AlertType::BackInStock, "A100", None);
        assert_eq!(
            evaluate(&sub, &offers, &MatchContext::new(now())),
            Decision::Suppressed(SuppressReason::ConditionNotMet)
        );

        let h100 = subscription(AlertType::Availability, "H100", None);
        assert!(matches!(
            evaluate(&h100, &offers, &MatchContext::new(now())),
            Decision::Triggered(o) if o.id == "vast-h100"
        ));
    }

    #[test]
    fn test_cheapest_tie_keeps_first() {
        let offers = vec![
            offer("first", "A", "T4", 0.5, Commitment::OnDemand, Availability::High),
            offer("second", "B", "T4", 0.5, Commitment::OnDemand, Availability::High),
        ];
        let sub = subscription(AlertType::Availability, "any", None);
        assert_eq!(cheapest_match(&sub, &offers).map(|o| o.id.as_str()), Some("first"));
    }

    #[test]
    fn test_new_low_target_only_policy() {
        let offers = dataset();
        let ctx = MatchContext::new(now());
        let untargeted = subscription(AlertType::NewLow, "H100", None);
        assert!(matches!(evaluate(&untargeted, &offers, &ctx), Decision::Triggered(_)));

        let targeted = subscription(AlertType::NewLow, "H100", Some(1.0));
        assert_eq!(
            evaluate(&targeted, &offers, &ctx),
            Decision::Suppressed(SuppressReason::ConditionNotMet)
        );
    }

    #[test]
    fn test_new_low_historical_policy() {
        let offers = dataset();
        let sub = subscription(AlertType::NewLow, "H100", None);
        let lower = history(1.20);
        let higher = history(1.80);

        let mut ctx = MatchContext::new(now());
        ctx.policy = NewLowPolicy::HistoricalLow;
        assert_eq!(
            evaluate(&sub, &offers, &ctx),
            Decision::Suppressed(SuppressReason::ConditionNotMet)
        );

        ctx.history = Some(&lower);
        assert_eq!(
            evaluate(&sub, &offers, &ctx),
            Decision::Suppressed(SuppressReason::ConditionNotMet)
        );

        ctx.history = Some(&higher);
        assert!(matches!(evaluate(&sub, &offers, &ctx), Decision::Triggered(_)));
    }

    #[test]
    fn test_policy_parse() {
        assert_eq!("historical-low".parse::<NewLowPolicy>(), Ok(NewLowPolicy::HistoricalLow));
        assert_eq!("target-only".parse::<NewLowPolicy>(), Ok(NewLowPolicy::TargetOnly));
        assert!("weekly".parse::<NewLowPolicy>().is_err());
    }
}
