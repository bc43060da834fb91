//! Price history trends

use crate::models::PriceHistory;
use serde::Serialize;

/// Smallest change over the trend window that counts as movement
const TREND_DEADBAND: f64 = 0.05;

/// Snapshots compared for the trend direction
const TREND_WINDOW: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Falling,
    Rising,
    Flat,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelPriceTrend {
    pub min_prices: Vec<f64>,
    pub avg_prices: Vec<f64>,
    pub dates: Vec<String>,
    /// Latest minimum is at or below every earlier minimum
    pub is_historical_low: bool,
    pub direction: TrendDirection,
    pub days_covered: usize,
}

impl ModelPriceTrend {
    pub fn historical_min(&self) -> Option<f64> {
        self.min_prices.iter().copied().reduce(f64::min)
    }

    pub fn current_min(&self) -> Option<f64> {
        self.min_prices.last().copied()
    }
}

fn direction(min_prices: &[f64]) -> TrendDirection {
    if min_prices.len() < TREND_WINDOW {
        return TrendDirection::Flat;
    }
    let recent = &min_prices[min_prices.len() - TREND_WINDOW..];
    let delta = recent[TREND_WINDOW - 1] - recent[0];
    if delta < -TREND_DEADBAND {
        TrendDirection::Falling
    } else if delta > TREND_DEADBAND {
        TrendDirection::Rising
    } else {
        TrendDirection::Flat
    }
}

/// Trend for `model`, `None` when no snapshot mentions it
pub fn model_price_trend(history: &PriceHistory, model: &str) -> Option<ModelPriceTrend> {
    let mut min_prices = Vec::new();
    let mut avg_prices = Vec::new();
    let mut dates = Vec::new();

    for snapshot in &history.snapshots {
        if let Some(stats) = snapshot.models.get(model) {
            min_prices.push(stats.min);
            avg_prices.push(stats.avg);
            dates.push(snapshot.date.clone());
        }
    }

    let current = *min_prices.last()?;
    let historical_min = min_prices.iter().copied().fold(f64::INFINITY, f64::min);

    Some(ModelPriceTrend {
        is_historical_low: current <= historical_min,
        direction: direction(&min_prices),
        days_covered: min_prices.len(),
        min_prices,
        avg_prices,
        dates,
    })
}

/// Whether `price` is at or below the lowest recorded minimum for `model`
pub fn is_at_or_below_history(history: &PriceHistory, model: &str, price: f64) -> Option<bool> {
    let trend = model_price_trend(history, model)?;
    trend.historical_min().map(|min| price <= min)
}
