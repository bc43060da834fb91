//! In-process daily alert schedule

use crate::api::AppState;
use chrono::{DateTime, Duration, NaiveTime, Utc};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{info, warn};

/// Next occurrence of `hour_utc:00` strictly after `now`
pub fn next_run_after(now: DateTime<Utc>, hour_utc: u32) -> DateTime<Utc> {
    let time = NaiveTime::from_hms_opt(hour_utc.min(23), 0, 0).unwrap_or(NaiveTime::MIN);
    let today = now.date_naive().and_time(time).and_utc();
    if today > now {
        today
    } else {
        today + Duration::days(1)
    }
}

/// Run the alert job every day at `hour_utc` until shutdown
pub async fn run_daily(state: Arc<AppState>, hour_utc: u32, mut shutdown: broadcast::Receiver<()>) {
    loop {
        let now = Utc::now();
        let next = next_run_after(now, hour_utc);
        let wait = (next - now).to_std().unwrap_or_default();
        info!(next_run = %next.to_rfc3339(), "Scheduled next alert job");

        tokio::select! {
            _ = tokio::time::sleep(wait) => {
                if let Err(e) = state.run_alert_job().await {
                    warn!(error = %e, "Scheduled alert job failed");
                }
            }
            _ = shutdown.recv() => {
                info!("Shutting down alert schedule");
                break;
            }
        }
    }
}
