//! Background daily reset
//!
//! Every tick, venues whose `reset_hour_utc` has passed today and that have
//! no reset logged for today are reset. The log row makes a reset run at most
//! once per venue and date, so overlapping ticks or a manual reset are safe.

use chrono::{NaiveDate, Timelike, Utc};
use shared::models::ResetTrigger;
use std::time::Duration;

use crate::db;
use crate::state::AppState;

/// Spawn the reset loop; `interval_secs == 0` disables it
pub fn spawn_daily_reset(state: AppState, interval_secs: u64) {
    if interval_secs == 0 {
        tracing::info!("Scheduled daily reset disabled");
        return;
    }
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            let now = Utc::now();
            run_due_resets(&state, now.date_naive(), now.hour() as i32).await;
        }
    });
}

async fn run_due_resets(state: &AppState, today: NaiveDate, hour_utc: i32) {
    let reset_date = today.format("%Y-%m-%d").to_string();
    let venues = match db::venues::due_for_reset(&state.pool, hour_utc, &reset_date).await {
        Ok(v) => v,
        Err(e) => {
            tracing::error!(%e, "Failed to list venues due for reset");
            return;
        }
    };

    for venue_id in venues {
        match db::daily_reset::run(&state.pool, venue_id, today, ResetTrigger::Scheduled).await {
            Ok(summary) if summary.skipped => {
                tracing::debug!(venue_id, reset_date = %reset_date, "Daily reset already done");
            }
            Ok(summary) => {
                tracing::info!(
                    venue_id,
                    reset_date = %reset_date,
                    orders_completed = summary.orders_completed,
                    orders_cancelled = summary.orders_cancelled,
                    sessions_closed = summary.sessions_closed,
                    "Scheduled daily reset"
                );
            }
            Err(e) => {
                tracing::error!(venue_id, %e, "Scheduled daily reset failed");
            }
        }
    }
}
