//! Usage accounting per (user, session).

use crate::{
    errors::PromptError,
    providers::db::storage::UsageStore,
    types::{UsageDelta, UsageStat},
};
use chrono::Utc;
use std::time::Duration;
use tracing::debug;

/// `successes / (successes + errors) × 100`, or `100` before anything was recorded.
pub fn success_rate(successes: i64, errors: i64) -> f64 {
    let attempts = successes + errors;
    if attempts <= 0 {
        return 100.0;
    }
    (successes as f64 / attempts as f64) * 100.0
}

pub enum UsageEvent {
    Success { tokens: u32, elapsed: Duration },
    Error,
}

impl UsageEvent {
    /// The increment this event adds to its session row.
    pub fn delta(&self) -> UsageDelta {
        let at = Utc::now();
        match self {
            UsageEvent::Success { tokens, elapsed } => UsageDelta {
                messages: 1,
                tokens: i64::from(*tokens),
                errors: 0,
                response_time_ms: Some(elapsed.as_millis() as i64),
                at,
            },
            UsageEvent::Error => UsageDelta {
                messages: 0,
                tokens: 0,
                errors: 1,
                response_time_ms: None,
                at,
            },
        }
    }
}

/// Adds `event` to the session row in one store operation and returns the
/// updated row.
pub async fn record_usage(
    store: &dyn UsageStore,
    user_id: &str,
    session_id: &str,
    event: UsageEvent,
) -> Result<UsageStat, PromptError> {
    let stat = store
        .apply_usage(user_id, session_id, &event.delta())
        .await?;
    debug!(
        "Usage for {user_id}/{session_id}: {} messages, {} errors",
        stat.messages_count, stat.error_count
    );
    Ok(stat)
}
