use std::time::Duration;

use chrono::Utc;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::instrument;

pub type Timestamp = chrono::DateTime<Utc>;

/// Default period between two polls.
pub const DEFAULT_PERIOD: Duration = Duration::from_secs(1);

/// A timer whose first tick fires one full `period` from now.
///
/// A slow poll pushes every following tick back instead of bursting to catch up,
/// so consecutive polls are always at least one period apart.
#[instrument]
pub fn ticker(period: Duration) -> Interval {
    let start = Instant::now() + period;

    let mut timer = tokio::time::interval_at(start, period);
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
    timer
}

/// parse a humantime duration such as `1s` or `500ms`, rejecting zero.
pub fn parse_period(text: &str) -> Result<Duration, String> {
    let period = humantime::parse_duration(text).map_err(|err| err.to_string())?;

    if period.is_zero() {
        return Err(format!("poll interval must be greater than zero, got `{text}`"));
    }

    Ok(period)
}
