use chrono::{NaiveTime, TimeZone, Timelike, Utc};

use crate::models::EngagementHistory;

const MINUTES_PER_DAY: f64 = 24.0 * 60.0;
const DEFAULT_HOUR: u32 = 6;

/// Derives the best hour to fire the daily notification from how the user
/// has historically interacted. Pure and total: malformed history entries
/// are skipped, and with nothing usable the answer is 06:00.
pub fn optimal_notification_time(history: &EngagementHistory) -> NaiveTime {
    let minutes: Vec<f64> = history
        .preferred_interaction_times
        .iter()
        .filter_map(|ts| minutes_of_day(*ts))
        .collect();

    if !minutes.is_empty() {
        return circular_mean(&minutes);
    }

    if let Some(hhmm) = history.average_open_time.as_deref() {
        if let Ok(parsed) = NaiveTime::parse_from_str(hhmm, "%H:%M") {
            return parsed;
        }
        log::warn!("unparseable average_open_time {:?}, using default", hhmm);
    }

    NaiveTime::from_hms_opt(DEFAULT_HOUR, 0, 0).unwrap_or_default()
}

fn minutes_of_day(ts: i64) -> Option<f64> {
    let dt = Utc.timestamp_opt(ts, 0).single()?;
    Some(dt.hour() as f64 * 60.0 + dt.minute() as f64)
}

/// Mean time-of-day on the clock circle, so times straddling midnight
/// average to the small hours instead of midday.
fn circular_mean(minutes: &[f64]) -> NaiveTime {
    let tau = std::f64::consts::TAU;
    let (mut sin_sum, mut cos_sum) = (0.0f64, 0.0f64);
    for m in minutes {
        let angle = tau * m / MINUTES_PER_DAY;
        sin_sum += angle.sin();
        cos_sum += angle.cos();
    }

    let mean_angle = sin_sum.atan2(cos_sum);
    let mut mean_minutes = mean_angle / tau * MINUTES_PER_DAY;
    if mean_minutes < 0.0 {
        mean_minutes += MINUTES_PER_DAY;
    }

    let total = mean_minutes.round() as u32 % (24 * 60);
    NaiveTime::from_hms_opt(total / 60, total % 60, 0).unwrap_or_default()
}
