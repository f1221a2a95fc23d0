use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EngagementHistory {
    pub user_id: String,
    pub total_days_active: u32,
    pub current_streak: u32,
    pub average_rating: Option<f32>,
    /// Local calendar date of the last open, "YYYY-MM-DD".
    pub last_active_date: Option<String>,
    /// Unix timestamps of historical opens/feedback taps.
    #[serde(default)]
    pub preferred_interaction_times: Vec<i64>,
    /// Pre-computed fallback, "HH:MM".
    #[serde(default)]
    pub average_open_time: Option<String>,
}
