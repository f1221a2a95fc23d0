use serde::{Deserialize, Serialize};

use crate::models::WeatherContext;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutfitRecommendation {
    pub id: String,
    pub daily_id: String,
    /// Weak references into the user's wardrobe, in wear order.
    pub item_ids: Vec<String>,
    pub confidence_score: f32,
    pub confidence_note: String,
    pub reasoning: Vec<String>,
    pub quick_actions: Vec<String>,
    pub is_quick_option: bool,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyRecommendations {
    pub id: String,
    pub user_id: String,
    /// Local calendar date, "YYYY-MM-DD".
    pub date: String,
    pub outfits: Vec<OutfitRecommendation>,
    /// Snapshot of the weather used for generation, not a live reading.
    pub weather: WeatherContext,
    pub generated_at: i64,
}

impl DailyRecommendations {
    pub fn quick_option(&self) -> Option<&OutfitRecommendation> {
        self.outfits.iter().find(|o| o.is_quick_option)
    }
}
