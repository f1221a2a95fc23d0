use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StyleProfile {
    pub user_id: String,
    pub preferred_colors: Vec<String>,
    pub preferred_styles: Vec<String>,
    /// Occasion name -> preference weight in 0..=1.
    #[serde(default)]
    pub occasion_weights: HashMap<String, f32>,
    #[serde(default)]
    pub confidence_history: Vec<f32>,
    pub updated_at: i64,
}

impl StyleProfile {
    /// Profile with no bias, used when nothing is known about the user.
    pub fn neutral(user_id: &str) -> Self {
        let mut occasion_weights = HashMap::new();
        for occasion in ["casual", "work", "evening"] {
            occasion_weights.insert(occasion.to_string(), 0.5);
        }
        Self {
            user_id: user_id.to_string(),
            preferred_colors: vec![],
            preferred_styles: vec![],
            occasion_weights,
            confidence_history: vec![],
            updated_at: chrono::Utc::now().timestamp(),
        }
    }

    pub fn likes_color(&self, color: &str) -> bool {
        self.preferred_colors
            .iter()
            .any(|c| c.eq_ignore_ascii_case(color))
    }

    pub fn likes_style(&self, style: &str) -> bool {
        self.preferred_styles
            .iter()
            .any(|s| s.eq_ignore_ascii_case(style))
    }
}
