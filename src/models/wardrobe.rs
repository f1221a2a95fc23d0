use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Top,
    Bottom,
    Dress,
    Shoes,
    Outerwear,
    Accessory,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UsageStats {
    pub total_wears: u32,
    pub last_worn: Option<i64>,
    pub average_rating: Option<f32>,
    pub compliments_received: u32,
    #[serde(default)]
    pub purchase_price: Option<f32>,
}

impl UsageStats {
    // Cost-per-wear trends toward zero as an item earns its keep.
    pub fn cost_per_wear(&self) -> Option<f32> {
        let price = self.purchase_price?;
        Some(price / self.total_wears.max(1) as f32)
    }

    pub fn worn_within_days(&self, now: i64, days: i64) -> bool {
        match self.last_worn {
            Some(ts) => now - ts <= days * 24 * 3600,
            None => false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WardrobeItem {
    pub id: String,
    pub user_id: String,
    pub category: Category,
    pub colors: Vec<String>,
    pub brand: Option<String>,
    pub tags: Vec<String>,
    #[serde(default)]
    pub stats: UsageStats,
}

impl WardrobeItem {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }
}
