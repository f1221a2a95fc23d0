use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeatherCondition {
    Sunny,
    Cloudy,
    Rainy,
    Snowy,
    Windy,
    Foggy,
}

impl WeatherCondition {
    pub fn label(&self) -> &'static str {
        match self {
            WeatherCondition::Sunny => "sunny",
            WeatherCondition::Cloudy => "cloudy",
            WeatherCondition::Rainy => "rainy",
            WeatherCondition::Snowy => "snowy",
            WeatherCondition::Windy => "windy",
            WeatherCondition::Foggy => "foggy",
        }
    }

    pub fn is_wet(&self) -> bool {
        matches!(self, WeatherCondition::Rainy | WeatherCondition::Snowy)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherContext {
    pub temperature_c: f32,
    pub condition: WeatherCondition,
    pub humidity_pct: f32,
    pub wind_speed_kmh: f32,
    pub location: String,
    pub observed_at: i64,
}
