pub mod app;
pub mod database;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

pub use app::{Collaborators, CoreServices};
pub use database::Database;
pub use error::CoreError;
pub use services::notification_scheduler::{NotificationScheduler, PushTransport};
pub use services::recommendation_engine::RecommendationEngine;
pub use services::source::{DegradedReason, SourceResult};
pub use services::style_profile::StyleProfileStore;
pub use services::timing::optimal_notification_time;
pub use services::wardrobe::WardrobeStore;
pub use services::weather::{HttpWeatherProvider, WeatherProvider};
pub use utils::retry::{retry_with_backoff, RetryContext, RetryPolicy};
