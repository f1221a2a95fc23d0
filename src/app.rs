use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use chrono::NaiveTime;

use crate::database::Database;
use crate::error::CoreError;
use crate::models::{
    DailyRecommendations, EngagementHistory, NotificationPreferences, ScheduledNotification,
};
use crate::services::cache::Cache;
use crate::services::notification_scheduler::{NotificationScheduler, PushTransport};
use crate::services::recommendation_engine::RecommendationEngine;
use crate::services::style_profile::{StyleProfileAdapter, StyleProfileStore};
use crate::services::timing;
use crate::services::wardrobe::{WardrobeAdapter, WardrobeStore};
use crate::services::weather::{HttpWeatherProvider, WeatherAdapter, WeatherProvider};
use crate::utils::config;
use crate::utils::retry::RetryPolicy;

/// External capabilities the core needs from the embedding app.
pub struct Collaborators {
    pub weather: Arc<dyn WeatherProvider>,
    pub wardrobe: Arc<dyn WardrobeStore>,
    pub style_profile: Arc<dyn StyleProfileStore>,
    pub push: Arc<dyn PushTransport>,
}

/// One constructed-once bundle of the core's components, wired at process
/// start and passed by reference wherever the app layer needs it.
pub struct CoreServices {
    engine: RecommendationEngine,
    scheduler: NotificationScheduler,
}

impl CoreServices {
    pub fn new(db: Arc<Database>, collaborators: Collaborators, policy: RetryPolicy) -> Self {
        let cache = Arc::new(Cache::new(db.clone()));

        let engine = RecommendationEngine::new(
            WeatherAdapter::new(collaborators.weather, cache.clone(), policy.clone()),
            WardrobeAdapter::new(collaborators.wardrobe, cache.clone(), policy.clone()),
            StyleProfileAdapter::new(collaborators.style_profile, cache, policy.clone()),
            db.clone(),
        );
        let scheduler = NotificationScheduler::new(collaborators.push, db, policy);

        Self { engine, scheduler }
    }

    /// Opens (or creates) the local store and wires the bundled HTTP
    /// weather provider; the remaining collaborators are app-supplied.
    pub fn open(
        db_path: Option<&str>,
        wardrobe: Arc<dyn WardrobeStore>,
        style_profile: Arc<dyn StyleProfileStore>,
        push: Arc<dyn PushTransport>,
    ) -> Result<Self> {
        config::load_dotenv();
        let path = config::resolve_db_path(db_path);
        let db = Arc::new(Database::open(Path::new(&path))?);
        let collaborators = Collaborators {
            weather: Arc::new(HttpWeatherProvider::new(config::weather_base_url())),
            wardrobe,
            style_profile,
            push,
        };
        Ok(Self::new(db, collaborators, RetryPolicy::default()))
    }

    pub async fn generate_daily_recommendations(
        &self,
        user_id: &str,
    ) -> Result<DailyRecommendations, CoreError> {
        self.engine.generate_daily_recommendations(user_id).await
    }

    pub async fn generate_daily_recommendations_forced(
        &self,
        user_id: &str,
    ) -> Result<DailyRecommendations, CoreError> {
        self.engine
            .generate_daily_recommendations_forced(user_id)
            .await
    }

    pub async fn schedule_daily_mirror_notification(
        &self,
        user_id: &str,
        prefs: &NotificationPreferences,
    ) -> Result<ScheduledNotification, CoreError> {
        self.scheduler.schedule_daily_mirror(user_id, prefs).await
    }

    pub async fn schedule_feedback_prompt(
        &self,
        user_id: &str,
        outfit_id: &str,
        delay_hours: Option<u32>,
    ) -> Result<ScheduledNotification, CoreError> {
        self.scheduler
            .schedule_feedback_prompt(user_id, outfit_id, delay_hours)
            .await
    }

    pub async fn send_re_engagement_message(
        &self,
        user_id: &str,
        days_since_last_use: u32,
    ) -> Result<(), CoreError> {
        self.scheduler
            .send_re_engagement_message(user_id, days_since_last_use)
            .await
    }

    pub async fn handle_timezone_change(
        &self,
        user_id: &str,
        new_timezone: &str,
    ) -> Result<ScheduledNotification, CoreError> {
        self.scheduler
            .handle_timezone_change(user_id, new_timezone)
            .await
    }

    pub async fn cancel_scheduled_notifications(&self, user_id: &str) -> Result<(), CoreError> {
        self.scheduler.cancel_scheduled_notifications(user_id).await
    }

    pub async fn are_notifications_enabled(&self) -> bool {
        self.scheduler.are_notifications_enabled().await
    }

    pub fn optimize_notification_timing(
        &self,
        user_id: &str,
        history: &EngagementHistory,
    ) -> NaiveTime {
        let time = timing::optimal_notification_time(history);
        log::debug!("optimal notification time for {} is {}", user_id, time);
        time
    }
}
