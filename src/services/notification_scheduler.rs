use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Duration as ChronoDuration, NaiveTime, TimeZone, Utc, Weekday};
use chrono_tz::Tz;

use crate::database::{queries, Database};
use crate::error::CoreError;
use crate::models::{
    NotificationKind, NotificationPayload, NotificationPreferences, ScheduledNotification,
};
use crate::utils::retry::{retry_with_backoff, RetryContext, RetryPolicy};

const DEFAULT_FEEDBACK_DELAY_HOURS: u32 = 1;
const RE_ENGAGEMENT_MIN_DAYS: u32 = 2;

#[async_trait]
pub trait PushTransport: Send + Sync {
    /// Registers a notification to fire at `fire_at`; returns the
    /// transport-assigned schedule id.
    async fn schedule(
        &self,
        payload: &NotificationPayload,
        fire_at: DateTime<Utc>,
    ) -> anyhow::Result<String>;

    async fn cancel(&self, schedule_id: &str) -> anyhow::Result<()>;

    async fn has_permission(&self) -> anyhow::Result<bool>;
}

/// Owns every future notification per user: computes fire times in the
/// user's timezone, registers them with the transport, and keeps the
/// persisted schedule in step so restarts and preference changes can
/// cancel-and-replace cleanly.
pub struct NotificationScheduler {
    transport: Arc<dyn PushTransport>,
    db: Arc<Database>,
    policy: RetryPolicy,
}

impl NotificationScheduler {
    pub fn new(transport: Arc<dyn PushTransport>, db: Arc<Database>, policy: RetryPolicy) -> Self {
        Self {
            transport,
            db,
            policy,
        }
    }

    /// Replaces the user's daily-mirror schedule. Unlike the fetch
    /// adapters this surfaces failure: a silently missing ritual
    /// notification is a defect, not a degradation.
    pub async fn schedule_daily_mirror(
        &self,
        user_id: &str,
        prefs: &NotificationPreferences,
    ) -> Result<ScheduledNotification, CoreError> {
        // Cancel before registering so the old and new schedule can never
        // both fire.
        self.cancel_kind(user_id, NotificationKind::DailyMirror).await?;

        let fire_at = next_fire_instant(prefs, Utc::now())?;
        let payload = NotificationPayload {
            user_id: user_id.to_string(),
            kind: NotificationKind::DailyMirror,
            title: "Your mirror moment".to_string(),
            body: "Today's looks are styled and waiting for you.".to_string(),
            outfit_id: None,
        };

        let record = self
            .register(user_id, &prefs.timezone, payload, fire_at, "daily_mirror")
            .await?;

        self.db
            .with_conn(|conn| queries::upsert_preferences(conn, prefs))?;

        log::info!(
            "daily mirror for {} scheduled at {} ({})",
            user_id,
            fire_at,
            prefs.timezone
        );
        Ok(record)
    }

    /// One-shot prompt asking how an outfit worked out, `delay_hours`
    /// (default 1) after the call.
    pub async fn schedule_feedback_prompt(
        &self,
        user_id: &str,
        outfit_id: &str,
        delay_hours: Option<u32>,
    ) -> Result<ScheduledNotification, CoreError> {
        let delay = delay_hours.unwrap_or(DEFAULT_FEEDBACK_DELAY_HOURS);
        let fire_at = Utc::now() + ChronoDuration::hours(delay as i64);
        let timezone = self.stored_timezone(user_id)?;

        let payload = NotificationPayload {
            user_id: user_id.to_string(),
            kind: NotificationKind::FeedbackPrompt,
            title: "How did it feel?".to_string(),
            body: "Tell us how today's look worked for you.".to_string(),
            outfit_id: Some(outfit_id.to_string()),
        };

        self.register(user_id, &timezone, payload, fire_at, "feedback_prompt")
            .await
    }

    /// Immediate nudge for users who have drifted away. Tone escalates
    /// with inactivity: 2-4 days gentle, 5-9 rediscover, 10+ ritual-awaits.
    /// Under two days away, no message is warranted.
    pub async fn send_re_engagement_message(
        &self,
        user_id: &str,
        days_since_last_use: u32,
    ) -> Result<(), CoreError> {
        if days_since_last_use < RE_ENGAGEMENT_MIN_DAYS {
            log::info!(
                "skipping re-engagement for {}: only {} day(s) inactive",
                user_id,
                days_since_last_use
            );
            return Ok(());
        }

        let (title, body) = re_engagement_copy(days_since_last_use);
        let payload = NotificationPayload {
            user_id: user_id.to_string(),
            kind: NotificationKind::ReEngagement,
            title,
            body,
            outfit_id: None,
        };

        let ctx = RetryContext::new("push", "send_now", user_id);
        let fire_at = Utc::now();
        retry_with_backoff(&ctx, &self.policy, || {
            self.transport.schedule(&payload, fire_at)
        })
        .await
        .map_err(|e| CoreError::SchedulingFailed {
            kind: "re_engagement",
            user_id: user_id.to_string(),
            source: e.into(),
        })?;
        Ok(())
    }

    /// Re-anchors the daily mirror after the device moves timezones. The
    /// old transport schedule is cancelled and a fresh one registered at
    /// the same wall-clock time in the new zone.
    pub async fn handle_timezone_change(
        &self,
        user_id: &str,
        new_timezone: &str,
    ) -> Result<ScheduledNotification, CoreError> {
        Tz::from_str(new_timezone)
            .map_err(|_| CoreError::InvalidTimezone(new_timezone.to_string()))?;

        let mut prefs = self
            .db
            .with_conn(|conn| queries::get_preferences(conn, user_id))?
            .unwrap_or_else(|| NotificationPreferences::new(user_id));
        prefs.timezone = new_timezone.to_string();

        self.schedule_daily_mirror(user_id, &prefs).await
    }

    /// Cancels every persisted schedule for the user. Each row is cleared
    /// only once the transport has confirmed its cancel, so a failure
    /// leaves the remaining ids on record for a later retry.
    pub async fn cancel_scheduled_notifications(&self, user_id: &str) -> Result<(), CoreError> {
        let records = self
            .db
            .with_conn(|conn| queries::get_scheduled_notifications(conn, user_id, None))?;

        for record in &records {
            self.cancel_record(user_id, record).await?;
        }
        Ok(())
    }

    /// Current transport permission state. A failed probe reads as
    /// disabled, never as an error.
    pub async fn are_notifications_enabled(&self) -> bool {
        match self.transport.has_permission().await {
            Ok(enabled) => enabled,
            Err(e) => {
                log::warn!("notification permission probe failed: {}", e);
                false
            }
        }
    }

    async fn cancel_kind(&self, user_id: &str, kind: NotificationKind) -> Result<(), CoreError> {
        let records = self.db.with_conn(|conn| {
            queries::get_scheduled_notifications(conn, user_id, Some(kind.as_str()))
        })?;

        for record in &records {
            self.cancel_record(user_id, record).await?;
        }
        Ok(())
    }

    /// Cancels one transport schedule through the retry envelope. The row
    /// holds the only copy of the transport id, so it is deleted only after
    /// the transport confirms; an exhausted cancel surfaces as a scheduling
    /// failure with the row intact.
    async fn cancel_record(
        &self,
        user_id: &str,
        record: &ScheduledNotification,
    ) -> Result<(), CoreError> {
        let ctx = RetryContext::new("push", "cancel", user_id);
        retry_with_backoff(&ctx, &self.policy, || self.transport.cancel(&record.id))
            .await
            .map_err(|e| CoreError::SchedulingFailed {
                kind: "cancel",
                user_id: user_id.to_string(),
                source: e.into(),
            })?;

        self.db
            .with_conn(|conn| queries::delete_scheduled_notification(conn, &record.id))?;
        Ok(())
    }

    async fn register(
        &self,
        user_id: &str,
        timezone: &str,
        payload: NotificationPayload,
        fire_at: DateTime<Utc>,
        kind_label: &'static str,
    ) -> Result<ScheduledNotification, CoreError> {
        let ctx = RetryContext::new("push", "schedule", user_id);
        let schedule_id = retry_with_backoff(&ctx, &self.policy, || {
            self.transport.schedule(&payload, fire_at)
        })
        .await
        .map_err(|e| CoreError::SchedulingFailed {
            kind: kind_label,
            user_id: user_id.to_string(),
            source: e.into(),
        })?;

        let record = ScheduledNotification {
            id: schedule_id,
            user_id: user_id.to_string(),
            kind: payload.kind,
            fire_at: fire_at.timestamp(),
            timezone: timezone.to_string(),
            payload,
        };

        self.db
            .with_conn(|conn| queries::insert_scheduled_notification(conn, &record))?;
        Ok(record)
    }

    fn stored_timezone(&self, user_id: &str) -> Result<String, CoreError> {
        Ok(self
            .db
            .with_conn(|conn| queries::get_preferences(conn, user_id))?
            .map(|p| p.timezone)
            .unwrap_or_else(|| "UTC".to_string()))
    }
}

/// Next instant the daily mirror should fire: the preferred wall-clock
/// time in the user's zone, rolled to the next day once today's slot has
/// passed, skipping weekends when those are disabled.
pub fn next_fire_instant(
    prefs: &NotificationPreferences,
    now: DateTime<Utc>,
) -> Result<DateTime<Utc>, CoreError> {
    let tz = Tz::from_str(&prefs.timezone)
        .map_err(|_| CoreError::InvalidTimezone(prefs.timezone.clone()))?;
    let time = NaiveTime::parse_from_str(&prefs.preferred_time, "%H:%M")
        .map_err(|_| CoreError::InvalidPreferredTime(prefs.preferred_time.clone()))?;

    let mut date = now.with_timezone(&tz).date_naive();

    loop {
        let is_weekend = matches!(date.weekday(), Weekday::Sat | Weekday::Sun);
        if !(is_weekend && !prefs.enable_weekends) {
            let fire_at = resolve_local(&tz, date, time);
            if fire_at > now {
                return Ok(fire_at);
            }
        }
        date = date.succ_opt().ok_or_else(|| {
            CoreError::InvalidPreferredTime(format!("no schedulable day after {}", date))
        })?;
    }
}

/// Maps a local date+time to an instant, tolerating DST edges: ambiguous
/// times take the earliest mapping, skipped times move forward an hour at
/// a time until they exist.
fn resolve_local(tz: &Tz, date: chrono::NaiveDate, time: NaiveTime) -> DateTime<Utc> {
    let mut local = date.and_time(time);
    for _ in 0..4 {
        match tz.from_local_datetime(&local) {
            chrono::LocalResult::Single(dt) => return dt.with_timezone(&Utc),
            chrono::LocalResult::Ambiguous(earliest, _) => return earliest.with_timezone(&Utc),
            chrono::LocalResult::None => {
                local += ChronoDuration::hours(1);
            }
        }
    }
    // Unreachable for real zones; pin to the UTC reading of the local time.
    Utc.from_utc_datetime(&local)
}

fn re_engagement_copy(days: u32) -> (String, String) {
    if days <= 4 {
        (
            "Your mirror misses you".to_string(),
            "A fresh look is ready whenever you are.".to_string(),
        )
    } else if days <= 9 {
        (
            "Rediscover your wardrobe".to_string(),
            "There are pieces in your closet you haven't seen in a while. Come take a look.".to_string(),
        )
    } else {
        (
            "Your ritual awaits".to_string(),
            "Your daily mirror is still here, styled and ready for your return.".to_string(),
        )
    }
}
