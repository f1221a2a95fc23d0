use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    DailyMirror,
    FeedbackPrompt,
    ReEngagement,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::DailyMirror => "daily_mirror",
            NotificationKind::FeedbackPrompt => "feedback_prompt",
            NotificationKind::ReEngagement => "re_engagement",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteStyle {
    Encouraging,
    Witty,
    Poetic,
}

impl Default for NoteStyle {
    fn default() -> Self {
        NoteStyle::Encouraging
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationPreferences {
    pub user_id: String,
    /// Preferred fire time, "HH:MM".
    pub preferred_time: String,
    /// IANA timezone id, e.g. "Europe/Berlin".
    pub timezone: String,
    #[serde(default = "default_true")]
    pub enable_weekends: bool,
    #[serde(default = "default_true")]
    pub enable_quick_options: bool,
    #[serde(default)]
    pub note_style: NoteStyle,
    #[serde(default)]
    pub location: String,
}

fn default_true() -> bool {
    true
}

impl NotificationPreferences {
    pub fn new(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            preferred_time: "07:00".to_string(),
            timezone: "UTC".to_string(),
            enable_weekends: true,
            enable_quick_options: true,
            note_style: NoteStyle::default(),
            location: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationPayload {
    pub user_id: String,
    pub kind: NotificationKind,
    pub title: String,
    pub body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outfit_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledNotification {
    /// Transport-assigned schedule id.
    pub id: String,
    pub user_id: String,
    pub kind: NotificationKind,
    pub fire_at: i64,
    pub timezone: String,
    pub payload: NotificationPayload,
}
