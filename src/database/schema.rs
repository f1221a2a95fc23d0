use anyhow::Result;
use rusqlite::Connection;

pub fn create_tables(conn: &Connection) -> Result<()> {
    // One record per user per local calendar day; regeneration upserts.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS daily_recommendations (
            id TEXT NOT NULL,
            user_id TEXT NOT NULL,
            date TEXT NOT NULL,
            payload TEXT NOT NULL,
            generated_at INTEGER NOT NULL,
            UNIQUE(user_id, date)
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_daily_recommendations_user
         ON daily_recommendations(user_id)",
        [],
    )?;

    // Transport-registered schedules, kept so restarts can cancel/replace.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS scheduled_notifications (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            kind TEXT NOT NULL,
            fire_at INTEGER NOT NULL,
            timezone TEXT NOT NULL,
            payload TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_scheduled_notifications_user
         ON scheduled_notifications(user_id, kind)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS notification_preferences (
            user_id TEXT PRIMARY KEY,
            payload TEXT NOT NULL,
            updated_at INTEGER NOT NULL
        )",
        [],
    )?;

    // TTL cache shared by the source adapters.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS cache_entries (
            cache_key TEXT PRIMARY KEY,
            value BLOB NOT NULL,
            expires_at INTEGER NOT NULL
        )",
        [],
    )?;

    Ok(())
}
