use anyhow::Result;
use rusqlite::Connection;

use crate::models::{DailyRecommendations, NotificationPreferences, ScheduledNotification};

// ─── Daily recommendations ───

pub fn upsert_daily_recommendations(conn: &Connection, record: &DailyRecommendations) -> Result<()> {
    let payload = serde_json::to_string(record)?;
    conn.execute(
        "INSERT INTO daily_recommendations (id, user_id, date, payload, generated_at)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(user_id, date) DO UPDATE SET
             id = excluded.id,
             payload = excluded.payload,
             generated_at = excluded.generated_at",
        rusqlite::params![
            record.id,
            record.user_id,
            record.date,
            payload,
            record.generated_at
        ],
    )?;
    Ok(())
}

pub fn get_daily_recommendations(
    conn: &Connection,
    user_id: &str,
    date: &str,
) -> Result<Option<DailyRecommendations>> {
    let result: Result<String, _> = conn.query_row(
        "SELECT payload FROM daily_recommendations WHERE user_id = ?1 AND date = ?2",
        rusqlite::params![user_id, date],
        |row| row.get(0),
    );

    match result {
        Ok(json) => Ok(serde_json::from_str(&json)?),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

// ─── Scheduled notifications ───

pub fn insert_scheduled_notification(
    conn: &Connection,
    record: &ScheduledNotification,
) -> Result<()> {
    let payload = serde_json::to_string(&record.payload)?;
    conn.execute(
        "INSERT INTO scheduled_notifications (id, user_id, kind, fire_at, timezone, payload)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(id) DO UPDATE SET
             fire_at = excluded.fire_at,
             timezone = excluded.timezone,
             payload = excluded.payload",
        rusqlite::params![
            record.id,
            record.user_id,
            record.kind.as_str(),
            record.fire_at,
            record.timezone,
            payload
        ],
    )?;
    Ok(())
}

pub fn get_scheduled_notifications(
    conn: &Connection,
    user_id: &str,
    kind: Option<&str>,
) -> Result<Vec<ScheduledNotification>> {
    let kind_clause = if kind.is_some() { "AND kind = ?2" } else { "" };
    let mut stmt = conn.prepare(&format!(
        "SELECT id, user_id, kind, fire_at, timezone, payload
         FROM scheduled_notifications
         WHERE user_id = ?1 {}
         ORDER BY fire_at ASC",
        kind_clause
    ))?;

    let map_row = |row: &rusqlite::Row| -> rusqlite::Result<(String, String, String, i64, String, String)> {
        Ok((
            row.get(0)?,
            row.get(1)?,
            row.get(2)?,
            row.get(3)?,
            row.get(4)?,
            row.get(5)?,
        ))
    };

    let raw: Vec<_> = match kind {
        Some(k) => stmt
            .query_map(rusqlite::params![user_id, k], map_row)?
            .collect::<Result<Vec<_>, _>>()?,
        None => stmt
            .query_map(rusqlite::params![user_id], map_row)?
            .collect::<Result<Vec<_>, _>>()?,
    };

    let mut records = Vec::with_capacity(raw.len());
    for (id, user_id, kind, fire_at, timezone, payload) in raw {
        let kind = serde_json::from_value(serde_json::Value::String(kind))?;
        records.push(ScheduledNotification {
            id,
            user_id,
            kind,
            fire_at,
            timezone,
            payload: serde_json::from_str(&payload)?,
        });
    }
    Ok(records)
}

pub fn delete_scheduled_notification(conn: &Connection, id: &str) -> Result<()> {
    conn.execute(
        "DELETE FROM scheduled_notifications WHERE id = ?1",
        rusqlite::params![id],
    )?;
    Ok(())
}

// ─── Notification preferences ───

pub fn upsert_preferences(conn: &Connection, prefs: &NotificationPreferences) -> Result<()> {
    let payload = serde_json::to_string(prefs)?;
    conn.execute(
        "INSERT INTO notification_preferences (user_id, payload, updated_at)
         VALUES (?1, ?2, ?3)
         ON CONFLICT(user_id) DO UPDATE SET
             payload = excluded.payload,
             updated_at = excluded.updated_at",
        rusqlite::params![prefs.user_id, payload, chrono::Utc::now().timestamp()],
    )?;
    Ok(())
}

pub fn get_preferences(conn: &Connection, user_id: &str) -> Result<Option<NotificationPreferences>> {
    let result: Result<String, _> = conn.query_row(
        "SELECT payload FROM notification_preferences WHERE user_id = ?1",
        rusqlite::params![user_id],
        |row| row.get(0),
    );

    match result {
        Ok(json) => Ok(serde_json::from_str(&json)?),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

// ─── Cache entries ───

pub fn cache_get(conn: &Connection, key: &str, now: i64) -> Result<Option<Vec<u8>>> {
    let result: Result<(Vec<u8>, i64), _> = conn.query_row(
        "SELECT value, expires_at FROM cache_entries WHERE cache_key = ?1",
        rusqlite::params![key],
        |row| Ok((row.get(0)?, row.get(1)?)),
    );

    match result {
        Ok((value, expires_at)) => {
            if expires_at <= now {
                // Expired rows are evicted on read.
                cache_remove(conn, key)?;
                Ok(None)
            } else {
                Ok(Some(value))
            }
        }
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn cache_put(conn: &Connection, key: &str, value: &[u8], expires_at: i64) -> Result<()> {
    conn.execute(
        "INSERT INTO cache_entries (cache_key, value, expires_at)
         VALUES (?1, ?2, ?3)
         ON CONFLICT(cache_key) DO UPDATE SET
             value = excluded.value,
             expires_at = excluded.expires_at",
        rusqlite::params![key, value, expires_at],
    )?;
    Ok(())
}

pub fn cache_remove(conn: &Connection, key: &str) -> Result<()> {
    conn.execute(
        "DELETE FROM cache_entries WHERE cache_key = ?1",
        rusqlite::params![key],
    )?;
    Ok(())
}
