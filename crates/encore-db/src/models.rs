//! Row mapping between SQLite and the shared encore-types models.
//!
//! Ids and timestamps are stored as TEXT. A corrupt value is logged and
//! replaced with a default rather than failing the whole query.

use chrono::{DateTime, NaiveDate, SecondsFormat, SubsecRound, Utc};
use rusqlite::Row;
use tracing::warn;
use uuid::Uuid;

use encore_types::models::{
    CalendarItem, CalendarStatus, ChatMessage, FanMessage, SiteSettings, SongRequest,
    SongRequestStatus, Video, VideoStatus,
};

pub(crate) const CHAT_COLUMNS: &str =
    "id, sender_id, sender_name, body, video_id, edited, created_at";

pub(crate) const VIDEO_COLUMNS: &str =
    "id, title, url, thumbnail_url, status, order_index, created_at, updated_at";

pub(crate) const SETTINGS_COLUMNS: &str = "hero_image, hero_description, about_image, about_text, \
     instagram_url, youtube_url, tiktok_url, spotify_url, facebook_url, \
     contact_email, contact_phone, updated_at";

pub(crate) const FAN_MESSAGE_COLUMNS: &str =
    "id, name, email, body, read, reply, replied_at, created_at";

pub(crate) const SONG_REQUEST_COLUMNS: &str =
    "id, requester_name, song_title, song_artist, note, status, created_at";

pub(crate) const CALENDAR_COLUMNS: &str =
    "id, title, description, platform, scheduled_for, status, video_id, created_at";

/// Current time at the precision the database keeps, so rows returned from
/// a write compare equal to the same rows read back later.
pub fn db_now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Fixed-width RFC 3339 so TEXT ordering matches chronological ordering.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn parse_timestamp(raw: &str, context: &str) -> DateTime<Utc> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| {
            // Rows written by hand through the sqlite shell use datetime('now'),
            // which has no timezone. Parse as naive UTC.
            chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt timestamp '{}' on {}: {}", raw, context, e);
            DateTime::default()
        })
}

pub fn parse_uuid(raw: &str, context: &str) -> Uuid {
    raw.parse().unwrap_or_else(|e| {
        warn!("Corrupt id '{}' on {}: {}", raw, context, e);
        Uuid::default()
    })
}

fn parse_optional_uuid(raw: Option<String>, context: &str) -> Option<Uuid> {
    raw.filter(|s| !s.is_empty()).map(|s| parse_uuid(&s, context))
}

fn parse_date(raw: &str, context: &str) -> NaiveDate {
    raw.parse().unwrap_or_else(|e| {
        warn!("Corrupt date '{}' on {}: {}", raw, context, e);
        NaiveDate::default()
    })
}

fn parse_status<S>(raw: &str, context: &str) -> S
where
    S: std::str::FromStr + Default,
    S::Err: std::fmt::Display,
{
    raw.parse().unwrap_or_else(|e| {
        warn!("{} on {}", e, context);
        S::default()
    })
}

pub(crate) fn chat_message_from_row(row: &Row<'_>) -> rusqlite::Result<ChatMessage> {
    let id: String = row.get(0)?;
    let context = format!("chat message {}", id);
    Ok(ChatMessage {
        id: parse_uuid(&id, &context),
        sender_id: row.get(1)?,
        sender_name: row.get(2)?,
        body: row.get(3)?,
        video_id: parse_optional_uuid(row.get(4)?, &context),
        edited: row.get(5)?,
        created_at: parse_timestamp(&row.get::<_, String>(6)?, &context),
    })
}

pub(crate) fn video_from_row(row: &Row<'_>) -> rusqlite::Result<Video> {
    let id: String = row.get(0)?;
    let context = format!("video {}", id);
    Ok(Video {
        id: parse_uuid(&id, &context),
        title: row.get(1)?,
        url: row.get(2)?,
        thumbnail_url: row.get(3)?,
        status: parse_status::<VideoStatus>(&row.get::<_, String>(4)?, &context),
        order_index: row.get(5)?,
        created_at: parse_timestamp(&row.get::<_, String>(6)?, &context),
        updated_at: parse_timestamp(&row.get::<_, String>(7)?, &context),
    })
}

pub(crate) fn settings_from_row(row: &Row<'_>) -> rusqlite::Result<SiteSettings> {
    Ok(SiteSettings {
        hero_image: row.get(0)?,
        hero_description: row.get(1)?,
        about_image: row.get(2)?,
        about_text: row.get(3)?,
        instagram_url: row.get(4)?,
        youtube_url: row.get(5)?,
        tiktok_url: row.get(6)?,
        spotify_url: row.get(7)?,
        facebook_url: row.get(8)?,
        contact_email: row.get(9)?,
        contact_phone: row.get(10)?,
        updated_at: Some(parse_timestamp(&row.get::<_, String>(11)?, "settings")),
    })
}

pub(crate) fn fan_message_from_row(row: &Row<'_>) -> rusqlite::Result<FanMessage> {
    let id: String = row.get(0)?;
    let context = format!("fan message {}", id);
    Ok(FanMessage {
        id: parse_uuid(&id, &context),
        name: row.get(1)?,
        email: row.get(2)?,
        body: row.get(3)?,
        read: row.get(4)?,
        reply: row.get(5)?,
        replied_at: row
            .get::<_, Option<String>>(6)?
            .map(|raw| parse_timestamp(&raw, &context)),
        created_at: parse_timestamp(&row.get::<_, String>(7)?, &context),
    })
}

pub(crate) fn song_request_from_row(row: &Row<'_>) -> rusqlite::Result<SongRequest> {
    let id: String = row.get(0)?;
    let context = format!("song request {}", id);
    Ok(SongRequest {
        id: parse_uuid(&id, &context),
        requester_name: row.get(1)?,
        song_title: row.get(2)?,
        song_artist: row.get(3)?,
        note: row.get(4)?,
        status: parse_status::<SongRequestStatus>(&row.get::<_, String>(5)?, &context),
        created_at: parse_timestamp(&row.get::<_, String>(6)?, &context),
    })
}

pub(crate) fn calendar_item_from_row(row: &Row<'_>) -> rusqlite::Result<CalendarItem> {
    let id: String = row.get(0)?;
    let context = format!("calendar item {}", id);
    Ok(CalendarItem {
        id: parse_uuid(&id, &context),
        title: row.get(1)?,
        description: row.get(2)?,
        platform: row.get(3)?,
        scheduled_for: parse_date(&row.get::<_, String>(4)?, &context),
        status: parse_status::<CalendarStatus>(&row.get::<_, String>(5)?, &context),
        video_id: parse_optional_uuid(row.get(6)?, &context),
        created_at: parse_timestamp(&row.get::<_, String>(7)?, &context),
    })
}

/// Blank strings coming from forms are stored as NULL.
pub(crate) fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamps_sort_lexically() {
        let early = "2024-01-02T03:04:05Z".parse::<DateTime<Utc>>().unwrap();
        let late = early + chrono::Duration::milliseconds(1500);
        assert!(format_timestamp(&early) < format_timestamp(&late));
        assert_eq!(format_timestamp(&early), "2024-01-02T03:04:05.000000Z");
    }

    #[test]
    fn parse_timestamp_accepts_sqlite_datetime() {
        let ts = parse_timestamp("2024-05-06 07:08:09", "test");
        assert_eq!(format_timestamp(&ts), "2024-05-06T07:08:09.000000Z");
    }

    #[test]
    fn corrupt_values_fall_back_to_defaults() {
        assert_eq!(parse_uuid("nope", "test"), Uuid::nil());
        assert_eq!(parse_timestamp("yesterday", "test"), DateTime::<Utc>::default());
        assert_eq!(parse_status::<VideoStatus>("archived", "test"), VideoStatus::Pending);
    }

    #[test]
    fn non_blank_trims() {
        assert_eq!(non_blank(Some("  x ")), Some("x"));
        assert_eq!(non_blank(Some("   ")), None);
        assert_eq!(non_blank(None), None);
    }
}
