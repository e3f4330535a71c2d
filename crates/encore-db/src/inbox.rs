use anyhow::{Context, Result};
use rusqlite::{Connection, params};
use uuid::Uuid;

use encore_types::api::{
    CalendarPatch, FanMessagePatch, NewCalendarItem, NewFanMessage, NewSongRequest,
};
use encore_types::models::{CalendarItem, FanMessage, SongRequest, SongRequestStatus};

use crate::Database;
use crate::models::{
    CALENDAR_COLUMNS, FAN_MESSAGE_COLUMNS, SONG_REQUEST_COLUMNS, calendar_item_from_row, db_now,
    fan_message_from_row, format_timestamp, non_blank, song_request_from_row,
};
use crate::queries::OptionalExt;

impl Database {
    // -- Fan messages --

    /// Fan messages, newest first.
    pub fn list_fan_messages(&self) -> Result<Vec<FanMessage>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM fan_messages ORDER BY created_at DESC, rowid DESC",
                FAN_MESSAGE_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([], fan_message_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn insert_fan_message(&self, new: &NewFanMessage) -> Result<FanMessage> {
        let message = FanMessage {
            id: Uuid::new_v4(),
            name: new.name.trim().to_string(),
            email: new.email.trim().to_string(),
            body: new.body.trim().to_string(),
            created_at: db_now(),
            read: false,
            reply: None,
            replied_at: None,
        };

        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO fan_messages (id, name, email, body, read, created_at)
                 VALUES (?1, ?2, ?3, ?4, 0, ?5)",
                params![
                    message.id.to_string(),
                    message.name,
                    message.email,
                    message.body,
                    format_timestamp(&message.created_at),
                ],
            )
            .context("insert fan message")?;
            Ok(())
        })?;

        Ok(message)
    }

    /// Mark read/unread and/or record a reply. A reply always marks the
    /// message read.
    pub fn update_fan_message(&self, id: Uuid, patch: &FanMessagePatch) -> Result<Option<FanMessage>> {
        self.with_conn(|conn| {
            let Some(mut message) = query_fan_message(conn, id)? else {
                return Ok(None);
            };

            if let Some(read) = patch.read {
                message.read = read;
            }
            if let Some(reply) = non_blank(patch.reply.as_deref()) {
                message.reply = Some(reply.to_string());
                message.replied_at = Some(db_now());
                message.read = true;
            }

            conn.execute(
                "UPDATE fan_messages SET read = ?1, reply = ?2, replied_at = ?3 WHERE id = ?4",
                params![
                    message.read,
                    message.reply,
                    message.replied_at.as_ref().map(format_timestamp),
                    id.to_string(),
                ],
            )?;

            Ok(Some(message))
        })
    }

    pub fn delete_fan_message(&self, id: Uuid) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute("DELETE FROM fan_messages WHERE id = ?1", [id.to_string()])?;
            Ok(changed > 0)
        })
    }

    // -- Song requests --

    /// Song requests in queue order (oldest first).
    pub fn list_song_requests(&self) -> Result<Vec<SongRequest>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM song_requests ORDER BY created_at ASC, rowid ASC",
                SONG_REQUEST_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([], song_request_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn insert_song_request(&self, new: &NewSongRequest) -> Result<SongRequest> {
        let request = SongRequest {
            id: Uuid::new_v4(),
            requester_name: new.requester_name.trim().to_string(),
            song_title: new.song_title.trim().to_string(),
            song_artist: non_blank(new.song_artist.as_deref()).map(String::from),
            note: non_blank(new.note.as_deref()).map(String::from),
            status: SongRequestStatus::Pending,
            created_at: db_now(),
        };

        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO song_requests (id, requester_name, song_title, song_artist, note, status, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    request.id.to_string(),
                    request.requester_name,
                    request.song_title,
                    request.song_artist,
                    request.note,
                    request.status.as_str(),
                    format_timestamp(&request.created_at),
                ],
            )
            .context("insert song request")?;
            Ok(())
        })?;

        Ok(request)
    }

    pub fn update_song_request_status(
        &self,
        id: Uuid,
        status: SongRequestStatus,
    ) -> Result<Option<SongRequest>> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE song_requests SET status = ?1 WHERE id = ?2",
                params![status.as_str(), id.to_string()],
            )?;
            if changed == 0 {
                return Ok(None);
            }
            let sql = format!("SELECT {} FROM song_requests WHERE id = ?1", SONG_REQUEST_COLUMNS);
            let row = conn
                .query_row(&sql, [id.to_string()], song_request_from_row)
                .optional()?;
            Ok(row)
        })
    }

    pub fn delete_song_request(&self, id: Uuid) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute("DELETE FROM song_requests WHERE id = ?1", [id.to_string()])?;
            Ok(changed > 0)
        })
    }

    // -- Content calendar --

    /// Calendar items by scheduled date.
    pub fn list_calendar_items(&self) -> Result<Vec<CalendarItem>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM content_calendar ORDER BY scheduled_for ASC, created_at ASC",
                CALENDAR_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([], calendar_item_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn insert_calendar_item(&self, new: &NewCalendarItem) -> Result<CalendarItem> {
        let item = CalendarItem {
            id: Uuid::new_v4(),
            title: new.title.trim().to_string(),
            description: non_blank(new.description.as_deref()).map(String::from),
            platform: new.platform.trim().to_string(),
            scheduled_for: new.scheduled_for,
            status: new.status,
            video_id: new.video_id,
            created_at: db_now(),
        };

        self.with_conn(|conn| {
            write_calendar_item(conn, &item, true).context("insert calendar item")?;
            Ok(())
        })?;

        Ok(item)
    }

    pub fn update_calendar_item(&self, id: Uuid, patch: &CalendarPatch) -> Result<Option<CalendarItem>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {} FROM content_calendar WHERE id = ?1", CALENDAR_COLUMNS);
            let Some(mut item) = conn
                .query_row(&sql, [id.to_string()], calendar_item_from_row)
                .optional()?
            else {
                return Ok(None);
            };

            patch.apply_to(&mut item);
            write_calendar_item(conn, &item, false)?;
            Ok(Some(item))
        })
    }

    pub fn delete_calendar_item(&self, id: Uuid) -> Result<bool> {
        self.with_conn(|conn| {
            let changed =
                conn.execute("DELETE FROM content_calendar WHERE id = ?1", [id.to_string()])?;
            Ok(changed > 0)
        })
    }
}

fn query_fan_message(conn: &Connection, id: Uuid) -> Result<Option<FanMessage>> {
    let sql = format!("SELECT {} FROM fan_messages WHERE id = ?1", FAN_MESSAGE_COLUMNS);
    let row = conn
        .query_row(&sql, [id.to_string()], fan_message_from_row)
        .optional()?;
    Ok(row)
}

fn write_calendar_item(conn: &Connection, item: &CalendarItem, insert: bool) -> Result<()> {
    let sql = if insert {
        "INSERT INTO content_calendar (title, description, platform, scheduled_for, status, video_id, created_at, id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"
    } else {
        "UPDATE content_calendar SET title = ?1, description = ?2, platform = ?3, scheduled_for = ?4,
             status = ?5, video_id = ?6, created_at = ?7
         WHERE id = ?8"
    };

    conn.execute(
        sql,
        params![
            item.title,
            item.description,
            item.platform,
            item.scheduled_for.to_string(),
            item.status.as_str(),
            item.video_id.map(|v| v.to_string()),
            format_timestamp(&item.created_at),
            item.id.to_string(),
        ],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use encore_types::models::CalendarStatus;

    fn fan(name: &str) -> NewFanMessage {
        NewFanMessage {
            name: name.into(),
            email: format!("{}@example.com", name),
            body: "See you at the show".into(),
        }
    }

    fn calendar(title: &str, day: u32) -> NewCalendarItem {
        NewCalendarItem {
            title: title.into(),
            description: Some("  ".into()),
            platform: "instagram".into(),
            scheduled_for: NaiveDate::from_ymd_opt(2025, 3, day).unwrap(),
            status: CalendarStatus::Idea,
            video_id: None,
        }
    }

    #[test]
    fn fan_messages_newest_first() {
        let db = Database::open_in_memory().unwrap();
        let first = db.insert_fan_message(&fan("ana")).unwrap();
        let second = db.insert_fan_message(&fan("bo")).unwrap();

        let listed = db.list_fan_messages().unwrap();
        assert_eq!(listed.iter().map(|m| m.id).collect::<Vec<_>>(), vec![second.id, first.id]);
        assert!(listed.iter().all(|m| !m.read));
    }

    #[test]
    fn reply_marks_message_read() {
        let db = Database::open_in_memory().unwrap();
        let message = db.insert_fan_message(&fan("ana")).unwrap();

        let patch = FanMessagePatch {
            read: None,
            reply: Some("Thank you!".into()),
        };
        let updated = db.update_fan_message(message.id, &patch).unwrap().unwrap();
        assert!(updated.read);
        assert_eq!(updated.reply.as_deref(), Some("Thank you!"));
        assert!(updated.replied_at.is_some());

        let unread = FanMessagePatch {
            read: Some(false),
            reply: None,
        };
        let updated = db.update_fan_message(message.id, &unread).unwrap().unwrap();
        assert!(!updated.read);
        assert_eq!(updated.reply.as_deref(), Some("Thank you!"));

        assert!(db.update_fan_message(Uuid::new_v4(), &unread).unwrap().is_none());
    }

    #[test]
    fn song_request_status_flow() {
        let db = Database::open_in_memory().unwrap();
        let request = db
            .insert_song_request(&NewSongRequest {
                requester_name: "Kim".into(),
                song_title: "Harbour Lights".into(),
                song_artist: Some("".into()),
                note: Some("for my mum".into()),
            })
            .unwrap();
        assert_eq!(request.status, SongRequestStatus::Pending);
        assert!(request.song_artist.is_none());

        let accepted = db
            .update_song_request_status(request.id, SongRequestStatus::Accepted)
            .unwrap()
            .unwrap();
        assert_eq!(accepted.status, SongRequestStatus::Accepted);
        assert_eq!(accepted.note.as_deref(), Some("for my mum"));

        assert!(db.delete_song_request(request.id).unwrap());
        assert!(db.list_song_requests().unwrap().is_empty());
    }

    #[test]
    fn calendar_sorted_by_date_and_patchable() {
        let db = Database::open_in_memory().unwrap();
        let later = db.insert_calendar_item(&calendar("Tour teaser", 20)).unwrap();
        let sooner = db.insert_calendar_item(&calendar("Studio vlog", 5)).unwrap();
        assert!(later.description.is_none());

        let listed = db.list_calendar_items().unwrap();
        assert_eq!(listed[0].id, sooner.id);
        assert_eq!(listed[1].id, later.id);

        let patch = CalendarPatch {
            status: Some(CalendarStatus::Scheduled),
            scheduled_for: NaiveDate::from_ymd_opt(2025, 3, 1),
            ..CalendarPatch::default()
        };
        let updated = db.update_calendar_item(later.id, &patch).unwrap().unwrap();
        assert_eq!(updated.status, CalendarStatus::Scheduled);

        let listed = db.list_calendar_items().unwrap();
        assert_eq!(listed[0].id, later.id);
        assert!(db.delete_calendar_item(sooner.id).unwrap());
        assert_eq!(db.list_calendar_items().unwrap().len(), 1);
    }
}
