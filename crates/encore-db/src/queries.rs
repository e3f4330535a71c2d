use std::collections::HashSet;

use anyhow::{Context, Result};
use rusqlite::{Connection, params};
use tracing::{debug, warn};
use uuid::Uuid;

use encore_types::api::{NewVideo, SendMessageRequest, SettingsPatch, VideoPatch};
use encore_types::models::{ChatMessage, SiteSettings, Video};

use crate::Database;
use crate::models::{
    CHAT_COLUMNS, SETTINGS_COLUMNS, VIDEO_COLUMNS, chat_message_from_row, db_now, format_timestamp,
    non_blank, settings_from_row, video_from_row,
};

impl Database {
    // -- Chat messages --

    /// All chat messages, oldest first.
    pub fn list_chat_messages(&self) -> Result<Vec<ChatMessage>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM chat_messages ORDER BY created_at ASC, rowid ASC",
                CHAT_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([], chat_message_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_chat_message(&self, id: Uuid) -> Result<Option<ChatMessage>> {
        self.with_conn(|conn| query_chat_message(conn, id))
    }

    pub fn insert_chat_message(
        &self,
        sender_id: &str,
        sender_name: &str,
        req: &SendMessageRequest,
    ) -> Result<ChatMessage> {
        let message = ChatMessage {
            id: Uuid::new_v4(),
            sender_id: sender_id.to_string(),
            sender_name: sender_name.to_string(),
            body: req.body.trim().to_string(),
            created_at: db_now(),
            video_id: req.video_id,
            edited: false,
        };

        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO chat_messages (id, sender_id, sender_name, body, video_id, edited, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6)",
                params![
                    message.id.to_string(),
                    message.sender_id,
                    message.sender_name,
                    message.body,
                    message.video_id.map(|v| v.to_string()),
                    format_timestamp(&message.created_at),
                ],
            )
            .context("insert chat message")?;
            Ok(())
        })?;

        Ok(message)
    }

    /// Replace the body, mark the message edited and move its timestamp to
    /// now. Returns `None` if the message does not exist.
    pub fn edit_chat_message(&self, id: Uuid, body: &str) -> Result<Option<ChatMessage>> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE chat_messages SET body = ?1, edited = 1, created_at = ?2 WHERE id = ?3",
                params![body.trim(), format_timestamp(&db_now()), id.to_string()],
            )?;
            if changed == 0 {
                return Ok(None);
            }
            query_chat_message(conn, id)
        })
    }

    pub fn delete_chat_message(&self, id: Uuid) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute("DELETE FROM chat_messages WHERE id = ?1", [id.to_string()])?;
            Ok(changed > 0)
        })
    }

    // -- Videos --

    /// All videos in display order.
    pub fn list_videos(&self) -> Result<Vec<Video>> {
        self.with_conn(query_videos)
    }

    pub fn get_video(&self, id: Uuid) -> Result<Option<Video>> {
        self.with_conn(|conn| query_video(conn, id))
    }

    /// Insert a video at the end of the current order.
    pub fn insert_video(&self, new: &NewVideo) -> Result<Video> {
        self.with_conn(|conn| {
            let next_index: i64 = conn.query_row(
                "SELECT COALESCE(MAX(order_index) + 1, 0) FROM videos",
                [],
                |row| row.get(0),
            )?;

            let now = db_now();
            let video = Video {
                id: Uuid::new_v4(),
                title: new.title.trim().to_string(),
                url: new.url.trim().to_string(),
                thumbnail_url: non_blank(new.thumbnail_url.as_deref()).map(String::from),
                status: new.status,
                order_index: next_index,
                created_at: now,
                updated_at: now,
            };

            conn.execute(
                "INSERT INTO videos (id, title, url, thumbnail_url, status, order_index, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
                params![
                    video.id.to_string(),
                    video.title,
                    video.url,
                    video.thumbnail_url,
                    video.status.as_str(),
                    video.order_index,
                    format_timestamp(&now),
                ],
            )
            .context("insert video")?;

            Ok(video)
        })
    }

    pub fn update_video(&self, id: Uuid, patch: &VideoPatch) -> Result<Option<Video>> {
        self.with_conn(|conn| {
            let Some(mut video) = query_video(conn, id)? else {
                return Ok(None);
            };

            patch.apply_to(&mut video);
            video.updated_at = db_now();

            conn.execute(
                "UPDATE videos SET title = ?1, url = ?2, thumbnail_url = ?3, status = ?4, updated_at = ?5
                 WHERE id = ?6",
                params![
                    video.title,
                    video.url,
                    video.thumbnail_url,
                    video.status.as_str(),
                    format_timestamp(&video.updated_at),
                    id.to_string(),
                ],
            )?;

            Ok(Some(video))
        })
    }

    pub fn delete_video(&self, id: Uuid) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute("DELETE FROM videos WHERE id = ?1", [id.to_string()])?;
            Ok(changed > 0)
        })
    }

    /// Rewrite every `order_index` so that `ids[i]` gets index `i`.
    ///
    /// The list must name every video exactly once; otherwise nothing is
    /// written and `None` is returned. Runs in a single transaction.
    pub fn reorder_videos(&self, ids: &[Uuid]) -> Result<Option<Vec<Video>>> {
        let unique: HashSet<&Uuid> = ids.iter().collect();
        if unique.len() != ids.len() {
            warn!("Reorder rejected: duplicate ids in request");
            return Ok(None);
        }

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let total: i64 = tx.query_row("SELECT COUNT(*) FROM videos", [], |row| row.get(0))?;
            if total != ids.len() as i64 {
                warn!("Reorder rejected: {} ids for {} videos", ids.len(), total);
                return Ok(None);
            }

            let now = format_timestamp(&db_now());
            {
                let mut stmt = tx.prepare(
                    "UPDATE videos SET order_index = ?1, updated_at = ?2 WHERE id = ?3",
                )?;
                for (index, id) in ids.iter().enumerate() {
                    let changed = stmt.execute(params![index as i64, now, id.to_string()])?;
                    if changed == 0 {
                        warn!("Reorder rejected: unknown video {}", id);
                        // Dropping the transaction rolls it back
                        return Ok(None);
                    }
                }
            }

            let videos = query_videos(&tx)?;
            tx.commit()?;

            debug!("Reordered {} videos", videos.len());
            Ok(Some(videos))
        })
    }

    // -- Settings --

    /// Current site settings, or the defaults if none were ever saved.
    pub fn get_settings(&self) -> Result<SiteSettings> {
        self.with_conn(|conn| Ok(query_settings(conn)?.unwrap_or_default()))
    }

    pub fn update_settings(&self, patch: &SettingsPatch) -> Result<SiteSettings> {
        self.with_conn(|conn| {
            let mut settings = query_settings(conn)?.unwrap_or_default();
            patch.apply_to(&mut settings);
            let now = db_now();
            settings.updated_at = Some(now);

            conn.execute(
                "INSERT INTO settings (id, hero_image, hero_description, about_image, about_text,
                     instagram_url, youtube_url, tiktok_url, spotify_url, facebook_url,
                     contact_email, contact_phone, updated_at)
                 VALUES (1, ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
                 ON CONFLICT(id) DO UPDATE SET
                     hero_image = excluded.hero_image,
                     hero_description = excluded.hero_description,
                     about_image = excluded.about_image,
                     about_text = excluded.about_text,
                     instagram_url = excluded.instagram_url,
                     youtube_url = excluded.youtube_url,
                     tiktok_url = excluded.tiktok_url,
                     spotify_url = excluded.spotify_url,
                     facebook_url = excluded.facebook_url,
                     contact_email = excluded.contact_email,
                     contact_phone = excluded.contact_phone,
                     updated_at = excluded.updated_at",
                params![
                    settings.hero_image,
                    settings.hero_description,
                    settings.about_image,
                    settings.about_text,
                    settings.instagram_url,
                    settings.youtube_url,
                    settings.tiktok_url,
                    settings.spotify_url,
                    settings.facebook_url,
                    settings.contact_email,
                    settings.contact_phone,
                    format_timestamp(&now),
                ],
            )
            .context("save settings")?;

            Ok(settings)
        })
    }
}

fn query_chat_message(conn: &Connection, id: Uuid) -> Result<Option<ChatMessage>> {
    let sql = format!("SELECT {} FROM chat_messages WHERE id = ?1", CHAT_COLUMNS);
    let row = conn
        .query_row(&sql, [id.to_string()], chat_message_from_row)
        .optional()?;
    Ok(row)
}

fn query_videos(conn: &Connection) -> Result<Vec<Video>> {
    let sql = format!(
        "SELECT {} FROM videos ORDER BY order_index ASC, created_at ASC",
        VIDEO_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], video_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn query_video(conn: &Connection, id: Uuid) -> Result<Option<Video>> {
    let sql = format!("SELECT {} FROM videos WHERE id = ?1", VIDEO_COLUMNS);
    let row = conn
        .query_row(&sql, [id.to_string()], video_from_row)
        .optional()?;
    Ok(row)
}

fn query_settings(conn: &Connection) -> Result<Option<SiteSettings>> {
    let sql = format!("SELECT {} FROM settings WHERE id = 1", SETTINGS_COLUMNS);
    let row = conn.query_row(&sql, [], settings_from_row).optional()?;
    Ok(row)
}

/// Extension trait for optional query results
pub(crate) trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use encore_types::models::VideoStatus;

    fn new_video(title: &str) -> NewVideo {
        NewVideo {
            title: title.into(),
            url: format!("https://youtu.be/{}", title),
            thumbnail_url: None,
            status: VideoStatus::Pending,
        }
    }

    fn send(body: &str) -> SendMessageRequest {
        SendMessageRequest {
            body: body.into(),
            video_id: None,
        }
    }

    #[test]
    fn chat_messages_come_back_oldest_first() {
        let db = Database::open_in_memory().unwrap();
        let first = db.insert_chat_message("artist", "Artist", &send("one")).unwrap();
        let second = db.insert_chat_message("editor", "Editor", &send("two")).unwrap();

        let listed = db.list_chat_messages().unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, first.id);
        assert_eq!(listed[1].id, second.id);
        assert_eq!(listed[1].sender_id, "editor");
        assert!(!listed[0].edited);
    }

    #[test]
    fn edit_marks_message_and_refreshes_timestamp() {
        let db = Database::open_in_memory().unwrap();
        let original = db.insert_chat_message("artist", "Artist", &send("draft")).unwrap();

        let edited = db.edit_chat_message(original.id, " final ").unwrap().unwrap();
        assert_eq!(edited.body, "final");
        assert!(edited.edited);
        assert!(edited.created_at >= original.created_at);

        assert!(db.edit_chat_message(Uuid::new_v4(), "x").unwrap().is_none());
    }

    #[test]
    fn delete_chat_message_reports_presence() {
        let db = Database::open_in_memory().unwrap();
        let msg = db.insert_chat_message("artist", "Artist", &send("bye")).unwrap();

        assert!(db.delete_chat_message(msg.id).unwrap());
        assert!(!db.delete_chat_message(msg.id).unwrap());
        assert!(db.list_chat_messages().unwrap().is_empty());
    }

    #[test]
    fn chat_message_keeps_video_reference() {
        let db = Database::open_in_memory().unwrap();
        let video = db.insert_video(&new_video("a")).unwrap();
        let req = SendMessageRequest {
            body: String::new(),
            video_id: Some(video.id),
        };
        let msg = db.insert_chat_message("editor", "Editor", &req).unwrap();

        let stored = db.get_chat_message(msg.id).unwrap().unwrap();
        assert_eq!(stored.video_id, Some(video.id));
    }

    #[test]
    fn videos_append_to_end_of_order() {
        let db = Database::open_in_memory().unwrap();
        let a = db.insert_video(&new_video("a")).unwrap();
        let b = db.insert_video(&new_video("b")).unwrap();

        assert_eq!(a.order_index, 0);
        assert_eq!(b.order_index, 1);

        let listed = db.list_videos().unwrap();
        assert_eq!(listed.iter().map(|v| v.id).collect::<Vec<_>>(), vec![a.id, b.id]);
    }

    #[test]
    fn update_video_applies_patch() {
        let db = Database::open_in_memory().unwrap();
        let video = db.insert_video(&new_video("a")).unwrap();

        let patch = VideoPatch {
            status: Some(VideoStatus::Completed),
            thumbnail_url: Some("https://cdn.example.com/a.jpg".into()),
            ..VideoPatch::default()
        };
        let updated = db.update_video(video.id, &patch).unwrap().unwrap();
        assert_eq!(updated.status, VideoStatus::Completed);
        assert_eq!(updated.title, "a");

        let stored = db.get_video(video.id).unwrap().unwrap();
        assert_eq!(stored.thumbnail_url.as_deref(), Some("https://cdn.example.com/a.jpg"));
        assert!(db.update_video(Uuid::new_v4(), &patch).unwrap().is_none());
    }

    #[test]
    fn reorder_assigns_contiguous_indices() {
        let db = Database::open_in_memory().unwrap();
        let a = db.insert_video(&new_video("a")).unwrap();
        let b = db.insert_video(&new_video("b")).unwrap();
        let c = db.insert_video(&new_video("c")).unwrap();

        let reordered = db.reorder_videos(&[c.id, a.id, b.id]).unwrap().unwrap();
        let order: Vec<(Uuid, i64)> = reordered.iter().map(|v| (v.id, v.order_index)).collect();
        assert_eq!(order, vec![(c.id, 0), (a.id, 1), (b.id, 2)]);
    }

    #[test]
    fn reorder_rejects_partial_or_foreign_sets() {
        let db = Database::open_in_memory().unwrap();
        let a = db.insert_video(&new_video("a")).unwrap();
        let b = db.insert_video(&new_video("b")).unwrap();

        assert!(db.reorder_videos(&[b.id]).unwrap().is_none());
        assert!(db.reorder_videos(&[b.id, b.id]).unwrap().is_none());
        assert!(db.reorder_videos(&[b.id, Uuid::new_v4()]).unwrap().is_none());

        // Nothing was written by the rejected attempts
        let listed = db.list_videos().unwrap();
        assert_eq!(listed[0].id, a.id);
        assert_eq!(listed[0].order_index, 0);
        assert_eq!(listed[1].order_index, 1);
    }

    #[test]
    fn settings_default_until_saved() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(db.get_settings().unwrap(), SiteSettings::default());

        let patch = SettingsPatch {
            contact_email: Some("booking@example.com".into()),
            ..SettingsPatch::default()
        };
        let saved = db.update_settings(&patch).unwrap();
        assert_eq!(saved.contact_email, "booking@example.com");
        assert!(saved.updated_at.is_some());

        let second = SettingsPatch {
            about_text: Some("Bio".into()),
            ..SettingsPatch::default()
        };
        db.update_settings(&second).unwrap();

        let loaded = db.get_settings().unwrap();
        assert_eq!(loaded.contact_email, "booking@example.com");
        assert_eq!(loaded.about_text, "Bio");
    }
}
