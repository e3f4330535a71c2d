use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS videos (
            id              TEXT PRIMARY KEY,
            title           TEXT NOT NULL,
            url             TEXT NOT NULL,
            thumbnail_url   TEXT,
            status          TEXT NOT NULL DEFAULT 'pending',
            order_index     INTEGER NOT NULL DEFAULT 0,
            created_at      TEXT NOT NULL,
            updated_at      TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_videos_order
            ON videos(order_index, created_at);

        CREATE TABLE IF NOT EXISTS chat_messages (
            id          TEXT PRIMARY KEY,
            sender_id   TEXT NOT NULL,
            sender_name TEXT NOT NULL,
            body        TEXT NOT NULL DEFAULT '',
            video_id    TEXT REFERENCES videos(id) ON DELETE SET NULL,
            edited      INTEGER NOT NULL DEFAULT 0,
            created_at  TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_chat_messages_created
            ON chat_messages(created_at);

        CREATE TABLE IF NOT EXISTS settings (
            id                  INTEGER PRIMARY KEY CHECK (id = 1),
            hero_image          TEXT NOT NULL,
            hero_description    TEXT NOT NULL,
            about_image         TEXT NOT NULL,
            about_text          TEXT NOT NULL,
            instagram_url       TEXT NOT NULL,
            youtube_url         TEXT NOT NULL,
            tiktok_url          TEXT NOT NULL,
            spotify_url         TEXT NOT NULL,
            facebook_url        TEXT NOT NULL,
            contact_email       TEXT NOT NULL,
            contact_phone       TEXT NOT NULL,
            updated_at          TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS fan_messages (
            id          TEXT PRIMARY KEY,
            name        TEXT NOT NULL,
            email       TEXT NOT NULL,
            body        TEXT NOT NULL,
            read        INTEGER NOT NULL DEFAULT 0,
            reply       TEXT,
            replied_at  TEXT,
            created_at  TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS song_requests (
            id              TEXT PRIMARY KEY,
            requester_name  TEXT NOT NULL,
            song_title      TEXT NOT NULL,
            song_artist     TEXT,
            note            TEXT,
            status          TEXT NOT NULL DEFAULT 'pending',
            created_at      TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS content_calendar (
            id              TEXT PRIMARY KEY,
            title           TEXT NOT NULL,
            description     TEXT,
            platform        TEXT NOT NULL,
            scheduled_for   TEXT NOT NULL,
            status          TEXT NOT NULL DEFAULT 'idea',
            video_id        TEXT REFERENCES videos(id) ON DELETE SET NULL,
            created_at      TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_content_calendar_date
            ON content_calendar(scheduled_for);

        CREATE TABLE IF NOT EXISTS visits (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            path            TEXT NOT NULL,
            visitor_hash    TEXT NOT NULL,
            created_at      TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_visits_created
            ON visits(created_at);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
