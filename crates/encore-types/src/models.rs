use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Placeholder image service used when a video has no usable thumbnail.
pub const PLACEHOLDER_THUMBNAIL_BASE: &str = "https://placehold.co/480x360";

#[derive(Debug, thiserror::Error)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

/// Declares a lowercase string-backed enum stored as TEXT in the database
/// and serialized as the same string on the wire.
macro_rules! text_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err(UnknownVariant { kind: $kind, value: other.to_string() }),
                }
            }
        }
    };
}

// -- Chat --

/// A message in the admin chat between the artist and the editor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub sender_id: String,
    pub sender_name: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub video_id: Option<Uuid>,
    #[serde(default)]
    pub edited: bool,
}

// -- Videos --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoStatus {
    #[default]
    Pending,
    Completed,
}

text_enum!(VideoStatus, "video status", {
    Pending => "pending",
    Completed => "completed",
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Video {
    pub id: Uuid,
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub status: VideoStatus,
    pub order_index: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Video {
    /// Thumbnail to display. Falls back to the YouTube still for YouTube
    /// links and to a generated placeholder for anything else, so a missing
    /// or broken thumbnail never blocks rendering.
    pub fn thumbnail(&self) -> String {
        if let Some(url) = self.thumbnail_url.as_deref().map(str::trim) {
            if !url.is_empty() {
                return url.to_string();
            }
        }

        match youtube_id(&self.url) {
            Some(id) => format!("https://img.youtube.com/vi/{}/hqdefault.jpg", id),
            None => placeholder_thumbnail(&self.title),
        }
    }
}

/// Extract the video id from the common YouTube link shapes.
pub fn youtube_id(link: &str) -> Option<&str> {
    let rest = link
        .trim()
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_start_matches("www.")
        .trim_start_matches("m.");

    let candidate = if let Some(path) = rest.strip_prefix("youtu.be/") {
        path
    } else if let Some(path) = rest.strip_prefix("youtube.com/") {
        if let Some(query) = path.strip_prefix("watch?") {
            query
                .split('&')
                .find_map(|pair| pair.strip_prefix("v="))?
        } else if let Some(id) = path
            .strip_prefix("embed/")
            .or_else(|| path.strip_prefix("shorts/"))
        {
            id
        } else {
            return None;
        }
    } else {
        return None;
    };

    let id = candidate
        .split(['?', '&', '#', '/'])
        .next()
        .unwrap_or_default();

    let valid = !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    valid.then_some(id)
}

/// Generated placeholder image URL carrying the (sanitized) title.
pub fn placeholder_thumbnail(title: &str) -> String {
    let text: String = title
        .split_whitespace()
        .map(|word| {
            word.chars()
                .filter(|c| c.is_ascii_alphanumeric())
                .collect::<String>()
        })
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join("+");

    if text.is_empty() {
        format!("{}?text=Video", PLACEHOLDER_THUMBNAIL_BASE)
    } else {
        format!("{}?text={}", PLACEHOLDER_THUMBNAIL_BASE, text)
    }
}

// -- Settings --

/// Site-wide content shown on the public pages. Every recognized field is
/// listed here; unknown keys are rejected at the API boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteSettings {
    pub hero_image: String,
    pub hero_description: String,
    pub about_image: String,
    pub about_text: String,
    pub instagram_url: String,
    pub youtube_url: String,
    pub tiktok_url: String,
    pub spotify_url: String,
    pub facebook_url: String,
    pub contact_email: String,
    pub contact_phone: String,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Default for SiteSettings {
    fn default() -> Self {
        Self {
            hero_image: "/images/hero.jpg".into(),
            hero_description: "New music, live sessions and behind-the-scenes videos.".into(),
            about_image: "/images/about.jpg".into(),
            about_text: String::new(),
            instagram_url: String::new(),
            youtube_url: String::new(),
            tiktok_url: String::new(),
            spotify_url: String::new(),
            facebook_url: String::new(),
            contact_email: String::new(),
            contact_phone: String::new(),
            updated_at: None,
        }
    }
}

impl SiteSettings {
    /// Social links that are actually configured, as (platform, url) pairs.
    pub fn social_links(&self) -> Vec<(&'static str, &str)> {
        [
            ("instagram", self.instagram_url.as_str()),
            ("youtube", self.youtube_url.as_str()),
            ("tiktok", self.tiktok_url.as_str()),
            ("spotify", self.spotify_url.as_str()),
            ("facebook", self.facebook_url.as_str()),
        ]
        .into_iter()
        .filter(|(_, url)| !url.trim().is_empty())
        .collect()
    }
}

// -- Fan messages --

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FanMessage {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub read: bool,
    #[serde(default)]
    pub reply: Option<String>,
    #[serde(default)]
    pub replied_at: Option<DateTime<Utc>>,
}

// -- Song requests --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SongRequestStatus {
    #[default]
    Pending,
    Accepted,
    Performed,
    Declined,
}

text_enum!(SongRequestStatus, "song request status", {
    Pending => "pending",
    Accepted => "accepted",
    Performed => "performed",
    Declined => "declined",
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SongRequest {
    pub id: Uuid,
    pub requester_name: String,
    pub song_title: String,
    #[serde(default)]
    pub song_artist: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub status: SongRequestStatus,
    pub created_at: DateTime<Utc>,
}

// -- Content calendar --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalendarStatus {
    #[default]
    Idea,
    Scheduled,
    Published,
}

text_enum!(CalendarStatus, "calendar status", {
    Idea => "idea",
    Scheduled => "scheduled",
    Published => "published",
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarItem {
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub platform: String,
    pub scheduled_for: NaiveDate,
    #[serde(default)]
    pub status: CalendarStatus,
    #[serde(default)]
    pub video_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

// -- Analytics --

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyVisits {
    pub day: NaiveDate,
    pub visits: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisitStats {
    pub total_visits: u64,
    pub unique_visitors: u64,
    pub per_day: Vec<DailyVisits>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub videos_total: u64,
    pub videos_pending: u64,
    pub videos_completed: u64,
    pub fan_messages_unread: u64,
    pub song_requests_pending: u64,
    pub calendar_upcoming: u64,
}
