use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{CalendarItem, CalendarStatus, SiteSettings, SongRequestStatus, Video, VideoStatus};

// -- JWT Claims --

/// JWT claims shared across encore-api (REST middleware) and the gateway
/// upgrade handler. `sub` is the admin account id (`artist`, `editor`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub name: String,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub user_id: String,
    pub name: String,
    pub token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

// -- Chat --

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendMessageRequest {
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub video_id: Option<Uuid>,
}

impl SendMessageRequest {
    /// A message needs either text or an attached video.
    pub fn has_content(&self) -> bool {
        !self.body.trim().is_empty() || self.video_id.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EditMessageRequest {
    pub body: String,
}

// -- Videos --

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewVideo {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub status: VideoStatus,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VideoPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<VideoStatus>,
}

impl VideoPatch {
    pub fn apply_to(&self, video: &mut Video) {
        if let Some(title) = &self.title {
            video.title = title.clone();
        }
        if let Some(url) = &self.url {
            video.url = url.clone();
        }
        if let Some(thumbnail_url) = &self.thumbnail_url {
            video.thumbnail_url = Some(thumbnail_url.clone()).filter(|t| !t.trim().is_empty());
        }
        if let Some(status) = self.status {
            video.status = status;
        }
    }
}

/// Full video order, first id gets `order_index` 0.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReorderRequest {
    pub ids: Vec<Uuid>,
}

// -- Settings --

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SettingsPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hero_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hero_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub about_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub about_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instagram_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub youtube_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tiktok_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spotify_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub facebook_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_phone: Option<String>,
}

impl SettingsPatch {
    pub fn apply_to(&self, settings: &mut SiteSettings) {
        let fields = [
            (&self.hero_image, &mut settings.hero_image),
            (&self.hero_description, &mut settings.hero_description),
            (&self.about_image, &mut settings.about_image),
            (&self.about_text, &mut settings.about_text),
            (&self.instagram_url, &mut settings.instagram_url),
            (&self.youtube_url, &mut settings.youtube_url),
            (&self.tiktok_url, &mut settings.tiktok_url),
            (&self.spotify_url, &mut settings.spotify_url),
            (&self.facebook_url, &mut settings.facebook_url),
            (&self.contact_email, &mut settings.contact_email),
            (&self.contact_phone, &mut settings.contact_phone),
        ];
        for (patch, field) in fields {
            if let Some(value) = patch {
                *field = value.clone();
            }
        }
    }
}

// -- Fan messages --

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewFanMessage {
    pub name: String,
    pub email: String,
    pub body: String,
}

impl NewFanMessage {
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.name.trim().is_empty() {
            return Err("name is required");
        }
        if !self.email.contains('@') {
            return Err("a valid email is required");
        }
        if self.body.trim().is_empty() {
            return Err("message is required");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FanMessagePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply: Option<String>,
}

// -- Song requests --

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewSongRequest {
    pub requester_name: String,
    pub song_title: String,
    #[serde(default)]
    pub song_artist: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SongRequestPatch {
    pub status: SongRequestStatus,
}

// -- Content calendar --

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewCalendarItem {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub platform: String,
    pub scheduled_for: NaiveDate,
    #[serde(default)]
    pub status: CalendarStatus,
    #[serde(default)]
    pub video_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CalendarPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_for: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<CalendarStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_id: Option<Uuid>,
}

impl CalendarPatch {
    pub fn apply_to(&self, item: &mut CalendarItem) {
        if let Some(title) = &self.title {
            item.title = title.clone();
        }
        if let Some(description) = &self.description {
            item.description = Some(description.clone()).filter(|d| !d.trim().is_empty());
        }
        if let Some(platform) = &self.platform {
            item.platform = platform.clone();
        }
        if let Some(scheduled_for) = self.scheduled_for {
            item.scheduled_for = scheduled_for;
        }
        if let Some(status) = self.status {
            item.status = status;
        }
        if let Some(video_id) = self.video_id {
            item.video_id = Some(video_id);
        }
    }
}

// -- Analytics --

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TrackVisitRequest {
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub feed_connections: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_content_rules() {
        assert!(!SendMessageRequest::default().has_content());
        assert!(!SendMessageRequest { body: "  \n".into(), video_id: None }.has_content());
        assert!(SendMessageRequest { body: "hi".into(), video_id: None }.has_content());
        assert!(SendMessageRequest { body: String::new(), video_id: Some(Uuid::new_v4()) }.has_content());
    }

    #[test]
    fn fan_message_validation() {
        let ok = NewFanMessage {
            name: "Sam".into(),
            email: "sam@example.com".into(),
            body: "Loved the show".into(),
        };
        assert!(ok.validate().is_ok());

        let bad_email = NewFanMessage { email: "sam".into(), ..ok.clone() };
        assert_eq!(bad_email.validate(), Err("a valid email is required"));

        let no_body = NewFanMessage { body: " ".into(), ..ok };
        assert_eq!(no_body.validate(), Err("message is required"));
    }

    #[test]
    fn settings_patch_rejects_unknown_keys() {
        let result = serde_json::from_str::<SettingsPatch>(r#"{"hero_colour":"red"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn settings_patch_applies_only_set_fields() {
        let mut settings = SiteSettings::default();
        let patch = SettingsPatch {
            about_text: Some("Songwriter from Lisbon".into()),
            contact_phone: Some("+351 900 000 000".into()),
            ..SettingsPatch::default()
        };
        patch.apply_to(&mut settings);

        assert_eq!(settings.about_text, "Songwriter from Lisbon");
        assert_eq!(settings.contact_phone, "+351 900 000 000");
        assert_eq!(settings.hero_image, SiteSettings::default().hero_image);
    }

    #[test]
    fn video_patch_serializes_only_set_fields() {
        let patch = VideoPatch {
            status: Some(VideoStatus::Completed),
            ..VideoPatch::default()
        };
        assert_eq!(serde_json::to_string(&patch).unwrap(), r#"{"status":"completed"}"#);
    }
}
