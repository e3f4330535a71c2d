use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{CalendarItem, ChatMessage, FanMessage, SiteSettings, SongRequest, Video};

/// Tables that publish change events on the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    ChatMessages,
    Videos,
    Settings,
    FanMessages,
    SongRequests,
    ContentCalendar,
}

impl Table {
    pub const ALL: [Table; 6] = [
        Table::ChatMessages,
        Table::Videos,
        Table::Settings,
        Table::FanMessages,
        Table::SongRequests,
        Table::ContentCalendar,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ChatMessages => "chat_messages",
            Self::Videos => "videos",
            Self::Settings => "settings",
            Self::FanMessages => "fan_messages",
            Self::SongRequests => "song_requests",
            Self::ContentCalendar => "content_calendar",
        }
    }

    /// Public tables back the marketing pages and can be followed without
    /// signing in. Everything else is admin-only.
    pub fn is_public(&self) -> bool {
        matches!(self, Self::Videos | Self::Settings)
    }
}

impl std::fmt::Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A row type that lives in one change-feed table.
pub trait Row: Serialize + DeserializeOwned + Clone + Send + 'static {
    type Id: Serialize + DeserializeOwned + PartialEq + Clone + Send + std::fmt::Debug + 'static;

    const TABLE: Table;

    fn id(&self) -> &Self::Id;
}

impl Row for ChatMessage {
    type Id = Uuid;
    const TABLE: Table = Table::ChatMessages;

    fn id(&self) -> &Uuid {
        &self.id
    }
}

impl Row for Video {
    type Id = Uuid;
    const TABLE: Table = Table::Videos;

    fn id(&self) -> &Uuid {
        &self.id
    }
}

impl Row for FanMessage {
    type Id = Uuid;
    const TABLE: Table = Table::FanMessages;

    fn id(&self) -> &Uuid {
        &self.id
    }
}

impl Row for SongRequest {
    type Id = Uuid;
    const TABLE: Table = Table::SongRequests;

    fn id(&self) -> &Uuid {
        &self.id
    }
}

impl Row for CalendarItem {
    type Id = Uuid;
    const TABLE: Table = Table::ContentCalendar;

    fn id(&self) -> &Uuid {
        &self.id
    }
}

/// Settings is a single-row table; its id is fixed.
pub const SETTINGS_ROW_ID: i64 = 1;

impl Row for SiteSettings {
    type Id = i64;
    const TABLE: Table = Table::Settings;

    fn id(&self) -> &i64 {
        &SETTINGS_ROW_ID
    }
}

/// Row-level change as it travels over the wire. Records are kept as raw
/// JSON so one gateway can carry every table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Change {
    Insert { record: serde_json::Value },
    Update { record: serde_json::Value },
    Delete { id: serde_json::Value },
}

/// One change-feed notification for a table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedEvent {
    pub table: Table,
    pub commit_timestamp: DateTime<Utc>,
    pub change: Change,
}

impl FeedEvent {
    pub fn insert<T: Row>(row: &T) -> Result<Self, serde_json::Error> {
        Ok(Self::now(
            T::TABLE,
            Change::Insert {
                record: serde_json::to_value(row)?,
            },
        ))
    }

    pub fn update<T: Row>(row: &T) -> Result<Self, serde_json::Error> {
        Ok(Self::now(
            T::TABLE,
            Change::Update {
                record: serde_json::to_value(row)?,
            },
        ))
    }

    pub fn delete<T: Row>(id: &T::Id) -> Result<Self, serde_json::Error> {
        Ok(Self::now(
            T::TABLE,
            Change::Delete {
                id: serde_json::to_value(id)?,
            },
        ))
    }

    fn now(table: Table, change: Change) -> Self {
        Self {
            table,
            commit_timestamp: Utc::now(),
            change,
        }
    }

    /// Decode into a typed change for `T`. Returns `Ok(None)` when the event
    /// belongs to another table.
    pub fn decode<T: Row>(&self) -> Result<Option<RowChange<T>>, serde_json::Error> {
        if self.table != T::TABLE {
            return Ok(None);
        }

        let change = match &self.change {
            Change::Insert { record } => RowChange::Insert(T::deserialize(record)?),
            Change::Update { record } => RowChange::Update(T::deserialize(record)?),
            Change::Delete { id } => RowChange::Delete(T::Id::deserialize(id)?),
        };
        Ok(Some(change))
    }
}

/// Typed change applied by client-side mirrors.
#[derive(Debug, Clone, PartialEq)]
pub enum RowChange<T: Row> {
    Insert(T),
    Update(T),
    Delete(T::Id),
}

/// Events sent over the WebSocket gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayEvent {
    /// Connection accepted. `authenticated` tells the client whether
    /// admin-only tables may be subscribed.
    Ready {
        connection_id: Uuid,
        authenticated: bool,
    },

    Subscribed { table: Table },

    Unsubscribed { table: Table },

    /// A row changed in a subscribed table
    Change(FeedEvent),

    /// A command was rejected; the connection stays open
    Error { message: String },
}

/// Commands sent FROM client TO server over WebSocket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayCommand {
    Subscribe { table: Table },
    Unsubscribe { table: Table },
}
