//! Admin-side client for the Encore backend: the REST data access layer,
//! change-feed subscriptions, the realtime chat reconciler and the video
//! reorder list.

pub mod chat;
pub mod config;
pub mod error;
pub mod feed;
pub mod memory;
pub mod notify;
pub mod reconciler;
pub mod reorder;
pub mod rest;
pub mod session;
pub mod store;
pub mod unread;

pub use config::ClientConfig;
pub use error::{ClientError, Result};
pub use rest::RestStore;
pub use session::Session;
