pub mod analytics;
pub mod auth;
pub mod calendar;
pub mod chat;
pub mod error;
pub mod fan_messages;
pub mod gateway;
pub mod middleware;
pub mod routes;
pub mod settings;
pub mod song_requests;
pub mod state;
pub mod videos;

pub use error::ApiError;
pub use routes::router;
pub use state::{AppState, AppStateInner};
