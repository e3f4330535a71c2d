use tracing::{error, info, warn};

use encore_types::models::ChatMessage;

/// Audible cue for messages that arrive while the chat is closed.
pub trait Notifier: Send + Sync {
    fn notify(&self, message: &ChatMessage);
}

/// Blocking user-facing prompts.
pub trait Alerts: Send + Sync {
    fn alert(&self, message: &str);

    /// Ask the user to confirm a destructive action.
    fn confirm(&self, prompt: &str) -> bool;
}

/// Logs instead of playing a sound. Used by headless tools.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, message: &ChatMessage) {
        info!("New message from {}", message.sender_name);
    }
}

/// Logs alerts and answers every confirmation with a fixed reply.
#[derive(Debug, Clone, Copy)]
pub struct TracingAlerts {
    pub confirm_reply: bool,
}

impl Alerts for TracingAlerts {
    fn alert(&self, message: &str) {
        error!("{}", message);
    }

    fn confirm(&self, prompt: &str) -> bool {
        warn!("{} -> {}", prompt, if self.confirm_reply { "yes" } else { "no" });
        self.confirm_reply
    }
}
