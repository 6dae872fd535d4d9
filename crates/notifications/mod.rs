mod config;
mod discord;
mod notifier;

use std::sync::Arc;

use mockall::automock;
use serde::Serialize;
use tracing::{info, warn};

use crate::domain::{entities::sessions::SessionEntity, value_objects::plans::Plan};

pub use config::NotificationConfig;
pub use discord::DiscordWebhookProvider;
pub use notifier::{LogProvider, NotificationProvider, Notifier};

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub enum BookingEvent {
    Waitlisted,
    Settled,
    Cancelled,
    Completed,
}

impl BookingEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingEvent::Waitlisted => "waitlisted",
            BookingEvent::Settled => "settled",
            BookingEvent::Cancelled => "cancelled",
            BookingEvent::Completed => "completed",
        }
    }
}

/// Snapshot of a session right after a workflow transition.
#[derive(Debug, Clone, PartialEq)]
pub struct BookingNotification {
    pub event: BookingEvent,
    pub session: SessionEntity,
    pub plan: Option<Plan>,
}

impl BookingNotification {
    pub fn waitlisted(&self) -> bool {
        self.event == BookingEvent::Waitlisted
    }
}

/// Fire-and-forget admin alerts. Implementations must not block the caller.
#[automock]
pub trait NotificationSink: Send + Sync {
    fn notify(&self, notification: BookingNotification);
}

/// Builds the queued notifier with every provider enabled in the environment.
/// Must be called inside a tokio runtime.
pub fn notifier_from_env() -> Notifier {
    let config = NotificationConfig::from_env();

    for warning in &config.warnings {
        warn!(warning = %warning, "notifications: config warning");
    }

    let mut providers: Vec<Arc<dyn NotificationProvider>> = vec![Arc::new(LogProvider)];
    match config.discord_webhook_url {
        Some(url) => {
            info!("notifications: discord admin alerts enabled");
            providers.push(Arc::new(DiscordWebhookProvider::new(url)));
        }
        None => info!("notifications: discord admin alerts disabled"),
    }

    Notifier::new(providers)
}
