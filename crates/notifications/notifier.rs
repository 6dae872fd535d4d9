use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{info, warn};

use super::{BookingNotification, NotificationSink};

const QUEUE_CAPACITY: usize = 256;

#[async_trait]
pub trait NotificationProvider: Send + Sync {
    async fn send(&self, notification: &BookingNotification) -> Result<()>;
    fn provider_name(&self) -> &'static str;
}

/// Writes every alert to the application log.
pub struct LogProvider;

#[async_trait]
impl NotificationProvider for LogProvider {
    async fn send(&self, notification: &BookingNotification) -> Result<()> {
        info!(
            event = notification.event.as_str(),
            session_id = %notification.session.id,
            status = %notification.session.status,
            plan_id = ?notification.plan.as_ref().map(|p| p.id.as_str()),
            "notifications: booking alert"
        );
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "log"
    }
}

/// Bounded queue drained by a background task. Full or closed queues drop the alert.
#[derive(Clone)]
pub struct Notifier {
    tx: mpsc::Sender<BookingNotification>,
}

impl Notifier {
    pub fn new(providers: Vec<Arc<dyn NotificationProvider>>) -> Self {
        let (tx, mut rx) = mpsc::channel::<BookingNotification>(QUEUE_CAPACITY);

        tokio::spawn(async move {
            while let Some(notification) = rx.recv().await {
                for provider in &providers {
                    if let Err(error) = provider.send(&notification).await {
                        warn!(
                            provider = provider.provider_name(),
                            session_id = %notification.session.id,
                            error = %error,
                            "notifications: provider failed"
                        );
                    }
                }
            }
        });

        Self { tx }
    }
}

impl NotificationSink for Notifier {
    fn notify(&self, notification: BookingNotification) {
        match self.tx.try_send(notification) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(dropped)) => {
                warn!(session_id = %dropped.session.id, "notifications: queue full; dropping alert");
            }
            Err(mpsc::error::TrySendError::Closed(dropped)) => {
                warn!(session_id = %dropped.session.id, "notifications: queue closed; dropping alert");
            }
        }
    }
}
