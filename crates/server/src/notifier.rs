//! Outbound notification queue.
//!
//! Workflow services publish into a bounded channel and return immediately. A background
//! dispatcher drains the channel and POSTs each event to the configured webhook, or logs it when
//! no webhook is configured. Delivery failures are logged and dropped.

use std::sync::Arc;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use callplan_core::config::NotificationsConfig;
use callplan_core::notifications::{NotificationError, NotificationEvent, NotificationSink};

const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum NotifierError {
    #[error("could not build webhook client: {0}")]
    Client(#[source] reqwest::Error),
}

/// Producer side of the queue. Never blocks; a full queue is reported to the caller.
#[derive(Clone)]
pub struct QueuedNotificationSink {
    sender: mpsc::Sender<NotificationEvent>,
}

impl QueuedNotificationSink {
    pub fn new(sender: mpsc::Sender<NotificationEvent>) -> Self {
        Self { sender }
    }
}

impl NotificationSink for QueuedNotificationSink {
    fn publish(&self, event: NotificationEvent) -> Result<(), NotificationError> {
        self.sender.try_send(event).map_err(|error| match error {
            TrySendError::Full(_) => NotificationError::QueueFull,
            TrySendError::Closed(_) => NotificationError::Closed,
        })
    }
}

/// Accepts and discards events while notifications are switched off.
#[derive(Clone, Copy, Debug, Default)]
pub struct DisabledNotificationSink;

impl NotificationSink for DisabledNotificationSink {
    fn publish(&self, event: NotificationEvent) -> Result<(), NotificationError> {
        debug!(
            event_name = "notification.discarded",
            notification_id = %event.id,
            notification_kind = event.kind.as_str(),
            "notifications are disabled"
        );
        Ok(())
    }
}

enum Delivery {
    Webhook { client: reqwest::Client, url: String, token: Option<SecretString> },
    Log,
}

impl Delivery {
    fn from_config(config: &NotificationsConfig) -> Result<Self, NotifierError> {
        let Some(url) = config.webhook_url.clone() else {
            return Ok(Self::Log);
        };
        let client = reqwest::Client::builder()
            .timeout(WEBHOOK_TIMEOUT)
            .build()
            .map_err(NotifierError::Client)?;
        Ok(Self::Webhook { client, url, token: config.webhook_token.clone() })
    }

    fn mode(&self) -> &'static str {
        match self {
            Self::Webhook { .. } => "webhook",
            Self::Log => "log",
        }
    }

    async fn deliver(&self, event: &NotificationEvent) -> Result<(), NotificationError> {
        match self {
            Self::Log => {
                info!(
                    event_name = "notification.logged",
                    notification_id = %event.id,
                    notification_kind = event.kind.as_str(),
                    recipient = %event.recipient,
                    subject_id = %event.subject_id,
                    message = %event.message,
                    "notification"
                );
                Ok(())
            }
            Self::Webhook { client, url, token } => {
                let mut request = client.post(url).json(&event.payload());
                if let Some(token) = token {
                    request = request.bearer_auth(token.expose_secret());
                }
                request
                    .send()
                    .await
                    .and_then(reqwest::Response::error_for_status)
                    .map(|_| ())
                    .map_err(|error| NotificationError::Delivery(error.to_string()))
            }
        }
    }
}

/// Handle on the background task draining the queue.
pub struct NotificationDispatcher {
    handle: JoinHandle<()>,
}

impl NotificationDispatcher {
    /// Waits for queued events to be delivered. The queue only closes once every sink clone has
    /// been dropped. Returns false if `grace` ran out first.
    pub async fn drain(self, grace: Duration) -> bool {
        match tokio::time::timeout(grace, self.handle).await {
            Ok(Ok(())) => {
                info!(
                    event_name = "notification.dispatcher.drained",
                    correlation_id = "shutdown",
                    "notification queue drained"
                );
                true
            }
            Ok(Err(join_error)) => {
                error!(
                    event_name = "notification.dispatcher.crashed",
                    correlation_id = "shutdown",
                    error = %join_error,
                    "notification dispatcher stopped abnormally"
                );
                false
            }
            Err(_) => {
                warn!(
                    event_name = "notification.dispatcher.drain_timeout",
                    correlation_id = "shutdown",
                    grace_secs = grace.as_secs(),
                    "notification queue not drained before shutdown"
                );
                false
            }
        }
    }
}

/// Builds the sink the workflow publishes into, plus its dispatcher when notifications are on.
pub fn start(
    config: &NotificationsConfig,
) -> Result<(Arc<dyn NotificationSink>, Option<NotificationDispatcher>), NotifierError> {
    if !config.enabled {
        info!(
            event_name = "notification.dispatcher.disabled",
            correlation_id = "bootstrap",
            "notifications disabled by configuration"
        );
        return Ok((Arc::new(DisabledNotificationSink), None));
    }

    let delivery = Delivery::from_config(config)?;
    let (sender, receiver) = mpsc::channel(config.queue_capacity.max(1));
    info!(
        event_name = "notification.dispatcher.started",
        correlation_id = "bootstrap",
        delivery = delivery.mode(),
        queue_capacity = config.queue_capacity,
        "notification dispatcher started"
    );

    let handle = tokio::spawn(dispatch(receiver, delivery));
    Ok((Arc::new(QueuedNotificationSink::new(sender)), Some(NotificationDispatcher { handle })))
}

async fn dispatch(mut receiver: mpsc::Receiver<NotificationEvent>, delivery: Delivery) {
    while let Some(event) = receiver.recv().await {
        match delivery.deliver(&event).await {
            Ok(()) => debug!(
                event_name = "notification.delivered",
                notification_id = %event.id,
                notification_kind = event.kind.as_str(),
                delivery = delivery.mode(),
                "notification delivered"
            ),
            Err(error) => warn!(
                event_name = "notification.delivery_failed",
                notification_id = %event.id,
                notification_kind = event.kind.as_str(),
                delivery = delivery.mode(),
                error = %error,
                "notification dropped after failed delivery"
            ),
        }
    }
}
