//! Fire-and-forget notification fan-out.
//!
//! Workflow transitions enqueue a [`Notification`] and move on; a worker
//! task drains the queue into a [`NotificationSender`]. Delivery failure is
//! warned, never propagated — a lost email must not roll back the
//! transition that triggered it.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::models::ApprovalStatus;

#[derive(Clone, Debug, PartialEq)]
pub enum Notification {
    ApprovalRequested {
        recipient: String,
        approval_title: String,
        project_name: String,
        requested_by: String,
    },
    ApprovalResponded {
        recipient: String,
        approval_title: String,
        status: ApprovalStatus,
        responded_by: String,
    },
    UpdatePosted {
        recipient: String,
        project_name: String,
        excerpt: String,
    },
    InvoiceSent {
        recipient: String,
        invoice_number: String,
        amount: String,
    },
}

impl Notification {
    pub fn recipient(&self) -> &str {
        match self {
            Notification::ApprovalRequested { recipient, .. }
            | Notification::ApprovalResponded { recipient, .. }
            | Notification::UpdatePosted { recipient, .. }
            | Notification::InvoiceSent { recipient, .. } => recipient,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Notification::ApprovalRequested { .. } => "approval-requested",
            Notification::ApprovalResponded { .. } => "approval-responded",
            Notification::UpdatePosted { .. } => "project-update-posted",
            Notification::InvoiceSent { .. } => "invoice-sent",
        }
    }
}

#[derive(Debug)]
pub struct DeliveryError(pub String);

impl std::fmt::Display for DeliveryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "delivery failed: {}", self.0)
    }
}

pub type DeliveryFuture = Pin<Box<dyn Future<Output = Result<(), DeliveryError>> + Send>>;

/// Transport for notifications. Implementations must build a `'static`
/// future, cloning whatever state they need into it.
pub trait NotificationSender: Send + Sync + 'static {
    fn deliver(&self, notification: Notification) -> DeliveryFuture;
}

/// Cloneable handle to the notification worker.
#[derive(Clone)]
pub struct NotificationQueue {
    tx: mpsc::UnboundedSender<Notification>,
}

impl NotificationQueue {
    /// Spawn the drain task and return the enqueue handle.
    pub fn spawn(sender: Arc<dyn NotificationSender>) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<Notification>();
        tokio::spawn(async move {
            while let Some(notification) = rx.recv().await {
                let kind = notification.kind();
                let recipient = notification.recipient().to_owned();
                if let Err(err) = sender.deliver(notification).await {
                    warn!(%kind, %recipient, %err, "notification delivery failed");
                }
            }
        });
        Self { tx }
    }

    /// Hand a notification to the worker. Never fails the caller; a closed
    /// queue (shutdown) is warned and the notification dropped.
    pub fn enqueue(&self, notification: Notification) {
        let kind = notification.kind();
        if self.tx.send(notification).is_err() {
            warn!(%kind, "notification queue closed, dropping notification");
        }
    }
}

/// Default sender: logs instead of sending. Real transports (email) plug in
/// behind the same trait.
pub struct LogSender;

impl NotificationSender for LogSender {
    fn deliver(&self, notification: Notification) -> DeliveryFuture {
        Box::pin(async move {
            info!(
                kind = notification.kind(),
                recipient = notification.recipient(),
                "notification (log transport)"
            );
            Ok(())
        })
    }
}

