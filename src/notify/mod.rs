//! Outbound notifications about item transitions.
//!
//! Notifications are fire-and-forget: the workflow executor spawns them and
//! only logs failures.

mod telegram;

pub use telegram::*;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{Item, ItemStatus};

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Notification rejected ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("Storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

/// Sink for human-facing transition notices.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(
        &self,
        item: &Item,
        new_status: ItemStatus,
        comment: Option<&str>,
    ) -> Result<(), NotifyError>;
}

/// Discards every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn notify(
        &self,
        _item: &Item,
        _new_status: ItemStatus,
        _comment: Option<&str>,
    ) -> Result<(), NotifyError> {
        Ok(())
    }
}
