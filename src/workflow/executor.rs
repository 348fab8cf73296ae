//! Applies transitions that have already been validated.

use std::sync::Arc;

use crate::db::{CommittedTransition, Database, StatusCommit};
use crate::events::{Event, EventBus};
use crate::models::{CreateDecisionLogInput, Item, ItemStatus, Role};
use crate::notify::Notifier;

use super::error::WorkflowError;

/// Persists status changes and fans them out to the broadcast and
/// notification collaborators.
///
/// The executor does not validate. Callers either run the validator first
/// or, like the autonomous worker, deliberately bypass it.
#[derive(Clone)]
pub struct WorkflowExecutor {
    db: Database,
    events: EventBus,
    notifier: Arc<dyn Notifier>,
}

impl WorkflowExecutor {
    pub fn new(db: Database, events: EventBus, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            db,
            events,
            notifier,
        }
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Move `item` to `to`, storing `comment` (attributed to `role`) in the
    /// same write.
    ///
    /// Fails with [`WorkflowError::Conflict`] if the item changed since it
    /// was read.
    pub async fn execute(
        &self,
        item: &Item,
        to: ItemStatus,
        role: Role,
        comment: Option<String>,
    ) -> Result<Item, WorkflowError> {
        self.commit(item, to, role, comment, None, None).await
    }

    /// Like [`execute`](Self::execute), also appending a decision log in the
    /// same write.
    pub async fn execute_with_decision(
        &self,
        item: &Item,
        to: ItemStatus,
        role: Role,
        comment: Option<String>,
        decision: CreateDecisionLogInput,
    ) -> Result<Item, WorkflowError> {
        self.commit(item, to, role, comment, Some(decision), None).await
    }

    /// Move `item` to `to` and hand it to `assignee` in the same write. On a
    /// conflict the assignee is left as it was.
    pub async fn execute_assigned(
        &self,
        item: &Item,
        to: ItemStatus,
        role: Role,
        assignee: &str,
    ) -> Result<Item, WorkflowError> {
        self.commit(item, to, role, None, None, Some(assignee.to_string())).await
    }

    async fn commit(
        &self,
        item: &Item,
        to: ItemStatus,
        role: Role,
        comment: Option<String>,
        decision: Option<CreateDecisionLogInput>,
        assignee: Option<String>,
    ) -> Result<Item, WorkflowError> {
        let comment = comment.filter(|c| !c.trim().is_empty());
        let notice = comment.clone();

        let committed = self.db.commit_transition(StatusCommit {
            item_id: item.id,
            expected_version: item.version,
            to,
            role,
            comment,
            decision,
            assignee,
        })?;

        let Some(CommittedTransition {
            item: updated,
            comment,
            decision,
        }) = committed
        else {
            return Err(match self.db.get_item(item.id)? {
                Some(_) => WorkflowError::Conflict(item.id),
                None => WorkflowError::NotFound("Item"),
            });
        };

        tracing::info!(
            item = %updated.id,
            role = %role,
            "Item \"{}\" {} -> {}",
            updated.title,
            item.status,
            to
        );

        if let Some(comment) = comment {
            self.events.emit(Event::CommentAdded(comment));
        }
        if let Some(decision) = decision {
            self.events.emit(Event::DecisionAdded(decision));
        }
        self.events.emit(Event::ItemTransitioned {
            item: updated.clone(),
            from: item.status,
            to,
        });

        let notifier = self.notifier.clone();
        let notified = updated.clone();
        tokio::spawn(async move {
            if let Err(e) = notifier.notify(&notified, to, notice.as_deref()).await {
                tracing::warn!(item = %notified.id, "Transition notification failed: {}", e);
            }
        });

        Ok(updated)
    }
}
