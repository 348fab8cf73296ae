//! The item workflow engine.
//!
//! - [`transitions`]: the closed table of seven legal edges
//! - [`validator`]: decides whether a requested move is allowed
//! - [`resolver`]: picks the next unblocked item for an implementer
//! - [`executor`]: persists accepted moves and notifies collaborators
//!
//! [`Workflow`] ties them together for request-driven callers. The
//! autonomous worker in [`crate::agent`] drives the executor directly.

pub mod error;
pub mod executor;
pub mod resolver;
pub mod transitions;
pub mod validator;

pub use error::WorkflowError;
pub use executor::WorkflowExecutor;
pub use transitions::{Transition, TransitionDef};
pub use validator::{RequestFacts, TransitionFacts};

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::Database;
use crate::events::EventBus;
use crate::models::{Item, ItemStatus, Role};
use crate::notify::Notifier;

/// A caller's request to move an item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionRequest {
    pub to: ItemStatus,
    pub comment: Option<String>,
    /// Start work even if dependencies are unfinished.
    #[serde(default)]
    pub force: bool,
}

impl TransitionRequest {
    pub fn to(to: ItemStatus) -> Self {
        Self {
            to,
            comment: None,
            force: false,
        }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn forced(mut self) -> Self {
        self.force = true;
        self
    }

    fn facts(&self) -> RequestFacts {
        RequestFacts::new(self.comment.as_deref(), self.force)
    }
}

#[derive(Clone)]
pub struct Workflow {
    db: Database,
    executor: WorkflowExecutor,
}

impl Workflow {
    pub fn new(db: Database, events: EventBus, notifier: Arc<dyn Notifier>) -> Self {
        let executor = WorkflowExecutor::new(db.clone(), events, notifier);
        Self { db, executor }
    }

    pub fn executor(&self) -> &WorkflowExecutor {
        &self.executor
    }

    /// Check a request against `item`'s current status without applying it.
    pub fn validate_transition(
        &self,
        item: &Item,
        role: Role,
        request: &TransitionRequest,
    ) -> Result<Transition, WorkflowError> {
        validator::validate(
            item.id,
            item.status,
            request.to,
            role,
            request.facts(),
            &self.db,
        )
    }

    /// Validate and apply a request against the item as currently stored.
    ///
    /// The write is conditional on the version that was validated, so a
    /// concurrent change surfaces as [`WorkflowError::Conflict`].
    pub async fn execute_transition(
        &self,
        item_id: Uuid,
        role: Role,
        request: TransitionRequest,
    ) -> Result<Item, WorkflowError> {
        let item = self
            .db
            .get_item(item_id)?
            .ok_or(WorkflowError::NotFound("Item"))?;

        let transition = self.validate_transition(&item, role, &request)?;
        tracing::debug!(item = %item.id, %transition, "Transition accepted");

        self.executor
            .execute(&item, request.to, role, request.comment)
            .await
    }

    pub fn next_unblocked(&self, project_id: Uuid) -> Result<Option<Item>, WorkflowError> {
        Ok(resolver::next_unblocked(&self.db, project_id)?)
    }
}
