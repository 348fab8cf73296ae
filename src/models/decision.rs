use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Role;

/// An immutable rationale record attached to an item.
///
/// Decision logs are append-only. The workflow engine never edits or deletes
/// them; an item cannot move to `done` (except by the authority) until at
/// least one exists.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DecisionLog {
    pub id: Uuid,
    pub item_id: Uuid,
    pub context: String,
    pub decision: String,
    pub alternatives: Option<String>,
    pub consequences: Option<String>,
    pub created_by_role: Option<Role>,
    pub created_at: DateTime<Utc>,
}

/// Input for appending a decision log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDecisionLogInput {
    pub context: String,
    pub decision: String,
    pub alternatives: Option<String>,
    pub consequences: Option<String>,
}
