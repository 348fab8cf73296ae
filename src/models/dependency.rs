use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ItemStatus;

/// A directed edge: `item_id` cannot start until `depends_on_item_id` is
/// finished.
///
/// Acyclicity is not enforced. An item on a cycle simply never becomes
/// unblocked.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Dependency {
    pub item_id: Uuid,
    pub depends_on_item_id: Uuid,
}

/// The resolved state of a depended-on item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DependencyStatus {
    pub id: Uuid,
    pub title: String,
    pub status: ItemStatus,
}

/// Input for adding a dependency to an item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddDependencyInput {
    pub depends_on_item_id: Uuid,
}
