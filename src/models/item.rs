use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Role;

/// A unit of work owned by a project.
///
/// The `status` field is only ever written through the workflow engine.
/// `version` is bumped on every status write and acts as the optimistic lock
/// token: a transition validated against one version fails if another writer
/// got there first.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Item {
    pub id: Uuid,
    pub project_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub priority: Priority,
    pub status: ItemStatus,
    pub sprint_tag: Option<String>,
    /// Who is working on the item. The autonomous worker uses `agent`.
    pub assigned_to: Option<String>,
    pub created_by_role: Option<Role>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The lifecycle status of an item.
///
/// - `Draft`: Being written, or sent back after a rejection
/// - `PendingReview`: Waiting for the authority to approve
/// - `Approved`: Ready to be picked up
/// - `InProgress`: Being implemented
/// - `Done`: Implemented, waiting for acceptance
/// - `Accepted`: Terminal
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Draft,
    PendingReview,
    Approved,
    InProgress,
    Done,
    Accepted,
}

impl ItemStatus {
    pub const ALL: [ItemStatus; 6] = [
        ItemStatus::Draft,
        ItemStatus::PendingReview,
        ItemStatus::Approved,
        ItemStatus::InProgress,
        ItemStatus::Done,
        ItemStatus::Accepted,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::PendingReview => "pending_review",
            Self::Approved => "approved",
            Self::InProgress => "in_progress",
            Self::Done => "done",
            Self::Accepted => "accepted",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(Self::Draft),
            "pending_review" => Some(Self::PendingReview),
            "approved" => Some(Self::Approved),
            "in_progress" => Some(Self::InProgress),
            "done" => Some(Self::Done),
            "accepted" => Some(Self::Accepted),
            _ => None,
        }
    }

    /// Whether an item in this status no longer blocks its dependents.
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Done | Self::Accepted)
    }

    /// Implementers only see items once they have been approved.
    pub fn is_visible_to(&self, role: Role) -> bool {
        match role {
            Role::Implementer => !matches!(self, Self::Draft | Self::PendingReview),
            Role::Planner | Role::Authority => true,
        }
    }
}

impl std::fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scheduling priority. The declaration order is the scheduling order:
/// `Critical` sorts first.
#[derive(
    Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Critical,
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "critical" => Some(Self::Critical),
            "high" => Some(Self::High),
            "medium" => Some(Self::Medium),
            "low" => Some(Self::Low),
            _ => None,
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Input for creating a new item. Items always start in `Draft`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateItemInput {
    pub title: String,
    pub description: Option<String>,
    /// Defaults to `Medium` if not specified.
    pub priority: Option<Priority>,
    pub sprint_tag: Option<String>,
}

/// Filters for listing items. All fields are optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ItemFilter {
    pub status: Option<ItemStatus>,
    pub priority: Option<Priority>,
    pub sprint_tag: Option<String>,
}

/// An item together with everything an implementer needs to work on it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemContext {
    pub item: Item,
    pub dependencies: Vec<DependencyContext>,
    pub comments: Vec<super::Comment>,
    pub decision_logs: Vec<super::DecisionLog>,
}

/// A dependency of an item with the decisions recorded on it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencyContext {
    pub item: super::DependencyStatus,
    pub decision_logs: Vec<super::DecisionLog>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_orders_critical_first() {
        let mut priorities = vec![Priority::Low, Priority::Critical, Priority::Medium, Priority::High];
        priorities.sort();
        assert_eq!(
            priorities,
            vec![Priority::Critical, Priority::High, Priority::Medium, Priority::Low]
        );
    }

    #[test]
    fn implementers_only_see_approved_and_later() {
        assert!(!ItemStatus::Draft.is_visible_to(Role::Implementer));
        assert!(!ItemStatus::PendingReview.is_visible_to(Role::Implementer));
        assert!(ItemStatus::Approved.is_visible_to(Role::Implementer));
        assert!(ItemStatus::Accepted.is_visible_to(Role::Implementer));
        assert!(ItemStatus::Draft.is_visible_to(Role::Planner));
    }

    #[test]
    fn status_round_trips_through_str() {
        for status in ItemStatus::ALL {
            assert_eq!(ItemStatus::from_str(status.as_str()), Some(status));
        }
        assert_eq!(ItemStatus::from_str("closed"), None);
    }

    #[test]
    fn only_done_and_accepted_are_finished() {
        let finished: Vec<_> = ItemStatus::ALL.into_iter().filter(|s| s.is_finished()).collect();
        assert_eq!(finished, vec![ItemStatus::Done, ItemStatus::Accepted]);
    }
}
