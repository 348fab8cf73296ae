//! Picks the next item an implementer should work on.

use uuid::Uuid;

use super::validator::TransitionFacts;
use crate::db::Database;
use crate::models::{Item, ItemStatus};

/// The highest-priority approved item of `project_id` whose dependencies are
/// all finished, or `None` when every approved item is blocked.
///
/// Items of equal priority keep storage order.
pub fn next_unblocked(db: &Database, project_id: Uuid) -> anyhow::Result<Option<Item>> {
    let approved = db.list_items_by_project_and_status(project_id, ItemStatus::Approved)?;
    select_unblocked(approved, db)
}

/// Stable-sort `candidates` by priority and return the first whose
/// dependencies are all `done` or `accepted`.
///
/// Dependencies are only looked up until a match is found.
pub fn select_unblocked<F: TransitionFacts + ?Sized>(
    mut candidates: Vec<Item>,
    facts: &F,
) -> anyhow::Result<Option<Item>> {
    candidates.sort_by_key(|item| item.priority);

    for item in candidates {
        let deps = facts.dependency_statuses(item.id)?;
        if deps.iter().all(|dep| dep.status.is_finished()) {
            return Ok(Some(item));
        }
        tracing::trace!(item = %item.id, "Skipping blocked item");
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DependencyStatus, Priority};
    use chrono::Utc;
    use std::collections::HashMap;

    struct Graph(HashMap<Uuid, Vec<DependencyStatus>>);

    impl TransitionFacts for Graph {
        fn decision_log_count(&self, _item_id: Uuid) -> anyhow::Result<usize> {
            Ok(0)
        }

        fn dependency_statuses(&self, item_id: Uuid) -> anyhow::Result<Vec<DependencyStatus>> {
            Ok(self.0.get(&item_id).cloned().unwrap_or_default())
        }
    }

    fn item(title: &str, priority: Priority) -> Item {
        let now = Utc::now();
        Item {
            id: Uuid::new_v4(),
            project_id: Uuid::nil(),
            title: title.to_string(),
            description: None,
            priority,
            status: ItemStatus::Approved,
            sprint_tag: None,
            assigned_to: None,
            created_by_role: None,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    fn blocked_by(status: ItemStatus) -> Vec<DependencyStatus> {
        vec![DependencyStatus {
            id: Uuid::new_v4(),
            title: "dep".to_string(),
            status,
        }]
    }

    #[test]
    fn returns_none_for_no_candidates() {
        let graph = Graph(HashMap::new());
        assert!(select_unblocked(vec![], &graph).unwrap().is_none());
    }

    #[test]
    fn prefers_critical_over_high() {
        let p1 = item("P1", Priority::High);
        let p2 = item("P2", Priority::Critical);
        let p3 = item("P3", Priority::High);
        let graph = Graph(HashMap::from([(p1.id, blocked_by(ItemStatus::Approved))]));

        let next = select_unblocked(vec![p1, p2, p3], &graph).unwrap().unwrap();
        assert_eq!(next.title, "P2");
    }

    #[test]
    fn skips_blocked_items_of_higher_priority() {
        let p1 = item("P1", Priority::High);
        let p3 = item("P3", Priority::High);
        let low = item("Low", Priority::Low);
        let graph = Graph(HashMap::from([(p1.id, blocked_by(ItemStatus::InProgress))]));

        let next = select_unblocked(vec![low, p1, p3], &graph).unwrap().unwrap();
        assert_eq!(next.title, "P3");
    }

    #[test]
    fn equal_priority_keeps_storage_order() {
        let first = item("first", Priority::Medium);
        let second = item("second", Priority::Medium);
        let graph = Graph(HashMap::new());

        let next = select_unblocked(vec![first, second], &graph).unwrap().unwrap();
        assert_eq!(next.title, "first");
    }

    #[test]
    fn finished_dependencies_unblock() {
        let a = item("A", Priority::Critical);
        let graph = Graph(HashMap::from([(a.id, blocked_by(ItemStatus::Accepted))]));

        let next = select_unblocked(vec![a], &graph).unwrap().unwrap();
        assert_eq!(next.title, "A");
    }

    #[test]
    fn all_blocked_yields_none() {
        let a = item("A", Priority::Critical);
        let b = item("B", Priority::Low);
        let graph = Graph(HashMap::from([
            (a.id, blocked_by(ItemStatus::Draft)),
            (b.id, blocked_by(ItemStatus::PendingReview)),
        ]));

        assert!(select_unblocked(vec![a, b], &graph).unwrap().is_none());
    }
}
