//! Decides whether a requested status change is allowed.
//!
//! Checks run in a fixed order and stop at the first failure: edge exists,
//! role is permitted, comment present, decision log present, dependencies
//! finished. Permission failures therefore never leak dependency details.

use uuid::Uuid;

use super::error::WorkflowError;
use super::transitions::Transition;
use crate::db::Database;
use crate::models::{DependencyStatus, ItemStatus, Role};

/// Read-only state the validator consults about an item.
///
/// Only queried when the edge actually needs it.
pub trait TransitionFacts {
    fn decision_log_count(&self, item_id: Uuid) -> anyhow::Result<usize>;
    fn dependency_statuses(&self, item_id: Uuid) -> anyhow::Result<Vec<DependencyStatus>>;
}

impl TransitionFacts for Database {
    fn decision_log_count(&self, item_id: Uuid) -> anyhow::Result<usize> {
        self.count_decision_logs(item_id)
    }

    fn dependency_statuses(&self, item_id: Uuid) -> anyhow::Result<Vec<DependencyStatus>> {
        self.list_dependencies(item_id)
    }
}

/// Facts carried by the request itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestFacts {
    pub has_comment: bool,
    pub force: bool,
}

impl RequestFacts {
    pub fn new(comment: Option<&str>, force: bool) -> Self {
        Self {
            has_comment: comment.is_some_and(|c| !c.trim().is_empty()),
            force,
        }
    }
}

/// Validate moving `item_id` from `current` to `target` as `role`.
///
/// Returns the named edge on success.
pub fn validate<F: TransitionFacts + ?Sized>(
    item_id: Uuid,
    current: ItemStatus,
    target: ItemStatus,
    role: Role,
    request: RequestFacts,
    facts: &F,
) -> Result<Transition, WorkflowError> {
    let transition = Transition::find(current, target).ok_or(WorkflowError::InvalidTransition {
        from: current,
        to: target,
    })?;
    let def = transition.def();

    if !def.permits(role) {
        return Err(WorkflowError::RoleNotPermitted { role });
    }

    if def.requires_comment && !request.has_comment {
        return Err(WorkflowError::CommentRequired);
    }

    // The authority may complete without a recorded decision.
    if def.requires_decision_log && role != Role::Authority && facts.decision_log_count(item_id)? == 0
    {
        return Err(WorkflowError::DecisionLogRequired);
    }

    if target == ItemStatus::InProgress && !request.force {
        let blockers: Vec<_> = facts
            .dependency_statuses(item_id)?
            .into_iter()
            .filter(|dep| !dep.status.is_finished())
            .collect();

        if !blockers.is_empty() {
            return Err(WorkflowError::DependencyBlocked { blockers });
        }
    }

    Ok(transition)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use ItemStatus::*;

    #[derive(Default)]
    struct StubFacts {
        decision_logs: usize,
        dependencies: Vec<DependencyStatus>,
        dependency_queries: Cell<usize>,
    }

    impl TransitionFacts for StubFacts {
        fn decision_log_count(&self, _item_id: Uuid) -> anyhow::Result<usize> {
            Ok(self.decision_logs)
        }

        fn dependency_statuses(&self, _item_id: Uuid) -> anyhow::Result<Vec<DependencyStatus>> {
            self.dependency_queries.set(self.dependency_queries.get() + 1);
            Ok(self.dependencies.clone())
        }
    }

    fn dep(title: &str, status: ItemStatus) -> DependencyStatus {
        DependencyStatus {
            id: Uuid::new_v4(),
            title: title.to_string(),
            status,
        }
    }

    fn satisfied() -> StubFacts {
        StubFacts {
            decision_logs: 1,
            ..Default::default()
        }
    }

    fn check(
        from: ItemStatus,
        to: ItemStatus,
        role: Role,
        request: RequestFacts,
        facts: &StubFacts,
    ) -> Result<Transition, WorkflowError> {
        validate(Uuid::new_v4(), from, to, role, request, facts)
    }

    #[test]
    fn rejects_every_pair_outside_the_table() {
        let facts = satisfied();
        for from in ItemStatus::ALL {
            for to in ItemStatus::ALL {
                if Transition::find(from, to).is_some() {
                    continue;
                }
                for role in Role::ALL {
                    let result = check(from, to, role, RequestFacts::new(Some("c"), true), &facts);
                    assert!(
                        matches!(result, Err(WorkflowError::InvalidTransition { .. })),
                        "{} -> {} as {} should be invalid",
                        from,
                        to,
                        role
                    );
                }
            }
        }
    }

    #[test]
    fn every_edge_checks_role_membership() {
        let facts = satisfied();
        let request = RequestFacts::new(Some("reason"), false);

        for transition in Transition::ALL {
            let def = transition.def();
            for role in Role::ALL {
                let result = check(def.from, def.to, role, request, &facts);
                if def.permits(role) {
                    assert_eq!(result.unwrap(), transition);
                } else {
                    assert!(
                        matches!(result, Err(WorkflowError::RoleNotPermitted { role: r }) if r == role),
                        "{} as {} should be refused",
                        transition,
                        role
                    );
                }
            }
        }
    }

    #[test]
    fn rejections_require_a_comment() {
        let facts = satisfied();
        for (from, to) in [(PendingReview, Draft), (Done, Draft)] {
            let missing = check(from, to, Role::Authority, RequestFacts::default(), &facts);
            assert!(matches!(missing, Err(WorkflowError::CommentRequired)));

            let blank = check(from, to, Role::Authority, RequestFacts::new(Some("  "), false), &facts);
            assert!(matches!(blank, Err(WorkflowError::CommentRequired)));

            let given = check(
                from,
                to,
                Role::Authority,
                RequestFacts::new(Some("needs tests"), false),
                &facts,
            );
            assert!(given.is_ok());
        }
    }

    #[test]
    fn complete_requires_a_decision_log_unless_authority() {
        let none = StubFacts::default();

        let result = check(InProgress, Done, Role::Implementer, RequestFacts::default(), &none);
        assert!(matches!(result, Err(WorkflowError::DecisionLogRequired)));

        let result = check(InProgress, Done, Role::Authority, RequestFacts::default(), &none);
        assert_eq!(result.unwrap(), Transition::Complete);

        let result = check(InProgress, Done, Role::Implementer, RequestFacts::default(), &satisfied());
        assert_eq!(result.unwrap(), Transition::Complete);
    }

    #[test]
    fn start_work_is_blocked_by_unfinished_dependencies() {
        let facts = StubFacts {
            dependencies: vec![dep("B", Approved), dep("C", Done)],
            ..Default::default()
        };

        let err = check(Approved, InProgress, Role::Implementer, RequestFacts::default(), &facts)
            .unwrap_err();
        match &err {
            WorkflowError::DependencyBlocked { blockers } => {
                assert_eq!(blockers.len(), 1);
                assert_eq!(blockers[0].title, "B");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(err.to_string().contains("\"B\" (approved)"));
        assert!(err.to_string().contains("force=true"));
    }

    #[test]
    fn finished_dependencies_do_not_block() {
        let facts = StubFacts {
            dependencies: vec![dep("B", Done), dep("C", Accepted)],
            ..Default::default()
        };
        let result = check(Approved, InProgress, Role::Implementer, RequestFacts::default(), &facts);
        assert_eq!(result.unwrap(), Transition::StartWork);
    }

    #[test]
    fn force_overrides_dependency_block() {
        let facts = StubFacts {
            dependencies: vec![dep("B", Draft)],
            ..Default::default()
        };
        let result = check(Approved, InProgress, Role::Implementer, RequestFacts::new(None, true), &facts);
        assert_eq!(result.unwrap(), Transition::StartWork);
        assert_eq!(facts.dependency_queries.get(), 0);
    }

    #[test]
    fn role_failure_is_reported_before_dependency_details() {
        let facts = StubFacts {
            dependencies: vec![dep("Secret", Draft)],
            ..Default::default()
        };
        let result = check(Approved, InProgress, Role::Planner, RequestFacts::default(), &facts);
        assert!(matches!(result, Err(WorkflowError::RoleNotPermitted { .. })));
        assert_eq!(facts.dependency_queries.get(), 0);
    }
}
