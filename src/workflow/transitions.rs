//! The closed table of legal status changes.

use serde::{Deserialize, Serialize};

use crate::models::{ItemStatus, Role};

/// One of the seven named edges of the item lifecycle.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
    SubmitForReview,
    Approve,
    RejectReview,
    StartWork,
    Complete,
    Accept,
    RejectResult,
}

/// Structural description of an edge.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct TransitionDef {
    pub name: Transition,
    pub from: ItemStatus,
    pub to: ItemStatus,
    pub roles: &'static [Role],
    pub requires_comment: bool,
    pub requires_decision_log: bool,
}

impl Transition {
    pub const ALL: [Transition; 7] = [
        Transition::SubmitForReview,
        Transition::Approve,
        Transition::RejectReview,
        Transition::StartWork,
        Transition::Complete,
        Transition::Accept,
        Transition::RejectResult,
    ];

    pub fn def(self) -> TransitionDef {
        use ItemStatus::*;
        use Role::*;

        let (from, to, roles, requires_comment, requires_decision_log): (
            ItemStatus,
            ItemStatus,
            &'static [Role],
            bool,
            bool,
        ) = match self {
            Self::SubmitForReview => (Draft, PendingReview, &[Planner, Authority], false, false),
            Self::Approve => (PendingReview, Approved, &[Authority], false, false),
            Self::RejectReview => (PendingReview, Draft, &[Authority], true, false),
            Self::StartWork => (Approved, InProgress, &[Implementer, Authority], false, false),
            Self::Complete => (InProgress, Done, &[Implementer, Authority], false, true),
            Self::Accept => (Done, Accepted, &[Authority], false, false),
            Self::RejectResult => (Done, Draft, &[Authority], true, false),
        };

        TransitionDef {
            name: self,
            from,
            to,
            roles,
            requires_comment,
            requires_decision_log,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SubmitForReview => "submit_for_review",
            Self::Approve => "approve",
            Self::RejectReview => "reject_review",
            Self::StartWork => "start_work",
            Self::Complete => "complete",
            Self::Accept => "accept",
            Self::RejectResult => "reject_result",
        }
    }

    /// The edge from `from` to `to`, if one exists.
    pub fn find(from: ItemStatus, to: ItemStatus) -> Option<Transition> {
        Self::ALL.into_iter().find(|t| {
            let def = t.def();
            def.from == from && def.to == to
        })
    }

    /// Edges `role` may take out of `from`.
    pub fn available_from(from: ItemStatus, role: Role) -> Vec<TransitionDef> {
        Self::ALL
            .into_iter()
            .map(Transition::def)
            .filter(|def| def.from == from && def.permits(role))
            .collect()
    }
}

impl TransitionDef {
    pub fn permits(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }
}

impl std::fmt::Display for Transition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ItemStatus::*;

    #[test]
    fn at_most_one_edge_per_pair() {
        for from in ItemStatus::ALL {
            for to in ItemStatus::ALL {
                let matches = Transition::ALL
                    .iter()
                    .filter(|t| t.def().from == from && t.def().to == to)
                    .count();
                assert!(matches <= 1, "{} -> {} has {} edges", from, to, matches);
            }
        }
    }

    #[test]
    fn lookup_returns_named_edges() {
        assert_eq!(Transition::find(Draft, PendingReview), Some(Transition::SubmitForReview));
        assert_eq!(Transition::find(PendingReview, Draft), Some(Transition::RejectReview));
        assert_eq!(Transition::find(Done, Draft), Some(Transition::RejectResult));
        assert_eq!(Transition::find(Draft, Approved), None);
        assert_eq!(Transition::find(Accepted, Draft), None);
        assert_eq!(Transition::find(Draft, Draft), None);
    }

    #[test]
    fn accepted_is_terminal_and_draft_has_one_exit() {
        let out_of = |status| {
            Transition::ALL
                .iter()
                .filter(|t| t.def().from == status)
                .count()
        };
        assert_eq!(out_of(Accepted), 0);
        assert_eq!(out_of(Draft), 1);
    }

    #[test]
    fn only_rejections_require_comments() {
        let requiring: Vec<_> = Transition::ALL
            .into_iter()
            .filter(|t| t.def().requires_comment)
            .collect();
        assert_eq!(requiring, vec![Transition::RejectReview, Transition::RejectResult]);

        let logging: Vec<_> = Transition::ALL
            .into_iter()
            .filter(|t| t.def().requires_decision_log)
            .collect();
        assert_eq!(logging, vec![Transition::Complete]);
    }

    #[test]
    fn available_edges_depend_on_role() {
        let authority: Vec<_> = Transition::available_from(Done, Role::Authority)
            .into_iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(authority, vec![Transition::Accept, Transition::RejectResult]);

        assert!(Transition::available_from(Done, Role::Implementer).is_empty());
        assert_eq!(Transition::available_from(Approved, Role::Implementer).len(), 1);
    }
}
