//! Prompt text for the two worker stages.

use crate::models::{Comment, DependencyContext, Item};

pub const PLANNER_SYSTEM: &str = "You are a senior software architect. Write a clear, actionable implementation plan for the given task. Include:
1. Approach overview (2-3 sentences)
2. Step-by-step implementation plan (numbered)
3. Key technical decisions
4. Potential risks or considerations

Be concise but thorough. Write in the same language as the task description.";

pub const IMPLEMENTER_SYSTEM: &str = "You are a senior developer implementing a task. Based on the task description and the approved plan, write:

1. The implementation details: what files to create or modify, what code to write
2. Key decisions made during implementation and why
3. What was completed

Be specific and technical. Write in the same language as the task.";

pub const PLAN_HEADING: &str = "**Implementation Plan**";
pub const IMPLEMENTATION_HEADING: &str = "**Implementation**";

/// Longest decision text recorded from an implementation narrative.
pub const DECISION_EXCERPT_CHARS: usize = 500;

/// One line per dependency with its status, followed by its recorded
/// decisions. Empty when there are no dependencies.
pub fn dependency_context(deps: &[DependencyContext]) -> String {
    if deps.is_empty() {
        return String::new();
    }

    let mut ctx = String::from("\n\nDependencies:\n");
    for dep in deps {
        ctx.push_str(&format!("- {} ({})\n", dep.item.title, dep.item.status));
        for log in &dep.decision_logs {
            ctx.push_str(&format!("  Decision: {}\n", log.decision));
        }
    }
    ctx
}

pub fn plan_request(item: &Item, deps: &[DependencyContext]) -> String {
    let mut msg = format!("Task: {}", item.title);
    if let Some(description) = non_blank(item.description.as_deref()) {
        msg.push_str(&format!("\n\nDescription: {}", description));
    }
    msg.push_str(&dependency_context(deps));
    msg.push_str(&format!("\n\nPriority: {}", item.priority));
    msg
}

pub fn implementation_request(
    item: &Item,
    plan: Option<&Comment>,
    deps: &[DependencyContext],
) -> String {
    let mut msg = format!("Task: {}", item.title);
    if let Some(description) = non_blank(item.description.as_deref()) {
        msg.push_str(&format!("\nDescription: {}", description));
    }
    if let Some(plan) = plan {
        msg.push_str(&format!("\n\nApproved plan:\n{}", plan.content));
    }
    msg.push_str(&dependency_context(deps));
    msg
}

/// The most recent plan comment, if any.
pub fn latest_plan(comments: &[Comment]) -> Option<&Comment> {
    comments
        .iter()
        .rev()
        .find(|c| c.content.contains("Implementation Plan"))
}

pub fn plan_comment(plan: &str) -> String {
    format!("{}\n\n{}", PLAN_HEADING, plan)
}

pub fn implementation_comment(narrative: &str) -> String {
    format!("{}\n\n{}", IMPLEMENTATION_HEADING, narrative)
}

pub fn decision_context(item: &Item) -> String {
    format!("Implementation of: {}", item.title)
}

/// The first `max_chars` characters of `text`, with `...` appended when
/// anything was cut.
pub fn excerpt(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

fn non_blank(text: Option<&str>) -> Option<&str> {
    text.filter(|t| !t.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DecisionLog, DependencyStatus, ItemStatus, Priority, Role};
    use chrono::Utc;
    use uuid::Uuid;

    fn item() -> Item {
        let now = Utc::now();
        Item {
            id: Uuid::new_v4(),
            project_id: Uuid::new_v4(),
            title: "Add login".to_string(),
            description: Some("OAuth via GitHub".to_string()),
            priority: Priority::High,
            status: ItemStatus::Draft,
            sprint_tag: None,
            assigned_to: None,
            created_by_role: Some(Role::Planner),
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    fn comment(content: &str) -> Comment {
        Comment {
            id: Uuid::new_v4(),
            item_id: Uuid::nil(),
            content: content.to_string(),
            author_role: Some(Role::Implementer),
            created_at: Utc::now(),
        }
    }

    fn dependency() -> DependencyContext {
        DependencyContext {
            item: DependencyStatus {
                id: Uuid::new_v4(),
                title: "Session store".to_string(),
                status: ItemStatus::Done,
            },
            decision_logs: vec![DecisionLog {
                id: Uuid::new_v4(),
                item_id: Uuid::nil(),
                context: "Implementation of: Session store".to_string(),
                decision: "Use Redis".to_string(),
                alternatives: None,
                consequences: None,
                created_by_role: Some(Role::Implementer),
                created_at: Utc::now(),
            }],
        }
    }

    #[test]
    fn plan_request_includes_task_dependencies_and_priority() {
        let msg = plan_request(&item(), &[dependency()]);
        assert!(msg.starts_with("Task: Add login\n\nDescription: OAuth via GitHub"));
        assert!(msg.contains("- Session store (done)\n  Decision: Use Redis"));
        assert!(msg.ends_with("Priority: high"));
    }

    #[test]
    fn dependency_context_is_empty_without_dependencies() {
        assert_eq!(dependency_context(&[]), "");
        assert!(!plan_request(&item(), &[]).contains("Dependencies"));
    }

    #[test]
    fn implementation_request_uses_the_latest_plan() {
        let comments = vec![
            comment("**Implementation Plan**\n\nfirst"),
            comment("looks good"),
            comment("**Implementation Plan**\n\nsecond"),
        ];
        let plan = latest_plan(&comments);
        let msg = implementation_request(&item(), plan, &[]);
        assert!(msg.contains("Approved plan:\n**Implementation Plan**\n\nsecond"));
        assert!(!msg.contains("first"));
    }

    #[test]
    fn excerpt_truncates_on_char_boundaries() {
        assert_eq!(excerpt("short", 500), "short");
        assert_eq!(excerpt("abcdef", 3), "abc...");
        assert_eq!(excerpt("ééé", 3), "ééé");
        assert_eq!(excerpt("éééé", 2), "éé...");

        let long = "x".repeat(600);
        let cut = excerpt(&long, DECISION_EXCERPT_CHARS);
        assert_eq!(cut.len(), 503);
        assert!(cut.ends_with("..."));
    }
}
