use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Role;

/// A free-text note on an item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Comment {
    pub id: Uuid,
    pub item_id: Uuid,
    /// Markdown supported.
    pub content: String,
    pub author_role: Option<Role>,
    pub created_at: DateTime<Utc>,
}

/// Input for adding a comment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCommentInput {
    pub content: String,
}
