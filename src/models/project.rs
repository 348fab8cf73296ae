use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Role;

/// A project containing items.
///
/// Credentials are never serialized back to clients; only whether they are
/// configured.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    /// Credential for the AI collaborator. Projects without one are skipped
    /// by the autonomous worker.
    #[serde(skip_serializing, default)]
    pub anthropic_api_key: Option<String>,
    #[serde(skip_serializing, default)]
    pub telegram_bot_token: Option<String>,
    pub telegram_chat_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An API key bound to one project and one role.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKey {
    pub id: Uuid,
    pub project_id: Uuid,
    pub role: Role,
    pub key: String,
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a new project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateProjectInput {
    pub name: String,
    pub description: Option<String>,
}

/// Response when creating a project: the project and one key per role.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateProjectResponse {
    pub project: Project,
    pub api_keys: Vec<ApiKey>,
}

/// Input for updating project credentials. `None` leaves a value unchanged;
/// an empty string clears it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateCredentialsInput {
    pub anthropic_api_key: Option<String>,
    pub telegram_bot_token: Option<String>,
    pub telegram_chat_id: Option<String>,
}
