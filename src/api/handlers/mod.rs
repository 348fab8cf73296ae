use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use uuid::Uuid;

use super::{Actor, AppState};
use crate::agent::{AgentError, TickReport};
use crate::events::Event;
use crate::models::*;
use crate::workflow::{Transition, TransitionDef, TransitionRequest, WorkflowError};

type ApiError = (StatusCode, String);

// ============================================================
// Error Handling
// ============================================================

/// Log an internal error and return a sanitized response to the client.
fn internal_error(e: impl std::fmt::Display) -> ApiError {
    tracing::error!("Internal error: {}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal server error".to_string(),
    )
}

fn workflow_error(e: WorkflowError) -> ApiError {
    let status = match &e {
        WorkflowError::RoleNotPermitted { .. } => StatusCode::FORBIDDEN,
        WorkflowError::InvalidTransition { .. }
        | WorkflowError::CommentRequired
        | WorkflowError::DecisionLogRequired
        | WorkflowError::DependencyBlocked { .. } => StatusCode::BAD_REQUEST,
        WorkflowError::NotFound(_) => StatusCode::NOT_FOUND,
        WorkflowError::Conflict(_) => StatusCode::CONFLICT,
        WorkflowError::Storage(inner) => return internal_error(inner),
    };
    tracing::debug!("Transition refused: {}", e);
    (status, e.to_string())
}

fn require_role(actor: &Actor, allowed: &[Role], action: &str) -> Result<(), ApiError> {
    if allowed.contains(&actor.role) {
        Ok(())
    } else {
        Err((
            StatusCode::FORBIDDEN,
            format!("Role '{}' cannot {}", actor.role, action),
        ))
    }
}

fn required(value: &str, field: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        Err((StatusCode::BAD_REQUEST, format!("{} is required", field)))
    } else {
        Ok(())
    }
}

/// Load an item in the caller's project that the caller is allowed to see.
fn load_item(state: &AppState, actor: &Actor, id: Uuid) -> Result<Item, ApiError> {
    let item = state
        .db
        .get_item(id)
        .map_err(internal_error)?
        .filter(|item| item.project_id == actor.project_id)
        .ok_or((StatusCode::NOT_FOUND, "Item not found".to_string()))?;

    if !item.status.is_visible_to(actor.role) {
        return Err((
            StatusCode::FORBIDDEN,
            format!("Item not visible to {} role", actor.role),
        ));
    }
    Ok(item)
}

// ============================================================
// Health
// ============================================================

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

// ============================================================
// Projects
// ============================================================

pub async fn create_project(
    State(state): State<AppState>,
    Json(input): Json<CreateProjectInput>,
) -> Result<(StatusCode, Json<CreateProjectResponse>), ApiError> {
    required(&input.name, "name")?;
    let created = state.db.create_project(input).map_err(internal_error)?;
    tracing::info!(project = %created.project.id, "Created project \"{}\"", created.project.name);
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update_credentials(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateCredentialsInput>,
) -> Result<Json<Project>, ApiError> {
    require_role(&actor, &[Role::Authority], "update project credentials")?;
    if id != actor.project_id {
        return Err((StatusCode::NOT_FOUND, "Project not found".to_string()));
    }

    state
        .db
        .update_project_credentials(id, input)
        .map_err(internal_error)?
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, "Project not found".to_string()))
}

// ============================================================
// Items
// ============================================================

pub async fn list_items(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Query(filter): Query<ItemFilter>,
) -> Result<Json<Vec<Item>>, ApiError> {
    let mut items = state
        .db
        .list_items(actor.project_id, &filter)
        .map_err(internal_error)?;
    items.retain(|item| item.status.is_visible_to(actor.role));
    Ok(Json(items))
}

pub async fn create_item(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(input): Json<CreateItemInput>,
) -> Result<(StatusCode, Json<Item>), ApiError> {
    require_role(&actor, &[Role::Planner], "create items")?;
    required(&input.title, "title")?;

    let item = state
        .db
        .create_item(actor.project_id, actor.role, input)
        .map_err(internal_error)?;
    state.events().emit(Event::ItemCreated(item.clone()));
    Ok((StatusCode::CREATED, Json(item)))
}

/// The highest-priority approved item with no unfinished dependencies.
pub async fn next_item(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<Item>, ApiError> {
    require_role(&actor, &[Role::Implementer], "use /items/next")?;

    state
        .workflow
        .next_unblocked(actor.project_id)
        .map_err(workflow_error)?
        .map(Json)
        .ok_or((
            StatusCode::NOT_FOUND,
            "No approved unblocked items available".to_string(),
        ))
}

pub async fn get_item(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<Json<Item>, ApiError> {
    load_item(&state, &actor, id).map(Json)
}

pub async fn get_item_context(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<Json<ItemContext>, ApiError> {
    load_item(&state, &actor, id)?;
    state
        .db
        .get_item_context(id)
        .map_err(internal_error)?
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, "Item not found".to_string()))
}

// ============================================================
// Transitions
// ============================================================

/// Edges the caller's role may take from the item's current status.
pub async fn list_transitions(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<TransitionDef>>, ApiError> {
    let item = load_item(&state, &actor, id)?;
    Ok(Json(Transition::available_from(item.status, actor.role)))
}

pub async fn transition_item(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    Json(request): Json<TransitionRequest>,
) -> Result<Json<Item>, ApiError> {
    load_item(&state, &actor, id)?;
    state
        .workflow
        .execute_transition(id, actor.role, request)
        .await
        .map(Json)
        .map_err(workflow_error)
}

// ============================================================
// Dependencies
// ============================================================

pub async fn add_dependency(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    Json(input): Json<AddDependencyInput>,
) -> Result<(StatusCode, Json<Dependency>), ApiError> {
    require_role(&actor, &[Role::Planner], "add dependencies")?;
    load_item(&state, &actor, id)?;

    if input.depends_on_item_id == id {
        return Err((
            StatusCode::BAD_REQUEST,
            "Item cannot depend on itself".to_string(),
        ));
    }
    state
        .db
        .get_item(input.depends_on_item_id)
        .map_err(internal_error)?
        .filter(|dep| dep.project_id == actor.project_id)
        .ok_or((
            StatusCode::NOT_FOUND,
            "Dependency item not found".to_string(),
        ))?;

    let dependency = state
        .db
        .add_dependency(id, input.depends_on_item_id)
        .map_err(internal_error)?;
    state.events().emit(Event::DependencyAdded(dependency));
    Ok((StatusCode::CREATED, Json(dependency)))
}

pub async fn remove_dependency(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path((id, dep_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
    require_role(&actor, &[Role::Planner, Role::Authority], "remove dependencies")?;
    load_item(&state, &actor, id)?;

    if !state
        .db
        .remove_dependency(id, dep_id)
        .map_err(internal_error)?
    {
        return Err((StatusCode::NOT_FOUND, "Dependency not found".to_string()));
    }

    state.events().emit(Event::DependencyRemoved(Dependency {
        item_id: id,
        depends_on_item_id: dep_id,
    }));
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================
// Comments
// ============================================================

pub async fn list_comments(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Comment>>, ApiError> {
    load_item(&state, &actor, id)?;
    state.db.list_comments(id).map(Json).map_err(internal_error)
}

pub async fn create_comment(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    Json(input): Json<CreateCommentInput>,
) -> Result<(StatusCode, Json<Comment>), ApiError> {
    required(&input.content, "content")?;
    load_item(&state, &actor, id)?;

    let comment = state
        .db
        .append_comment(id, input.content, actor.role)
        .map_err(internal_error)?;
    state.events().emit(Event::CommentAdded(comment.clone()));
    Ok((StatusCode::CREATED, Json(comment)))
}

// ============================================================
// Decision Logs
// ============================================================

pub async fn list_decision_logs(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<DecisionLog>>, ApiError> {
    load_item(&state, &actor, id)?;
    state
        .db
        .list_decision_logs(id)
        .map(Json)
        .map_err(internal_error)
}

pub async fn create_decision_log(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    Json(input): Json<CreateDecisionLogInput>,
) -> Result<(StatusCode, Json<DecisionLog>), ApiError> {
    require_role(&actor, &[Role::Implementer], "create decision logs")?;
    required(&input.context, "context")?;
    required(&input.decision, "decision")?;
    load_item(&state, &actor, id)?;

    let log = state
        .db
        .append_decision_log(id, actor.role, input)
        .map_err(internal_error)?;
    state.events().emit(Event::DecisionAdded(log.clone()));
    Ok((StatusCode::CREATED, Json(log)))
}

// ============================================================
// Worker
// ============================================================

/// Run one worker pass over the caller's project.
pub async fn run_tick(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<TickReport>, ApiError> {
    require_role(&actor, &[Role::Authority], "run the agent worker")?;

    state
        .worker
        .tick_project(actor.project_id)
        .await
        .map(Json)
        .map_err(|e| match e {
            AgentError::ProjectNotFound => (StatusCode::NOT_FOUND, e.to_string()),
            AgentError::NoCredential => (StatusCode::BAD_REQUEST, e.to_string()),
            AgentError::Storage(inner) => internal_error(inner),
        })
}
