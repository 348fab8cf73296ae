mod handlers;
pub mod middleware;

use axum::{
    middleware::from_fn_with_state,
    routing::{delete, get, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::agent::AgentWorker;
use crate::db::Database;
use crate::events::EventBus;
use crate::workflow::Workflow;

pub use middleware::Actor;

/// Shared state for every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub workflow: Workflow,
    pub worker: AgentWorker,
}

impl AppState {
    pub fn new(db: Database, workflow: Workflow, worker: AgentWorker) -> Self {
        Self {
            db,
            workflow,
            worker,
        }
    }

    pub fn events(&self) -> &EventBus {
        self.workflow.executor().events()
    }
}

pub fn create_router(state: AppState) -> Router {
    let authenticated = Router::new()
        // Projects
        .route("/projects/{id}/credentials", put(handlers::update_credentials))
        // Items
        .route("/items", get(handlers::list_items))
        .route("/items", post(handlers::create_item))
        .route("/items/next", get(handlers::next_item))
        .route("/items/{id}", get(handlers::get_item))
        .route("/items/{id}/context", get(handlers::get_item_context))
        .route("/items/{id}/transitions", get(handlers::list_transitions))
        .route("/items/{id}/transition", post(handlers::transition_item))
        // Dependencies
        .route("/items/{id}/dependencies", post(handlers::add_dependency))
        .route(
            "/items/{id}/dependencies/{dep_id}",
            delete(handlers::remove_dependency),
        )
        // Comments and decisions
        .route("/items/{id}/comments", get(handlers::list_comments))
        .route("/items/{id}/comments", post(handlers::create_comment))
        .route("/items/{id}/decision-logs", get(handlers::list_decision_logs))
        .route("/items/{id}/decision-logs", post(handlers::create_decision_log))
        // Worker
        .route("/worker/tick", post(handlers::run_tick))
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware::auth_middleware,
        ));

    let api = Router::new()
        .route("/projects", post(handlers::create_project))
        .route("/health", get(handlers::health))
        .merge(authenticated);

    Router::new()
        .nest("/api/v1", api)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
