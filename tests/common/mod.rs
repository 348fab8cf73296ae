#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use agentboard::agent::AgentWorker;
use agentboard::ai::{AiError, ChatMessage, TextGenerator};
use agentboard::db::Database;
use agentboard::events::EventBus;
use agentboard::models::*;
use agentboard::notify::{NoopNotifier, Notifier};
use agentboard::workflow::Workflow;

pub const PROJECT_CREDENTIAL: &str = "sk-project";

/// A text generator that replays scripted outcomes, then falls back to a
/// fixed reply.
#[derive(Default)]
pub struct StubGenerator {
    script: Mutex<VecDeque<Result<String, String>>>,
    fallback: Option<String>,
    calls: AtomicUsize,
    requests: Mutex<Vec<String>>,
    credentials: Mutex<Vec<String>>,
}

impl StubGenerator {
    pub fn always(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            fallback: Some(reply.to_string()),
            ..Default::default()
        })
    }

    /// `Err` entries fail the call with the given body.
    pub fn scripted(outcomes: Vec<Result<&str, &str>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(
                outcomes
                    .into_iter()
                    .map(|o| o.map(str::to_string).map_err(str::to_string))
                    .collect(),
            ),
            ..Default::default()
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// User messages received, in call order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub fn credentials(&self) -> Vec<String> {
        self.credentials.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for StubGenerator {
    async fn complete(
        &self,
        credential: &str,
        _system: &str,
        conversation: &[ChatMessage],
    ) -> Result<String, AiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.credentials.lock().unwrap().push(credential.to_string());
        if let Some(message) = conversation.last() {
            self.requests.lock().unwrap().push(message.content.clone());
        }

        match self.script.lock().unwrap().pop_front() {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(body)) => Err(AiError::Api { status: 503, body }),
            None => self.fallback.clone().ok_or(AiError::EmptyResponse),
        }
    }
}

pub struct Harness {
    pub db: Database,
    pub events: EventBus,
    pub workflow: Workflow,
    pub worker: AgentWorker,
    pub generator: Arc<StubGenerator>,
    pub project: CreateProjectResponse,
}

impl Harness {
    pub fn new(generator: Arc<StubGenerator>) -> Self {
        Self::build(generator, Arc::new(NoopNotifier))
    }

    pub fn build(generator: Arc<StubGenerator>, notifier: Arc<dyn Notifier>) -> Self {
        let db = Database::open_memory().expect("Failed to create database");
        db.migrate().expect("Failed to migrate");

        let events = EventBus::new();
        let workflow = Workflow::new(db.clone(), events.clone(), notifier);
        let worker = AgentWorker::new(db.clone(), workflow.executor().clone(), generator.clone());

        let project = create_project(&db, "Board");
        db.update_project_credentials(
            project.project.id,
            UpdateCredentialsInput {
                anthropic_api_key: Some(PROJECT_CREDENTIAL.to_string()),
                ..Default::default()
            },
        )
        .expect("Failed to set credentials");

        Self {
            db,
            events,
            workflow,
            worker,
            generator,
            project,
        }
    }

    pub fn project_id(&self) -> uuid::Uuid {
        self.project.project.id
    }

    pub fn item(&self, title: &str, priority: Priority) -> Item {
        create_item(&self.db, self.project_id(), title, priority)
    }

    pub fn item_in(&self, title: &str, priority: Priority, status: ItemStatus) -> Item {
        let item = self.item(title, priority);
        set_status(&self.db, &item, status)
    }

    pub fn reload(&self, item: &Item) -> Item {
        self.db
            .get_item(item.id)
            .expect("Query failed")
            .expect("Item disappeared")
    }
}

pub fn create_project(db: &Database, name: &str) -> CreateProjectResponse {
    db.create_project(CreateProjectInput {
        name: name.to_string(),
        description: None,
    })
    .expect("Failed to create project")
}

pub fn create_item(db: &Database, project_id: uuid::Uuid, title: &str, priority: Priority) -> Item {
    db.create_item(
        project_id,
        Role::Planner,
        CreateItemInput {
            title: title.to_string(),
            description: None,
            priority: Some(priority),
            sprint_tag: None,
        },
    )
    .expect("Failed to create item")
}

/// Put an item straight into `status`, bypassing the workflow.
pub fn set_status(db: &Database, item: &Item, status: ItemStatus) -> Item {
    let current = db.get_item(item.id).unwrap().unwrap();
    assert!(db
        .update_item_status(item.id, status, current.version)
        .expect("Failed to update status"));
    db.get_item(item.id).unwrap().unwrap()
}

pub fn key_for(project: &CreateProjectResponse, role: Role) -> String {
    project
        .api_keys
        .iter()
        .find(|k| k.role == role)
        .map(|k| k.key.clone())
        .expect("No key for role")
}
