//! The autonomous implementer.
//!
//! Each tick visits every project that has an AI credential and runs two
//! stages in order:
//!
//! 1. every `draft` item gets a generated plan and is submitted for review
//! 2. every `approved` item is started, implemented and completed with a
//!    decision log
//!
//! Items the worker started but failed to finish stay `in_progress` and are
//! picked up again on the next tick.

pub mod prompts;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::ai::{ChatMessage, TextGenerator};
use crate::config::WorkerSchedule;
use crate::db::Database;
use crate::models::{CreateDecisionLogInput, Item, ItemStatus, Project, Role};
use crate::workflow::WorkflowExecutor;

/// Assignee recorded on items the worker has started.
pub const AGENT_ASSIGNEE: &str = "agent";

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Project not found")]
    ProjectNotFound,

    #[error("No AI credential configured for project")]
    NoCredential,

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

/// What one tick did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickReport {
    pub projects_processed: usize,
    pub projects_skipped: usize,
    /// Drafts moved to review.
    pub planned: usize,
    /// Items moved to done.
    pub completed: usize,
    /// Items left where they were because a step failed.
    pub failed: usize,
}

impl TickReport {
    fn absorb(&mut self, other: TickReport) {
        self.projects_processed += other.projects_processed;
        self.projects_skipped += other.projects_skipped;
        self.planned += other.planned;
        self.completed += other.completed;
        self.failed += other.failed;
    }

    fn record_completion(&mut self, item: &Item, outcome: anyhow::Result<()>) {
        match outcome {
            Ok(()) => self.completed += 1,
            Err(e) => {
                tracing::warn!(item = %item.id, "Failed to implement \"{}\": {}", item.title, e);
                self.failed += 1;
            }
        }
    }
}

#[derive(Clone)]
pub struct AgentWorker {
    db: Database,
    executor: WorkflowExecutor,
    generator: Arc<dyn TextGenerator>,
}

impl AgentWorker {
    pub fn new(
        db: Database,
        executor: WorkflowExecutor,
        generator: Arc<dyn TextGenerator>,
    ) -> Self {
        Self {
            db,
            executor,
            generator,
        }
    }

    fn credential_for(project: &Project) -> Option<String> {
        project
            .anthropic_api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
    }

    /// Run one pass over every project. Failures are logged and counted,
    /// never returned.
    pub async fn tick(&self) -> TickReport {
        let mut report = TickReport::default();

        let projects = match self.db.get_all_projects() {
            Ok(projects) => projects,
            Err(e) => {
                tracing::error!("Agent worker could not list projects: {}", e);
                return report;
            }
        };

        for project in projects {
            let Some(credential) = Self::credential_for(&project) else {
                tracing::trace!(project = %project.id, "No AI credential, skipping");
                report.projects_skipped += 1;
                continue;
            };
            report.absorb(self.process_project(&project, &credential).await);
        }

        if report.planned + report.completed + report.failed > 0 {
            tracing::info!(
                planned = report.planned,
                completed = report.completed,
                failed = report.failed,
                "Agent tick finished"
            );
        }
        report
    }

    /// Run one pass over a single project.
    pub async fn tick_project(&self, project_id: Uuid) -> Result<TickReport, AgentError> {
        let project = self
            .db
            .get_project(project_id)?
            .ok_or(AgentError::ProjectNotFound)?;
        let credential = Self::credential_for(&project).ok_or(AgentError::NoCredential)?;
        Ok(self.process_project(&project, &credential).await)
    }

    async fn process_project(&self, project: &Project, credential: &str) -> TickReport {
        let mut report = TickReport {
            projects_processed: 1,
            ..Default::default()
        };

        match self
            .db
            .list_items_by_project_and_status(project.id, ItemStatus::Draft)
        {
            Ok(drafts) => {
                for item in drafts {
                    match self.plan(&item, credential).await {
                        Ok(()) => report.planned += 1,
                        Err(e) => {
                            tracing::warn!(item = %item.id, "Failed to plan \"{}\": {}", item.title, e);
                            report.failed += 1;
                        }
                    }
                }
            }
            Err(e) => {
                tracing::error!(project = %project.id, "Could not list drafts: {}", e);
                report.failed += 1;
            }
        }

        let work = self
            .db
            .list_items_by_project_and_status(project.id, ItemStatus::Approved)
            .and_then(|approved| {
                let resumed = self
                    .db
                    .list_items_by_project_and_status(project.id, ItemStatus::InProgress)?
                    .into_iter()
                    .filter(|item| item.assigned_to.as_deref() == Some(AGENT_ASSIGNEE));
                Ok((approved, resumed.collect::<Vec<_>>()))
            });

        let (approved, resumed) = match work {
            Ok(work) => work,
            Err(e) => {
                tracing::error!(project = %project.id, "Could not list approved items: {}", e);
                report.failed += 1;
                return report;
            }
        };

        for item in approved {
            let outcome = match self.start(&item).await {
                Ok(started) => self.implement(&started, credential).await,
                Err(e) => Err(e),
            };
            report.record_completion(&item, outcome);
        }

        for item in resumed {
            tracing::debug!(item = %item.id, "Resuming \"{}\"", item.title);
            let outcome = self.implement(&item, credential).await;
            report.record_completion(&item, outcome);
        }

        report
    }

    async fn plan(&self, item: &Item, credential: &str) -> anyhow::Result<()> {
        tracing::info!(item = %item.id, "Planning draft item \"{}\"", item.title);

        let deps = self
            .db
            .get_item_context(item.id)?
            .map(|ctx| ctx.dependencies)
            .unwrap_or_default();
        let request = prompts::plan_request(item, &deps);

        let plan = self
            .generator
            .complete(
                credential,
                prompts::PLANNER_SYSTEM,
                &[ChatMessage::user(request)],
            )
            .await?;

        self.executor
            .execute(
                item,
                ItemStatus::PendingReview,
                Role::Implementer,
                Some(prompts::plan_comment(&plan)),
            )
            .await?;
        Ok(())
    }

    async fn start(&self, item: &Item) -> anyhow::Result<Item> {
        tracing::info!(item = %item.id, "Starting work on \"{}\"", item.title);
        let started = self
            .executor
            .execute_assigned(item, ItemStatus::InProgress, Role::Implementer, AGENT_ASSIGNEE)
            .await?;
        Ok(started)
    }

    async fn implement(&self, item: &Item, credential: &str) -> anyhow::Result<()> {
        let ctx = self
            .db
            .get_item_context(item.id)?
            .ok_or_else(|| anyhow::anyhow!("Item not found"))?;

        let request = prompts::implementation_request(
            item,
            prompts::latest_plan(&ctx.comments),
            &ctx.dependencies,
        );

        let narrative = self
            .generator
            .complete(
                credential,
                prompts::IMPLEMENTER_SYSTEM,
                &[ChatMessage::user(request)],
            )
            .await?;

        let decision = CreateDecisionLogInput {
            context: prompts::decision_context(item),
            decision: prompts::excerpt(&narrative, prompts::DECISION_EXCERPT_CHARS),
            alternatives: None,
            consequences: None,
        };

        self.executor
            .execute_with_decision(
                item,
                ItemStatus::Done,
                Role::Implementer,
                Some(prompts::implementation_comment(&narrative)),
                decision,
            )
            .await?;
        Ok(())
    }

    /// Run [`tick`](Self::tick) on `schedule` until the returned handle is
    /// stopped.
    pub fn spawn(self, schedule: WorkerSchedule) -> WorkerHandle {
        let (shutdown, mut stopped) = watch::channel(false);

        let task = tokio::spawn(async move {
            tracing::info!(
                "Agent worker started (polling every {}s)",
                schedule.poll_interval.as_secs()
            );

            tokio::select! {
                _ = tokio::time::sleep(schedule.start_delay) => {}
                _ = stopped.changed() => return,
            }

            let mut interval = tokio::time::interval(schedule.poll_interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        self.tick().await;
                    }
                    _ = stopped.changed() => break,
                }
            }
        });

        WorkerHandle { shutdown, task }
    }
}

/// A running worker loop.
pub struct WorkerHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl WorkerHandle {
    /// Signal the loop to stop and wait for it. A tick already in progress
    /// is allowed to finish.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            tracing::error!("Agent worker task failed: {}", e);
        }
        tracing::info!("Agent worker stopped");
    }
}
