//! Run orchestration: one destruction pass per trigger.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::{ChaosError, DestructionError};
use crate::fate::FateEngine;
use crate::infrastructure::Infrastructure;
use crate::member::Member;
use crate::pool::WorkerPool;
use crate::report::{fold_outcomes, MemberOutcome, Outcome, RunReport};
use crate::reporter::Reporter;
use crate::state::{RunState, StateProvider};
use crate::task::{Task, TaskRepository, Trigger};

/// The only event a run request may name.
pub const DESTROY_EVENT: &str = "destroy";

/// Payload of a run request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventRequest {
    #[serde(default)]
    pub event: Option<String>,
}

impl EventRequest {
    pub fn new(event: impl Into<String>) -> Self {
        Self {
            event: Some(event.into()),
        }
    }
}

pub struct Destroyer {
    dry_run: bool,
    member_timeout: Option<Duration>,
    pool: WorkerPool,
    fate_engine: Arc<dyn FateEngine>,
    infrastructure: Arc<dyn Infrastructure>,
    reporter: Arc<dyn Reporter>,
    tasks: Arc<dyn TaskRepository>,
}

impl Destroyer {
    pub fn new(
        pool: WorkerPool,
        fate_engine: Arc<dyn FateEngine>,
        infrastructure: Arc<dyn Infrastructure>,
        reporter: Arc<dyn Reporter>,
        tasks: Arc<dyn TaskRepository>,
    ) -> Self {
        Self {
            dry_run: false,
            member_timeout: None,
            pool,
            fate_engine,
            infrastructure,
            reporter,
            tasks,
        }
    }

    /// Select and report members without calling the destructive operation.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Deadline for each destructive call; `None` waits indefinitely.
    pub fn with_member_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.member_timeout = timeout;
        self
    }

    pub fn dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn tasks(&self) -> &Arc<dyn TaskRepository> {
        &self.tasks
    }

    /// Timer entry point. Does nothing while runs are stopped; otherwise
    /// runs to completion before returning.
    pub async fn scheduled_run(
        &self,
        state: &dyn StateProvider,
    ) -> Result<Option<RunReport>, ChaosError> {
        if state.get() == RunState::Stopped {
            info!("Chaos run stopped, skipping scheduled run");
            return Ok(None);
        }

        let task = self.tasks.create(Trigger::Scheduled)?;
        self.run(task).await.map(Some)
    }

    /// Request entry point. Validates the payload, creates a manual task and
    /// runs it in the background. Run state is not consulted here.
    pub fn request_run(self: &Arc<Self>, request: &EventRequest) -> Result<Task, ChaosError> {
        let event = request
            .event
            .as_deref()
            .ok_or_else(|| ChaosError::InvalidEvent("missing 'event'".into()))?;

        if !event.eq_ignore_ascii_case(DESTROY_EVENT) {
            return Err(ChaosError::InvalidEvent(event.to_string()));
        }

        let task = self.tasks.create(Trigger::Manual)?;
        let destroyer = Arc::clone(self);
        let background = task.clone();
        tokio::spawn(async move {
            let task_id = background.id();
            if let Err(e) = destroyer.run(background).await {
                error!(task_id = %task_id, "Manual run failed: {}", e);
            }
        });

        Ok(task)
    }

    /// One destruction pass. Per-member failures are folded into the report;
    /// failures listing members, reporting or tracking the task are returned.
    pub async fn run(&self, task: Task) -> Result<RunReport, ChaosError> {
        let run_id = Uuid::new_v4();
        info!(run_id = %run_id, task_id = %task.id(), trigger = %task.trigger(), "Beginning run...");

        let members = self.infrastructure.members().await?;
        debug!(run_id = %run_id, count = members.len(), "Fetched members");

        let handles: Vec<_> = members
            .into_iter()
            .map(|member| {
                let pool = self.pool.clone();
                let fate_engine = Arc::clone(&self.fate_engine);
                let infrastructure = Arc::clone(&self.infrastructure);
                let dry_run = self.dry_run;
                let timeout = self.member_timeout;

                tokio::spawn(async move {
                    let _permit = pool.acquire().await?;
                    Ok::<_, ChaosError>(
                        evaluate_member(
                            run_id,
                            member,
                            fate_engine.as_ref(),
                            infrastructure.as_ref(),
                            dry_run,
                            timeout,
                        )
                        .await,
                    )
                })
            })
            .collect();

        let results = join_all(handles).await.into_iter().map(|joined| {
            joined
                .map_err(|e| ChaosError::Process(format!("member evaluation failed: {}", e)))
                .and_then(|outcome| outcome)
        });
        let report = fold_outcomes(run_id, task.id(), results);

        info!(
            run_id = %run_id,
            destroyed = report.destroyed.len(),
            failed = report.failed.len(),
            spared = report.spared,
            "Run finished"
        );

        self.reporter
            .send_event(&report.title(), &report.message())
            .await?;

        task.stop();
        Ok(report)
    }
}

async fn evaluate_member(
    run_id: Uuid,
    member: Member,
    fate_engine: &dyn FateEngine,
    infrastructure: &dyn Infrastructure,
    dry_run: bool,
    timeout: Option<Duration>,
) -> MemberOutcome {
    if !fate_engine.should_die(&member) {
        return MemberOutcome::new(member, Outcome::Spared);
    }

    debug!(run_id = %run_id, member = %member, "Destroying");

    if dry_run {
        info!(run_id = %run_id, member = %member, "Destroyed (Dry Run)");
        return MemberOutcome::new(member, Outcome::DryRun);
    }

    let result = match timeout {
        Some(after) => tokio::time::timeout(after, infrastructure.destroy(&member))
            .await
            .unwrap_or_else(|_| {
                Err(DestructionError::TimedOut {
                    member: member.clone(),
                    after,
                })
            }),
        None => infrastructure.destroy(&member).await,
    };

    match result {
        Ok(()) => {
            info!(run_id = %run_id, member = %member, "Destroyed");
            MemberOutcome::new(member, Outcome::Destroyed)
        }
        Err(e) => {
            warn!(run_id = %run_id, member = %member, "Destroy failed: {}", e.cause());
            MemberOutcome::new(member, Outcome::Failed(e))
        }
    }
}
