use crate::error::DestructionError;
use crate::member::Member;
use crate::task::TaskId;
use std::fmt;
use tracing::error;
use uuid::Uuid;

const SPACE: char = '\u{a0}';
const BULLET: char = '\u{2022}';

/// What happened to one member during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Spared,
    Destroyed,
    /// Selected under dry run; counted as destroyed.
    DryRun,
    Failed(DestructionError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberOutcome {
    pub member: Member,
    pub outcome: Outcome,
}

impl MemberOutcome {
    pub fn new(member: Member, outcome: Outcome) -> Self {
        Self { member, outcome }
    }
}

/// Aggregated result of one run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: Uuid,
    pub task_id: TaskId,
    /// Sorted by member name.
    pub destroyed: Vec<Member>,
    pub failed: Vec<DestructionError>,
    pub spared: usize,
    pub wait_failures: usize,
}

impl RunReport {
    pub fn title(&self) -> String {
        title(&self.run_id)
    }

    pub fn message(&self) -> String {
        message(&self.destroyed)
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "run_id": self.run_id.to_string(),
            "task_id": self.task_id.0,
            "destroyed": self.destroyed,
            "failed": self.failed.iter().map(|e| serde_json::json!({
                "member": e.member(),
                "cause": e.cause(),
            })).collect::<Vec<_>>(),
            "spared": self.spared,
            "wait_failures": self.wait_failures,
        })
    }
}

/// Fold per-member results collected at the barrier into a report.
/// `Err` entries are evaluations that could not be awaited; they are logged
/// and counted but never abort the fold.
pub fn fold_outcomes<E: fmt::Display>(
    run_id: Uuid,
    task_id: TaskId,
    results: impl IntoIterator<Item = Result<MemberOutcome, E>>,
) -> RunReport {
    let mut report = RunReport {
        run_id,
        task_id,
        destroyed: Vec::new(),
        failed: Vec::new(),
        spared: 0,
        wait_failures: 0,
    };

    for result in results {
        match result {
            Ok(MemberOutcome { member, outcome }) => match outcome {
                Outcome::Spared => report.spared += 1,
                Outcome::Destroyed | Outcome::DryRun => report.destroyed.push(member),
                Outcome::Failed(e) => report.failed.push(e),
            },
            Err(e) => {
                error!(run_id = %run_id, "{}", e);
                report.wait_failures += 1;
            }
        }
    }

    report.destroyed.sort();
    report
}

pub fn title(run_id: &Uuid) -> String {
    format!("Chaos Run Destruction ({})", run_id)
}

/// Header with the pluralized count, then one bullet per member by name.
pub fn message(members: &[Member]) -> String {
    let mut sorted: Vec<&Member> = members.iter().collect();
    sorted.sort();

    let noun = if sorted.len() == 1 { "VM" } else { "VMs" };
    let bullets: Vec<String> = sorted
        .iter()
        .map(|m| format!("{SPACE}{SPACE}{BULLET}{SPACE}{}", m.name))
        .collect();

    format!("\n{} {} destroyed:\n{}", sorted.len(), noun, bullets.join("\n"))
}
