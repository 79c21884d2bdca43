use std::time::Duration;

use thiserror::Error;

use crate::member::Member;

#[derive(Error, Debug)]
pub enum ChaosError {
    #[error("Infrastructure error: {0}")]
    Infrastructure(String),

    #[error("Reporter error: {0}")]
    Reporter(String),

    #[error("Task tracker error: {0}")]
    TaskTracker(String),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Invalid event: {0}")]
    InvalidEvent(String),

    #[error("Invalid run state: {0}")]
    InvalidState(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Process error: {0}")]
    Process(String),

    #[error("SSH error: {0}")]
    Ssh(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Failure to destroy a single member. Never aborts a run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DestructionError {
    #[error("{member}: {cause}")]
    Failed { member: Member, cause: String },

    #[error("{member}: timed out after {}s", .after.as_secs())]
    TimedOut { member: Member, after: Duration },
}

impl DestructionError {
    pub fn failed(member: &Member, cause: impl Into<String>) -> Self {
        Self::Failed {
            member: member.clone(),
            cause: cause.into(),
        }
    }

    pub fn member(&self) -> &Member {
        match self {
            Self::Failed { member, .. } | Self::TimedOut { member, .. } => member,
        }
    }

    /// Human-readable cause without the member prefix.
    pub fn cause(&self) -> String {
        match self {
            Self::Failed { cause, .. } => cause.clone(),
            Self::TimedOut { after, .. } => format!("timed out after {}s", after.as_secs()),
        }
    }
}
