use crate::error::ChaosError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};

/// Whether scheduled runs are enabled. Manual runs ignore it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunState {
    Started,
    Stopped,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunState::Started => write!(f, "STARTED"),
            RunState::Stopped => write!(f, "STOPPED"),
        }
    }
}

impl FromStr for RunState {
    type Err = ChaosError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "STARTED" => Ok(RunState::Started),
            "STOPPED" => Ok(RunState::Stopped),
            other => Err(ChaosError::InvalidState(other.to_string())),
        }
    }
}

pub trait StateProvider: Send + Sync {
    fn get(&self) -> RunState;

    fn set(&self, state: RunState);
}

#[derive(Debug)]
pub struct InMemoryStateProvider {
    started: AtomicBool,
}

impl InMemoryStateProvider {
    pub fn new(initial: RunState) -> Self {
        Self {
            started: AtomicBool::new(initial == RunState::Started),
        }
    }
}

impl Default for InMemoryStateProvider {
    fn default() -> Self {
        Self::new(RunState::Started)
    }
}

impl StateProvider for InMemoryStateProvider {
    fn get(&self) -> RunState {
        if self.started.load(Ordering::SeqCst) {
            RunState::Started
        } else {
            RunState::Stopped
        }
    }

    fn set(&self, state: RunState) {
        self.started
            .store(state == RunState::Started, Ordering::SeqCst);
    }
}
