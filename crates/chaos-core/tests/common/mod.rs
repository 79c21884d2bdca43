#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chaos_core::{
    ChaosError, DestructionError, Destroyer, FateEngine, InMemoryTaskRepository, Infrastructure,
    Member, Reporter, Task, TaskStatus, WorkerPool,
};
use parking_lot::Mutex;

pub fn members(names: &[&str]) -> Vec<Member> {
    names
        .iter()
        .map(|n| Member::new(format!("id-{n}"), *n, "web"))
        .collect()
}

fn set(names: &[&str]) -> HashSet<String> {
    names.iter().map(|n| n.to_string()).collect()
}

/// Infrastructure backed by a fixed member list that records every call.
#[derive(Default)]
pub struct FakeInfrastructure {
    members: Vec<Member>,
    failing: HashSet<String>,
    hanging: HashSet<String>,
    delay: Option<Duration>,
    list_fails: bool,
    pub list_calls: AtomicUsize,
    pub destroyed: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl FakeInfrastructure {
    pub fn new(members: Vec<Member>) -> Self {
        Self {
            members,
            ..Self::default()
        }
    }

    pub fn failing(mut self, names: &[&str]) -> Self {
        self.failing = set(names);
        self
    }

    pub fn hanging(mut self, names: &[&str]) -> Self {
        self.hanging = set(names);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn list_fails(mut self) -> Self {
        self.list_fails = true;
        self
    }

    pub fn destroy_calls(&self) -> usize {
        self.destroyed.lock().len()
    }
}

#[async_trait::async_trait]
impl Infrastructure for FakeInfrastructure {
    fn provider_type(&self) -> &str {
        "fake"
    }

    async fn members(&self) -> Result<Vec<Member>, ChaosError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.list_fails {
            return Err(ChaosError::Infrastructure("inventory unavailable".into()));
        }
        Ok(self.members.clone())
    }

    async fn destroy(&self, member: &Member) -> Result<(), DestructionError> {
        self.destroyed.lock().push(member.name.clone());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.hanging.contains(&member.name) {
            std::future::pending::<()>().await;
        }
        if self.failing.contains(&member.name) {
            return Err(DestructionError::failed(member, "already gone"));
        }
        Ok(())
    }
}

/// Kills exactly the named members; panics on the `panicking` ones.
#[derive(Default)]
pub struct FixedFate {
    doomed: HashSet<String>,
    panicking: HashSet<String>,
}

impl FixedFate {
    pub fn new(doomed: &[&str]) -> Self {
        Self {
            doomed: set(doomed),
            panicking: HashSet::new(),
        }
    }

    pub fn panicking(mut self, names: &[&str]) -> Self {
        self.panicking = set(names);
        self
    }
}

impl FateEngine for FixedFate {
    fn should_die(&self, member: &Member) -> bool {
        if self.panicking.contains(&member.name) {
            panic!("fate engine exploded on {}", member.name);
        }
        self.doomed.contains(&member.name)
    }
}

#[derive(Default)]
pub struct CapturingReporter {
    fails: bool,
    pub events: Mutex<Vec<(String, String)>>,
}

impl CapturingReporter {
    pub fn failing() -> Self {
        Self {
            fails: true,
            ..Self::default()
        }
    }

    pub fn count(&self) -> usize {
        self.events.lock().len()
    }
}

#[async_trait::async_trait]
impl Reporter for CapturingReporter {
    async fn send_event(&self, title: &str, message: &str) -> Result<(), ChaosError> {
        if self.fails {
            return Err(ChaosError::Reporter("channel down".into()));
        }
        self.events
            .lock()
            .push((title.to_string(), message.to_string()));
        Ok(())
    }
}

pub struct Harness {
    pub infrastructure: Arc<FakeInfrastructure>,
    pub reporter: Arc<CapturingReporter>,
    pub tasks: Arc<InMemoryTaskRepository>,
}

impl Harness {
    pub fn new(infrastructure: FakeInfrastructure, reporter: CapturingReporter) -> Self {
        Self {
            infrastructure: Arc::new(infrastructure),
            reporter: Arc::new(reporter),
            tasks: Arc::new(InMemoryTaskRepository::new()),
        }
    }

    pub fn destroyer(&self, fate: FixedFate, pool: WorkerPool) -> Destroyer {
        Destroyer::new(
            pool,
            Arc::new(fate),
            self.infrastructure.clone(),
            self.reporter.clone(),
            self.tasks.clone(),
        )
    }
}

pub async fn wait_until_complete(task: &Task) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while task.status() != TaskStatus::Complete {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("run did not complete");
}
