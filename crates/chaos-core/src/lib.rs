pub mod api;
pub mod config;
pub mod destroyer;
pub mod error;
pub mod fate;
pub mod infrastructure;
pub mod member;
pub mod pool;
pub mod report;
pub mod reporter;
pub mod state;
pub mod task;

pub use config::Config;
pub use destroyer::{Destroyer, EventRequest};
pub use error::{ChaosError, DestructionError};
pub use fate::{FateEngine, RandomFateEngine};
pub use infrastructure::Infrastructure;
pub use member::Member;
pub use pool::WorkerPool;
pub use report::{MemberOutcome, Outcome, RunReport};
pub use reporter::{LogReporter, Reporter, WebhookReporter};
pub use state::{InMemoryStateProvider, RunState, StateProvider};
pub use task::{InMemoryTaskRepository, Task, TaskId, TaskRepository, TaskStatus, TaskUriBuilder, Trigger};
