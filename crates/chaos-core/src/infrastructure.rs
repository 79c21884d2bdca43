use crate::error::{ChaosError, DestructionError};
use crate::member::Member;

/// Infrastructure provider trait. Every backend implements this.
#[async_trait::async_trait]
pub trait Infrastructure: Send + Sync {
    /// Provider type string ("ssh", "container", "command").
    fn provider_type(&self) -> &str;

    /// Snapshot of the current members.
    async fn members(&self) -> Result<Vec<Member>, ChaosError>;

    /// Destroy one member. A member that is already gone is a
    /// `DestructionError`, not a panic.
    async fn destroy(&self, member: &Member) -> Result<(), DestructionError>;
}
