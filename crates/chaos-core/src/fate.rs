use crate::config::FateConfig;
use crate::member::Member;
use rand::Rng;
use tracing::debug;

/// Decides, per member, whether it dies this run.
pub trait FateEngine: Send + Sync {
    fn should_die(&self, member: &Member) -> bool;
}

/// Kills each member with the probability configured for its group.
pub struct RandomFateEngine {
    config: FateConfig,
}

impl RandomFateEngine {
    pub fn new(config: FateConfig) -> Self {
        Self { config }
    }

    /// Effective kill probability for a member, in [0, 1].
    pub fn probability(&self, member: &Member) -> f64 {
        if self.config.exclude_groups.contains(&member.group) {
            return 0.0;
        }
        if !self.config.include_groups.is_empty()
            && !self.config.include_groups.contains(&member.group)
        {
            return 0.0;
        }
        self.config
            .probabilities
            .get(&member.group)
            .copied()
            .unwrap_or(self.config.default_probability)
            .clamp(0.0, 1.0)
    }
}

impl FateEngine for RandomFateEngine {
    fn should_die(&self, member: &Member) -> bool {
        let probability = self.probability(member);
        let roll: f64 = rand::thread_rng().gen();
        debug!(member = %member, probability, roll, "Fate rolled");
        roll < probability
    }
}
