use std::path::Path;
use std::sync::Arc;

use chaos_core::config::{Config, ProviderType, ReporterConfig, ReporterType};
use chaos_core::error::ChaosError;
use chaos_core::{
    Destroyer, InMemoryTaskRepository, Infrastructure, LogReporter, RandomFateEngine, Reporter,
    WebhookReporter, WorkerPool,
};

/// Load config from an explicit path, or the default location.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let config = match path {
        Some(path) => Config::load_from(path)?,
        None => Config::load_default()?,
    };
    Ok(config)
}

/// Create the infrastructure provider named by the config.
pub fn create_infrastructure(config: &Config) -> Result<Arc<dyn Infrastructure>, ChaosError> {
    let infra = config.infrastructure.as_ref().ok_or_else(|| {
        ChaosError::Config("No 'infrastructure' configured; run `chaos-run config --init`".into())
    })?;

    match infra.provider_type {
        ProviderType::Ssh => Ok(Arc::new(
            chaos_ssh::SshInfrastructure::new(infra)?.with_timeout(config.member_timeout()),
        )),
        ProviderType::Container => Ok(Arc::new(
            chaos_container::ContainerInfrastructure::new(infra),
        )),
        ProviderType::Command => Ok(Arc::new(chaos_local::CommandInfrastructure::new(infra)?)),
    }
}

pub fn create_reporter(config: &ReporterConfig) -> Result<Arc<dyn Reporter>, ChaosError> {
    match config.reporter_type {
        ReporterType::Log => Ok(Arc::new(LogReporter)),
        ReporterType::Webhook => {
            let url = config
                .url
                .as_deref()
                .ok_or_else(|| ChaosError::Config("Webhook reporter requires 'url'".into()))?;
            Ok(Arc::new(WebhookReporter::new(url)))
        }
    }
}

/// Wire a destroyer from config. The task repository and worker pool are
/// owned here and shared by every run of the returned destroyer.
pub fn build_destroyer(config: &Config, dry_run: bool) -> Result<Destroyer, ChaosError> {
    Ok(Destroyer::new(
        WorkerPool::new(config.max_concurrency),
        Arc::new(RandomFateEngine::new(config.fate.clone())),
        create_infrastructure(config)?,
        create_reporter(&config.reporter)?,
        Arc::new(InMemoryTaskRepository::new()),
    )
    .with_dry_run(dry_run)
    .with_member_timeout(config.member_timeout()))
}
