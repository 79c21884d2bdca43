use chaos_core::config::Config;
use chaos_core::Trigger;

use crate::dispatch;

/// Run one destruction pass in the foreground and print its report.
pub async fn run(config: &Config, dry_run: bool, json: bool) -> anyhow::Result<()> {
    let destroyer = dispatch::build_destroyer(config, config.dry_run || dry_run)?;
    let task = destroyer.tasks().create(Trigger::Manual)?;
    let report = destroyer.run(task).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report.to_json())?);
        return Ok(());
    }

    println!("{}", report.title());
    println!("{}", report.message().trim_start());
    if !report.failed.is_empty() {
        println!("Failed:");
        for failure in &report.failed {
            println!("  - {}", failure);
        }
    }
    if report.wait_failures > 0 {
        println!("Evaluations lost: {}", report.wait_failures);
    }

    Ok(())
}
