use chaos_core::config::Config;
use chaos_core::{Infrastructure, RandomFateEngine};

use crate::dispatch;

pub async fn run(config: &Config, json: bool) -> anyhow::Result<()> {
    let infrastructure = dispatch::create_infrastructure(config)?;
    let fate = RandomFateEngine::new(config.fate.clone());
    let mut members = infrastructure.members().await?;
    members.sort();

    if json {
        let entries: Vec<serde_json::Value> = members
            .iter()
            .map(|m| {
                serde_json::json!({
                    "id": m.id,
                    "name": m.name,
                    "group": m.group,
                    "probability": fate.probability(m),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if members.is_empty() {
        println!("No members found ({}).", infrastructure.provider_type());
        return Ok(());
    }

    println!("{:<24} {:<16} {:<24} {}", "NAME", "GROUP", "ID", "P(DIE)");
    println!("{}", "-".repeat(72));
    for m in &members {
        println!(
            "{:<24} {:<16} {:<24} {:.2}",
            m.name,
            m.group,
            m.id,
            fate.probability(m)
        );
    }

    Ok(())
}
