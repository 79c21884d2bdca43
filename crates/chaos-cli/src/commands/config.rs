use chaos_core::Config;
use std::path::Path;

const SAMPLE_CONFIG: &str = r#"# chaos-run configuration

dry_run: true
schedule_secs: 3600
max_concurrency: 8
member_timeout_secs: 300
listen: 127.0.0.1:8080
base_url: http://127.0.0.1:8080

fate:
  default_probability: 0.2
  probabilities:
    database: 0.05
  exclude_groups:
    - bastion

infrastructure:
  type: container
  runtime: docker
  label: chaos.enabled=true
  group_label: chaos.group

# infrastructure:
#   type: ssh
#   user: ops
#   key_path: ~/.ssh/id_ed25519
#   destroy_command: sudo poweroff -f
#   hosts:
#     - name: web-0
#       host: 10.0.0.10
#       group: web
#
# infrastructure:
#   type: command
#   list_command: ./list-instances.sh
#   destroy_command: aws ec2 terminate-instances --instance-ids {id}

reporter:
  type: log
# reporter:
#   type: webhook
#   url: https://hooks.slack.com/services/...
"#;

pub async fn run(config_path: Option<&Path>, path: bool, init: bool) -> anyhow::Result<()> {
    let config_path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(Config::default_path);

    if path {
        println!("{}", config_path.display());
        return Ok(());
    }

    if init {
        if config_path.exists() {
            println!("Config already exists at: {}", config_path.display());
            println!("Remove it first if you want to reinitialize.");
            return Ok(());
        }

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&config_path, SAMPLE_CONFIG)?;
        println!("Sample config written to: {}", config_path.display());
        return Ok(());
    }

    // Default: show current config path and a summary
    println!("Config path:    {}", config_path.display());
    if config_path.exists() {
        let config = Config::load_from(&config_path)?;
        println!("Dry run:        {}", config.dry_run);
        println!("Schedule:       every {}s", config.schedule_secs);
        println!("Concurrency:    {}", config.max_concurrency);
        match &config.infrastructure {
            Some(infra) => println!("Infrastructure: {}", infra.provider_type),
            None => println!("Infrastructure: not configured"),
        }
    } else {
        println!("Status:         not found");
        println!("Run `chaos-run config --init` to create one.");
    }

    Ok(())
}
