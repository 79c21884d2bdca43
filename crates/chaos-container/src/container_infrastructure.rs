use chaos_core::config::{ContainerRuntime, InfrastructureConfig};
use chaos_core::error::{ChaosError, DestructionError};
use chaos_core::member::Member;
use chaos_core::Infrastructure;
use tokio::process::Command;
use tracing::{debug, info};

/// Group used when a container carries no group label.
const UNGROUPED: &str = "ungrouped";

/// Container infrastructure: members are running Docker/Podman containers,
/// optionally filtered by label. Destroying a member force-removes it.
pub struct ContainerInfrastructure {
    runtime: ContainerRuntime,
    label: Option<String>,
    group_label: Option<String>,
}

impl ContainerInfrastructure {
    pub fn new(config: &InfrastructureConfig) -> Self {
        Self {
            runtime: config.runtime.clone().unwrap_or_default(),
            label: config.label.clone(),
            group_label: config.group_label.clone(),
        }
    }

    /// Get the container runtime command ("docker" or "podman").
    fn runtime_cmd(&self) -> &str {
        match self.runtime {
            ContainerRuntime::Docker => "docker",
            ContainerRuntime::Podman => "podman",
        }
    }

    /// Arguments for `ps`, emitting `id<TAB>name<TAB>group` per container.
    fn ps_args(&self) -> Vec<String> {
        let group_field = match &self.group_label {
            Some(label) => format!("{{{{.Label \"{}\"}}}}", label),
            None => "{{.Image}}".to_string(),
        };

        let mut args = vec![
            "ps".to_string(),
            "--format".to_string(),
            format!("{{{{.ID}}}}\t{{{{.Names}}}}\t{}", group_field),
        ];
        if let Some(label) = &self.label {
            args.push("--filter".to_string());
            args.push(format!("label={}", label));
        }
        args
    }

    /// Run a container runtime command and return stdout.
    async fn run_cmd(&self, args: &[&str]) -> Result<String, ChaosError> {
        let runtime = self.runtime_cmd();
        debug!("Running: {} {}", runtime, args.join(" "));

        let output = Command::new(runtime)
            .args(args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| ChaosError::Process(format!("Failed to run {}: {}", runtime, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ChaosError::Process(format!(
                "{} {} failed: {}",
                runtime,
                args.first().unwrap_or(&""),
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

/// Parse `ps` output lines of the form `id<TAB>name<TAB>group`.
pub fn parse_ps_output(output: &str) -> Vec<Member> {
    output
        .lines()
        .filter(|l| !l.trim().is_empty())
        .filter_map(|line| {
            let mut fields = line.splitn(3, '\t');
            let id = fields.next()?.trim();
            let name = fields.next()?.trim();
            let group = fields
                .next()
                .map(str::trim)
                .filter(|g| !g.is_empty() && *g != "<no value>")
                .unwrap_or(UNGROUPED);
            if id.is_empty() || name.is_empty() {
                return None;
            }
            Some(Member::new(id, name, group))
        })
        .collect()
}

#[async_trait::async_trait]
impl Infrastructure for ContainerInfrastructure {
    fn provider_type(&self) -> &str {
        "container"
    }

    async fn members(&self) -> Result<Vec<Member>, ChaosError> {
        let args = self.ps_args();
        let args_refs: Vec<&str> = args.iter().map(|s| s.as_str()).collect();
        let output = self
            .run_cmd(&args_refs)
            .await
            .map_err(|e| ChaosError::Infrastructure(e.to_string()))?;
        Ok(parse_ps_output(&output))
    }

    async fn destroy(&self, member: &Member) -> Result<(), DestructionError> {
        info!("Removing container {} ({})", member.name, member.id);
        self.run_cmd(&["rm", "-f", &member.id])
            .await
            .map(|_| ())
            .map_err(|e| DestructionError::failed(member, e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chaos_core::config::ProviderType;

    fn config(label: Option<&str>, group_label: Option<&str>) -> InfrastructureConfig {
        InfrastructureConfig {
            provider_type: ProviderType::Container,
            runtime: Some(ContainerRuntime::Podman),
            label: label.map(String::from),
            group_label: group_label.map(String::from),
            user: None,
            port: None,
            key_path: None,
            hosts: Vec::new(),
            list_command: None,
            destroy_command: None,
        }
    }

    #[test]
    fn parses_ps_lines() {
        let output = "abc123\tweb-1\tweb\ndef456\tdb-1\t<no value>\n\n";
        let members = parse_ps_output(output);
        assert_eq!(
            members,
            vec![
                Member::new("abc123", "web-1", "web"),
                Member::new("def456", "db-1", "ungrouped"),
            ]
        );
    }

    #[test]
    fn skips_malformed_lines() {
        assert!(parse_ps_output("only-an-id").is_empty());
    }

    #[test]
    fn ps_args_filter_by_label_and_group_by_label() {
        let infra = ContainerInfrastructure::new(&config(Some("chaos=true"), Some("tier")));
        assert_eq!(infra.runtime_cmd(), "podman");
        assert_eq!(
            infra.ps_args(),
            vec![
                "ps",
                "--format",
                "{{.ID}}\t{{.Names}}\t{{.Label \"tier\"}}",
                "--filter",
                "label=chaos=true",
            ]
        );
    }

    #[test]
    fn ps_args_group_by_image_without_label() {
        let infra = ContainerInfrastructure::new(&config(None, None));
        assert_eq!(infra.ps_args(), vec!["ps", "--format", "{{.ID}}\t{{.Names}}\t{{.Image}}"]);
    }
}
