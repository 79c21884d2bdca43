use chaos_core::config::InfrastructureConfig;
use chaos_core::error::{ChaosError, DestructionError};
use chaos_core::member::Member;
use chaos_core::Infrastructure;
use tokio::process::Command;
use tracing::{debug, info};

const DEFAULT_GROUP: &str = "default";

/// Command infrastructure: lists and destroys members through shell
/// commands on the local host, e.g. a cloud provider's CLI.
///
/// `list_command` prints one member per line as `id name [group]`.
/// `destroy_command` is a template; `{id}`, `{name}` and `{group}` are
/// replaced with the shell-escaped member fields.
pub struct CommandInfrastructure {
    list_command: String,
    destroy_command: String,
}

impl CommandInfrastructure {
    pub fn new(config: &InfrastructureConfig) -> Result<Self, ChaosError> {
        let list_command = config.list_command.clone().ok_or_else(|| {
            ChaosError::Config("Command infrastructure requires 'list_command'".into())
        })?;
        let destroy_command = config.destroy_command.clone().ok_or_else(|| {
            ChaosError::Config("Command infrastructure requires 'destroy_command'".into())
        })?;
        Ok(Self {
            list_command,
            destroy_command,
        })
    }

    /// Run a command through `sh -c` and return stdout. Dropping the
    /// returned future kills the shell.
    async fn run_shell(cmd: &str) -> Result<String, ChaosError> {
        debug!("Local exec: {}", cmd);

        let output = Command::new("sh")
            .arg("-c")
            .arg(cmd)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| ChaosError::Process(format!("Failed to spawn: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ChaosError::Process(format!(
                "'{}' exited with {}: {}",
                cmd,
                output.status.code().unwrap_or(-1),
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

/// Parse `id name [group]` lines. Blank lines and `#` comments are skipped.
pub fn parse_member_lines(output: &str) -> Vec<Member> {
    output
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let id = fields.next()?;
            let name = fields.next()?;
            let group = fields.next().unwrap_or(DEFAULT_GROUP);
            Some(Member::new(id, name, group))
        })
        .collect()
}

/// Fill the destroy template for one member.
pub fn render_command(template: &str, member: &Member) -> String {
    template
        .replace("{id}", &shell_escape(&member.id))
        .replace("{name}", &shell_escape(&member.name))
        .replace("{group}", &shell_escape(&member.group))
}

#[async_trait::async_trait]
impl Infrastructure for CommandInfrastructure {
    fn provider_type(&self) -> &str {
        "command"
    }

    async fn members(&self) -> Result<Vec<Member>, ChaosError> {
        let output = Self::run_shell(&self.list_command)
            .await
            .map_err(|e| ChaosError::Infrastructure(e.to_string()))?;
        Ok(parse_member_lines(&output))
    }

    async fn destroy(&self, member: &Member) -> Result<(), DestructionError> {
        let cmd = render_command(&self.destroy_command, member);
        info!("Destroying {} via '{}'", member, cmd);
        Self::run_shell(&cmd)
            .await
            .map(|_| ())
            .map_err(|e| DestructionError::failed(member, e.to_string()))
    }
}

fn shell_escape(s: &str) -> String {
    format!("'{}'", s.replace('\'', "'\\''"))
}
