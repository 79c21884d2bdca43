use chaos_core::config::{HostConfig, InfrastructureConfig};
use chaos_core::error::{ChaosError, DestructionError};
use chaos_core::member::Member;
use chaos_core::Infrastructure;
use ssh2::Session;
use std::io::Read;
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;
use tracing::{debug, info};

const DEFAULT_DESTROY_COMMAND: &str = "sudo poweroff -f";
const DEFAULT_GROUP: &str = "ssh";

/// SSH infrastructure: members are statically configured hosts; destroying
/// one runs the configured command on it.
pub struct SshInfrastructure {
    user: String,
    port: u16,
    key_path: Option<String>,
    hosts: Vec<HostConfig>,
    destroy_command: String,
    timeout: Option<Duration>,
}

/// Everything a blocking worker needs to reach one host.
#[derive(Debug, Clone)]
struct SshTarget {
    host: String,
    port: u16,
    user: String,
    key_path: Option<String>,
    timeout: Option<Duration>,
}

/// How a remote command ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RemoteExit {
    Status(i32),
    /// The channel hit EOF without reporting a status, as when the host
    /// powers off under the session.
    Closed,
}

/// Decide the exit from the channel's EOF flag and its reported status.
/// A missing status only counts as `Closed` once the channel reached EOF.
fn classify_exit<E: std::fmt::Display>(
    eof: bool,
    status: Result<i32, E>,
) -> Result<RemoteExit, ChaosError> {
    match status {
        Ok(code) => Ok(RemoteExit::Status(code)),
        Err(_) if eof => Ok(RemoteExit::Closed),
        Err(e) => Err(ChaosError::Ssh(format!("No exit status: {}", e))),
    }
}

/// Map a remote exit to a destruction result.
fn check_exit(command: &str, exit: RemoteExit) -> Result<(), String> {
    match exit {
        RemoteExit::Status(0) | RemoteExit::Closed => Ok(()),
        RemoteExit::Status(code) => Err(format!("'{}' exited with {}", command, code)),
    }
}

impl SshTarget {
    fn open_tcp(&self) -> Result<TcpStream, ChaosError> {
        let connect_err = |e: std::io::Error| {
            ChaosError::Ssh(format!("TCP connect to {}:{}: {}", self.host, self.port, e))
        };

        let Some(timeout) = self.timeout else {
            return TcpStream::connect((self.host.as_str(), self.port)).map_err(connect_err);
        };

        let mut last_err = None;
        for addr in (self.host.as_str(), self.port).to_socket_addrs().map_err(connect_err)? {
            match TcpStream::connect_timeout(&addr, timeout) {
                Ok(tcp) => return Ok(tcp),
                Err(e) => last_err = Some(e),
            }
        }
        Err(match last_err {
            Some(e) => connect_err(e),
            None => ChaosError::Ssh(format!("No address for {}:{}", self.host, self.port)),
        })
    }

    /// Establish an SSH session to the host.
    fn connect(&self) -> Result<Session, ChaosError> {
        debug!("Connecting to {}@{}:{}", self.user, self.host, self.port);
        let tcp = self.open_tcp()?;

        let mut sess =
            Session::new().map_err(|e| ChaosError::Ssh(format!("Session::new: {}", e)))?;
        if let Some(timeout) = self.timeout {
            // Bounds every blocking libssh2 call; 0 would mean no limit.
            sess.set_timeout(u32::try_from(timeout.as_millis()).unwrap_or(u32::MAX).max(1));
        }
        sess.set_tcp_stream(tcp);
        sess.handshake()
            .map_err(|e| ChaosError::Ssh(format!("Handshake: {}", e)))?;

        if let Some(key_path) = &self.key_path {
            sess.userauth_pubkey_file(&self.user, None, std::path::Path::new(key_path), None)
                .map_err(|e| ChaosError::Ssh(format!("Pubkey auth: {}", e)))?;
        } else {
            sess.userauth_agent(&self.user)
                .map_err(|e| ChaosError::Ssh(format!("Agent auth: {}", e)))?;
        }

        if !sess.authenticated() {
            return Err(ChaosError::Ssh("Authentication failed".into()));
        }

        Ok(sess)
    }

    /// Execute a command and report how it ended.
    fn exec_remote(&self, sess: &Session, cmd: &str) -> Result<RemoteExit, ChaosError> {
        debug!("Remote exec on {}: {}", self.host, cmd);
        let mut channel = sess
            .channel_session()
            .map_err(|e| ChaosError::Ssh(format!("Channel: {}", e)))?;
        channel
            .exec(cmd)
            .map_err(|e| ChaosError::Ssh(format!("Exec '{}': {}", cmd, e)))?;

        let mut output = String::new();
        channel
            .read_to_string(&mut output)
            .map_err(|e| ChaosError::Ssh(format!("Read stdout: {}", e)))?;
        let mut stderr = String::new();
        channel
            .stderr()
            .read_to_string(&mut stderr)
            .map_err(|e| ChaosError::Ssh(format!("Read stderr: {}", e)))?;

        let eof = channel.eof();
        channel
            .wait_close()
            .map_err(|e| ChaosError::Ssh(format!("Close channel: {}", e)))?;
        let exit = classify_exit(eof, channel.exit_status())?;

        if exit != RemoteExit::Status(0) && !stderr.is_empty() {
            debug!("Remote command stderr: {}", stderr.trim());
        }

        Ok(exit)
    }
}

impl SshInfrastructure {
    pub fn new(config: &InfrastructureConfig) -> Result<Self, ChaosError> {
        let user = config
            .user
            .clone()
            .ok_or_else(|| ChaosError::Config("SSH infrastructure requires 'user'".into()))?;
        if config.hosts.is_empty() {
            return Err(ChaosError::Config(
                "SSH infrastructure requires at least one entry in 'hosts'".into(),
            ));
        }

        Ok(Self {
            user,
            port: config.ssh_port(),
            key_path: config.key_path.clone(),
            hosts: config.hosts.clone(),
            destroy_command: config
                .destroy_command
                .clone()
                .unwrap_or_else(|| DEFAULT_DESTROY_COMMAND.to_string()),
            timeout: None,
        })
    }

    /// Bound connecting and every blocking SSH call. The blocking worker
    /// cannot be cancelled, so this is what stops it after a deadline.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    fn member_for(host: &HostConfig) -> Member {
        Member::new(
            host.host.clone(),
            host.name.clone(),
            host.group.clone().unwrap_or_else(|| DEFAULT_GROUP.to_string()),
        )
    }

    fn target_for(&self, member: &Member) -> Option<SshTarget> {
        self.hosts
            .iter()
            .find(|h| h.host == member.id && h.name == member.name)
            .map(|h| SshTarget {
                host: h.host.clone(),
                port: h.port.unwrap_or(self.port),
                user: self.user.clone(),
                key_path: self.key_path.clone(),
                timeout: self.timeout,
            })
    }
}

#[async_trait::async_trait]
impl Infrastructure for SshInfrastructure {
    fn provider_type(&self) -> &str {
        "ssh"
    }

    async fn members(&self) -> Result<Vec<Member>, ChaosError> {
        Ok(self.hosts.iter().map(Self::member_for).collect())
    }

    async fn destroy(&self, member: &Member) -> Result<(), DestructionError> {
        let target = self
            .target_for(member)
            .ok_or_else(|| DestructionError::failed(member, "host is no longer configured"))?;
        let command = self.destroy_command.clone();

        info!("Running '{}' on {}", command, member);
        let exit = tokio::task::spawn_blocking(move || {
            let sess = target.connect()?;
            target.exec_remote(&sess, &command)
        })
        .await
        .map_err(|e| DestructionError::failed(member, format!("SSH worker failed: {}", e)))?
        .map_err(|e| DestructionError::failed(member, e.to_string()))?;

        check_exit(&self.destroy_command, exit)
            .map_err(|cause| DestructionError::failed(member, cause))
    }
}
