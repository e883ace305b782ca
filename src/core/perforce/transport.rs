use crate::core::config::PerforceSettings;
use crate::core::error::{Result, SourceBridgeError};
use crate::core::perforce::ztag::{parse_cli_version, parse_ztag, TagRecord};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Oldest command-line client release known to work
pub const MIN_CLI_VERSION: (u32, u32) = (2015, 1);

#[derive(Debug, Clone, Default)]
pub struct P4Output {
    pub records: Vec<TagRecord>,
    /// Warnings and informational lines written to stderr
    pub messages: Vec<String>,
}

impl P4Output {
    pub fn mentions(&self, needle: &str) -> bool {
        self.messages.iter().any(|m| m.contains(needle))
    }
}

/// Executes Perforce commands. `client` selects the workspace (`-c`), `input`
/// is written to stdin for form commands such as `client -i`.
#[async_trait]
pub trait P4Transport: Send + Sync {
    async fn run(&self, client: Option<&str>, args: &[&str], input: Option<&str>)
        -> Result<P4Output>;
}

/// Runs the `p4` command-line client
pub struct CliTransport {
    binary: PathBuf,
    settings: PerforceSettings,
}

impl CliTransport {
    pub fn new(settings: PerforceSettings) -> Self {
        Self::with_binary("p4", settings)
    }

    pub fn with_binary(binary: impl Into<PathBuf>, settings: PerforceSettings) -> Self {
        Self {
            binary: binary.into(),
            settings,
        }
    }

    /// Fail early on a missing binary or an unsupported release
    pub async fn check_cli_version(&self) -> Result<(u32, u32)> {
        if self.binary.components().count() > 1 && !self.binary.exists() {
            return Err(SourceBridgeError::invalid_location(&self.binary));
        }

        let output = Command::new(&self.binary)
            .arg("-V")
            .output()
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => SourceBridgeError::invalid_location(&self.binary),
                _ => SourceBridgeError::Io(e),
            })?;

        let text = String::from_utf8_lossy(&output.stdout);
        let version = parse_cli_version(&text)
            .ok_or_else(|| SourceBridgeError::malformed_output("-V", "Rev."))?;
        if version < MIN_CLI_VERSION {
            return Err(SourceBridgeError::version_too_low(
                format!("{}.{}", version.0, version.1),
                format!("{}.{}", MIN_CLI_VERSION.0, MIN_CLI_VERSION.1),
            ));
        }
        Ok(version)
    }

    fn command(&self, client: Option<&str>, args: &[&str]) -> Command {
        let mut cmd = Command::new(&self.binary);
        if !self.settings.connection_string.is_empty() {
            cmd.args(["-p", self.settings.connection_string.as_str()]);
        }
        if !self.settings.username.is_empty() {
            cmd.args(["-u", self.settings.username.as_str()]);
        }
        if let Some(client) = client {
            cmd.args(["-c", client]);
        }
        cmd.arg("-ztag").args(args);
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.settings.timeout.max(1))
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }
}

#[async_trait]
impl P4Transport for CliTransport {
    async fn run(
        &self,
        client: Option<&str>,
        args: &[&str],
        input: Option<&str>,
    ) -> Result<P4Output> {
        log::debug!("p4 {}", args.join(" "));
        let mut child = self.command(client, args).spawn()?;

        if let Some(mut stdin) = child.stdin.take() {
            if let Some(input) = input {
                stdin.write_all(input.as_bytes()).await?;
            }
            // dropping stdin closes it so form commands can finish
        }

        let output = tokio::time::timeout(self.timeout(), child.wait_with_output())
            .await
            .map_err(|_| SourceBridgeError::PerforceTimeout {
                seconds: self.timeout().as_secs(),
            })??;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        if !output.status.success() {
            let message = stderr.trim();
            return Err(SourceBridgeError::perforce(if message.is_empty() {
                format!("p4 {} exited with {}", args.join(" "), output.status)
            } else {
                message.to_string()
            }));
        }

        Ok(P4Output {
            records: parse_ztag(&stdout),
            messages: stderr
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect(),
        })
    }
}
