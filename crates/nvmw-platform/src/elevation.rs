use std::ffi::OsStr;
use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use log::debug;
use thiserror::Error;
use tokio::io::AsyncReadExt;
use tokio::process::Command;

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

#[derive(Debug, Error)]
pub enum ElevationError {
    #[error("failed to launch {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{command} failed ({}): {}", exit_label(.code), .output.trim())]
    Failed {
        command: String,
        code: Option<i32>,
        output: String,
    },
}

fn exit_label(code: &Option<i32>) -> String {
    code.map_or_else(|| "terminated".to_string(), |code| format!("exit code {code}"))
}

impl ElevationError {
    fn output_contains(&self, needles: &[&str]) -> bool {
        let text = match self {
            Self::Spawn { source, .. } => source.to_string(),
            Self::Failed { output, .. } => output.clone(),
        }
        .to_ascii_lowercase();
        needles.iter().any(|needle| text.contains(needle))
    }

    /// The command was refused for lack of privilege.
    #[must_use]
    pub fn is_access_denied(&self) -> bool {
        if let Self::Spawn { source, .. } = self
            && source.kind() == std::io::ErrorKind::PermissionDenied
        {
            return true;
        }
        self.output_contains(&["access is denied", "not have sufficient privilege"])
    }

    /// `mklink` refused because the link path is still occupied.
    #[must_use]
    pub fn is_already_exists(&self) -> bool {
        self.output_contains(&["already exists"])
    }
}

/// Runs commands that need administrator rights (directory symlinks).
#[async_trait]
pub trait Elevator: Send + Sync {
    /// Run one `cmd` built-in command line, such as `["mklink", "/D", link, target]`.
    async fn run_elevated(&self, command: &[String]) -> Result<(), ElevationError>;
}

/// Elevator backed by `cmd /C`, retried through the `elevate.cmd` UAC helper.
#[derive(Debug, Clone)]
pub struct CmdElevator {
    helper: Option<PathBuf>,
}

impl CmdElevator {
    #[must_use]
    pub fn new(helper: Option<PathBuf>) -> Self {
        Self { helper }
    }

    fn build(program: &OsStr, args: &[String]) -> Command {
        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(windows)]
        cmd.creation_flags(CREATE_NO_WINDOW);
        cmd
    }

    async fn run(program: &OsStr, args: &[String]) -> Result<(), ElevationError> {
        let mut cmd = Self::build(program, args);
        let description = format!("{} {}", program.to_string_lossy(), args.join(" "));
        debug!("Running {description}");

        let mut child = cmd.spawn().map_err(|source| ElevationError::Spawn {
            program: program.to_string_lossy().into_owned(),
            source,
        })?;

        let stdout_relay = child.stdout.take().map(|mut stdout| {
            tokio::spawn(async move {
                let mut console = tokio::io::stdout();
                let _ = tokio::io::copy(&mut stdout, &mut console).await;
            })
        });
        let stderr_capture = child.stderr.take().map(|mut stderr| {
            tokio::spawn(async move {
                let mut captured = String::new();
                let _ = stderr.read_to_string(&mut captured).await;
                captured
            })
        });

        let status = child.wait().await.map_err(|source| ElevationError::Spawn {
            program: program.to_string_lossy().into_owned(),
            source,
        })?;

        if let Some(relay) = stdout_relay {
            let _ = relay.await;
        }
        let output = match stderr_capture {
            Some(capture) => capture.await.unwrap_or_default(),
            None => String::new(),
        };

        if status.success() {
            Ok(())
        } else {
            Err(ElevationError::Failed {
                command: description,
                code: status.code(),
                output,
            })
        }
    }
}

#[async_trait]
impl Elevator for CmdElevator {
    async fn run_elevated(&self, command: &[String]) -> Result<(), ElevationError> {
        let direct: Vec<String> = std::iter::once("/C".to_string())
            .chain(command.iter().cloned())
            .collect();
        let first = match Self::run(OsStr::new("cmd"), &direct).await {
            Ok(()) => return Ok(()),
            Err(error) => error,
        };

        let Some(helper) = self.helper.as_ref().filter(|helper| helper.is_file()) else {
            return Err(first);
        };

        debug!("Direct command failed ({first}), retrying through {}", helper.display());
        let elevated: Vec<String> = ["cmd".to_string(), "/C".to_string()]
            .into_iter()
            .chain(command.iter().cloned())
            .collect();
        Self::run(helper.as_os_str(), &elevated).await
    }
}
