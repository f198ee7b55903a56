use log::warn;
use nvmw_backend::{ArchRequest, Architecture, NodeVersion, NvmError};
use tokio::sync::mpsc;

/// Successful end of an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Installed {
        version: NodeVersion,
        architectures: Vec<Architecture>,
    },
    AlreadyInstalled {
        version: NodeVersion,
        arch: ArchRequest,
    },
    Activated {
        version: NodeVersion,
        arch: Architecture,
    },
    AlreadyActive {
        version: NodeVersion,
        arch: Architecture,
    },
    Uninstalled {
        version: NodeVersion,
    },
    Disabled,
}

/// Everything an operation tells the user, in order.
#[derive(Debug, Clone)]
pub enum Status {
    Progress(String),
    Warning(String),
    Failed { error: NvmError, show_help: bool },
    Cancelled,
    Completed(Outcome),
}

impl Status {
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Failed { .. } | Self::Cancelled | Self::Completed(_)
        )
    }
}

/// Sending half of the status channel handed to operations.
#[derive(Debug, Clone)]
pub struct Reporter {
    tx: mpsc::Sender<Status>,
}

impl Reporter {
    #[must_use]
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Status>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }

    pub async fn progress(&self, text: impl Into<String>) {
        let _ = self.tx.send(Status::Progress(text.into())).await;
    }

    pub async fn warning(&self, text: impl Into<String>) {
        let text = text.into();
        warn!("{text}");
        let _ = self.tx.send(Status::Warning(text)).await;
    }

    /// Publish the terminal status for `result`.
    pub async fn finish(&self, result: Result<Outcome, NvmError>) {
        let status = match result {
            Ok(outcome) => Status::Completed(outcome),
            Err(NvmError::Cancelled) => Status::Cancelled,
            Err(error) => {
                let show_help = error.show_help();
                Status::Failed { error, show_help }
            }
        };
        let _ = self.tx.send(status).await;
    }
}
