//! Drives one engine operation: relays its status stream to the terminal and
//! turns Ctrl-C into cancellation.

use std::future::Future;

use log::debug;
use nvmw_backend::NvmError;
use nvmw_core::{Installer, Outcome, Reporter, Session, Status};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::AppError;

const STATUS_CAPACITY: usize = 32;

/// Run `start` with a fresh [`Installer`] until it reports a terminal status.
///
/// # Errors
/// Returns the operation failure, or [`AppError::OperationCancelled`] after
/// an interrupt.
pub async fn drive<'a, F, Fut>(
    operation: &'static str,
    session: &'a Session,
    start: F,
) -> Result<Outcome, AppError>
where
    F: FnOnce(Installer<'a>) -> Fut,
    Fut: Future<Output = Result<Outcome, NvmError>>,
{
    let (reporter, rx) = Reporter::channel(STATUS_CAPACITY);
    let cancel = CancellationToken::new();
    let watcher = watch_interrupt(cancel.clone());

    let installer = Installer::new(session, reporter.clone(), cancel);
    let work = async move {
        let result = start(installer).await;
        reporter.finish(result).await;
    };
    let ((), terminal) = tokio::join!(work, relay(rx));
    watcher.abort();

    match terminal {
        Some(Status::Completed(outcome)) => Ok(outcome),
        Some(Status::Cancelled) => Err(AppError::OperationCancelled { operation }),
        Some(Status::Failed { error, .. }) => Err(AppError::operation(operation, error)),
        Some(Status::Progress(_) | Status::Warning(_)) | None => {
            Err(AppError::NoResult { operation })
        }
    }
}

/// Print statuses until the terminal one, which is returned.
async fn relay(mut rx: mpsc::Receiver<Status>) -> Option<Status> {
    while let Some(status) = rx.recv().await {
        match status {
            Status::Progress(text) => println!("{text}"),
            Status::Warning(text) => eprintln!("WARNING: {text}"),
            terminal => return Some(terminal),
        }
    }
    None
}

fn watch_interrupt(cancel: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            debug!("Interrupt received, cancelling");
            eprintln!("Cancelling...");
            cancel.cancel();
        }
    })
}

#[cfg(test)]
mod tests {
    use nvmw_backend::NvmError;
    use nvmw_core::{Outcome, Reporter, Status};

    use super::relay;

    #[tokio::test]
    async fn relay_stops_at_terminal_status() {
        let (reporter, rx) = Reporter::channel(8);
        reporter.progress("Downloading...").await;
        reporter.warning("no checksum").await;
        reporter.finish(Ok(Outcome::Disabled)).await;
        reporter.finish(Err(NvmError::Cancelled)).await;

        assert!(matches!(relay(rx).await, Some(Status::Completed(Outcome::Disabled))));
    }

    #[tokio::test]
    async fn closed_channel_without_result() {
        let (reporter, rx) = Reporter::channel(8);
        reporter.progress("Downloading...").await;
        drop(reporter);

        assert!(relay(rx).await.is_none());
    }
}
