//! Test doubles for the network and the elevation helper.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use nvmw_backend::NvmError;
use nvmw_platform::{ElevationError, Elevator, HostProcessor};
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::session::Session;
use crate::transfer::Transfer;

/// Serves canned bodies by URL; everything else is a 404.
#[derive(Default)]
pub(crate) struct MockTransfer {
    bodies: HashMap<String, Vec<u8>>,
    requests: Mutex<Vec<String>>,
    interrupt: Option<String>,
}

impl MockTransfer {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_text(self, url: &str, body: &str) -> Self {
        self.with_bytes(url, body.as_bytes().to_vec())
    }

    pub(crate) fn with_bytes(mut self, url: &str, body: Vec<u8>) -> Self {
        self.bodies.insert(url.to_string(), body);
        self
    }

    /// Downloading `url` writes half its body, then cancels the token, as
    /// if Ctrl-C arrived mid-transfer.
    pub(crate) fn interrupting(mut self, url: &str) -> Self {
        self.interrupt = Some(url.to_string());
        self
    }

    pub(crate) fn request_count(&self, url: &str) -> usize {
        self.requests
            .lock()
            .expect("request log should not be poisoned")
            .iter()
            .filter(|requested| requested.as_str() == url)
            .count()
    }

    fn record(&self, url: &str) {
        self.requests
            .lock()
            .expect("request log should not be poisoned")
            .push(url.to_string());
    }

    fn body(&self, url: &str) -> Result<&Vec<u8>, NvmError> {
        self.bodies.get(url).ok_or_else(|| NvmError::HttpStatus {
            url: url.to_string(),
            status: 404,
        })
    }
}

#[async_trait]
impl Transfer for MockTransfer {
    async fn get(&self, url: &str) -> Result<Vec<u8>, NvmError> {
        self.record(url);
        self.body(url).cloned()
    }

    async fn head(&self, url: &str) -> Result<bool, NvmError> {
        self.record(url);
        Ok(self.bodies.contains_key(url))
    }

    async fn download(
        &self,
        url: &str,
        dest: &Path,
        cancel: &CancellationToken,
    ) -> Result<u64, NvmError> {
        self.record(url);
        if cancel.is_cancelled() {
            return Err(NvmError::Cancelled);
        }
        let body = self.body(url)?;
        if self.interrupt.as_deref() == Some(url) {
            std::fs::write(dest, &body[..body.len() / 2])
                .map_err(|error| NvmError::io_with_path("write download", dest, &error))?;
            cancel.cancel();
            return Err(NvmError::Cancelled);
        }
        std::fs::write(dest, body).map_err(|error| NvmError::io_with_path("write download", dest, &error))?;
        Ok(body.len() as u64)
    }
}

pub(crate) fn symlink_dir(target: &Path, link: &Path) -> std::io::Result<()> {
    #[cfg(unix)]
    {
        std::os::unix::fs::symlink(target, link)
    }
    #[cfg(windows)]
    {
        std::os::windows::fs::symlink_dir(target, link)
    }
}

fn remove_symlink(link: &Path) -> std::io::Result<()> {
    #[cfg(unix)]
    {
        std::fs::remove_file(link)
    }
    #[cfg(windows)]
    {
        std::fs::remove_dir(link)
    }
}

/// Emulates `mklink /D` and `rmdir` with real symlinks.
#[derive(Default)]
pub(crate) struct LinkElevator {
    deny: bool,
    calls: Mutex<Vec<Vec<String>>>,
}

impl LinkElevator {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn denying() -> Self {
        Self {
            deny: true,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn calls(&self) -> Vec<Vec<String>> {
        self.calls
            .lock()
            .expect("call log should not be poisoned")
            .clone()
    }

    fn failed(command: &[String], output: &str) -> ElevationError {
        ElevationError::Failed {
            command: command.join(" "),
            code: Some(1),
            output: output.to_string(),
        }
    }
}

#[async_trait]
impl Elevator for LinkElevator {
    async fn run_elevated(&self, command: &[String]) -> Result<(), ElevationError> {
        self.calls
            .lock()
            .expect("call log should not be poisoned")
            .push(command.to_vec());
        if self.deny {
            return Err(Self::failed(command, "Access is denied."));
        }

        match command {
            [verb, link] if verb == "rmdir" => {
                let link = Path::new(link);
                match std::fs::symlink_metadata(link) {
                    Ok(meta) if meta.file_type().is_symlink() => remove_symlink(link)
                        .map_err(|error| Self::failed(command, &error.to_string())),
                    Ok(_) => Err(Self::failed(command, "The directory is not empty.")),
                    Err(_) => Err(Self::failed(
                        command,
                        "The system cannot find the file specified.",
                    )),
                }
            }
            [verb, flag, link, target] if verb == "mklink" && flag == "/D" => {
                let link = Path::new(link);
                if std::fs::symlink_metadata(link).is_ok() {
                    return Err(Self::failed(
                        command,
                        "Cannot create a file when that file already exists.",
                    ));
                }
                symlink_dir(Path::new(target), link)
                    .map_err(|error| Self::failed(command, &error.to_string()))
            }
            _ => Err(Self::failed(command, "unsupported command")),
        }
    }
}

pub(crate) fn test_config(root: &Path) -> Config {
    Config::new(
        root.join("nvm"),
        root.join("nodejs"),
        HostProcessor::from_reported("AMD64"),
    )
}

pub(crate) fn session_with(root: &Path, transfer: MockTransfer) -> (Session, Arc<MockTransfer>) {
    let (session, transfer, _) = session_full(test_config(root), transfer, LinkElevator::new());
    (session, transfer)
}

pub(crate) fn session_full(
    config: Config,
    transfer: MockTransfer,
    elevator: LinkElevator,
) -> (Session, Arc<MockTransfer>, Arc<LinkElevator>) {
    let transfer = Arc::new(transfer);
    let elevator = Arc::new(elevator);
    let session = Session::new(config, transfer.clone(), elevator.clone());
    (session, transfer, elevator)
}
