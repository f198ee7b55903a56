use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use log::{debug, info, warn};
use nvmw_backend::NvmError;
use reqwest::header::LOCATION;
use reqwest::{Method, Response, redirect};
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;

use crate::config::Config;

pub const MAX_REDIRECTS: usize = 10;
const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// Network access used by every remote operation.
#[async_trait]
pub trait Transfer: Send + Sync {
    /// Fetch a whole response body.
    async fn get(&self, url: &str) -> Result<Vec<u8>, NvmError>;

    /// Whether the resource exists (success status after redirects).
    async fn head(&self, url: &str) -> Result<bool, NvmError>;

    /// Stream `url` into `dest`, returning the number of bytes written.
    ///
    /// The partial file is removed on failure or cancellation.
    async fn download(
        &self,
        url: &str,
        dest: &Path,
        cancel: &CancellationToken,
    ) -> Result<u64, NvmError>;

    async fn get_text(&self, url: &str) -> Result<String, NvmError> {
        let body = self.get(url).await?;
        Ok(String::from_utf8_lossy(&body).into_owned())
    }
}

/// [`Transfer`] over a single configured `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpTransfer {
    client: reqwest::Client,
}

impl HttpTransfer {
    /// Build the client from the proxy and TLS settings of `config`.
    ///
    /// # Errors
    /// Returns an error when the proxy address is invalid or the TLS backend
    /// cannot be initialized.
    pub fn new(config: &Config) -> Result<Self, NvmError> {
        let mut builder = reqwest::Client::builder()
            .redirect(redirect::Policy::none())
            .connect_timeout(CONNECT_TIMEOUT)
            .user_agent(format!("nvmw/{}", env!("CARGO_PKG_VERSION")));

        builder = match &config.proxy {
            Some(proxy) => {
                debug!("Using proxy {proxy}");
                let proxy = reqwest::Proxy::all(proxy)
                    .map_err(|error| NvmError::network_request_from("configure proxy", error))?;
                builder.proxy(proxy)
            }
            None => builder.no_proxy(),
        };

        if !config.verify_ssl {
            warn!("TLS certificate verification is disabled");
            builder = builder.danger_accept_invalid_certs(true);
        }

        let client = builder
            .build()
            .map_err(|error| NvmError::network_request_from("build HTTP client", error))?;
        Ok(Self { client })
    }

    fn redirect_target(response: &Response) -> Option<String> {
        let location = response.headers().get(LOCATION)?.to_str().ok()?;
        let target = response.url().join(location).ok()?;
        let follow = match response.status().as_u16() {
            300 => target != *response.url(),
            301 | 302 | 303 | 307 | 308 => true,
            _ => false,
        };
        follow.then(|| target.to_string())
    }

    async fn send(&self, method: Method, url: &str) -> Result<Response, NvmError> {
        let mut current = url.to_string();
        for hop in 0..=MAX_REDIRECTS {
            debug!("{method} {current}");
            let response = self
                .client
                .request(method.clone(), &current)
                .send()
                .await
                .map_err(|error| NvmError::network_request("HTTP request", format!("{current}: {error}")))?;

            match Self::redirect_target(&response) {
                Some(next) => {
                    debug!("{} redirect #{} -> {next}", response.status(), hop + 1);
                    current = next;
                }
                None => return Ok(response),
            }
        }
        Err(NvmError::TooManyRedirects {
            url: url.to_string(),
        })
    }
}

async fn remove_partial(dest: &Path) {
    if let Err(error) = tokio::fs::remove_file(dest).await
        && error.kind() != std::io::ErrorKind::NotFound
    {
        warn!("Failed to remove partial download {}: {error}", dest.display());
    }
}

async fn copy_body(
    response: Response,
    file: &mut tokio::fs::File,
    dest: &Path,
    cancel: &CancellationToken,
) -> Result<u64, NvmError> {
    let mut stream = response.bytes_stream();
    let mut written: u64 = 0;

    loop {
        let chunk = tokio::select! {
            () = cancel.cancelled() => return Err(NvmError::Cancelled),
            chunk = stream.next() => chunk,
        };
        let Some(chunk) = chunk else {
            break;
        };
        let chunk =
            chunk.map_err(|error| NvmError::network_request_from("download stream", error))?;
        file.write_all(&chunk)
            .await
            .map_err(|error| NvmError::io_with_path("write download data", dest, &error))?;
        written += chunk.len() as u64;
    }

    file.flush()
        .await
        .map_err(|error| NvmError::io_with_path("flush download file", dest, &error))?;
    Ok(written)
}

#[async_trait]
impl Transfer for HttpTransfer {
    async fn get(&self, url: &str) -> Result<Vec<u8>, NvmError> {
        let response = self.send(Method::GET, url).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(NvmError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        let body = response
            .bytes()
            .await
            .map_err(|error| NvmError::network_parse_from("read response body", error))?;
        Ok(body.to_vec())
    }

    async fn head(&self, url: &str) -> Result<bool, NvmError> {
        let response = self.send(Method::HEAD, url).await?;
        debug!("HEAD {url} -> {}", response.status());
        Ok(response.status().is_success())
    }

    async fn download(
        &self,
        url: &str,
        dest: &Path,
        cancel: &CancellationToken,
    ) -> Result<u64, NvmError> {
        let response = tokio::select! {
            () = cancel.cancelled() => {
                remove_partial(dest).await;
                return Err(NvmError::Cancelled);
            }
            response = self.send(Method::GET, url) => response?,
        };

        let status = response.status();
        if !status.is_success() {
            remove_partial(dest).await;
            return Err(NvmError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let mut file = tokio::fs::File::create(dest)
            .await
            .map_err(|error| NvmError::io_with_path("create download file", dest, &error))?;
        let result = copy_body(response, &mut file, dest, cancel).await;
        // Wait for in-flight writes so the handle is really closed before removal.
        drop(file.into_std().await);

        match result {
            Ok(written) => {
                info!("Downloaded {url} ({written} bytes)");
                Ok(written)
            }
            Err(error) => {
                remove_partial(dest).await;
                Err(error)
            }
        }
    }
}
