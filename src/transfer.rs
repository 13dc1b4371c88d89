use std::sync::LazyLock;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use regex::Regex;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use tracing::{debug, warn};

use crate::error::EnaError;
use crate::fs_util;

/// Every file transfer is attempted at most this many times.
pub const MAX_ATTEMPTS: usize = 2;

static HREF: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"href="([^"]+)""#).unwrap());

pub trait FileTransfer: Send + Sync {
    /// Fetches `url` into `dest_dir` and returns the local file path.
    fn fetch(&self, url: &str, dest_dir: &Utf8Path) -> Result<Utf8PathBuf, EnaError>;
    /// Lists the entry names of a remote directory.
    fn list(&self, url: &str) -> Result<Vec<String>, EnaError>;
}

/// Runs `attempt` until it succeeds or `max_attempts` tries have failed.
/// The closure receives the 1-based attempt number.
pub fn with_retry<T, F>(max_attempts: usize, mut attempt: F) -> Result<T, EnaError>
where
    F: FnMut(usize) -> Result<T, EnaError>,
{
    let max_attempts = max_attempts.max(1);
    let mut tries = 1;
    loop {
        match attempt(tries) {
            Ok(value) => return Ok(value),
            Err(err) if tries < max_attempts => {
                warn!(attempt = tries, error = %err, "transfer failed, retrying");
                tries += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

/// Bulk transfer of files from the archive's FTP tree through its HTTPS mirror.
#[derive(Clone)]
pub struct FtpTransfer {
    client: Client,
}

impl FtpTransfer {
    pub fn new() -> Result<Self, EnaError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("ena-browser-tools/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| EnaError::Transfer(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .connect_timeout(Duration::from_secs(60))
            .build()
            .map_err(|err| EnaError::Transfer(err.to_string()))?;
        Ok(Self { client })
    }

    /// Portal file lists omit the scheme; FTP URLs are served over HTTPS by the same hosts.
    pub fn normalize_url(url: &str) -> String {
        if let Some(rest) = url.strip_prefix("ftp://") {
            return format!("https://{rest}");
        }
        if url.starts_with("http://") || url.starts_with("https://") {
            return url.to_string();
        }
        format!("https://{url}")
    }

    fn get(&self, url: &str) -> Result<reqwest::blocking::Response, EnaError> {
        debug!(url, "GET");
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|err| EnaError::Transfer(format!("{url}: {err}")))?;
        if !response.status().is_success() {
            return Err(EnaError::TransferStatus {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }
        Ok(response)
    }
}

impl FileTransfer for FtpTransfer {
    fn fetch(&self, url: &str, dest_dir: &Utf8Path) -> Result<Utf8PathBuf, EnaError> {
        let url = Self::normalize_url(url);
        let destination = fs_util::local_file(dest_dir, &url);
        let mut response = self.get(&url)?;

        let mut temp = tempfile::Builder::new()
            .prefix(".ena-download")
            .tempfile_in(dest_dir.as_std_path())
            .map_err(|err| EnaError::Filesystem(err.to_string()))?;
        std::io::copy(&mut response, temp.as_file_mut())
            .map_err(|err| EnaError::Transfer(format!("{url}: {err}")))?;
        temp.persist(destination.as_std_path())
            .map_err(|err| EnaError::Filesystem(err.to_string()))?;
        Ok(destination)
    }

    fn list(&self, url: &str) -> Result<Vec<String>, EnaError> {
        let mut url = Self::normalize_url(url);
        if !url.ends_with('/') {
            url.push('/');
        }
        let body = self
            .get(&url)?
            .text()
            .map_err(|err| EnaError::Transfer(format!("{url}: {err}")))?;
        Ok(parse_listing(&body))
    }
}

/// Extracts entry names from an HTML directory index.
pub fn parse_listing(html: &str) -> Vec<String> {
    HREF.captures_iter(html)
        .filter_map(|caps| caps.get(1))
        .map(|href| href.as_str())
        .filter(|href| !href.starts_with('?') && !href.starts_with('/') && !href.contains("://"))
        .filter(|href| !href.starts_with(".."))
        .map(|href| href.trim_end_matches('/').to_string())
        .filter(|name| !name.is_empty())
        .collect()
}
