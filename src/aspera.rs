use std::process::Command;

use camino::{Utf8Path, Utf8PathBuf};
use tracing::debug;

use crate::config::AsperaSettings;
use crate::error::EnaError;
use crate::fs_util;
use crate::transfer::FileTransfer;

const PORT_ARG: &str = "-P33001";
const REMOTE_USER: &str = "era-fasp";

/// Transfers files with the external `ascp` client.
#[derive(Debug, Clone)]
pub struct AsperaTransfer {
    settings: AsperaSettings,
}

impl AsperaTransfer {
    pub fn new(settings: AsperaSettings) -> Self {
        Self { settings }
    }

    pub fn command_args(&self, url: &str, dest_dir: &Utf8Path) -> Vec<String> {
        let mut args = vec![
            "-QT".to_string(),
            "-L".to_string(),
            dest_dir.join("logs").to_string(),
            "-l".to_string(),
            self.settings.speed.clone(),
            PORT_ARG.to_string(),
        ];
        args.extend(self.settings.options.split_whitespace().map(str::to_string));
        args.push("-i".to_string());
        args.push(self.settings.private_key.to_string_lossy().to_string());
        args.push(format!("{REMOTE_USER}@{url}"));
        args.push(dest_dir.to_string());
        args
    }

    fn check_tools(&self) -> Result<(), EnaError> {
        if !self.settings.binary.exists() {
            return Err(EnaError::MissingTool(
                self.settings.binary.display().to_string(),
            ));
        }
        if !self.settings.private_key.exists() {
            return Err(EnaError::Aspera(format!(
                "private key {} not found",
                self.settings.private_key.display()
            )));
        }
        Ok(())
    }
}

impl FileTransfer for AsperaTransfer {
    fn fetch(&self, url: &str, dest_dir: &Utf8Path) -> Result<Utf8PathBuf, EnaError> {
        self.check_tools()?;
        fs_util::ensure_dir(&dest_dir.join("logs"))?;

        let args = self.command_args(url, dest_dir);
        debug!(binary = %self.settings.binary.display(), ?args, "ascp");
        let output = Command::new(&self.settings.binary)
            .args(&args)
            .output()
            .map_err(|err| EnaError::Aspera(err.to_string()))?;
        if output.status.success() {
            return Ok(fs_util::local_file(dest_dir, url));
        }
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let message = if stderr.is_empty() {
            format!("ascp exited with {} for {url}", output.status)
        } else {
            stderr
        };
        Err(EnaError::Aspera(message))
    }

    fn list(&self, url: &str) -> Result<Vec<String>, EnaError> {
        Err(EnaError::Aspera(format!(
            "directory listing is not available over aspera: {url}"
        )))
    }
}
