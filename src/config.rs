use std::fs;
use std::path::{Path, PathBuf};

use directories::BaseDirs;

use crate::domain::TransportMode;
use crate::error::EnaError;

pub const SETTINGS_ENV: &str = "ENA_ASPERA_INIFILE";
pub const SETTINGS_FILE: &str = "aspera_settings.ini";
pub const DEFAULT_SPEED: &str = "100M";

const SECTION: &str = "aspera";

/// Accelerated-transfer client settings read from the `[aspera]` INI section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AsperaSettings {
    pub binary: PathBuf,
    pub private_key: PathBuf,
    pub speed: String,
    pub options: String,
}

impl AsperaSettings {
    pub fn load(path: &Path) -> Result<Self, EnaError> {
        let content = fs::read_to_string(path).map_err(|err| EnaError::AsperaSettings {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
        Self::parse(&content).map_err(|message| EnaError::AsperaSettings {
            path: path.to_path_buf(),
            message,
        })
    }

    pub fn parse(content: &str) -> Result<Self, String> {
        let mut in_section = false;
        let mut seen_section = false;
        let mut binary = None;
        let mut private_key = None;
        let mut speed = None;
        let mut options = None;

        for (number, raw) in content.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }
            if let Some(name) = line.strip_prefix('[').and_then(|rest| rest.strip_suffix(']')) {
                in_section = name.trim().eq_ignore_ascii_case(SECTION);
                seen_section |= in_section;
                continue;
            }
            if !in_section {
                continue;
            }
            let Some(split) = line.find(['=', ':']) else {
                return Err(format!("line {}: expected `KEY = value`", number + 1));
            };
            let key = line[..split].trim().to_ascii_uppercase();
            let value = line[split + 1..].trim().to_string();
            match key.as_str() {
                "ASPERA_BIN" => binary = Some(PathBuf::from(value)),
                "ASPERA_PRIVATE_KEY" => private_key = Some(PathBuf::from(value)),
                "ASPERA_SPEED" => speed = Some(value),
                "ASPERA_OPTIONS" => options = Some(value),
                _ => {}
            }
        }

        if !seen_section {
            return Err(format!("no [{SECTION}] section"));
        }
        Ok(Self {
            binary: binary.ok_or("missing ASPERA_BIN")?,
            private_key: private_key.ok_or("missing ASPERA_PRIVATE_KEY")?,
            speed: speed
                .filter(|value| !value.is_empty())
                .unwrap_or_else(|| DEFAULT_SPEED.to_string()),
            options: options.unwrap_or_default(),
        })
    }

    /// Reason the client cannot be used, if any.
    pub fn validate(&self) -> Result<(), String> {
        if !self.binary.exists() {
            return Err(format!(
                "Aspera binary ({}) does not exist. Defaulting to FTP transfer",
                self.binary.display()
            ));
        }
        if !is_executable(&self.binary) {
            return Err(format!(
                "You do not have permissions to execute the aspera binary ({}). Defaulting to FTP transfer",
                self.binary.display()
            ));
        }
        if !self.private_key.exists() {
            return Err(format!(
                "Private key file ({}) does not exist. Defaulting to FTP transfer",
                self.private_key.display()
            ));
        }
        Ok(())
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    fs::metadata(path)
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// Transport chosen at startup; `reason` explains a fallback to bulk transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigOutcome {
    pub mode: TransportMode,
    pub reason: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub outcome: ConfigOutcome,
    pub aspera: Option<AsperaSettings>,
}

impl TransportConfig {
    pub fn ftp() -> Self {
        Self::fallback(None)
    }

    fn fallback(reason: Option<String>) -> Self {
        Self {
            outcome: ConfigOutcome {
                mode: TransportMode::Ftp,
                reason,
            },
            aspera: None,
        }
    }

    pub fn mode(&self) -> TransportMode {
        self.outcome.mode
    }
}

pub struct TransportLoader;

impl TransportLoader {
    /// Resolves the transport for this run. Settings are looked up from the explicit path,
    /// then `ENA_ASPERA_INIFILE`, then the user configuration directory.
    pub fn resolve(requested: bool, explicit: Option<&Path>) -> Result<TransportConfig, EnaError> {
        if !requested {
            return Ok(TransportConfig::ftp());
        }
        let from_env = std::env::var_os(SETTINGS_ENV)
            .filter(|value| !value.is_empty())
            .map(PathBuf::from);
        Self::resolve_from(explicit, from_env.as_deref(), default_settings_path().as_deref())
    }

    pub fn resolve_from(
        explicit: Option<&Path>,
        from_env: Option<&Path>,
        default: Option<&Path>,
    ) -> Result<TransportConfig, EnaError> {
        let path = match (explicit, from_env) {
            (Some(path), _) | (None, Some(path)) => path,
            (None, None) => match default.filter(|path| path.exists()) {
                Some(path) => path,
                None => {
                    return Ok(TransportConfig::fallback(Some(format!(
                        "Cannot find {SETTINGS_FILE} file, defaulting to FTP transfer"
                    ))));
                }
            },
        };
        if !path.exists() {
            return Ok(TransportConfig::fallback(Some(format!(
                "Cannot find {} file, defaulting to FTP transfer",
                path.display()
            ))));
        }

        let settings = AsperaSettings::load(path)?;
        if let Err(reason) = settings.validate() {
            return Ok(TransportConfig::fallback(Some(reason)));
        }
        Ok(TransportConfig {
            outcome: ConfigOutcome {
                mode: TransportMode::Aspera,
                reason: None,
            },
            aspera: Some(settings),
        })
    }
}

pub fn default_settings_path() -> Option<PathBuf> {
    BaseDirs::new().map(|dirs| {
        dirs.config_dir()
            .join("ena-browser-tools")
            .join(SETTINGS_FILE)
    })
}
