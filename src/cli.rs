use std::path::PathBuf;
use std::process::ExitCode;

use clap::Args;
use tracing::error;
use tracing_subscriber::EnvFilter;

use crate::app::{App, ProgressEvent, ProgressSink};
use crate::aspera::AsperaTransfer;
use crate::config::{TransportConfig, TransportLoader};
use crate::error::EnaError;
use crate::portal::EnaHttpClient;
use crate::transfer::FtpTransfer;

pub type HttpApp = App<EnaHttpClient, FtpTransfer, AsperaTransfer>;

#[derive(Args, Debug, Clone)]
pub struct TransportArgs {
    /// Use the aspera command line client instead of FTP, optionally with a settings file
    /// given as `-a=PATH`
    #[arg(
        short = 'a',
        long = "aspera",
        value_name = "SETTINGS",
        num_args = 0..=1,
        require_equals = true
    )]
    aspera: Option<Option<PathBuf>>,

    /// Aspera settings file; implies --aspera
    #[arg(long = "aspera-settings", value_name = "PATH")]
    aspera_settings: Option<PathBuf>,
}

impl TransportArgs {
    pub fn requested(&self) -> bool {
        self.aspera.is_some() || self.aspera_settings.is_some()
    }

    pub fn settings_path(&self) -> Option<&std::path::Path> {
        self.aspera_settings
            .as_deref()
            .or_else(|| self.aspera.as_ref().and_then(|path| path.as_deref()))
    }

    /// Resolves the transport and reports a fallback to FTP through `sink`.
    pub fn resolve(&self, sink: &dyn ProgressSink) -> Result<TransportConfig, EnaError> {
        let config = TransportLoader::resolve(self.requested(), self.settings_path())?;
        if let Some(reason) = &config.outcome.reason {
            sink.event(ProgressEvent::info(reason.clone()));
        }
        Ok(config)
    }
}

pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

pub fn build_app(transport: &TransportConfig) -> Result<HttpApp, EnaError> {
    let client = EnaHttpClient::new()?;
    let ftp = FtpTransfer::new()?;
    let aspera = transport.aspera.clone().map(AsperaTransfer::new);
    Ok(App::new(client, ftp, aspera))
}

/// Expected failures are shown as diagnostics; anything else gets the generic apology.
pub fn exit_with(report: miette::Report) -> ExitCode {
    match report.downcast_ref::<EnaError>() {
        Some(err) if err.is_expected() => eprintln!("{report:?}"),
        _ => {
            error!("{report}");
            eprintln!("ERROR: Something unexpected went wrong please try again.");
            eprintln!("If problem persists, please contact datasubs@ebi.ac.uk for assistance.");
        }
    }
    ExitCode::from(1)
}
