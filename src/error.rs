use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum EnaError {
    #[error("invalid accession: {0}")]
    InvalidAccession(String),

    #[error("record does not exist or is not available for accession {0}")]
    NotAvailable(String),

    #[error("illegal format {format} for {kind} accession {accession}; allowed: {allowed}")]
    IllegalFormat {
        accession: String,
        kind: String,
        format: String,
        allowed: String,
    },

    #[error("illegal group and format combination: {group} group does not allow {format}; allowed: {allowed}")]
    IllegalGroupFormat {
        group: String,
        format: String,
        allowed: String,
    },

    #[error("only sample and study/project accessions or NCBI tax IDs support group download: {0}")]
    NotGroupAccession(String),

    #[error("{0} is a study, sample or taxon accession; use ena-group-get for group downloads")]
    GroupAccession(String),

    #[error("{0}")]
    UnsupportedGroup(String),

    #[error("no file search is defined for {kind} accession {accession}")]
    NoFileSearch { accession: String, kind: String },

    #[error("portal request failed: {0}")]
    PortalHttp(String),

    #[error("portal returned status {status}: {message}")]
    PortalStatus { status: u16, message: String },

    #[error("failed to parse portal response: {0}")]
    PortalParse(String),

    #[error("record view request failed: {0}")]
    ViewHttp(String),

    #[error("record view returned status {status}: {message}")]
    ViewStatus { status: u16, message: String },

    #[error("no record returned for {0}")]
    EmptyRecord(String),

    #[error("failed to parse XML record: {0}")]
    Xml(String),

    #[error("transfer failed: {0}")]
    Transfer(String),

    #[error("transfer of {url} returned status {status}")]
    TransferStatus { url: String, status: u16 },

    #[error("MD5 mismatch for {path}: expected {expected}, generated {actual}")]
    ChecksumMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    #[error("required tool not found: {0}")]
    MissingTool(String),

    #[error("aspera transfer failed: {0}")]
    Aspera(String),

    #[error("cannot read aspera settings from {path}: {message}")]
    AsperaSettings { path: PathBuf, message: String },

    #[error("filesystem error: {0}")]
    Filesystem(String),
}

impl EnaError {
    /// Errors caused by the command line itself; reported before any network call.
    pub fn is_usage(&self) -> bool {
        matches!(
            self,
            EnaError::InvalidAccession(_)
                | EnaError::IllegalFormat { .. }
                | EnaError::IllegalGroupFormat { .. }
                | EnaError::NotGroupAccession(_)
                | EnaError::GroupAccession(_)
                | EnaError::UnsupportedGroup(_)
                | EnaError::NoFileSearch { .. }
        )
    }

    /// Errors the binaries report verbatim instead of the generic failure message.
    pub fn is_expected(&self) -> bool {
        self.is_usage()
            || matches!(
                self,
                EnaError::NotAvailable(_) | EnaError::AsperaSettings { .. }
            )
    }
}
