use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

use crate::accession::RecordKind;
use crate::domain::{Channel, Format, TransportMode};

/// One row of a portal search result: field name to value. List-valued fields
/// arrive as `;`-joined strings.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct PortalRow(BTreeMap<String, Value>);

impl PortalRow {
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        Self(
            pairs
                .into_iter()
                .map(|(key, value)| (key.to_string(), Value::String(value.to_string())))
                .collect(),
        )
    }

    pub fn get(&self, field: &str) -> String {
        match self.0.get(field) {
            Some(Value::String(value)) => value.trim().to_string(),
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        }
    }
}

/// Splits a `;`-joined list. Empty entries are kept so positions line up
/// with the parallel checksum list.
pub fn split_list(value: &str) -> Vec<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }
    trimmed.split(';').map(|item| item.trim().to_string()).collect()
}

/// Parallel URL and checksum lists of one channel; always the same length.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileChannel {
    pub urls: Vec<String>,
    pub checksums: Vec<String>,
}

impl FileChannel {
    pub fn new(urls: Vec<String>, mut checksums: Vec<String>) -> Self {
        checksums.resize(urls.len(), String::new());
        Self { urls, checksums }
    }

    fn from_row(row: &PortalRow, channel: Channel, mode: TransportMode) -> Self {
        let urls = split_list(&row.get(channel.url_field(mode)));
        let checksums = channel
            .checksum_field()
            .map(|field| split_list(&row.get(field)))
            .unwrap_or_default();
        Self::new(urls, checksums)
    }

    pub fn has_files(&self) -> bool {
        self.urls.iter().any(|url| !url.is_empty())
    }

    fn remote_files(&self) -> Vec<RemoteFile> {
        self.urls
            .iter()
            .zip(&self.checksums)
            .filter(|(url, _)| !url.is_empty())
            .map(|(url, checksum)| RemoteFile {
                url: url.clone(),
                checksum: (!checksum.is_empty()).then(|| checksum.clone()),
            })
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    pub accession: String,
    pub submitted: FileChannel,
    pub sra: FileChannel,
    pub fastq: FileChannel,
    pub index: Vec<String>,
}

impl Manifest {
    pub fn from_row(row: &PortalRow, accession_field: &str, mode: TransportMode) -> Self {
        Self {
            accession: row.get(accession_field),
            submitted: FileChannel::from_row(row, Channel::Submitted, mode),
            sra: FileChannel::from_row(row, Channel::Sra, mode),
            fastq: FileChannel::from_row(row, Channel::Fastq, mode),
            index: split_list(&row.get(Channel::Index.url_field(mode))),
        }
    }

    pub fn is_empty(&self) -> bool {
        !self.submitted.has_files() && !self.sra.has_files() && !self.fastq.has_files()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    pub url: String,
    pub checksum: Option<String>,
}

impl RemoteFile {
    pub fn file_name(&self) -> &str {
        file_name(&self.url)
    }
}

pub fn file_name(url: &str) -> &str {
    url.rsplit('/').next().unwrap_or(url)
}

/// Files to act on for one manifest row, empty slots already removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadPlan {
    pub accession: String,
    pub format: Format,
    pub files: Vec<RemoteFile>,
    pub index_files: Vec<String>,
}

impl DownloadPlan {
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Picks the channel to download. Analyses only have submitted files; for
/// reads an unspecified format falls back submitted, then sra, then fastq,
/// taking the first channel that actually lists files.
pub fn resolve(
    manifest: &Manifest,
    kind: RecordKind,
    requested: Option<Format>,
    fetch_index: bool,
) -> DownloadPlan {
    if kind == RecordKind::Analysis {
        return DownloadPlan {
            accession: manifest.accession.clone(),
            format: Format::Submitted,
            files: manifest.submitted.remote_files(),
            index_files: Vec::new(),
        };
    }

    let format = requested.unwrap_or_else(|| infer_format(manifest));
    let channel = match format {
        Format::Sra => &manifest.sra,
        Format::Fastq => &manifest.fastq,
        _ => &manifest.submitted,
    };
    let index_files = if format == Format::Submitted && fetch_index {
        manifest
            .index
            .iter()
            .filter(|url| !url.is_empty())
            .cloned()
            .collect()
    } else {
        Vec::new()
    };

    DownloadPlan {
        accession: manifest.accession.clone(),
        format,
        files: channel.remote_files(),
        index_files,
    }
}

fn infer_format(manifest: &Manifest) -> Format {
    if manifest.submitted.has_files() {
        Format::Submitted
    } else if manifest.sra.has_files() {
        Format::Sra
    } else {
        Format::Fastq
    }
}
