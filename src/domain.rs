use std::fmt;

use clap::ValueEnum;

use crate::accession::RecordKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum Format {
    Embl,
    Fasta,
    Master,
    Submitted,
    Fastq,
    Sra,
    #[value(skip)]
    Xml,
}

impl Format {
    pub fn as_str(&self) -> &'static str {
        match self {
            Format::Embl => "embl",
            Format::Fasta => "fasta",
            Format::Master => "master",
            Format::Submitted => "submitted",
            Format::Fastq => "fastq",
            Format::Sra => "sra",
            Format::Xml => "xml",
        }
    }

    /// Extension of a locally written record file, `None` for file-channel formats.
    pub fn record_extension(&self) -> Option<&'static str> {
        match self {
            Format::Xml => Some("xml"),
            Format::Embl => Some("embl"),
            Format::Fasta => Some("fasta"),
            _ => None,
        }
    }

    /// Suffix of the remote WGS set file for this format.
    pub fn wgs_suffix(&self) -> Option<&'static str> {
        match self {
            Format::Embl => Some(".dat.gz"),
            Format::Fasta => Some(".fasta.gz"),
            Format::Master => Some(".master.dat"),
            _ => None,
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Data group fetched for a study, sample or taxon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum Group {
    Sequence,
    Wgs,
    Assembly,
    Read,
    Analysis,
}

impl Group {
    pub fn as_str(&self) -> &'static str {
        match self {
            Group::Sequence => "sequence",
            Group::Wgs => "wgs",
            Group::Assembly => "assembly",
            Group::Read => "read",
            Group::Analysis => "analysis",
        }
    }

    pub fn default_format(&self) -> Format {
        match self {
            Group::Read | Group::Analysis => Format::Submitted,
            Group::Sequence | Group::Wgs | Group::Assembly => Format::Embl,
        }
    }

    pub fn allowed_formats(&self) -> &'static [Format] {
        match self {
            Group::Analysis => &[Format::Submitted],
            Group::Read => &[Format::Submitted, Format::Fastq, Format::Sra],
            Group::Sequence | Group::Wgs | Group::Assembly => &[Format::Embl, Format::Fasta],
        }
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportMode {
    Ftp,
    Aspera,
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportMode::Ftp => write!(f, "ftp"),
            TransportMode::Aspera => write!(f, "aspera"),
        }
    }
}

/// File-delivery channel exposed by the portal for runs, experiments and analyses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Submitted,
    Sra,
    Fastq,
    Index,
}

impl Channel {
    pub fn url_field(&self, mode: TransportMode) -> &'static str {
        match (self, mode) {
            (Channel::Submitted, TransportMode::Ftp) => "submitted_ftp",
            (Channel::Submitted, TransportMode::Aspera) => "submitted_aspera",
            (Channel::Sra, TransportMode::Ftp) => "sra_ftp",
            (Channel::Sra, TransportMode::Aspera) => "sra_aspera",
            (Channel::Fastq, TransportMode::Ftp) => "fastq_ftp",
            (Channel::Fastq, TransportMode::Aspera) => "fastq_aspera",
            (Channel::Index, TransportMode::Ftp) => "cram_index_ftp",
            (Channel::Index, TransportMode::Aspera) => "cram_index_aspera",
        }
    }

    /// Index files carry no checksum field.
    pub fn checksum_field(&self) -> Option<&'static str> {
        match self {
            Channel::Submitted => Some("submitted_md5"),
            Channel::Sra => Some("sra_md5"),
            Channel::Fastq => Some("fastq_md5"),
            Channel::Index => None,
        }
    }
}

/// Formats a single accession of the given kind may be downloaded in.
pub fn allowed_formats(kind: RecordKind) -> &'static [Format] {
    match kind {
        RecordKind::Analysis => &[Format::Submitted],
        RecordKind::Run | RecordKind::Experiment => {
            &[Format::Submitted, Format::Fastq, Format::Sra]
        }
        _ => &[Format::Embl, Format::Fasta],
    }
}

pub fn accession_format_allowed(kind: RecordKind, format: Format) -> bool {
    allowed_formats(kind).contains(&format)
}

/// WGS sets additionally accept the master record format.
pub fn wgs_format_allowed(format: Format) -> bool {
    matches!(format, Format::Embl | Format::Fasta | Format::Master)
}

pub fn group_format_allowed(group: Group, format: Format) -> bool {
    group.allowed_formats().contains(&format)
}

pub fn format_list(formats: &[Format]) -> String {
    formats
        .iter()
        .map(|format| format.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
