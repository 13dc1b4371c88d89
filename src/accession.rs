use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::EnaError;

static SEQUENCE_1: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z]{1}[0-9]{5}(\.[0-9]+)?$").unwrap());
static SEQUENCE_2: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z]{2}[0-9]{6}(\.[0-9]+)?$").unwrap());
static WGS_SEQUENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Z]{4}[0-9]{8,9}|[A-Z]{6}[0-9]{9,})(\.[0-9]+)?$").unwrap()
});
static CODING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z]{3}[0-9]{5}(\.[0-9]+)?$").unwrap());
static WGS_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Z]{4}|[A-Z]{6})[0-9]{2}$").unwrap());
static WGS_MASTER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Z]{4}|[A-Z]{6})[0-9]{2}0{6,9}$").unwrap());
static UNVERSIONED_WGS_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Z]{4}|[A-Z]{6})$").unwrap());
static UNVERSIONED_WGS_MASTER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Z]{4}|[A-Z]{6})0{8,11}$").unwrap());
static RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[EDS]RR[0-9]{6,}$").unwrap());
static EXPERIMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[EDS]RX[0-9]{6,}$").unwrap());
static ANALYSIS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[EDS]RZ[0-9]{6,}$").unwrap());
static ASSEMBLY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^GCA_[0-9]{9}(\.[0-9]+)?$").unwrap());
static SECONDARY_STUDY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[EDS]RP[0-9]{6,}$").unwrap());
static PRIMARY_STUDY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^PRJ[EDN][AB][0-9]+$").unwrap());
static PRIMARY_SAMPLE_1: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^SAM[ND][0-9]{8}$").unwrap());
static PRIMARY_SAMPLE_2: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^SAMEA[0-9]{6,}$").unwrap());
static SECONDARY_SAMPLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[EDS]RS[0-9]{6,}$").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WgsVersioning {
    Versioned,
    Unversioned,
}

/// Primary (INSDC/BioSample) or secondary (SRA-style) identifier space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    Primary,
    Secondary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    Sequence,
    Coding,
    WgsSet(WgsVersioning),
    Run,
    Experiment,
    Analysis,
    Assembly,
    Study(Tier),
    Sample(Tier),
    Taxon,
}

impl RecordKind {
    pub fn name(&self) -> &'static str {
        match self {
            RecordKind::Sequence => "sequence",
            RecordKind::Coding => "coding",
            RecordKind::WgsSet(_) => "wgs",
            RecordKind::Run => "run",
            RecordKind::Experiment => "experiment",
            RecordKind::Analysis => "analysis",
            RecordKind::Assembly => "assembly",
            RecordKind::Study(_) => "study",
            RecordKind::Sample(_) => "sample",
            RecordKind::Taxon => "taxon",
        }
    }

    /// Study, sample and taxon accessions only make sense as group downloads.
    pub fn is_group(&self) -> bool {
        matches!(
            self,
            RecordKind::Study(_) | RecordKind::Sample(_) | RecordKind::Taxon
        )
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Classifies an accession string. The first matching rule wins, in the order
/// study, sample, run, experiment, analysis, assembly, WGS set, coding,
/// sequence, taxon.
pub fn classify(accession: &str) -> Option<RecordKind> {
    if PRIMARY_STUDY.is_match(accession) {
        Some(RecordKind::Study(Tier::Primary))
    } else if SECONDARY_STUDY.is_match(accession) {
        Some(RecordKind::Study(Tier::Secondary))
    } else if is_primary_sample(accession) {
        Some(RecordKind::Sample(Tier::Primary))
    } else if SECONDARY_SAMPLE.is_match(accession) {
        Some(RecordKind::Sample(Tier::Secondary))
    } else if is_run(accession) {
        Some(RecordKind::Run)
    } else if is_experiment(accession) {
        Some(RecordKind::Experiment)
    } else if is_analysis(accession) {
        Some(RecordKind::Analysis)
    } else if is_assembly(accession) {
        Some(RecordKind::Assembly)
    } else if is_unversioned_wgs_set(accession) {
        Some(RecordKind::WgsSet(WgsVersioning::Unversioned))
    } else if WGS_PREFIX.is_match(accession) || WGS_MASTER.is_match(accession) {
        Some(RecordKind::WgsSet(WgsVersioning::Versioned))
    } else if is_coding(accession) {
        Some(RecordKind::Coding)
    } else if is_sequence(accession) {
        Some(RecordKind::Sequence)
    } else if is_taxid(accession) {
        Some(RecordKind::Taxon)
    } else {
        None
    }
}

pub fn is_sequence(accession: &str) -> bool {
    SEQUENCE_1.is_match(accession) || SEQUENCE_2.is_match(accession)
}

/// Individual contig/scaffold accessions that live inside a WGS set.
pub fn is_wgs_sequence(accession: &str) -> bool {
    WGS_SEQUENCE.is_match(accession)
}

pub fn is_coding(accession: &str) -> bool {
    CODING.is_match(accession)
}

pub fn is_wgs_set(accession: &str) -> bool {
    WGS_PREFIX.is_match(accession)
        || WGS_MASTER.is_match(accession)
        || is_unversioned_wgs_set(accession)
}

pub fn is_unversioned_wgs_set(accession: &str) -> bool {
    UNVERSIONED_WGS_PREFIX.is_match(accession) || UNVERSIONED_WGS_MASTER.is_match(accession)
}

pub fn is_run(accession: &str) -> bool {
    RUN.is_match(accession)
}

pub fn is_experiment(accession: &str) -> bool {
    EXPERIMENT.is_match(accession)
}

pub fn is_analysis(accession: &str) -> bool {
    ANALYSIS.is_match(accession)
}

pub fn is_assembly(accession: &str) -> bool {
    ASSEMBLY.is_match(accession)
}

pub fn is_study(accession: &str) -> bool {
    PRIMARY_STUDY.is_match(accession) || SECONDARY_STUDY.is_match(accession)
}

pub fn is_sample(accession: &str) -> bool {
    is_primary_sample(accession) || SECONDARY_SAMPLE.is_match(accession)
}

fn is_primary_sample(accession: &str) -> bool {
    PRIMARY_SAMPLE_1.is_match(accession) || PRIMARY_SAMPLE_2.is_match(accession)
}

pub fn is_taxid(accession: &str) -> bool {
    accession.parse::<i64>().is_ok()
}

/// Returns the set prefix of a WGS accession: letters plus two version digits
/// for versioned sets, letters alone for unversioned ones.
pub fn wgs_prefix(accession: &str) -> Option<&str> {
    let letters = accession
        .bytes()
        .take_while(|byte| byte.is_ascii_uppercase())
        .count();
    if letters != 4 && letters != 6 {
        return None;
    }
    if is_unversioned_wgs_set(accession) {
        return Some(&accession[..letters]);
    }
    let digits = accession[letters..]
        .bytes()
        .take_while(|byte| byte.is_ascii_digit())
        .count();
    if digits < 2 {
        return None;
    }
    Some(&accession[..letters + 2])
}

/// An accession string together with its derived record kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Accession {
    raw: String,
    kind: RecordKind,
}

impl Accession {
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn kind(&self) -> RecordKind {
        self.kind
    }
}

impl fmt::Display for Accession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

impl FromStr for Accession {
    type Err = EnaError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let raw = value.trim().to_string();
        let kind = classify(&raw).ok_or_else(|| EnaError::InvalidAccession(value.to_string()))?;
        Ok(Self { raw, kind })
    }
}
