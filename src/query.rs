use std::fmt;

use crate::accession::{Accession, RecordKind, Tier};
use crate::domain::{Channel, Group, TransportMode};
use crate::error::EnaError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultSet {
    ReadRun,
    Analysis,
    WgsSet,
    Assembly,
    SequenceUpdate,
    SequenceRelease,
}

impl ResultSet {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResultSet::ReadRun => "read_run",
            ResultSet::Analysis => "analysis",
            ResultSet::WgsSet => "wgs_set",
            ResultSet::Assembly => "assembly",
            ResultSet::SequenceUpdate => "sequence_update",
            ResultSet::SequenceRelease => "sequence_release",
        }
    }

    /// Result set listing the members of a group; sequence groups need two
    /// searches (update and release) and have no single result set.
    pub fn for_group(group: Group) -> Option<ResultSet> {
        match group {
            Group::Read => Some(ResultSet::ReadRun),
            Group::Analysis => Some(ResultSet::Analysis),
            Group::Wgs => Some(ResultSet::WgsSet),
            Group::Assembly => Some(ResultSet::Assembly),
            Group::Sequence => None,
        }
    }
}

impl fmt::Display for ResultSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A portal search: predicate, result set and the fields to return. The first
/// field is always the accession field identifying each returned row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryDescriptor {
    pub predicate: String,
    pub result: ResultSet,
    pub fields: Vec<String>,
}

impl QueryDescriptor {
    pub fn accession_field(&self) -> &str {
        self.fields.first().map(String::as_str).unwrap_or("accession")
    }

    pub fn params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("query", self.predicate.clone()),
            ("result", self.result.as_str().to_string()),
            ("fields", self.fields.join(",")),
            ("format", "json".to_string()),
            ("limit", "0".to_string()),
        ]
    }
}

/// Builds the file search for a run, experiment, analysis or sample accession.
pub fn file_search_query(
    accession: &Accession,
    mode: TransportMode,
    fetch_index: bool,
) -> Result<QueryDescriptor, EnaError> {
    let kind = accession.kind();
    let field = match kind {
        RecordKind::Run => "run_accession",
        RecordKind::Experiment => "experiment_accession",
        RecordKind::Analysis => "analysis_accession",
        RecordKind::Sample(Tier::Primary) => "sample_accession",
        RecordKind::Sample(Tier::Secondary) => "secondary_sample_accession",
        _ => {
            return Err(EnaError::NoFileSearch {
                accession: accession.to_string(),
                kind: kind.to_string(),
            });
        }
    };
    let (result, member_field) = if kind == RecordKind::Analysis {
        (ResultSet::Analysis, "analysis_accession")
    } else {
        (ResultSet::ReadRun, "run_accession")
    };

    let mut fields = vec![member_field.to_string()];
    push_channel(&mut fields, Channel::Submitted, mode);
    if kind != RecordKind::Analysis {
        if fetch_index {
            push_channel(&mut fields, Channel::Index, mode);
        }
        push_channel(&mut fields, Channel::Sra, mode);
        push_channel(&mut fields, Channel::Fastq, mode);
    }

    Ok(QueryDescriptor {
        predicate: format!("{field}=\"{}\"", accession.as_str()),
        result,
        fields,
    })
}

fn push_channel(fields: &mut Vec<String>, channel: Channel, mode: TransportMode) {
    fields.push(channel.url_field(mode).to_string());
    if let Some(checksum) = channel.checksum_field() {
        fields.push(checksum.to_string());
    }
}

/// Builds the member listing for a study, sample or taxon.
pub fn group_query(
    accession: &Accession,
    group: Group,
    result: ResultSet,
    subtree: bool,
) -> Result<QueryDescriptor, EnaError> {
    let acc = accession.as_str();
    let predicate = match accession.kind() {
        RecordKind::Study(Tier::Primary) => format!("study_accession=\"{acc}\""),
        RecordKind::Study(Tier::Secondary) => format!("secondary_study_accession=\"{acc}\""),
        RecordKind::Sample(Tier::Primary) => format!("sample_accession=\"{acc}\""),
        RecordKind::Sample(Tier::Secondary) => format!("secondary_sample_accession=\"{acc}\""),
        RecordKind::Taxon if subtree => format!("tax_tree({acc})"),
        RecordKind::Taxon => format!("tax_eq({acc})"),
        _ => return Err(EnaError::NotGroupAccession(acc.to_string())),
    };
    let field = match group {
        Group::Sequence | Group::Wgs | Group::Assembly => "accession",
        Group::Read => "run_accession",
        Group::Analysis => "analysis_accession",
    };
    Ok(QueryDescriptor {
        predicate,
        result,
        fields: vec![field.to_string()],
    })
}

/// Looks up the experiment a run belongs to.
pub fn experiment_query(run: &Accession) -> QueryDescriptor {
    QueryDescriptor {
        predicate: format!("run_accession=\"{}\"", run.as_str()),
        result: ResultSet::ReadRun,
        fields: vec![
            "run_accession".to_string(),
            "experiment_accession".to_string(),
        ],
    }
}
