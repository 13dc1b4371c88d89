use std::fmt;

use crate::error::EnaError;

const SEQUENCE_REPORT_LABEL: &str = "Sequence Report";

/// Molecule role of a sequence listed in an assembly's sequence report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MoleculeCategory {
    AssembledMolecule,
    UnlocalisedScaffold,
    UnplacedScaffold,
    Patch,
}

impl MoleculeCategory {
    pub const ALL: [MoleculeCategory; 4] = [
        MoleculeCategory::AssembledMolecule,
        MoleculeCategory::UnlocalisedScaffold,
        MoleculeCategory::UnplacedScaffold,
        MoleculeCategory::Patch,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MoleculeCategory::AssembledMolecule => "assembled-molecule",
            MoleculeCategory::UnlocalisedScaffold => "unlocalised-scaffold",
            MoleculeCategory::UnplacedScaffold => "unplaced-scaffold",
            MoleculeCategory::Patch => "patch",
        }
    }

    /// Scaffolds of these roles may live only inside the assembly's WGS set.
    pub fn is_scaffold(&self) -> bool {
        matches!(
            self,
            MoleculeCategory::UnlocalisedScaffold | MoleculeCategory::UnplacedScaffold
        )
    }

    fn from_role(role: &str) -> Option<Self> {
        match role {
            "assembled-molecule" => Some(MoleculeCategory::AssembledMolecule),
            "unlocalised-scaffold" => Some(MoleculeCategory::UnlocalisedScaffold),
            "unplaced-scaffold" => Some(MoleculeCategory::UnplacedScaffold),
            other if other.contains("patch") => Some(MoleculeCategory::Patch),
            _ => None,
        }
    }
}

impl fmt::Display for MoleculeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the assembly XML record tells us about where its sequences live.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssemblyRecord {
    pub sequence_report: Option<String>,
    pub wgs_set: Option<String>,
}

pub fn parse_assembly_xml(xml: &str) -> Result<AssemblyRecord, EnaError> {
    let document = roxmltree::Document::parse(xml).map_err(|err| EnaError::Xml(err.to_string()))?;
    let root = document.root_element();

    let sequence_report = root
        .descendants()
        .filter(|node| node.has_tag_name("URL_LINK"))
        .find(|link| child_text(*link, "LABEL") == Some(SEQUENCE_REPORT_LABEL))
        .and_then(|link| child_text(link, "URL"))
        .map(str::to_string);

    let wgs_set = root
        .descendants()
        .find(|node| node.has_tag_name("WGS_SET"))
        .and_then(|wgs| {
            let prefix = child_text(wgs, "PREFIX")?;
            let version = child_text(wgs, "VERSION")?;
            Some(format!("{prefix}{version:0>2}"))
        });

    Ok(AssemblyRecord {
        sequence_report,
        wgs_set,
    })
}

fn child_text<'a>(node: roxmltree::Node<'a, '_>, tag: &str) -> Option<&'a str> {
    node.children()
        .find(|child| child.has_tag_name(tag))
        .and_then(|child| child.text())
        .map(str::trim)
}

/// Member accessions of an assembly, grouped by molecule role in report order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SequenceReport {
    pub assembled_molecule: Vec<String>,
    pub unlocalised_scaffold: Vec<String>,
    pub unplaced_scaffold: Vec<String>,
    pub patch: Vec<String>,
}

impl SequenceReport {
    pub fn members(&self, category: MoleculeCategory) -> &[String] {
        match category {
            MoleculeCategory::AssembledMolecule => &self.assembled_molecule,
            MoleculeCategory::UnlocalisedScaffold => &self.unlocalised_scaffold,
            MoleculeCategory::UnplacedScaffold => &self.unplaced_scaffold,
            MoleculeCategory::Patch => &self.patch,
        }
    }

    fn members_mut(&mut self, category: MoleculeCategory) -> &mut Vec<String> {
        match category {
            MoleculeCategory::AssembledMolecule => &mut self.assembled_molecule,
            MoleculeCategory::UnlocalisedScaffold => &mut self.unlocalised_scaffold,
            MoleculeCategory::UnplacedScaffold => &mut self.unplaced_scaffold,
            MoleculeCategory::Patch => &mut self.patch,
        }
    }
}

/// Parses the tab-separated report: header skipped, accession in column 0,
/// role in column 3.
pub fn parse_sequence_report(content: &str) -> SequenceReport {
    let mut report = SequenceReport::default();
    for line in content.lines().skip(1) {
        let columns: Vec<&str> = line.split('\t').collect();
        if columns.len() < 4 {
            continue;
        }
        if let Some(category) = MoleculeCategory::from_role(columns[3].trim()) {
            report
                .members_mut(category)
                .push(columns[0].trim().to_string());
        }
    }
    report
}
