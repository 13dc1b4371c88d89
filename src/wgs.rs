use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};

use camino::{Utf8Path, Utf8PathBuf};
use flate2::read::MultiGzDecoder;

use crate::domain::Format;
use crate::error::EnaError;

pub const WGS_BASE: &str = "https://ftp.ebi.ac.uk/pub/databases/ena/wgs";

/// Release status directory a set file lives under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetStatus {
    Public,
    Suppressed,
}

impl SetStatus {
    pub const SEARCH_ORDER: [SetStatus; 2] = [SetStatus::Public, SetStatus::Suppressed];

    pub fn as_str(&self) -> &'static str {
        match self {
            SetStatus::Public => "public",
            SetStatus::Suppressed => "suppressed",
        }
    }
}

/// Directory holding every set file that shares the prefix's first two letters.
pub fn set_directory(prefix: &str, status: SetStatus) -> String {
    let shard: String = prefix.chars().take(2).collect::<String>().to_lowercase();
    format!("{WGS_BASE}/{}/{shard}", status.as_str())
}

pub fn set_file_url(prefix: &str, status: SetStatus, format: Format) -> Option<String> {
    let suffix = format.wgs_suffix()?;
    Some(format!("{}/{prefix}{suffix}", set_directory(prefix, status)))
}

/// Picks the newest file for an unversioned prefix: the greatest matching name in string order.
/// Only version digits may sit between prefix and suffix.
pub fn latest_file<'a>(names: &'a [String], prefix: &str, suffix: &str) -> Option<&'a str> {
    names
        .iter()
        .map(String::as_str)
        .filter(|name| {
            name.strip_prefix(prefix)
                .and_then(|rest| rest.strip_suffix(suffix))
                .is_some_and(|version| {
                    !version.is_empty() && version.bytes().all(|byte| byte.is_ascii_digit())
                })
        })
        .max()
}

pub fn strip_version(accession: &str) -> &str {
    accession.split('.').next().unwrap_or(accession)
}

/// Accession named by a record header line, without its version: FASTA headers
/// carry it as the second `|` field, EMBL `ID` lines as the first token.
pub fn record_accession(line: &str) -> Option<&str> {
    if let Some(header) = line.strip_prefix('>') {
        let mut fields = header.split('|');
        let first = fields.next()?;
        let accession = fields
            .next()
            .unwrap_or(first)
            .split_whitespace()
            .next()?;
        return Some(strip_version(accession));
    }
    if line.starts_with("ID   ") {
        let token = line.split_whitespace().nth(1)?;
        return Some(strip_version(token.trim_end_matches(';')));
    }
    None
}

/// Copies the records whose accession is a key of `targets` to the file mapped
/// to it, appending. Returns the accessions that were found.
pub fn extract_records<R: BufRead>(
    reader: R,
    targets: &BTreeMap<String, Utf8PathBuf>,
) -> Result<BTreeSet<String>, EnaError> {
    let mut writers: HashMap<Utf8PathBuf, BufWriter<File>> = HashMap::new();
    let mut found = BTreeSet::new();
    let mut current: Option<Utf8PathBuf> = None;

    for line in reader.lines() {
        let line = line.map_err(|err| EnaError::Filesystem(format!("read WGS set: {err}")))?;
        if let Some(accession) = record_accession(&line) {
            current = targets.get(accession).cloned();
            if current.is_some() {
                found.insert(accession.to_string());
            }
        }
        let Some(path) = &current else {
            continue;
        };
        if !writers.contains_key(path) {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path.as_std_path())
                .map_err(|err| EnaError::Filesystem(format!("open {path}: {err}")))?;
            writers.insert(path.clone(), BufWriter::new(file));
        }
        if let Some(writer) = writers.get_mut(path) {
            writeln!(writer, "{line}")
                .map_err(|err| EnaError::Filesystem(format!("write {path}: {err}")))?;
        }
    }

    for (path, mut writer) in writers {
        writer
            .flush()
            .map_err(|err| EnaError::Filesystem(format!("write {path}: {err}")))?;
    }
    Ok(found)
}

/// Streams a gzip-compressed set file through [`extract_records`].
pub fn extract_from_set(
    set_file: &Utf8Path,
    targets: &BTreeMap<String, Utf8PathBuf>,
) -> Result<BTreeSet<String>, EnaError> {
    let file = File::open(set_file.as_std_path())
        .map_err(|err| EnaError::Filesystem(format!("open {set_file}: {err}")))?;
    extract_records(BufReader::new(MultiGzDecoder::new(file)), targets)
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use flate2::Compression;
    use flate2::write::GzEncoder;

    use super::*;

    #[test]
    fn set_urls() {
        assert_eq!(
            set_file_url("AAAB01", SetStatus::Public, Format::Embl).unwrap(),
            "https://ftp.ebi.ac.uk/pub/databases/ena/wgs/public/aa/AAAB01.dat.gz"
        );
        assert_eq!(
            set_file_url("CABZPD01", SetStatus::Suppressed, Format::Master).unwrap(),
            "https://ftp.ebi.ac.uk/pub/databases/ena/wgs/suppressed/ca/CABZPD01.master.dat"
        );
        assert!(set_file_url("AAAB01", SetStatus::Public, Format::Fastq).is_none());
    }

    #[test]
    fn latest_matching_file() {
        let names: Vec<String> = [
            "AAAB01.dat.gz",
            "AAAB02.dat.gz",
            "AAAB02.fasta.gz",
            "AAABCD09.dat.gz",
            "AAAC09.dat.gz",
        ]
            .iter()
            .map(|name| name.to_string())
            .collect();
        assert_eq!(latest_file(&names, "AAAB", ".dat.gz"), Some("AAAB02.dat.gz"));
        assert_eq!(latest_file(&names, "AAAD", ".dat.gz"), None);
    }

    #[test]
    fn header_accessions() {
        assert_eq!(
            record_accession(">ENA|AAAB01000001|AAAB01000001.1 Homo sapiens contig"),
            Some("AAAB01000001")
        );
        assert_eq!(
            record_accession("ID   AAAB01000002; SV 1; linear; genomic DNA; CON; MAM; 1 BP."),
            Some("AAAB01000002")
        );
        assert_eq!(record_accession("SQ   Sequence 1 BP;"), None);
    }

    #[test]
    fn extracts_only_wanted_records() {
        let temp = tempfile::tempdir().unwrap();
        let dir = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
        let set_file = dir.join("AAAB01.fasta.gz");
        let mut encoder = GzEncoder::new(
            File::create(set_file.as_std_path()).unwrap(),
            Compression::default(),
        );
        encoder
            .write_all(b">ENA|AAAB01000001|AAAB01000001.1 a\nACGT\n>ENA|AAAB01000002|AAAB01000002.1 b\nTTTT\n>ENA|AAAB01000003|AAAB01000003.1 c\nGGGG\n")
            .unwrap();
        encoder.finish().unwrap();

        let unplaced = dir.join("unplaced-scaffold.fasta");
        let mut targets = BTreeMap::new();
        targets.insert("AAAB01000002".to_string(), unplaced.clone());
        targets.insert("AAAB01000009".to_string(), unplaced.clone());

        let found = extract_from_set(&set_file, &targets).unwrap();
        assert_eq!(found.into_iter().collect::<Vec<_>>(), vec!["AAAB01000002"]);
        let content = std::fs::read_to_string(unplaced.as_std_path()).unwrap();
        assert_eq!(content, ">ENA|AAAB01000002|AAAB01000002.1 b\nTTTT\n");
    }
}
