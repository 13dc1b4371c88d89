use std::collections::HashMap;
use std::io::Write;
use std::sync::Mutex;

use assert_matches::assert_matches;
use camino::{Utf8Path, Utf8PathBuf};
use md5::{Digest, Md5};

use ena_browser_tools::accession::Accession;
use ena_browser_tools::app::{
    self, App, DownloadOptions, ProgressEvent, ProgressLevel, ProgressSink,
};
use ena_browser_tools::domain::{Format, Group};
use ena_browser_tools::error::EnaError;
use ena_browser_tools::manifest::{PortalRow, file_name};
use ena_browser_tools::portal::EnaClient;
use ena_browser_tools::query::QueryDescriptor;
use ena_browser_tools::transfer::FileTransfer;

#[derive(Default)]
struct MockClient {
    unavailable: bool,
    records: HashMap<String, String>,
    interrupted: HashMap<String, String>,
    rows: HashMap<String, Vec<PortalRow>>,
    probes: Mutex<usize>,
    queries: Mutex<Vec<QueryDescriptor>>,
    fetched: Mutex<Vec<String>>,
}

impl MockClient {
    fn record(mut self, accession: &str, format: Format, body: &str) -> Self {
        self.records
            .insert(format!("{accession}.{format}"), body.to_string());
        self
    }

    /// The record stream breaks off after `partial` has been written.
    fn interrupted(mut self, accession: &str, partial: &str) -> Self {
        self.interrupted
            .insert(accession.to_string(), partial.to_string());
        self
    }

    fn rows(mut self, result: &str, predicate: &str, rows: Vec<PortalRow>) -> Self {
        self.rows.insert(format!("{result}|{predicate}"), rows);
        self
    }
}

impl EnaClient for MockClient {
    fn is_available(&self, _accession: &Accession) -> Result<bool, EnaError> {
        *self.probes.lock().unwrap() += 1;
        Ok(!self.unavailable)
    }

    fn fetch_record(
        &self,
        accession: &str,
        format: Format,
        _expanded: bool,
        out: &mut dyn Write,
    ) -> Result<u64, EnaError> {
        self.fetched.lock().unwrap().push(accession.to_string());
        if let Some(partial) = self.interrupted.get(accession) {
            out.write_all(partial.as_bytes()).unwrap();
            return Err(EnaError::ViewHttp("connection reset".to_string()));
        }
        let Some(body) = self.records.get(&format!("{accession}.{format}")) else {
            return Err(EnaError::ViewStatus {
                status: 404,
                message: accession.to_string(),
            });
        };
        out.write_all(body.as_bytes()).unwrap();
        Ok(body.len() as u64)
    }

    fn search(&self, query: &QueryDescriptor) -> Result<Vec<PortalRow>, EnaError> {
        self.queries.lock().unwrap().push(query.clone());
        let key = format!("{}|{}", query.result, query.predicate);
        Ok(self.rows.get(&key).cloned().unwrap_or_default())
    }
}

#[derive(Default)]
struct MockTransfer {
    files: HashMap<String, Vec<u8>>,
    listings: HashMap<String, Vec<String>>,
    attempts: Mutex<Vec<String>>,
}

impl MockTransfer {
    fn file(mut self, url: &str, content: &[u8]) -> Self {
        self.files.insert(url.to_string(), content.to_vec());
        self
    }

    fn listing(mut self, url: &str, names: &[&str]) -> Self {
        self.listings.insert(
            url.to_string(),
            names.iter().map(|name| name.to_string()).collect(),
        );
        self
    }

    fn attempts_for(&self, url: &str) -> usize {
        self.attempts
            .lock()
            .unwrap()
            .iter()
            .filter(|attempt| attempt.as_str() == url)
            .count()
    }
}

impl FileTransfer for MockTransfer {
    fn fetch(&self, url: &str, dest_dir: &Utf8Path) -> Result<Utf8PathBuf, EnaError> {
        self.attempts.lock().unwrap().push(url.to_string());
        let Some(content) = self.files.get(url) else {
            return Err(EnaError::TransferStatus {
                url: url.to_string(),
                status: 404,
            });
        };
        let path = dest_dir.join(file_name(url));
        std::fs::write(path.as_std_path(), content).unwrap();
        Ok(path)
    }

    fn list(&self, url: &str) -> Result<Vec<String>, EnaError> {
        self.listings
            .get(url)
            .cloned()
            .ok_or_else(|| EnaError::Transfer(format!("no listing for {url}")))
    }
}

#[derive(Default)]
struct RecordingSink {
    events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingSink {
    fn warnings(&self) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|event| event.level == ProgressLevel::Warning)
            .map(|event| event.message.clone())
            .collect()
    }
}

impl ProgressSink for RecordingSink {
    fn event(&self, event: ProgressEvent) {
        self.events.lock().unwrap().push(event);
    }
}

type TestApp = App<MockClient, MockTransfer, MockTransfer>;

fn md5_hex(content: &[u8]) -> String {
    format!("{:x}", Md5::digest(content))
}

fn temp_dest() -> (tempfile::TempDir, Utf8PathBuf) {
    let temp = tempfile::tempdir().unwrap();
    let dest = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
    (temp, dest)
}

fn options(dest: &Utf8Path, format: Option<Format>) -> DownloadOptions {
    DownloadOptions {
        dest: dest.to_path_buf(),
        format,
        ..DownloadOptions::default()
    }
}

fn acc(value: &str) -> Accession {
    value.parse().unwrap()
}

const FASTQ_1: &str = "ftp.sra.ebi.ac.uk/vol1/fastq/SRR000/SRR000001/SRR000001_1.fastq.gz";
const FASTQ_2: &str = "ftp.sra.ebi.ac.uk/vol1/fastq/SRR000/SRR000001/SRR000001_2.fastq.gz";

fn run_row(fastq: &str, fastq_md5: &str) -> PortalRow {
    PortalRow::from_pairs([
        ("run_accession", "SRR000001"),
        ("submitted_ftp", ""),
        ("submitted_md5", ""),
        ("sra_ftp", ""),
        ("sra_md5", ""),
        ("fastq_ftp", fastq),
        ("fastq_md5", fastq_md5),
    ])
}

#[test]
fn run_without_format_falls_back_to_fastq() {
    let (_temp, dest) = temp_dest();
    let checksums = format!("{};{}", md5_hex(b"read-1"), md5_hex(b"read-2"));
    let client = MockClient::default().rows(
        "read_run",
        "run_accession=\"SRR000001\"",
        vec![run_row(&format!("{FASTQ_1};{FASTQ_2}"), &checksums)],
    );
    let ftp = MockTransfer::default()
        .file(FASTQ_1, b"read-1")
        .file(FASTQ_2, b"read-2");
    let app: TestApp = App::new(client, ftp, None);
    let sink = RecordingSink::default();

    let report = app
        .download_accession(&acc("SRR000001"), &options(&dest, None), &sink)
        .unwrap();

    assert!(report.is_clean());
    let run_dir = dest.join("SRR000001");
    assert_eq!(
        std::fs::read(run_dir.join("SRR000001_1.fastq.gz")).unwrap(),
        b"read-1"
    );
    assert!(run_dir.join("SRR000001_2.fastq.gz").exists());
    assert_eq!(report.files.len(), 2);
}

#[test]
fn failing_file_is_tried_exactly_twice() {
    let (_temp, dest) = temp_dest();
    let client = MockClient::default().rows(
        "read_run",
        "run_accession=\"SRR000001\"",
        vec![run_row(FASTQ_1, &md5_hex(b"read-1"))],
    );
    let app: TestApp = App::new(client, MockTransfer::default(), None);
    let sink = RecordingSink::default();

    let report = app
        .download_accession(&acc("SRR000001"), &options(&dest, Some(Format::Fastq)), &sink)
        .unwrap();

    assert_eq!(app_ftp_attempts(&app, FASTQ_1), 2);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].target, FASTQ_1);
    assert!(!dest.join("SRR000001").exists());
}

fn app_ftp_attempts(app: &TestApp, url: &str) -> usize {
    app.file_transfer().attempts_for(url)
}

#[test]
fn checksum_mismatch_counts_as_failed_attempt() {
    let (_temp, dest) = temp_dest();
    let client = MockClient::default().rows(
        "read_run",
        "run_accession=\"SRR000001\"",
        vec![run_row(FASTQ_1, &md5_hex(b"expected"))],
    );
    let ftp = MockTransfer::default().file(FASTQ_1, b"corrupted");
    let app: TestApp = App::new(client, ftp, None);
    let sink = RecordingSink::default();

    let report = app
        .download_accession(&acc("SRR000001"), &options(&dest, Some(Format::Fastq)), &sink)
        .unwrap();

    assert_eq!(app_ftp_attempts(&app, FASTQ_1), 2);
    assert_eq!(report.failures.len(), 1);
    assert!(report.failures[0].reason.contains("MD5 mismatch"));
    assert!(!dest.join("SRR000001").join("SRR000001_1.fastq.gz").exists());
}

#[test]
fn matching_local_file_is_not_downloaded_again() {
    let (_temp, dest) = temp_dest();
    let run_dir = dest.join("SRR000001");
    std::fs::create_dir_all(run_dir.as_std_path()).unwrap();
    std::fs::write(run_dir.join("SRR000001_1.fastq.gz"), b"read-1").unwrap();

    let client = MockClient::default().rows(
        "read_run",
        "run_accession=\"SRR000001\"",
        vec![run_row(FASTQ_1, &md5_hex(b"read-1"))],
    );
    let app: TestApp = App::new(client, MockTransfer::default(), None);
    let sink = RecordingSink::default();

    let report = app
        .download_accession(&acc("SRR000001"), &options(&dest, Some(Format::Fastq)), &sink)
        .unwrap();

    assert!(report.is_clean());
    assert_eq!(app_ftp_attempts(&app, FASTQ_1), 0);
}

#[test]
fn empty_list_slots_are_skipped() {
    let (_temp, dest) = temp_dest();
    let client = MockClient::default().rows(
        "read_run",
        "run_accession=\"SRR000001\"",
        vec![run_row(&format!(";{FASTQ_2}"), &format!(";{}", md5_hex(b"read-2")))],
    );
    let ftp = MockTransfer::default().file(FASTQ_2, b"read-2");
    let app: TestApp = App::new(client, ftp, None);
    let sink = RecordingSink::default();

    let report = app
        .download_accession(&acc("SRR000001"), &options(&dest, Some(Format::Fastq)), &sink)
        .unwrap();

    assert!(report.is_clean());
    assert_eq!(app.file_transfer().attempts.lock().unwrap().len(), 1);
    assert_eq!(app_ftp_attempts(&app, FASTQ_2), 1);
}

#[test]
fn illegal_analysis_format_fails_before_any_request() {
    let err = app::prepare_accession("ERZ123456", Some(Format::Fastq)).unwrap_err();
    assert_matches!(err, EnaError::IllegalFormat { .. });
    assert!(err.is_usage());

    let (_temp, dest) = temp_dest();
    let app: TestApp = App::new(MockClient::default(), MockTransfer::default(), None);
    let sink = RecordingSink::default();
    let result =
        app.download_accession(&acc("ERZ123456"), &options(&dest, Some(Format::Fastq)), &sink);

    assert_matches!(result, Err(EnaError::IllegalFormat { .. }));
    assert_eq!(*app.client().probes.lock().unwrap(), 0);
    assert!(app.client().queries.lock().unwrap().is_empty());
}

#[test]
fn unavailable_record_is_reported() {
    let (_temp, dest) = temp_dest();
    let client = MockClient {
        unavailable: true,
        ..MockClient::default()
    };
    let app: TestApp = App::new(client, MockTransfer::default(), None);
    let sink = RecordingSink::default();

    let result = app.download_accession(&acc("A12345"), &options(&dest, None), &sink);

    assert_matches!(result, Err(EnaError::NotAvailable(accession)) if accession == "A12345");
    assert!(app.client().fetched.lock().unwrap().is_empty());
}

#[test]
fn sequence_record_written_as_embl() {
    let (_temp, dest) = temp_dest();
    let client = MockClient::default().record("A12345", Format::Embl, "ID   A12345;\n//\n");
    let app: TestApp = App::new(client, MockTransfer::default(), None);
    let sink = RecordingSink::default();

    let report = app
        .download_accession(&acc("A12345"), &options(&dest, None), &sink)
        .unwrap();

    assert!(report.is_clean());
    assert_eq!(
        std::fs::read_to_string(dest.join("A12345.embl")).unwrap(),
        "ID   A12345;\n//\n"
    );
}

#[test]
fn experiment_fans_out_per_run_and_drops_empty_directories() {
    let (_temp, dest) = temp_dest();
    let fastq = "ftp.sra.ebi.ac.uk/vol1/fastq/ERR000/ERR000001/ERR000001.fastq.gz";
    let rows = vec![
        PortalRow::from_pairs([
            ("run_accession", "ERR000001"),
            ("fastq_ftp", fastq),
            ("fastq_md5", ""),
        ]),
        PortalRow::from_pairs([("run_accession", "ERR000002")]),
    ];
    let client =
        MockClient::default().rows("read_run", "experiment_accession=\"ERX000001\"", rows);
    let ftp = MockTransfer::default().file(fastq, b"reads");
    let app: TestApp = App::new(client, ftp, None);
    let sink = RecordingSink::default();

    let report = app
        .download_accession(&acc("ERX000001"), &options(&dest, None), &sink)
        .unwrap();

    assert!(report.is_clean());
    let experiment_dir = dest.join("ERX000001");
    assert!(experiment_dir.join("ERR000001").join("ERR000001.fastq.gz").exists());
    assert!(!experiment_dir.join("ERR000002").exists());
    assert!(
        sink.warnings()
            .contains(&"No files of format any for ERR000002".to_string())
    );
}

#[test]
fn sequence_group_skips_released_duplicates() {
    let (_temp, dest) = temp_dest();
    let members = |values: &[&'static str]| {
        values
            .iter()
            .map(|value| PortalRow::from_pairs([("accession", *value)]))
            .collect::<Vec<_>>()
    };
    let client = MockClient::default()
        .rows(
            "sequence_update",
            "study_accession=\"PRJEB1234\"",
            members(&["AB000001", "AB000002"]),
        )
        .rows(
            "sequence_release",
            "study_accession=\"PRJEB1234\"",
            members(&["AB000002", "AB000003"]),
        )
        .record("AB000001", Format::Embl, "one\n")
        .record("AB000002", Format::Embl, "two\n")
        .record("AB000003", Format::Embl, "three\n");
    let app: TestApp = App::new(client, MockTransfer::default(), None);
    let sink = RecordingSink::default();

    let (accession, format) = app::prepare_group("PRJEB1234", Group::Sequence, None).unwrap();
    let report = app
        .download_group(&accession, Group::Sequence, &options(&dest, Some(format)), &sink)
        .unwrap();

    assert!(report.is_clean());
    assert_eq!(
        *app.client().fetched.lock().unwrap(),
        vec!["AB000001", "AB000002", "AB000003"]
    );
    let combined = dest.join("PRJEB1234").join("PRJEB1234_sequences.embl");
    assert_eq!(std::fs::read_to_string(combined).unwrap(), "one\ntwo\nthree\n");
}

#[test]
fn interrupted_record_leaves_no_partial_entry() {
    let (_temp, dest) = temp_dest();
    let client = MockClient::default()
        .rows(
            "sequence_update",
            "study_accession=\"PRJEB1234\"",
            ["AB000001", "AB000002", "AB000003"]
                .iter()
                .map(|value| PortalRow::from_pairs([("accession", *value)]))
                .collect(),
        )
        .record("AB000001", Format::Embl, "one\n")
        .interrupted("AB000002", "tw")
        .record("AB000003", Format::Embl, "three\n");
    let app: TestApp = App::new(client, MockTransfer::default(), None);
    let sink = RecordingSink::default();

    let report = app
        .download_group(
            &acc("PRJEB1234"),
            Group::Sequence,
            &options(&dest, Some(Format::Embl)),
            &sink,
        )
        .unwrap();

    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].target, "AB000002");
    let combined = dest.join("PRJEB1234").join("PRJEB1234_sequences.embl");
    assert_eq!(std::fs::read_to_string(combined).unwrap(), "one\nthree\n");
}

#[test]
fn interrupted_single_record_writes_nothing() {
    let (_temp, dest) = temp_dest();
    let client = MockClient::default().interrupted("A12345", "ID   A123");
    let app: TestApp = App::new(client, MockTransfer::default(), None);
    let sink = RecordingSink::default();

    let report = app
        .download_accession(&acc("A12345"), &options(&dest, None), &sink)
        .unwrap();

    assert_eq!(report.failures.len(), 1);
    assert!(!dest.join("A12345.embl").exists());
    assert_eq!(std::fs::read_dir(dest.as_std_path()).unwrap().count(), 0);
}

#[test]
fn taxon_read_group_is_rejected() {
    let err = app::prepare_group("9606", Group::Read, None).unwrap_err();
    assert_matches!(err, EnaError::UnsupportedGroup(_));
    let err = app::prepare_group("SRR000001", Group::Read, None).unwrap_err();
    assert_matches!(err, EnaError::NotGroupAccession(_));
}

const REPORT_URL: &str =
    "ftp.ebi.ac.uk/pub/databases/ena/assembly/GCA_000/GCA_000001/GCA_000001405.29_sequence_report.txt";

fn assembly_xml(wgs: Option<(&str, &str)>) -> String {
    let wgs = wgs
        .map(|(prefix, version)| {
            format!("<WGS_SET><PREFIX>{prefix}</PREFIX><VERSION>{version}</VERSION></WGS_SET>")
        })
        .unwrap_or_default();
    format!(
        "<ASSEMBLY_SET><ASSEMBLY accession=\"GCA_000001405.29\">{wgs}<ASSEMBLY_LINKS>\
         <ASSEMBLY_LINK><URL_LINK><LABEL>Sequence Report</LABEL><URL>{REPORT_URL}</URL></URL_LINK></ASSEMBLY_LINK>\
         </ASSEMBLY_LINKS></ASSEMBLY></ASSEMBLY_SET>"
    )
}

const REPORT_HEADER: &str = "accession\tsequence-name\tsequence-length\tmolecule-type\n";

#[test]
fn assembly_without_wgs_set_fetches_molecules_only() {
    let (_temp, dest) = temp_dest();
    let report_body = format!("{REPORT_HEADER}CM000663.2\t1\t248956422\tassembled-molecule\n");
    let client = MockClient::default()
        .record("GCA_000001405.29", Format::Xml, &assembly_xml(None))
        .record("CM000663.2", Format::Embl, "ID   CM000663;\n//\n");
    let ftp = MockTransfer::default().file(REPORT_URL, report_body.as_bytes());
    let app: TestApp = App::new(client, ftp, None);
    let sink = RecordingSink::default();

    let report = app
        .download_accession(&acc("GCA_000001405.29"), &options(&dest, None), &sink)
        .unwrap();

    assert!(report.is_clean());
    let assembly_dir = dest.join("GCA_000001405.29");
    assert!(assembly_dir.join("GCA_000001405.29.xml").exists());
    assert_eq!(
        std::fs::read_to_string(assembly_dir.join("assembled-molecule.embl")).unwrap(),
        "ID   CM000663;\n//\n"
    );
    assert!(!assembly_dir.join("unplaced-scaffold.embl").exists());
    assert_eq!(*app.file_transfer().attempts.lock().unwrap(), vec![REPORT_URL]);
}

#[test]
fn assembly_scaffolds_extracted_from_wgs_set() {
    use flate2::Compression;
    use flate2::write::GzEncoder;

    let (_temp, dest) = temp_dest();
    let report_body = format!(
        "{REPORT_HEADER}CM000663.2\t1\t248956422\tassembled-molecule\n\
         AADB02000001.1\tun1\t1000\tunplaced-scaffold\n"
    );
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(b"ID   AADB02000001; SV 1;\nSQ   acgt\n//\nID   AADB02000002; SV 1;\n//\n")
        .unwrap();
    let set = encoder.finish().unwrap();
    let set_url = "https://ftp.ebi.ac.uk/pub/databases/ena/wgs/public/aa/AADB02.dat.gz";

    let client = MockClient::default()
        .record("GCA_000001405.29", Format::Xml, &assembly_xml(Some(("AADB", "2"))))
        .record("CM000663.2", Format::Embl, "ID   CM000663;\n//\n");
    let ftp = MockTransfer::default()
        .file(REPORT_URL, report_body.as_bytes())
        .file(set_url, &set);
    let app: TestApp = App::new(client, ftp, None);
    let sink = RecordingSink::default();
    let options = DownloadOptions {
        extract_wgs: true,
        ..options(&dest, None)
    };

    let report = app
        .download_accession(&acc("GCA_000001405.29"), &options, &sink)
        .unwrap();

    assert!(report.is_clean(), "{:?}", report.failures);
    let assembly_dir = dest.join("GCA_000001405.29");
    assert!(assembly_dir.join("AADB02.dat.gz").exists());
    assert_eq!(
        std::fs::read_to_string(assembly_dir.join("unplaced-scaffold.embl")).unwrap(),
        "ID   AADB02000001; SV 1;\nSQ   acgt\n//\n"
    );
    assert!(
        !app.client()
            .fetched
            .lock()
            .unwrap()
            .contains(&"AADB02000001.1".to_string())
    );
}

#[test]
fn unversioned_wgs_set_picks_latest_listed_file() {
    let (_temp, dest) = temp_dest();
    let directory = "https://ftp.ebi.ac.uk/pub/databases/ena/wgs/public/aa";
    let latest = format!("{directory}/AAAA02.dat.gz");
    let ftp = MockTransfer::default()
        .listing(
            directory,
            &["AAAA01.dat.gz", "AAAA02.dat.gz", "AAAA02.fasta.gz", "AAAB01.dat.gz"],
        )
        .file(&latest, b"set");
    let app: TestApp = App::new(MockClient::default(), ftp, None);
    let sink = RecordingSink::default();

    let report = app
        .download_accession(&acc("AAAA"), &options(&dest, None), &sink)
        .unwrap();

    assert!(report.is_clean());
    assert!(dest.join("AAAA02.dat.gz").exists());
    assert_eq!(*app.client().probes.lock().unwrap(), 0);
}

#[test]
fn wgs_set_falls_back_to_suppressed_location() {
    let (_temp, dest) = temp_dest();
    let public = "https://ftp.ebi.ac.uk/pub/databases/ena/wgs/public/aa/AAAB01.fasta.gz";
    let suppressed = "https://ftp.ebi.ac.uk/pub/databases/ena/wgs/suppressed/aa/AAAB01.fasta.gz";
    let ftp = MockTransfer::default().file(suppressed, b"set");
    let app: TestApp = App::new(MockClient::default(), ftp, None);
    let sink = RecordingSink::default();

    let report = app
        .download_accession(&acc("AAAB01"), &options(&dest, Some(Format::Fasta)), &sink)
        .unwrap();

    assert!(report.is_clean());
    assert_eq!(app_ftp_attempts(&app, public), 2);
    assert_eq!(app_ftp_attempts(&app, suppressed), 1);
    assert!(dest.join("AAAB01.fasta.gz").exists());
}
