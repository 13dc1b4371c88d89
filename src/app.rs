use std::collections::{BTreeMap, HashSet};
use std::fs::{self, OpenOptions};
use std::io::{self, Seek, SeekFrom};

use camino::{Utf8Path, Utf8PathBuf};
use tracing::debug;

use crate::accession::{self, Accession, RecordKind};
use crate::assembly::{self, MoleculeCategory, SequenceReport};
use crate::checksum;
use crate::domain::{self, Format, Group, TransportMode};
use crate::error::EnaError;
use crate::fs_util;
use crate::manifest::{self, Manifest, RemoteFile};
use crate::portal::EnaClient;
use crate::query::{self, ResultSet};
use crate::transfer::{FileTransfer, MAX_ATTEMPTS, with_retry};
use crate::wgs::{self, SetStatus};

const TAXON_GROUP_UNSUPPORTED: &str =
    "Sorry, tax ID retrieval not yet supported for read and analysis";

#[derive(Debug, Clone)]
pub struct DownloadOptions {
    pub dest: Utf8PathBuf,
    pub format: Option<Format>,
    pub fetch_wgs: bool,
    pub fetch_meta: bool,
    pub fetch_index: bool,
    pub extract_wgs: bool,
    pub expanded: bool,
    pub subtree: bool,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            dest: Utf8PathBuf::from("."),
            format: None,
            fetch_wgs: false,
            fetch_meta: false,
            fetch_index: false,
            extract_wgs: false,
            expanded: false,
            subtree: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferFailure {
    pub target: String,
    pub reason: String,
}

/// Outcome of one batch: files written and the per-file failures that did not abort it.
#[derive(Debug, Clone, Default)]
pub struct DownloadReport {
    pub files: Vec<String>,
    pub failures: Vec<TransferFailure>,
}

impl DownloadReport {
    fn add_file(&mut self, path: &Utf8Path) {
        let path = path.to_string();
        if !self.files.contains(&path) {
            self.files.push(path);
        }
    }

    fn fail(&mut self, target: impl Into<String>, reason: impl ToString) {
        self.failures.push(TransferFailure {
            target: target.into(),
            reason: reason.to_string(),
        });
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressLevel {
    Info,
    Warning,
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub level: ProgressLevel,
    pub message: String,
}

impl ProgressEvent {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: ProgressLevel::Info,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: ProgressLevel::Warning,
            message: message.into(),
        }
    }
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

/// Download orchestrator. Record views and searches go through `C`; files go
/// through the accelerated client `A` when one is configured, `F` otherwise.
pub struct App<C: EnaClient, F: FileTransfer, A: FileTransfer> {
    client: C,
    ftp: F,
    aspera: Option<A>,
}

impl<C: EnaClient, F: FileTransfer, A: FileTransfer> App<C, F, A> {
    pub fn new(client: C, ftp: F, aspera: Option<A>) -> Self {
        Self {
            client,
            ftp,
            aspera,
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn file_transfer(&self) -> &F {
        &self.ftp
    }

    pub fn mode(&self) -> TransportMode {
        if self.aspera.is_some() {
            TransportMode::Aspera
        } else {
            TransportMode::Ftp
        }
    }

    pub fn download_accession(
        &self,
        accession: &Accession,
        options: &DownloadOptions,
        sink: &dyn ProgressSink,
    ) -> Result<DownloadReport, EnaError> {
        check_accession(accession, options.format)?;
        let kind = accession.kind();
        // WGS sets have no record view to probe
        if !matches!(kind, RecordKind::WgsSet(_)) && !self.client.is_available(accession)? {
            return Err(EnaError::NotAvailable(accession.to_string()));
        }

        fs_util::ensure_dir(&options.dest)?;
        let mut report = DownloadReport::default();
        let record_format = options.format.unwrap_or(Format::Embl);
        match kind {
            RecordKind::Sequence | RecordKind::Coding => {
                self.notice_ftp_only("sequence downloads", sink);
                self.download_sequence(
                    accession.as_str(),
                    record_format,
                    options.expanded,
                    &options.dest,
                    &mut report,
                    sink,
                )?;
            }
            RecordKind::WgsSet(_) => {
                self.notice_ftp_only("WGS data", sink);
                self.download_wgs(
                    accession.as_str(),
                    record_format,
                    &options.dest,
                    &mut report,
                    sink,
                )?;
            }
            RecordKind::Assembly => {
                self.notice_ftp_only("assembly data", sink);
                self.download_assembly(
                    accession.as_str(),
                    record_format,
                    options,
                    &options.dest,
                    false,
                    &mut report,
                    sink,
                )?;
            }
            RecordKind::Run | RecordKind::Experiment | RecordKind::Analysis => {
                self.download_read_files(accession, options, &options.dest, &mut report, sink)?;
            }
            RecordKind::Study(_) | RecordKind::Sample(_) | RecordKind::Taxon => {
                return Err(EnaError::GroupAccession(accession.to_string()));
            }
        }
        Ok(report)
    }

    pub fn download_group(
        &self,
        accession: &Accession,
        group: Group,
        options: &DownloadOptions,
        sink: &dyn ProgressSink,
    ) -> Result<DownloadReport, EnaError> {
        let format = check_group(accession, group, options.format)?;
        if !self.client.is_available(accession)? {
            return Err(EnaError::NotAvailable(accession.to_string()));
        }

        let group_dir = options.dest.join(accession.as_str());
        fs_util::ensure_dir(&group_dir)?;
        let mut report = DownloadReport::default();
        let member_options = DownloadOptions {
            format: Some(format),
            ..options.clone()
        };

        let result = match ResultSet::for_group(group) {
            Some(result) => result,
            None => {
                self.notice_ftp_only("sequence downloads", sink);
                self.download_sequence_group(
                    accession,
                    format,
                    options,
                    &group_dir,
                    &mut report,
                    sink,
                )?;
                return Ok(report);
            }
        };

        let query = query::group_query(accession, group, result, options.subtree)?;
        let rows = self.client.search(&query)?;
        debug!(members = rows.len(), %group, "group listing");
        for row in rows {
            let member = row.get(query.accession_field());
            if member.is_empty() {
                continue;
            }
            match group {
                Group::Wgs => {
                    let Some(prefix) = accession::wgs_prefix(&member) else {
                        report.fail(member.as_str(), "not a WGS set accession");
                        continue;
                    };
                    sink.event(ProgressEvent::info(format!("Fetching {prefix}")));
                    self.notice_ftp_only("WGS data", sink);
                    self.download_wgs(prefix, format, &group_dir, &mut report, sink)?;
                }
                Group::Assembly => {
                    sink.event(ProgressEvent::info(format!("Fetching {member}")));
                    self.notice_ftp_only("assembly data", sink);
                    self.download_assembly(
                        &member,
                        format,
                        &member_options,
                        &group_dir,
                        true,
                        &mut report,
                        sink,
                    )?;
                }
                Group::Read | Group::Analysis => {
                    sink.event(ProgressEvent::info(format!("Fetching {member}")));
                    match member.parse::<Accession>() {
                        Ok(member) => self.download_read_files(
                            &member,
                            &member_options,
                            &group_dir,
                            &mut report,
                            sink,
                        )?,
                        Err(err) => report.fail(member.as_str(), err),
                    }
                }
                Group::Sequence => {}
            }
        }
        Ok(report)
    }

    fn notice_ftp_only(&self, what: &str, sink: &dyn ProgressSink) {
        if self.aspera.is_some() {
            sink.event(ProgressEvent::info(format!(
                "Aspera not supported for {what}. Using FTP..."
            )));
        }
    }

    fn transport(&self) -> &dyn FileTransfer {
        match &self.aspera {
            Some(aspera) => aspera as &dyn FileTransfer,
            None => &self.ftp as &dyn FileTransfer,
        }
    }

    /// Writes (or appends) a record view to `destination`. The record is staged in a
    /// temporary file first, so a failed fetch leaves `destination` untouched.
    fn write_record(
        &self,
        accession: &str,
        format: Format,
        expanded: bool,
        destination: &Utf8Path,
        append: bool,
    ) -> Result<(), EnaError> {
        let dir = destination.parent().unwrap_or(Utf8Path::new("."));
        let mut staged = tempfile::Builder::new()
            .prefix(".ena-record")
            .tempfile_in(dir.as_std_path())
            .map_err(|err| EnaError::Filesystem(format!("stage {destination}: {err}")))?;
        self.client
            .fetch_record(accession, format, expanded, staged.as_file_mut())?;

        if !append {
            staged
                .persist(destination.as_std_path())
                .map_err(|err| EnaError::Filesystem(format!("write {destination}: {err}")))?;
            return Ok(());
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(destination.as_std_path())
            .map_err(|err| EnaError::Filesystem(format!("open {destination}: {err}")))?;
        staged
            .as_file_mut()
            .seek(SeekFrom::Start(0))
            .and_then(|_| io::copy(staged.as_file_mut(), &mut file))
            .map_err(|err| EnaError::Filesystem(format!("append {destination}: {err}")))?;
        Ok(())
    }

    fn download_sequence(
        &self,
        accession: &str,
        format: Format,
        expanded: bool,
        dir: &Utf8Path,
        report: &mut DownloadReport,
        sink: &dyn ProgressSink,
    ) -> Result<(), EnaError> {
        let destination = record_path(dir, accession, format)?;
        match self.write_record(accession, format, expanded, &destination, false) {
            Ok(()) => report.add_file(&destination),
            Err(err) => {
                sink.event(ProgressEvent::warning(format!(
                    "Unable to fetch file for {accession}, format {format}"
                )));
                report.fail(accession, err);
            }
        }
        Ok(())
    }

    /// Fetches the set file of a WGS prefix, trying the public location before
    /// the suppressed one. Returns the local file when one was found.
    fn download_wgs(
        &self,
        set_accession: &str,
        format: Format,
        dir: &Utf8Path,
        report: &mut DownloadReport,
        sink: &dyn ProgressSink,
    ) -> Result<Option<Utf8PathBuf>, EnaError> {
        let (Some(prefix), Some(suffix)) =
            (accession::wgs_prefix(set_accession), format.wgs_suffix())
        else {
            report.fail(set_accession, format!("no WGS set file for format {format}"));
            return Ok(None);
        };
        fs_util::ensure_dir(dir)?;
        let unversioned = accession::is_unversioned_wgs_set(prefix);

        for status in SetStatus::SEARCH_ORDER {
            let url = if unversioned {
                let directory = wgs::set_directory(prefix, status);
                let listing = match self.ftp.list(&directory) {
                    Ok(listing) => listing,
                    Err(err) => {
                        debug!(directory, error = %err, "WGS directory listing failed");
                        continue;
                    }
                };
                wgs::latest_file(&listing, prefix, suffix).map(|name| format!("{directory}/{name}"))
            } else {
                wgs::set_file_url(prefix, status, format)
            };
            let Some(url) = url else {
                continue;
            };
            match with_retry(MAX_ATTEMPTS, |_| self.ftp.fetch(&url, dir)) {
                Ok(path) => {
                    report.add_file(&path);
                    return Ok(Some(path));
                }
                Err(err) => debug!(url, error = %err, "WGS set not at this location"),
            }
        }

        sink.event(ProgressEvent::warning(format!(
            "No WGS set file available for {set_accession}, format {format}\n\
             Please contact ENA (datasubs@ebi.ac.uk) if you feel this set should be available"
        )));
        report.fail(set_accession, format!("no WGS set file available, format {format}"));
        Ok(None)
    }

    #[allow(clippy::too_many_arguments)]
    fn download_assembly(
        &self,
        accession: &str,
        format: Format,
        options: &DownloadOptions,
        dest: &Utf8Path,
        quiet: bool,
        report: &mut DownloadReport,
        sink: &dyn ProgressSink,
    ) -> Result<(), EnaError> {
        let assembly_dir = dest.join(accession);
        fs_util::ensure_dir(&assembly_dir)?;

        let xml_path = fs_util::metadata_file(&assembly_dir, accession);
        self.write_record(accession, Format::Xml, false, &xml_path, false)?;
        report.add_file(&xml_path);
        let xml = fs::read_to_string(xml_path.as_std_path())
            .map_err(|err| EnaError::Filesystem(format!("read {xml_path}: {err}")))?;
        let record = assembly::parse_assembly_xml(&xml)?;

        let sequence_report = match &record.sequence_report {
            Some(url) => self.fetch_sequence_report(url, &assembly_dir, report, sink)?,
            None => None,
        };

        let mut deferred: BTreeMap<String, Utf8PathBuf> = BTreeMap::new();
        if let Some(sequence_report) = &sequence_report {
            deferred = self.download_report_sequences(
                sequence_report,
                record.wgs_set.is_some(),
                format,
                options.expanded,
                &assembly_dir,
                quiet,
                report,
                sink,
            )?;
        }

        let Some(wgs_set) = &record.wgs_set else {
            return Ok(());
        };
        if !(options.fetch_wgs || sequence_report.is_none() || !deferred.is_empty()) {
            return Ok(());
        }
        if !quiet {
            sink.event(ProgressEvent::info("fetching wgs set"));
        }
        let set_file = self.download_wgs(wgs_set, format, &assembly_dir, report, sink)?;
        if !options.extract_wgs || deferred.is_empty() {
            return Ok(());
        }
        let Some(set_file) = set_file else {
            return Ok(());
        };
        if !quiet {
            sink.event(ProgressEvent::info(format!(
                "extracting {} scaffolds from {wgs_set}",
                deferred.len()
            )));
        }
        let found = wgs::extract_from_set(&set_file, &deferred)?;
        for (scaffold, target) in &deferred {
            if found.contains(scaffold) {
                report.add_file(target);
            } else {
                report.fail(scaffold.as_str(), format!("not found in WGS set {wgs_set}"));
            }
        }
        Ok(())
    }

    fn fetch_sequence_report(
        &self,
        url: &str,
        assembly_dir: &Utf8Path,
        report: &mut DownloadReport,
        sink: &dyn ProgressSink,
    ) -> Result<Option<SequenceReport>, EnaError> {
        match with_retry(MAX_ATTEMPTS, |_| self.ftp.fetch(url, assembly_dir)) {
            Ok(path) => {
                report.add_file(&path);
                let content = fs::read_to_string(path.as_std_path())
                    .map_err(|err| EnaError::Filesystem(format!("read {path}: {err}")))?;
                Ok(Some(assembly::parse_sequence_report(&content)))
            }
            Err(err) => {
                sink.event(ProgressEvent::warning(format!(
                    "Unable to fetch sequence report {url}"
                )));
                report.fail(url, err);
                Ok(None)
            }
        }
    }

    /// Appends each category's members to `<category>.<ext>`. WGS-style scaffolds
    /// are returned instead of fetched when the assembly names its WGS set.
    #[allow(clippy::too_many_arguments)]
    fn download_report_sequences(
        &self,
        sequence_report: &SequenceReport,
        has_wgs_set: bool,
        format: Format,
        expanded: bool,
        assembly_dir: &Utf8Path,
        quiet: bool,
        report: &mut DownloadReport,
        sink: &dyn ProgressSink,
    ) -> Result<BTreeMap<String, Utf8PathBuf>, EnaError> {
        let mut deferred = BTreeMap::new();
        for category in MoleculeCategory::ALL {
            let members = sequence_report.members(category);
            if members.is_empty() {
                if !quiet {
                    sink.event(ProgressEvent::info(format!("no sequences: {category}")));
                }
                continue;
            }
            let target = record_path(assembly_dir, category.as_str(), format)?;
            if !quiet {
                sink.event(ProgressEvent::info(format!("fetching sequences: {category}")));
            }

            let mut failed = Vec::new();
            for member in members {
                if has_wgs_set && category.is_scaffold() && accession::is_wgs_sequence(member) {
                    deferred.insert(wgs::strip_version(member).to_string(), target.clone());
                    continue;
                }
                if let Err(err) = self.write_record(member, format, expanded, &target, true) {
                    debug!(member, error = %err, "sequence fetch failed");
                    report.fail(member.as_str(), err);
                    failed.push(member.as_str());
                }
            }
            if target.as_std_path().exists() {
                report.add_file(&target);
            }
            if !failed.is_empty() {
                sink.event(ProgressEvent::warning(format!(
                    "Failed to fetch following {category}, format {format}\n{}",
                    failed.join(",")
                )));
            }
        }
        Ok(deferred)
    }

    fn download_read_files(
        &self,
        accession: &Accession,
        options: &DownloadOptions,
        dest: &Utf8Path,
        report: &mut DownloadReport,
        sink: &dyn ProgressSink,
    ) -> Result<(), EnaError> {
        let kind = accession.kind();
        let mode = self.mode();
        let accession_dir = dest.join(accession.as_str());
        fs_util::ensure_dir(&accession_dir)?;

        if options.fetch_meta {
            match kind {
                RecordKind::Experiment => {
                    self.download_meta(accession.as_str(), &accession_dir, report, sink)
                }
                RecordKind::Run => {
                    self.download_experiment_meta(accession, &accession_dir, report, sink)?
                }
                _ => {}
            }
        }

        let query = query::file_search_query(accession, mode, options.fetch_index)?;
        let rows = self.client.search(&query)?;
        for row in &rows {
            let manifest = Manifest::from_row(row, query.accession_field(), mode);
            let plan = manifest::resolve(&manifest, kind, options.format, options.fetch_index);
            let member = if plan.accession.is_empty() {
                accession.as_str()
            } else {
                plan.accession.as_str()
            };
            let target_dir = if kind == RecordKind::Experiment {
                accession_dir.join(member)
            } else {
                accession_dir.clone()
            };
            fs_util::ensure_dir(&target_dir)?;

            if options.fetch_meta {
                self.download_meta(member, &target_dir, report, sink);
            }
            if plan.is_empty() {
                let format = if options.format.is_some() || kind == RecordKind::Analysis {
                    plan.format.as_str()
                } else {
                    "any"
                };
                sink.event(ProgressEvent::warning(format!(
                    "No files of format {format} for {member}"
                )));
            }
            for file in &plan.files {
                self.transfer_file(file, &target_dir, report, sink);
            }
            for index in &plan.index_files {
                let index = RemoteFile {
                    url: index.clone(),
                    checksum: None,
                };
                self.transfer_file(&index, &target_dir, report, sink);
            }
            if kind == RecordKind::Experiment {
                fs_util::remove_if_empty(&target_dir)?;
            }
        }

        if fs_util::remove_if_empty(&accession_dir)? {
            debug!(dir = %accession_dir, "removed empty directory");
        }
        Ok(())
    }

    fn download_meta(
        &self,
        accession: &str,
        dir: &Utf8Path,
        report: &mut DownloadReport,
        sink: &dyn ProgressSink,
    ) {
        let destination = fs_util::metadata_file(dir, accession);
        match self.write_record(accession, Format::Xml, false, &destination, false) {
            Ok(()) => report.add_file(&destination),
            Err(err) => {
                sink.event(ProgressEvent::warning(format!(
                    "Unable to fetch metadata for {accession}"
                )));
                report.fail(accession, err);
            }
        }
    }

    fn download_experiment_meta(
        &self,
        run: &Accession,
        dir: &Utf8Path,
        report: &mut DownloadReport,
        sink: &dyn ProgressSink,
    ) -> Result<(), EnaError> {
        let rows = self.client.search(&query::experiment_query(run))?;
        let experiment = rows
            .first()
            .map(|row| row.get("experiment_accession"))
            .filter(|experiment| !experiment.is_empty());
        match experiment {
            Some(experiment) => self.download_meta(&experiment, dir, report, sink),
            None => sink.event(ProgressEvent::warning(format!(
                "No experiment found for run {run}"
            ))),
        }
        Ok(())
    }

    /// One file, at most [`MAX_ATTEMPTS`] tries; a checksum mismatch counts as a failed try.
    fn transfer_file(
        &self,
        file: &RemoteFile,
        dir: &Utf8Path,
        report: &mut DownloadReport,
        sink: &dyn ProgressSink,
    ) {
        let local = fs_util::local_file(dir, &file.url);
        if let Some(expected) = &file.checksum {
            if checksum::already_present(&local, expected) {
                sink.event(ProgressEvent::info(format!(
                    "Skipping {}: already downloaded",
                    file.file_name()
                )));
                report.add_file(&local);
                return;
            }
        }

        sink.event(ProgressEvent::info(format!("Downloading file: {}", file.url)));
        let result = with_retry(MAX_ATTEMPTS, |_| {
            let path = self.transport().fetch(&file.url, dir)?;
            if let Some(expected) = &file.checksum {
                checksum::verify(&path, expected)?;
            }
            Ok(path)
        });
        match result {
            Ok(path) => report.add_file(&path),
            Err(err) => {
                sink.event(ProgressEvent::warning(format!(
                    "Failed to download file {}: {err}",
                    file.url
                )));
                report.fail(file.url.as_str(), err);
            }
        }
    }

    fn download_sequence_group(
        &self,
        accession: &Accession,
        format: Format,
        options: &DownloadOptions,
        group_dir: &Utf8Path,
        report: &mut DownloadReport,
        sink: &dyn ProgressSink,
    ) -> Result<(), EnaError> {
        sink.event(ProgressEvent::info("Downloading sequences"));
        let destination = record_path(group_dir, &format!("{accession}_sequences"), format)?;
        let mut updated = HashSet::new();

        for result in [ResultSet::SequenceUpdate, ResultSet::SequenceRelease] {
            let query = query::group_query(accession, Group::Sequence, result, options.subtree)?;
            for row in self.client.search(&query)? {
                let member = row.get(query.accession_field());
                if member.is_empty() {
                    continue;
                }
                match result {
                    ResultSet::SequenceUpdate => {
                        updated.insert(member.clone());
                    }
                    _ if updated.contains(&member) => continue,
                    _ => {}
                }
                if let Err(err) =
                    self.write_record(&member, format, options.expanded, &destination, true)
                {
                    sink.event(ProgressEvent::warning(format!(
                        "Unable to fetch file for {member}, format {format}"
                    )));
                    report.fail(member, err);
                }
            }
        }
        if destination.as_std_path().exists() {
            report.add_file(&destination);
        }
        Ok(())
    }
}

/// Parses and vets a single-accession request; nothing touches the network.
pub fn prepare_accession(raw: &str, format: Option<Format>) -> Result<Accession, EnaError> {
    let accession: Accession = raw.parse()?;
    check_accession(&accession, format)?;
    Ok(accession)
}

/// Parses and vets a group request, returning the effective format.
pub fn prepare_group(
    raw: &str,
    group: Group,
    format: Option<Format>,
) -> Result<(Accession, Format), EnaError> {
    let accession: Accession = raw.parse().map_err(|err| match err {
        EnaError::InvalidAccession(value) => EnaError::NotGroupAccession(value),
        other => other,
    })?;
    let format = check_group(&accession, group, format)?;
    Ok((accession, format))
}

fn check_accession(accession: &Accession, format: Option<Format>) -> Result<(), EnaError> {
    let kind = accession.kind();
    if kind.is_group() {
        return Err(EnaError::GroupAccession(accession.to_string()));
    }
    let Some(format) = format else {
        return Ok(());
    };
    let allowed = match kind {
        RecordKind::WgsSet(_) => domain::wgs_format_allowed(format),
        _ => domain::accession_format_allowed(kind, format),
    };
    if allowed {
        return Ok(());
    }
    let allowed = match kind {
        RecordKind::WgsSet(_) => domain::format_list(&[Format::Embl, Format::Fasta, Format::Master]),
        _ => domain::format_list(domain::allowed_formats(kind)),
    };
    Err(EnaError::IllegalFormat {
        accession: accession.to_string(),
        kind: kind.to_string(),
        format: format.to_string(),
        allowed,
    })
}

fn check_group(
    accession: &Accession,
    group: Group,
    format: Option<Format>,
) -> Result<Format, EnaError> {
    if !accession.kind().is_group() {
        return Err(EnaError::NotGroupAccession(accession.to_string()));
    }
    let format = match format {
        Some(format) if !domain::group_format_allowed(group, format) => {
            return Err(EnaError::IllegalGroupFormat {
                group: group.to_string(),
                format: format.to_string(),
                allowed: domain::format_list(group.allowed_formats()),
            });
        }
        Some(format) => format,
        None => group.default_format(),
    };
    if accession.kind() == RecordKind::Taxon && matches!(group, Group::Read | Group::Analysis) {
        return Err(EnaError::UnsupportedGroup(TAXON_GROUP_UNSUPPORTED.to_string()));
    }
    Ok(format)
}

fn record_path(dir: &Utf8Path, base: &str, format: Format) -> Result<Utf8PathBuf, EnaError> {
    fs_util::record_file(dir, base, format).ok_or_else(|| EnaError::IllegalFormat {
        accession: base.to_string(),
        kind: "record".to_string(),
        format: format.to_string(),
        allowed: domain::format_list(&[Format::Embl, Format::Fasta]),
    })
}
