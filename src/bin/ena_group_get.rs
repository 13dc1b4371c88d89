use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::Parser;
use miette::IntoDiagnostic;

use ena_browser_tools::app::{self, DownloadOptions};
use ena_browser_tools::cli::{self, TransportArgs};
use ena_browser_tools::domain::{Format, Group};
use ena_browser_tools::output::ConsoleOutput;

#[derive(Parser)]
#[command(name = "ena-group-get")]
#[command(about = "Download data for a given study or sample, or (for sequence and assembly) taxon")]
#[command(version, disable_version_flag = true)]
struct Cli {
    /// Study or sample accession or NCBI tax ID to fetch data for
    accession: String,

    /// Data group to be downloaded for this study/sample/taxon
    #[arg(short = 'g', long = "group", default_value = "read")]
    group: Group,

    /// File format required. sequence, assembly and wgs groups: embl (default) and fasta.
    /// read group: submitted (default), fastq and sra. analysis group: submitted only
    #[arg(short = 'f', long = "format")]
    format: Option<Format>,

    /// Destination directory
    #[arg(short = 'd', long = "dest", default_value = ".")]
    dest: Utf8PathBuf,

    /// Download WGS set for each assembly if available
    #[arg(short = 'w', long = "wgs")]
    wgs: bool,

    /// Extract WGS scaffolds for each assembly if available
    #[arg(short = 'e', long = "extract-wgs")]
    extract_wgs: bool,

    /// Download the expanded sequence records (EMBL and FASTA only)
    #[arg(long = "expanded", visible_alias = "exp")]
    expanded: bool,

    /// Download read or analysis XML in addition to data files
    #[arg(short = 'm', long = "meta")]
    meta: bool,

    /// Download CRAM index files with submitted CRAM files, if any. Ignored for fastq and sra
    #[arg(short = 'i', long = "index")]
    index: bool,

    #[command(flatten)]
    transport: TransportArgs,

    /// Include subordinate taxa (taxon subtree) when querying with NCBI tax ID
    #[arg(short = 't', long = "subtree")]
    subtree: bool,

    /// Print version
    #[arg(short = 'v', long = "version", action = clap::ArgAction::Version)]
    version: Option<bool>,
}

fn main() -> ExitCode {
    cli::init_tracing();
    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(report) => cli::exit_with(report),
    }
}

fn run(args: Cli) -> miette::Result<()> {
    let (accession, format) = app::prepare_group(&args.accession, args.group, args.format)?;
    let transport = args.transport.resolve(&ConsoleOutput)?;
    let app = cli::build_app(&transport)?;

    let options = DownloadOptions {
        dest: args.dest,
        format: Some(format),
        fetch_wgs: args.wgs,
        fetch_meta: args.meta,
        fetch_index: args.index,
        extract_wgs: args.extract_wgs,
        expanded: args.expanded,
        subtree: args.subtree,
    };
    let report = app.download_group(&accession, args.group, &options, &ConsoleOutput)?;
    ConsoleOutput::print_summary(&report).into_diagnostic()?;
    println!("Completed");
    Ok(())
}
