use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::Parser;
use miette::IntoDiagnostic;

use ena_browser_tools::app::{self, DownloadOptions};
use ena_browser_tools::cli::{self, TransportArgs};
use ena_browser_tools::domain::Format;
use ena_browser_tools::output::ConsoleOutput;

#[derive(Parser)]
#[command(name = "ena-data-get")]
#[command(about = "Download data for a given accession")]
#[command(version, disable_version_flag = true)]
struct Cli {
    /// Sequence, coding, assembly, run, experiment or analysis accession or WGS prefix (LLLLVV) to download
    accession: String,

    /// File format required. sequence, assembly and wgs accessions: embl (default) and fasta
    /// (master for WGS sets). read: submitted, fastq and sra. analysis: submitted only
    #[arg(short = 'f', long = "format")]
    format: Option<Format>,

    /// Destination directory
    #[arg(short = 'd', long = "dest", default_value = ".")]
    dest: Utf8PathBuf,

    /// Download the WGS set of an assembly if available
    #[arg(short = 'w', long = "wgs")]
    wgs: bool,

    /// Extract WGS scaffolds for each assembly if available
    #[arg(short = 'e', long = "extract-wgs")]
    extract_wgs: bool,

    /// Download the expanded sequence record (EMBL and FASTA only)
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
    let accession = app::prepare_accession(&args.accession, args.format)?;
    let transport = args.transport.resolve(&ConsoleOutput)?;
    let app = cli::build_app(&transport)?;

    let options = DownloadOptions {
        dest: args.dest,
        format: args.format,
        fetch_wgs: args.wgs,
        fetch_meta: args.meta,
        fetch_index: args.index,
        extract_wgs: args.extract_wgs,
        expanded: args.expanded,
        subtree: false,
    };
    let report = app.download_accession(&accession, &options, &ConsoleOutput)?;
    ConsoleOutput::print_summary(&report).into_diagnostic()?;
    println!("Completed");
    Ok(())
}
