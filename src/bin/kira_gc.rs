use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use kira_gene_counts::app::{App, RunRequest, RunResult};
use kira_gene_counts::config::ConfigLoader;
use kira_gene_counts::domain::AnnotationType;
use kira_gene_counts::error::KiraError;
use kira_gene_counts::output::{ConsoleOutput, JsonOutput, OutputMode};
use kira_gene_counts::store::Store;

#[derive(Parser)]
#[command(name = "kira-gc")]
#[command(
    about = "Per-gene annotation count matrices, normalized abundances and taxon averages"
)]
#[command(version, author)]
struct Cli {
    /// Directory with per-portal .tab annotation files
    #[arg(long, visible_alias = "annotation_dir")]
    annotation_dir: PathBuf,

    /// CSV with at least portal, genus and species columns
    #[arg(long, visible_alias = "metadata_path")]
    metadata_path: PathBuf,

    /// Directory the CSV tables are written to (created if absent)
    #[arg(long, visible_alias = "output_dir")]
    output_dir: PathBuf,

    /// Annotation vocabulary; detected from file names when omitted
    #[arg(long, visible_alias = "annotation_type", value_enum)]
    annotation_type: Option<AnnotationType>,

    /// JSON config overriding key columns, portal markers or the normalization total
    #[arg(long)]
    config: Option<String>,

    /// Print the run summary as JSON on stdout
    #[arg(long)]
    non_interactive: bool,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(kira) = report.downcast_ref::<KiraError>() {
            return ExitCode::from(map_exit_code(kira));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &KiraError) -> u8 {
    match error {
        KiraError::TypeNotDetected(_)
        | KiraError::UnknownAnnotationType(_)
        | KiraError::NoAnnotationFiles(_)
        | KiraError::MetadataColumn(_)
        | KiraError::MetadataParse { .. }
        | KiraError::ConfigRead(_)
        | KiraError::ConfigParse(_)
        | KiraError::InvalidConfig(_) => 2,
        KiraError::TableParse { .. } | KiraError::MissingColumn { .. } => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.non_interactive {
        OutputMode::NonInteractive
    } else {
        OutputMode::Interactive
    };

    let config = ConfigLoader::resolve(cli.config.as_deref())?;
    let store = Store::new(&cli.output_dir)?;
    let app = App::new(store, config);
    let request = RunRequest {
        annotation_dir: cli.annotation_dir,
        metadata_path: cli.metadata_path,
        annotation_type: cli.annotation_type,
    };

    match output_mode {
        OutputMode::NonInteractive => {
            let result = app.run(request, &JsonOutput)?;
            JsonOutput::print_run(&result).into_diagnostic()?;
        }
        OutputMode::Interactive => {
            let result = app.run(request, &ConsoleOutput)?;
            print_run_summary(&result);
        }
    }
    Ok(())
}

fn print_run_summary(result: &RunResult) {
    let green = "\x1b[32m";
    let yellow = "\x1b[33m";
    let cyan = "\x1b[36m";
    let reset = "\x1b[0m";

    let origin = if result.detected { "detected" } else { "requested" };
    println!(
        "{cyan}KIRA-GC summary: {} ({origin}, key column {}){reset}",
        result.annotation_type, result.key_column
    );
    println!(
        "{green}Portals: {}  Genes: {}{reset}",
        result.portals, result.genes
    );
    for file in &result.selected {
        println!(
            "{green}  + {} <- {} (date {}){reset}",
            file.portal, file.file_name, file.date
        );
    }
    if !result.skipped.is_empty() {
        println!("{yellow}Skipped files: {}{reset}", result.skipped.len());
        for file in &result.skipped {
            match &file.kept {
                Some(kept) => println!(
                    "{yellow}  - {} (superseded by {kept}){reset}",
                    file.file_name
                ),
                None => println!("{yellow}  - {} (empty or unreadable){reset}", file.file_name),
            }
        }
    }
    for output in &result.outputs {
        println!("{cyan}  {} -> {}{reset}", output.kind, output.path);
    }
}
