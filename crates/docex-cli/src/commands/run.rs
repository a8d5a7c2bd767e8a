//! Run command - batch extraction over a directory of scanned documents.

use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use docex_core::models::outcome::Stage;
use docex_core::output::BatchReport;
use docex_core::pipeline::{connect_default, discover};

use super::{load_config, ClassificationArg, CompletionArgs, UnknownPolicyArg};

/// Arguments for the run command.
#[derive(Args)]
pub struct RunArgs {
    /// Directory containing scanned documents
    #[arg(default_value = "samples")]
    input_dir: PathBuf,

    /// Output directory for JSON/XLSX files
    #[arg(short, long, default_value = "output")]
    output_dir: PathBuf,

    /// Descend into subdirectories
    #[arg(short, long)]
    recursive: bool,

    /// Skip documents whose outputs already exist
    #[arg(long)]
    resume: bool,

    #[command(flatten)]
    completion: CompletionArgs,

    /// Where the document type comes from
    #[arg(long, value_enum)]
    classification: Option<ClassificationArg>,

    /// What to do when the model answers Unknown
    #[arg(long, value_enum)]
    unknown_policy: Option<UnknownPolicyArg>,

    /// Do not write summary.csv
    #[arg(long)]
    no_summary: bool,
}

pub async fn run(args: RunArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let mut config = load_config(config_path)?;
    args.completion.apply(&mut config);
    if args.recursive {
        config.batch.recursive = true;
    }
    if args.resume {
        config.batch.resume = true;
    }
    if args.no_summary {
        config.batch.summary_csv = false;
    }
    if let Some(mode) = args.classification {
        config.extraction.classification = mode.into();
    }
    if let Some(policy) = args.unknown_policy {
        config.extraction.unknown_policy = policy.into();
    }

    let documents = discover(&args.input_dir, config.batch.recursive)?;
    if documents.is_empty() {
        println!(
            "{} No supported documents found in {}",
            style("ℹ").blue(),
            args.input_dir.display()
        );
        return Ok(());
    }

    println!(
        "{} Found {} files to process",
        style("ℹ").blue(),
        documents.len()
    );

    let pipeline = connect_default(config)
        .await
        .map_err(|e| anyhow::anyhow!("Cannot start batch: {}", e))?;

    let pb = ProgressBar::new(documents.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files {msg}")?
            .progress_chars("=>-"),
    );

    let report = pipeline
        .run_documents(&documents, &args.output_dir, |outcome| {
            if let Some(name) = outcome.path.file_name() {
                pb.set_message(name.to_string_lossy().into_owned());
            }
            pb.inc(1);
        })
        .await?;

    pb.finish_and_clear();
    print_summary(&report, start);
    info!("Outputs in {}", args.output_dir.display());

    Ok(())
}

fn print_summary(report: &BatchReport, start: Instant) {
    println!();
    println!(
        "{} Processed {} files in {:?}",
        style("✓").green(),
        report.processed(),
        start.elapsed()
    );
    println!(
        "   {} successful, {} failed, {} skipped",
        style(report.succeeded).green(),
        style(report.failed()).red(),
        style(report.skipped).yellow()
    );

    if report.failed() > 0 {
        let by_stage: Vec<String> = Stage::ALL
            .iter()
            .filter(|s| report.failures(**s) > 0)
            .map(|s| format!("{} {}", report.failures(*s), s))
            .collect();
        println!("   failures by stage: {}", by_stage.join(", "));

        println!();
        println!("{}", style("Failed files:").red());
        for (path, stage, message) in report.failures_iter() {
            println!("  - {} [{}]: {}", path.display(), stage, message);
        }
    }
}
