//! Process command - extract data from a single document.

use std::path::PathBuf;

use clap::Args;
use console::style;

use docex_core::models::outcome::ProcessingOutcome;
use docex_core::pipeline::connect_default;

use super::{load_config, ClassificationArg, CompletionArgs};

/// Arguments for the process command.
#[derive(Args)]
pub struct ProcessArgs {
    /// Input file (PDF or image)
    #[arg(required = true)]
    input: PathBuf,

    /// Output directory for JSON/XLSX files
    #[arg(short, long, default_value = "output")]
    output_dir: PathBuf,

    #[command(flatten)]
    completion: CompletionArgs,

    /// Where the document type comes from
    #[arg(long, value_enum)]
    classification: Option<ClassificationArg>,
}

pub async fn run(args: ProcessArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    let mut config = load_config(config_path)?;
    args.completion.apply(&mut config);
    if let Some(mode) = args.classification {
        config.extraction.classification = mode.into();
    }

    let pipeline = connect_default(config).await?;
    let result = pipeline.process_file(&args.input, &args.output_dir).await?;

    match result.outcome {
        ProcessingOutcome::Extracted { record, outputs } => {
            println!("{}", serde_json::to_string_pretty(&record)?);
            eprintln!(
                "{} Wrote {} and {} in {}ms",
                style("✓").green(),
                outputs.json.display(),
                outputs.xlsx.display(),
                result.elapsed_ms
            );
            Ok(())
        }
        ProcessingOutcome::Skipped { reason } => {
            anyhow::bail!("{} was skipped: {:?}", args.input.display(), reason)
        }
        ProcessingOutcome::Failed { stage, message } => {
            anyhow::bail!("{} failed ({}): {}", args.input.display(), stage, message)
        }
    }
}
