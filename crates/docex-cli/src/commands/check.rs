//! Check command - probe the completion service and the PDF renderer.

use clap::Args;
use console::style;

use docex_core::extraction::{CompletionService, OllamaClient};
use docex_core::models::config::RasterizerKind;
use docex_core::pdf::PdftoppmRasterizer;

use super::{load_config, CompletionArgs};

/// Arguments for the check command.
#[derive(Args)]
pub struct CheckArgs {
    #[command(flatten)]
    completion: CompletionArgs,
}

pub async fn run(args: CheckArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let mut config = load_config(config_path)?;
    args.completion.apply(&mut config);
    config.validate()?;

    if config.pdf.rasterizer == RasterizerKind::Pdftoppm {
        if PdftoppmRasterizer::is_available() {
            println!("{} pdftoppm found", style("✓").green());
        } else {
            println!(
                "{} pdftoppm not found; PDFs will fail unless pdf.rasterizer is \"embedded\"",
                style("!").yellow()
            );
        }
    }

    let client = OllamaClient::new(config.completion.clone())?;
    match client.health_check().await {
        Ok(()) => {
            println!(
                "{} Completion service reachable at {} (model {})",
                style("✓").green(),
                config.completion.base_url,
                client.model()
            );
            Ok(())
        }
        Err(e) => {
            println!(
                "{} Completion service unreachable at {}",
                style("✗").red(),
                config.completion.base_url
            );
            Err(e.into())
        }
    }
}
