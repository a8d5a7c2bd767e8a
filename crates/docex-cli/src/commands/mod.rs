//! CLI subcommands.

pub mod check;
pub mod config;
pub mod process;
pub mod run;

use std::path::{Path, PathBuf};

use clap::ValueEnum;
use tracing::debug;

use docex_core::models::config::{ClassificationMode, DocexConfig, UnknownPolicy};

/// Default configuration file location.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("docex")
        .join("config.json")
}

/// Resolve the config file in use: `--config` if given, else the default path.
pub fn config_path(explicit: Option<&str>) -> PathBuf {
    explicit.map(PathBuf::from).unwrap_or_else(default_config_path)
}

/// Load configuration from `--config`, the default path, or built-in defaults.
pub fn load_config(explicit: Option<&str>) -> anyhow::Result<DocexConfig> {
    match explicit {
        Some(path) => DocexConfig::from_file(Path::new(path))
            .map_err(|e| anyhow::anyhow!("Failed to load config {}: {}", path, e)),
        None => {
            let path = default_config_path();
            if path.exists() {
                debug!("Loading configuration from {}", path.display());
                Ok(DocexConfig::from_file(&path)?)
            } else {
                Ok(DocexConfig::default())
            }
        }
    }
}

/// Flags shared by commands that talk to the completion service.
#[derive(clap::Args, Debug, Default)]
pub struct CompletionArgs {
    /// Model name
    #[arg(long)]
    pub model: Option<String>,

    /// Completion service base URL
    #[arg(long)]
    pub base_url: Option<String>,
}

impl CompletionArgs {
    pub fn apply(&self, config: &mut DocexConfig) {
        if let Some(model) = &self.model {
            config.completion.model = model.clone();
        }
        if let Some(url) = &self.base_url {
            config.completion.base_url = url.clone();
        }
    }
}

/// Classification source selectable on the command line.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum ClassificationArg {
    /// The model classifies while extracting
    Model,
    /// Keyword heuristics pick a schema first
    Keywords,
}

impl From<ClassificationArg> for ClassificationMode {
    fn from(arg: ClassificationArg) -> Self {
        match arg {
            ClassificationArg::Model => ClassificationMode::Model,
            ClassificationArg::Keywords => ClassificationMode::Keywords,
        }
    }
}

/// Unknown-classification policy selectable on the command line.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum UnknownPolicyArg {
    /// Keep the single attempt
    Single,
    /// Retry under each document schema and keep the best record
    BestOfSchemas,
}

impl From<UnknownPolicyArg> for UnknownPolicy {
    fn from(arg: UnknownPolicyArg) -> Self {
        match arg {
            UnknownPolicyArg::Single => UnknownPolicy::Single,
            UnknownPolicyArg::BestOfSchemas => UnknownPolicy::BestOfSchemas,
        }
    }
}
