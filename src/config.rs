use crate::cli::Cli;
use anyhow::Context;
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_NAMESPACE: &str = "default";
pub const DEFAULT_INSTANCE: &str = "wandb";

/// Optional settings file; every key can also be given on the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileSettings {
    pub context: Option<String>,
    pub namespace: Option<String>,
    pub instance: Option<String>,
    pub output_dir: Option<PathBuf>,
}

impl FileSettings {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn parse(text: &str) -> anyhow::Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }
}

/// Effective settings: defaults, then the settings file, then CLI flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub context: Option<String>,
    pub namespace: String,
    pub instance: String,
    pub output_dir: PathBuf,
}

impl Settings {
    pub fn resolve(cli: &Cli, file: FileSettings) -> Self {
        Self {
            context: cli.context.clone().or(file.context),
            namespace: cli
                .namespace
                .clone()
                .or(file.namespace)
                .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string()),
            instance: cli
                .instance
                .clone()
                .or(file.instance)
                .unwrap_or_else(|| DEFAULT_INSTANCE.to_string()),
            output_dir: cli
                .output_dir
                .clone()
                .or(file.output_dir)
                .unwrap_or_else(|| PathBuf::from(".")),
        }
    }

    pub fn load(cli: &Cli) -> anyhow::Result<Self> {
        let file = match &cli.config {
            Some(path) => FileSettings::load(path)?,
            None => FileSettings::default(),
        };
        Ok(Self::resolve(cli, file))
    }
}
