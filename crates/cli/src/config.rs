use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::Deserialize;
use sync_core::extractor::{ExtractStrategy, DEFAULT_ANCHOR, DEFAULT_CONTAINER};

pub const DEFAULT_SOURCE: &str = "lib/data/apps.ts";
pub const DEFAULT_TARGET: &str = "site/src/content/ecosystem/plasma.yaml";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    /// Read every record inside the container array
    Container,
    /// Read every object anchored on the id field, anywhere in the file
    Scan,
}

/// Optional TOML config file
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub extract: ExtractConfig,
    pub keep_unmentioned: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PathsConfig {
    pub source: Option<PathBuf>,
    pub target: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExtractConfig {
    pub strategy: Option<StrategyKind>,
    pub container: Option<String>,
    pub anchor: Option<String>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::parse(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}

/// Values given on the command line; `None` means "not given"
#[derive(Debug, Default)]
pub struct Overrides {
    pub source: Option<PathBuf>,
    pub target: Option<PathBuf>,
    pub strategy: Option<StrategyKind>,
    pub container: Option<String>,
    pub anchor: Option<String>,
    pub keep_unmentioned: Option<bool>,
}

/// Fully resolved run settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub source: PathBuf,
    pub target: PathBuf,
    pub strategy: ExtractStrategy,
    pub keep_unmentioned: bool,
}

impl Settings {
    /// Command line beats config file beats built-in defaults
    pub fn resolve(overrides: Overrides, file: FileConfig) -> Self {
        let source = overrides
            .source
            .or(file.paths.source)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SOURCE));
        let target = overrides
            .target
            .or(file.paths.target)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_TARGET));

        let kind = overrides
            .strategy
            .or(file.extract.strategy)
            .unwrap_or(StrategyKind::Container);
        let strategy = match kind {
            StrategyKind::Container => ExtractStrategy::Container {
                marker: overrides
                    .container
                    .or(file.extract.container)
                    .unwrap_or_else(|| DEFAULT_CONTAINER.to_string()),
            },
            StrategyKind::Scan => ExtractStrategy::Scan {
                anchor: overrides
                    .anchor
                    .or(file.extract.anchor)
                    .unwrap_or_else(|| DEFAULT_ANCHOR.to_string()),
            },
        };

        Self {
            source,
            target,
            strategy,
            keep_unmentioned: overrides
                .keep_unmentioned
                .or(file.keep_unmentioned)
                .unwrap_or(false),
        }
    }
}
