use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use sync_core::application::{SyncOptions, SyncServiceImpl};
use sync_core::patcher::PatchOptions;
use sync_core::ports::{RecordSource, TargetDocument};
use tracing::{error, info};
use typescript_adapter::TypeScriptRecordSource;
use yaml_adapter::YamlTargetDocument;

mod config;
mod logging;

use config::{FileConfig, Overrides, Settings, StrategyKind};

/// CLI tool to copy app websites and social links from a TypeScript data module into the ecosystem YAML
#[derive(Parser, Debug)]
#[command(name = "social-sync")]
#[command(about = "Updates websites and social links in the ecosystem YAML from the TypeScript apps data")]
struct Cli {
    /// TypeScript file holding the apps data [default: lib/data/apps.ts]
    #[arg(short = 's', long = "source")]
    source: Option<PathBuf>,

    /// YAML file to patch in place [default: site/src/content/ecosystem/plasma.yaml]
    #[arg(short = 't', long = "target")]
    target: Option<PathBuf>,

    /// How records are located in the source file [default: container]
    #[arg(long, value_enum)]
    strategy: Option<StrategyKind>,

    /// Name of the array holding the records [default: APPS_DATA]
    #[arg(long)]
    container: Option<String>,

    /// Key that opens every record when scanning [default: id]
    #[arg(long)]
    anchor: Option<String>,

    /// Leave twitter/discord lines alone when the source does not mention the link
    #[arg(long, overrides_with = "no_keep_unmentioned")]
    keep_unmentioned: bool,

    /// Blank twitter/discord lines the source does not mention, even if the config keeps them
    #[arg(long, overrides_with = "keep_unmentioned")]
    no_keep_unmentioned: bool,

    /// Report what would change without writing the target
    #[arg(long)]
    dry_run: bool,

    /// Optional TOML config file
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    // Whichever of the two flags came last; `None` when neither was given
    fn keep_unmentioned_flag(&self) -> Option<bool> {
        match (self.keep_unmentioned, self.no_keep_unmentioned) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    if let Err(e) = run(cli) {
        error!("{e:#}");
        eprintln!("Error during sync: {e:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let file_config = match &cli.config {
        Some(path) => FileConfig::load(path)?,
        None => FileConfig::default(),
    };
    let keep_unmentioned = cli.keep_unmentioned_flag();
    let settings = Settings::resolve(
        Overrides {
            source: cli.source,
            target: cli.target,
            strategy: cli.strategy,
            container: cli.container,
            anchor: cli.anchor,
            keep_unmentioned,
        },
        file_config,
    );

    // Instantiate concrete implementations of secondary adapters
    let record_source: Box<dyn RecordSource> = Box::new(TypeScriptRecordSource::new(
        settings.source.clone(),
        settings.strategy.clone(),
    ));
    let target_document: Box<dyn TargetDocument> =
        Box::new(YamlTargetDocument::new(settings.target.clone()));

    let options = SyncOptions {
        patch: PatchOptions {
            keep_unmentioned: settings.keep_unmentioned,
        },
        dry_run: cli.dry_run,
    };
    let service = SyncServiceImpl::new(record_source, target_document, options);

    let summary = service.execute_sync().with_context(|| {
        format!(
            "syncing {} into {}",
            settings.source.display(),
            settings.target.display()
        )
    })?;

    info!(
        "Update completed: {} apps read, {} entries matched, {} unmatched{}",
        summary.records_found,
        summary.report.matched(),
        summary.report.unmatched(),
        if summary.written { "" } else { " (target not written)" }
    );
    Ok(())
}
