use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use pipemerge_core::{
    FsArchiver, MergeAnalysis, MergeConfig, MergeOrchestrator, MergeReport, ReplacementOutcome,
    TemplateReplacer,
};
use pipemerge_ingest::{TemplateStructure, read_template_structure};
use tracing::info_span;

use crate::cli::{InspectArgs, MapArgs, MergeArgs, ReplaceArgs, TemplateArg};

/// Load the config file and apply command-line overrides.
pub fn load_config(
    path: &Path,
    template: &TemplateArg,
    output_dir: Option<&PathBuf>,
) -> Result<MergeConfig> {
    let mut config = MergeConfig::from_file(path)
        .with_context(|| format!("load config {}", path.display()))?;
    if let Some(template) = &template.template {
        config.template.path.clone_from(template);
    }
    if let Some(dir) = output_dir {
        config.output.dir.clone_from(dir);
    }
    Ok(config)
}

pub fn run_merge(config_path: &Path, args: &MergeArgs) -> Result<MergeReport> {
    let config = load_config(config_path, &args.template, args.output_dir.as_ref())?;
    let orchestrator = MergeOrchestrator::new(config);
    orchestrator
        .merge_configured(&args.raw)
        .with_context(|| format!("merge {}", args.raw.display()))
}

pub fn run_inspect(config_path: &Path, args: &InspectArgs) -> Result<TemplateStructure> {
    let config = load_config(config_path, &args.template, None)?;
    let span = info_span!("inspect", template = %config.template.path.display());
    let _guard = span.enter();
    read_template_structure(&config.template.path, &config.template.layout)
        .with_context(|| format!("read template {}", config.template.path.display()))
}

pub fn run_map(config_path: &Path, args: &MapArgs) -> Result<MergeAnalysis> {
    let config = load_config(config_path, &args.template, None)?;
    let template = config.template.path.clone();
    MergeOrchestrator::new(config)
        .analyze(&args.raw, &template)
        .with_context(|| format!("analyze {}", args.raw.display()))
}

pub fn run_replace(config_path: &Path, args: &ReplaceArgs) -> Result<ReplacementOutcome> {
    let config = load_config(config_path, &args.template, None)?;
    let current = config.template.path.clone();
    let backup_dir = args
        .backup_dir
        .clone()
        .or_else(|| config.template.backup_dir.clone())
        .unwrap_or_else(|| default_backup_dir(&current));
    let replacer = TemplateReplacer::new(
        config.template.layout,
        Box::new(FsArchiver::new(backup_dir)),
    );
    replacer
        .replace(&args.new_template, &current)
        .with_context(|| format!("replace template with {}", args.new_template.display()))
}

/// `backups/` next to the current template.
fn default_backup_dir(template: &Path) -> PathBuf {
    template
        .parent()
        .map_or_else(|| PathBuf::from("backups"), |dir| dir.join("backups"))
}
