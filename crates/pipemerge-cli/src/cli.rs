//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "pipemerge",
    version,
    about = "Merge pipeline exports into the report template",
    long_about = "Merge a raw pipeline export into the fixed report template.\n\n\
                  The raw header row is detected automatically, template columns are\n\
                  mapped by name and content, and rows are cleaned and ordered before\n\
                  being written into a copy of the template."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Configuration file with the template and output locations.
    #[arg(
        long = "config",
        short = 'c',
        value_name = "PATH",
        default_value = "pipemerge.toml",
        global = true
    )]
    pub config: PathBuf,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for humans, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Merge a raw export into the template.
    Merge(MergeArgs),

    /// Show the template's column slots.
    Inspect(InspectArgs),

    /// Detect the raw header and show the column mapping without writing output.
    Map(MapArgs),

    /// Validate a new template and install it, archiving the current one.
    ReplaceTemplate(ReplaceArgs),
}

/// Template path override shared by several subcommands.
#[derive(Args, Clone, Default)]
pub struct TemplateArg {
    /// Template workbook (overrides `template.path` from the config).
    #[arg(long = "template", value_name = "PATH")]
    pub template: Option<PathBuf>,
}

#[derive(Args)]
pub struct MergeArgs {
    /// Raw pipeline export (.xlsx, .xlsm, .xls, .ods or .csv).
    #[arg(value_name = "RAW")]
    pub raw: PathBuf,

    #[command(flatten)]
    pub template: TemplateArg,

    /// Output directory (overrides `output.dir` from the config).
    #[arg(long = "output-dir", value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Print the merge report as JSON.
    #[arg(long = "json")]
    pub json: bool,

    /// Exit with status 2 when the merge raised warnings.
    #[arg(long = "strict")]
    pub strict: bool,
}

#[derive(Args)]
pub struct InspectArgs {
    #[command(flatten)]
    pub template: TemplateArg,

    /// Print the slots as JSON.
    #[arg(long = "json")]
    pub json: bool,
}

#[derive(Args)]
pub struct MapArgs {
    /// Raw pipeline export to analyze.
    #[arg(value_name = "RAW")]
    pub raw: PathBuf,

    #[command(flatten)]
    pub template: TemplateArg,

    /// Print the analysis as JSON.
    #[arg(long = "json")]
    pub json: bool,
}

#[derive(Args)]
pub struct ReplaceArgs {
    /// Candidate template workbook.
    #[arg(value_name = "NEW")]
    pub new_template: PathBuf,

    #[command(flatten)]
    pub template: TemplateArg,

    /// Backup directory (overrides `template.backup_dir` from the config).
    #[arg(long = "backup-dir", value_name = "DIR")]
    pub backup_dir: Option<PathBuf>,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_flags() {
        let cli = Cli::try_parse_from([
            "pipemerge",
            "merge",
            "export.xlsx",
            "--template",
            "t.xlsx",
            "--output-dir",
            "out",
            "--strict",
            "--config",
            "alt.toml",
        ])
        .expect("parse");
        assert_eq!(cli.config, PathBuf::from("alt.toml"));
        let Command::Merge(args) = cli.command else {
            panic!("expected merge");
        };
        assert_eq!(args.raw, PathBuf::from("export.xlsx"));
        assert_eq!(args.template.template, Some(PathBuf::from("t.xlsx")));
        assert_eq!(args.output_dir, Some(PathBuf::from("out")));
        assert!(args.strict);
        assert!(!args.json);
    }

    #[test]
    fn test_default_config_path() {
        let cli = Cli::try_parse_from(["pipemerge", "inspect"]).expect("parse");
        assert_eq!(cli.config, PathBuf::from("pipemerge.toml"));
        assert!(matches!(cli.command, Command::Inspect(_)));
    }

    #[test]
    fn test_replace_template_subcommand() {
        let cli = Cli::try_parse_from(["pipemerge", "replace-template", "new.xlsx"])
            .expect("parse");
        let Command::ReplaceTemplate(args) = cli.command else {
            panic!("expected replace-template");
        };
        assert_eq!(args.new_template, PathBuf::from("new.xlsx"));
        assert_eq!(args.backup_dir, None);
    }

    #[test]
    fn test_map_requires_raw() {
        assert!(Cli::try_parse_from(["pipemerge", "map"]).is_err());
    }
}
