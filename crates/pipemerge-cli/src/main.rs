//! Pipeline report merge CLI.

use std::io::{self, IsTerminal};

use clap::{ColorChoice, Parser};
use pipemerge_cli::logging::{LogConfig, LogFormat, init_logging};
use tracing::level_filters::LevelFilter;

mod cli;
mod commands;
mod summary;

use crate::cli::{Cli, Command, LogFormatArg, LogLevelArg};
use crate::commands::{run_inspect, run_map, run_merge, run_replace};
use crate::summary::{print_analysis, print_json, print_merge_report, print_replacement, print_slots};

/// Exit status when `--strict` is set and the merge raised warnings.
const EXIT_WARNINGS: i32 = 2;

fn main() {
    let cli = Cli::parse();
    cli.color.write_global();
    let log_config = log_config_from_cli(&cli);
    if let Err(error) = init_logging(&log_config) {
        eprintln!("error: failed to initialize logging: {error}");
        std::process::exit(1);
    }
    let exit_code = match run(&cli) {
        Ok(code) => code,
        Err(error) => {
            eprintln!("error: {error:#}");
            1
        }
    };
    std::process::exit(exit_code);
}

fn run(cli: &Cli) -> anyhow::Result<i32> {
    match &cli.command {
        Command::Merge(args) => {
            let report = run_merge(&cli.config, args)?;
            if args.json {
                print_json(&report)?;
            } else {
                print_merge_report(&report);
            }
            Ok(if args.strict && report.has_warnings() {
                EXIT_WARNINGS
            } else {
                0
            })
        }
        Command::Inspect(args) => {
            let structure = run_inspect(&cli.config, args)?;
            if args.json {
                print_json(&structure.slots)?;
            } else {
                print_slots(&structure);
            }
            Ok(0)
        }
        Command::Map(args) => {
            let analysis = run_map(&cli.config, args)?;
            if args.json {
                print_json(&analysis)?;
            } else {
                print_analysis(&analysis);
            }
            Ok(0)
        }
        Command::ReplaceTemplate(args) => {
            let outcome = run_replace(&cli.config, args)?;
            print_replacement(&outcome);
            Ok(0)
        }
    }
}

/// Build logging configuration from CLI flags with consistent precedence.
fn log_config_from_cli(cli: &Cli) -> LogConfig {
    let mut config = LogConfig {
        level_filter: cli.verbosity.tracing_level_filter(),
        ..LogConfig::default()
    };
    config.use_env_filter = !(cli.verbosity.is_present() || cli.log_level.is_some());
    if let Some(level) = cli.log_level {
        config.level_filter = match level {
            LogLevelArg::Error => LevelFilter::ERROR,
            LogLevelArg::Warn => LevelFilter::WARN,
            LogLevelArg::Info => LevelFilter::INFO,
            LogLevelArg::Debug => LevelFilter::DEBUG,
            LogLevelArg::Trace => LevelFilter::TRACE,
        };
    }
    config.format = match cli.log_format {
        LogFormatArg::Pretty => LogFormat::Pretty,
        LogFormatArg::Compact => LogFormat::Compact,
        LogFormatArg::Json => LogFormat::Json,
    };
    config.log_file = cli.log_file.clone();
    config.with_ansi = match cli.color.color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => cli.log_file.is_none() && io::stderr().is_terminal(),
    };
    config
}
