//! Command-line wrapper around the Java importer.

use clap::{ColorChoice, Parser};
use omero_import::MainClass;
use omero_import_cli::cli::{Cli, Command, LogFormatArg, LogLevelArg};
use omero_import_cli::commands::{error_exit_code, run_import};
use omero_import_cli::logging::{LogConfig, LogFormat, init_logging};
use omero_import_cli::summary::print_summary;
use std::io::{self, IsTerminal};
use tracing::level_filters::LevelFilter;

fn main() {
    let cli = Cli::parse();
    cli.color.write_global();
    let log_config = log_config_from_cli(&cli);
    if let Err(error) = init_logging(&log_config) {
        eprintln!("error: failed to initialize logging: {error}");
        std::process::exit(1);
    }
    let (args, main_class) = match &cli.command {
        Command::Import(args) => (args, MainClass::Importer),
        Command::TestEngine(args) => (args, MainClass::TestEngine),
    };
    let exit_code = match run_import(args, main_class) {
        Ok(run) => {
            if run.bulk {
                print_summary(&run.outcome);
            }
            run.exit_code()
        }
        Err(error) => {
            eprintln!("error: {error:#}");
            error_exit_code(&error)
        }
    };
    std::process::exit(exit_code);
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
