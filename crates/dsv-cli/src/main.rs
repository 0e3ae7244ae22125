//! Data set version mapping CLI.

use std::io::{self, IsTerminal};

use anyhow::Result;
use clap::{ColorChoice, Parser};
use tracing::level_filters::LevelFilter;

use dsv_cli::cli::{Cli, Command, LogFormatArg, LogLevelArg};
use dsv_cli::commands::{
    CommandContext, run_export, run_freeze, run_impact, run_list, run_plan, run_rebuild,
    run_set, run_show, run_status,
};
use dsv_cli::logging::{LogConfig, LogFormat, init_logging};
use dsv_cli::summary::{
    print_mapping, print_rebuild_report, print_staleness, print_store_listing,
};
use dsv_map::MatchOptions;

fn main() {
    let cli = Cli::parse();
    cli.color.write_global();
    let log_config = log_config_from_cli(&cli);
    if let Err(error) = init_logging(&log_config) {
        eprintln!("error: failed to initialize logging: {error}");
        std::process::exit(1);
    }
    let context = CommandContext::new(
        cli.store.clone(),
        MatchOptions::default().with_parallel(!cli.sequential),
    );
    let exit_code = match run(&context, &cli.command) {
        Ok(()) => 0,
        Err(error) => {
            eprintln!("error: {error:#}");
            1
        }
    };
    std::process::exit(exit_code);
}

fn run(context: &CommandContext, command: &Command) -> Result<()> {
    match command {
        Command::Plan(args) => {
            let saved = run_plan(context, args)?;
            println!("Saved: {}", saved.path.display());
            print_mapping(&saved.mapping, false);
        }
        Command::Show(args) => {
            let mapping = run_show(context, args)?;
            print_mapping(&mapping, args.unresolved);
        }
        Command::Set(args) => {
            let outcome = run_set(context, args)?;
            match outcome.path {
                Some(path) => println!("Updated {} in {}", outcome.address, path.display()),
                None => println!("{} unchanged", outcome.address),
            }
        }
        Command::Rebuild(args) => {
            let report = run_rebuild(context, args)?;
            print_rebuild_report(&report);
        }
        Command::Impact(args) => {
            let evaluation = run_impact(context, &args.version)?;
            println!("{}", serde_json::to_string_pretty(&evaluation)?);
        }
        Command::Status(args) => {
            let status = run_status(context, args)?;
            print_staleness(status);
        }
        Command::Freeze(args) => {
            if run_freeze(context, &args.version)? {
                println!("Frozen {}", args.version);
            } else {
                println!("{} was already frozen", args.version);
            }
        }
        Command::Export(args) => {
            let counts = run_export(context, args)?;
            println!("Wrote {} mapping rows to {}", counts.mappings, args.out.display());
            if let (Some(count), Some(path)) = (counts.candidates, &args.candidates) {
                println!("Wrote {count} candidate rows to {}", path.display());
            }
        }
        Command::List => print_store_listing(&run_list(context)?),
    }
    Ok(())
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
