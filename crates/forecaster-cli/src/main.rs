// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod config;
mod runtime;

use anyhow::{Context, Result, anyhow};
use config::Config;
use forecaster_app::{ColumnMapping, ForecastFrequency, WizardState};
use forecaster_client::{Client, Orchestrator};
use runtime::WizardInput;
use std::env;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() {
    if let Err(error) = run() {
        eprintln!("{error:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = parse_cli_args(env::args().skip(1), Config::default_path()?)?;
    if options.show_help {
        print_help();
        return Ok(());
    }

    if options.print_config_path {
        println!("{}", options.config_path.display());
        return Ok(());
    }

    if options.print_example {
        print!("{}", Config::example_config(&options.config_path));
        return Ok(());
    }

    let config = Config::load(&options.config_path).with_context(|| {
        format!(
            "load config {}; run `forecaster --print-example-config` to generate a v1 template",
            options.config_path.display()
        )
    })?;
    init_tracing(config.log_level());

    let client = Client::new(&config.base_url(), config.timeouts()?).with_context(|| {
        format!(
            "invalid [server] or [timeouts] config in {}; fix base_url and timeout values",
            options.config_path.display()
        )
    })?;
    if options.check_only {
        client
            .ping()
            .map_err(|error| anyhow!(runtime::failure_message(&error, &[])))?;
        println!("backend at {} is healthy", client.base_url());
        return Ok(());
    }

    let file = options
        .file
        .ok_or_else(|| anyhow!("--file is required; run with --help to see supported options"))?;
    let frequency = match options.frequency.as_deref() {
        Some(raw) => ForecastFrequency::parse(raw).ok_or_else(|| {
            anyhow!(
                "unknown frequency {raw:?}; use one of Daily, Weekly, Monthly, Quarterly, Yearly"
            )
        })?,
        None => config.default_frequency(),
    };
    let input = WizardInput {
        source: runtime::read_source(&file)?,
        mapping: ColumnMapping::new(
            options.date.as_deref().unwrap_or_default(),
            options.value.as_deref().unwrap_or_default(),
        )
        .with_aggregation(options.aggregation.as_deref().unwrap_or_default()),
        frequency,
        periods: options
            .periods
            .unwrap_or_else(|| config.default_periods()),
    };

    info!(backend = client.base_url(), file = %file.display(), "starting forecast");
    let orchestrator = Orchestrator::new(client);
    let mut state = WizardState::default();
    let results = runtime::run_forecast(&orchestrator, &mut state, input)
        .map_err(|error| anyhow!(runtime::failure_message(&error, &state.headers)))?;

    if options.plain {
        println!("{}", forecaster_tui::render_results_text(&results));
        return Ok(());
    }
    forecaster_tui::run_results_view(&results)
}

fn init_tracing(default_level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct CliOptions {
    config_path: PathBuf,
    file: Option<PathBuf>,
    date: Option<String>,
    value: Option<String>,
    aggregation: Option<String>,
    frequency: Option<String>,
    periods: Option<String>,
    plain: bool,
    print_config_path: bool,
    print_example: bool,
    check_only: bool,
    show_help: bool,
}

fn parse_cli_args<I, S>(args: I, default_config_path: PathBuf) -> Result<CliOptions>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut options = CliOptions {
        config_path: default_config_path,
        ..CliOptions::default()
    };

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        let flag = arg.as_ref();
        let mut value_for = |flag: &str, what: &str| -> Result<String> {
            iter.next()
                .map(|value| value.as_ref().to_owned())
                .ok_or_else(|| anyhow!("{flag} requires {what}"))
        };
        match flag {
            "--config" => {
                options.config_path = PathBuf::from(value_for(flag, "a file path")?);
            }
            "--file" | "-f" => {
                options.file = Some(PathBuf::from(value_for(flag, "a file path")?));
            }
            "--date" => {
                options.date = Some(value_for(flag, "a column name")?);
            }
            "--value" => {
                options.value = Some(value_for(flag, "a column name")?);
            }
            "--aggregation" => {
                options.aggregation = Some(value_for(flag, "a column name")?);
            }
            "--frequency" => {
                options.frequency = Some(value_for(flag, "a frequency name")?);
            }
            "--periods" => {
                options.periods = Some(value_for(flag, "a number of periods")?);
            }
            "--plain" => {
                options.plain = true;
            }
            "--print-config-path" => {
                options.print_config_path = true;
            }
            "--print-example-config" => {
                options.print_example = true;
            }
            "--check" => {
                options.check_only = true;
            }
            "--help" | "-h" => {
                options.show_help = true;
            }
            unknown => {
                return Err(anyhow!(
                    "unknown argument {unknown:?}; run with --help to see supported options"
                ));
            }
        }
    }

    Ok(options)
}

fn print_help() {
    println!("forecaster");
    println!("  --file <path>            CSV file to forecast (required)");
    println!("  --date <column>          Date column");
    println!("  --value <column>         Value column");
    println!("  --aggregation <column>   Optional aggregation column");
    println!("  --frequency <name>       Daily, Weekly, Monthly, Quarterly or Yearly");
    println!("  --periods <n>            Number of periods to forecast");
    println!("  --plain                  Print results as text instead of the chart view");
    println!("  --config <path>          Use a specific config path");
    println!("  --print-config-path      Print resolved config path");
    println!("  --print-example-config   Print a v1 config template");
    println!("  --check                  Validate config and ping the backend");
    println!("  --help                   Show this help");
}
