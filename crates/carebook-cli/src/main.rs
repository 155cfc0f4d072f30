// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod config;
mod runtime;

use anyhow::{Context, Result, anyhow};
use carebook_app::{GridState, YearMonth};
use carebook_store::validation::parse_period;
use carebook_tui::AppRuntime;
use config::Config;
use runtime::{DEMO_RESIDENTS, DEMO_SEED, RecordSource, WorkspaceRuntime};
use std::env;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
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
            "load config {}; run `carebook --print-example-config` to generate a v1 template",
            options.config_path.display()
        )
    })?;

    init_logging(&config.log_path()?, config.log_filter())?;

    let period = resolve_period(options.period.as_deref(), &config)?;
    let source = if options.demo {
        RecordSource::Demo {
            seed: DEMO_SEED,
            residents: DEMO_RESIDENTS,
        }
    } else {
        config
            .records_path()
            .map_or(RecordSource::Empty, RecordSource::File)
    };
    info!(
        config = %options.config_path.display(),
        period = %period,
        source = ?source,
        "carebook starting"
    );

    let mut runtime = WorkspaceRuntime::new(source, period)
        .with_save_edits(config.save_edits())
        .with_compact_width(config.compact_width());

    if options.check_only {
        let workspace = runtime.load_workspace().with_context(|| {
            format!(
                "check records for {:?} -- fix the JSON import or set [data].records_path",
                runtime.source()
            )
        })?;
        info!(records = workspace.total_records(), "check passed");
        return Ok(());
    }

    let mut state = GridState::new(config.start_view(), period);
    carebook_tui::run_app(&mut state, &mut runtime)
}

/// `--period` wins over `[data].period`, which wins over the current month.
fn resolve_period(cli_period: Option<&str>, config: &Config) -> Result<YearMonth> {
    match cli_period {
        Some(raw) => parse_period(raw).with_context(|| format!("--period {raw:?}")),
        None => config.period(time::OffsetDateTime::now_utc().date()),
    }
}

fn init_logging(path: &Path, default_filter: &str) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("create log directory {}", parent.display()))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("open log file {}", path.display()))?;

    let filter = match EnvFilter::try_from_env("CAREBOOK_LOG") {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_filter)
            .with_context(|| format!("log filter {default_filter:?}"))?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init()
        .map_err(|error| anyhow!("initialize logging: {error}"))
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    config_path: PathBuf,
    print_config_path: bool,
    demo: bool,
    period: Option<String>,
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
        print_config_path: false,
        demo: false,
        period: None,
        print_example: false,
        check_only: false,
        show_help: false,
    };

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_ref() {
            "--config" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--config requires a file path"))?;
                options.config_path = PathBuf::from(value.as_ref());
            }
            "--period" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--period requires a YYYY-MM value"))?;
                options.period = Some(value.as_ref().to_owned());
            }
            "--print-config-path" => {
                options.print_config_path = true;
            }
            "--print-example-config" => {
                options.print_example = true;
            }
            "--demo" => {
                options.demo = true;
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
    println!("carebook");
    println!("  --config <path>          Use a specific config path");
    println!("  --print-config-path      Print resolved config path");
    println!("  --print-example-config   Print a v1 config template");
    println!("  --demo                   Launch with generated residents (edits stay in memory)");
    println!("  --period <YYYY-MM>       Open the grid on a specific month");
    println!("  --check                  Validate config and record import, then exit");
    println!("  --help                   Show this help");
}
