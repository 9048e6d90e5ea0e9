use evdispatch::cli::Args;
use evdispatch::config::{self, Settings};
use evdispatch::core::DispatchConfig;
use evdispatch::scenario::{self, Scenario};

use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, info};
use std::io::Read;

fn init_logger(args: &Args, path_config: &config::PathConfig) -> Result<()> {
    // 0 (default) = warn, 1 (-v) = info, 2 (-vv) = debug, 3+ (-vvv) = trace
    let log_level = match args.verbosity {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    if let Some(log_path_opt) = &args.log_file {
        let log_path = log_path_opt
            .as_ref()
            .cloned()
            .unwrap_or_else(|| config::data_file(config::LOG_FILE, path_config));

        let file = std::fs::File::create(&log_path)
            .with_context(|| format!("Failed to create log file: {}", log_path.display()))?;

        env_logger::Builder::new()
            .filter_level(log_level)
            .format_timestamp_millis()
            .target(env_logger::Target::Pipe(Box::new(file)))
            .init();

        info!("Logging to file: {} (level: {:?})", log_path.display(), log_level);
    } else {
        // Console logging (respects RUST_LOG if set); stdout is reserved for the report
        let default_level = match args.verbosity {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        };

        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
            .format_timestamp_millis()
            .target(env_logger::Target::Stderr)
            .init();
    }
    Ok(())
}

fn read_scenario(args: &Args) -> Result<Scenario> {
    match &args.scenario {
        Some(path) => Scenario::from_file(path),
        None => {
            let mut json = String::new();
            std::io::stdin()
                .read_to_string(&mut json)
                .context("Failed to read scenario from stdin")?;
            Scenario::from_json(&json)
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let path_config = config::PathConfig::from_env_and_cli(args.config_dir.clone());
    if let Err(e) = config::ensure_dirs(&path_config) {
        eprintln!("Warning: Failed to create application directories: {}", e);
    }

    init_logger(&args, &path_config)?;
    debug!("Command-line args: {:?}", args);

    let settings_path = args
        .settings
        .clone()
        .unwrap_or_else(|| config::config_file(config::SETTINGS_FILE, &path_config));
    info!("Settings path: {}", settings_path.display());

    let mut settings = Settings::load(&settings_path)?;
    if let Some(max_depth) = args.max_depth {
        settings.dispatch = DispatchConfig::with_max_depth(max_depth);
    }
    if args.save_settings {
        settings.save(&settings_path)?;
        info!("Settings saved to {}", settings_path.display());
    }

    let scenario = read_scenario(&args)?;
    info!(
        "Running scenario: {} listener(s), {} dispatch(es), max depth {}",
        scenario.listeners.len(),
        scenario.dispatches.len(),
        settings.dispatch.max_depth
    );

    let report = scenario::run(&scenario, settings.dispatch)?;
    let json = if args.compact {
        serde_json::to_string(&report)
    } else {
        serde_json::to_string_pretty(&report)
    }
    .context("Failed to serialize report")?;
    println!("{}", json);

    Ok(())
}
