use clap::Parser;
use std::path::{Path, PathBuf};

use esp_overlay::cli::{self, Args, Command};
use esp_overlay::config::{self, Config, ConfigError};
use esp_overlay::logging;
use esp_overlay::pipeline::{self, PipelineError};

fn main() {
    let args = Args::parse();

    if let Err(e) = logging::init(args.log_level()) {
        eprintln!("Warning: failed to initialise logging: {}", e);
    }

    let path = args.config.clone().unwrap_or_else(config::default_path);

    let result = match args.command {
        Some(Command::Config { ref action }) => {
            run_config_action(&args, action.clone(), &path).map_err(PipelineError::from)
        }
        Some(Command::Devices) => cli::list_devices().map_err(PipelineError::from),
        Some(Command::Run) | None => run_overlay(&args, &path),
    };

    if let Err(e) = result {
        log::error!("{}", e);
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Load the config file and apply command-line overrides.
///
/// A path given with `--config` must exist; the default path may be absent.
fn load_config(args: &Args, path: &Path) -> Result<Config, ConfigError> {
    if args.config.is_some() && !path.exists() {
        return Err(ConfigError::IoError {
            path: PathBuf::from(path),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "file not found"),
        });
    }

    let mut config = Config::load(Some(path))?;
    args.apply_overrides(&mut config);
    config.validate()?;
    Ok(config)
}

fn run_config_action(
    args: &Args,
    action: cli::ConfigAction,
    path: &Path,
) -> Result<(), ConfigError> {
    let config = match action {
        cli::ConfigAction::Init => Config::default(),
        cli::ConfigAction::Show => load_config(args, path)?,
    };
    cli::handle_config_action(action, &config, path)
}

fn run_overlay(args: &Args, path: &Path) -> Result<(), PipelineError> {
    let config = load_config(args, path)?;
    let summary = pipeline::run(&config)?;
    log::info!(
        "Presented {} frames, stopped: {:?}",
        summary.frames_presented,
        summary.reason
    );
    Ok(())
}
