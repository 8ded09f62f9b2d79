//! Subcommand handlers for config actions and device listing.

use std::path::Path;

use super::args::ConfigAction;
use crate::capture::{self, CaptureError};
use crate::config::{Config, ConfigError};

const CONFIG_HEADER: &str = "# esp-overlay configuration\n\
# capture.kind: webcam, elgato, screen, synthetic\n\
# ai.classes: class allow-list, empty keeps every class\n\n";

/// Handle config subcommand actions.
///
/// `config` is the effective configuration, `path` the file it was read from.
pub fn handle_config_action(
    action: ConfigAction,
    config: &Config,
    path: &Path,
) -> Result<(), ConfigError> {
    match action {
        ConfigAction::Show => {
            println!("Current configuration:");
            println!();
            print!("{}", config.to_toml()?);
            println!();

            if path.exists() {
                println!("Config file: {} (exists)", path.display());
            } else {
                println!("Config file: {} (not found)", path.display());
            }
        }
        ConfigAction::Init => {
            write_default_config(path)?;
            println!("Created config file: {}", path.display());
        }
    }
    Ok(())
}

/// Print the cameras that can be used for webcam or Elgato capture.
pub fn list_devices() -> Result<(), CaptureError> {
    let cameras = capture::list_cameras()?;
    print!("{}", capture::format_camera_list(&cameras));
    Ok(())
}

/// Write the default configuration to `path`, refusing to overwrite.
pub fn write_default_config(path: &Path) -> Result<(), ConfigError> {
    if path.exists() {
        return Err(ConfigError::AlreadyExists(path.to_path_buf()));
    }

    let io_error = |source| ConfigError::IoError {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(io_error)?;
    }

    let body = Config::default().to_toml()?;
    std::fs::write(path, format!("{CONFIG_HEADER}{body}")).map_err(io_error)
}
