//! CLI argument parsing with clap.

use clap::{ArgAction, Parser, Subcommand};
use log::LevelFilter;
use std::path::PathBuf;

use crate::capture::CaptureKind;
use crate::config::Config;

/// Real-time object detection overlay with optional aim assist
#[derive(Parser, Debug)]
#[command(name = "esp-overlay")]
#[command(version, about = "Detection overlay and aim control for live video", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Config file path
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// Capture source, overriding the config file
    #[arg(long, value_enum)]
    pub capture: Option<CaptureKind>,

    /// Detection model (.onnx), overriding the config file
    #[arg(long, short)]
    pub model: Option<PathBuf>,

    /// Request GPU execution for inference
    #[arg(long)]
    pub gpu: bool,

    /// Log pointer moves instead of performing them
    #[arg(long)]
    pub dry_run: bool,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, conflicts_with = "quiet")]
    pub verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the overlay (default)
    Run,
    /// List cameras usable as capture.device_index
    Devices,
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigAction {
    /// Show current configuration
    Show,
    /// Create default config file
    Init,
}

impl Args {
    pub fn log_level(&self) -> LevelFilter {
        if self.quiet {
            return LevelFilter::Warn;
        }
        match self.verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }

    /// Command-line flags win over the config file.
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(kind) = self.capture {
            config.capture.kind = kind;
        }
        if let Some(model) = &self.model {
            config.ai.model_path = model.clone();
        }
        if self.gpu {
            config.ai.use_gpu = true;
        }
        if self.dry_run {
            config.aim.dry_run = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_defaults() {
        let args = Args::parse_from(["esp-overlay"]);
        assert!(args.config.is_none());
        assert!(args.capture.is_none());
        assert!(args.model.is_none());
        assert!(!args.gpu);
        assert!(!args.dry_run);
        assert_eq!(args.verbose, 0);
        assert!(!args.quiet);
        assert!(args.command.is_none());
        assert_eq!(args.log_level(), LevelFilter::Info);
    }

    #[test]
    fn test_args_capture_values() {
        let args = Args::parse_from(["esp-overlay", "--capture", "webcam"]);
        assert_eq!(args.capture, Some(CaptureKind::Webcam));

        let args = Args::parse_from(["esp-overlay", "--capture", "elgato"]);
        assert_eq!(args.capture, Some(CaptureKind::Elgato));

        let args = Args::parse_from(["esp-overlay", "--capture", "screen"]);
        assert_eq!(args.capture, Some(CaptureKind::Screen));

        let args = Args::parse_from(["esp-overlay", "--capture", "synthetic"]);
        assert_eq!(args.capture, Some(CaptureKind::Synthetic));
    }

    #[test]
    fn test_args_rejects_unknown_capture() {
        assert!(Args::try_parse_from(["esp-overlay", "--capture", "vhs"]).is_err());
    }

    #[test]
    fn test_args_config_option() {
        let args = Args::parse_from(["esp-overlay", "--config", "/tmp/config.toml"]);
        assert_eq!(args.config, Some(PathBuf::from("/tmp/config.toml")));

        let args = Args::parse_from(["esp-overlay", "-c", "/tmp/test.toml"]);
        assert_eq!(args.config, Some(PathBuf::from("/tmp/test.toml")));
    }

    #[test]
    fn test_args_verbosity() {
        let args = Args::parse_from(["esp-overlay", "-v"]);
        assert_eq!(args.log_level(), LevelFilter::Debug);

        let args = Args::parse_from(["esp-overlay", "-vv"]);
        assert_eq!(args.log_level(), LevelFilter::Trace);

        let args = Args::parse_from(["esp-overlay", "--quiet"]);
        assert_eq!(args.log_level(), LevelFilter::Warn);

        assert!(Args::try_parse_from(["esp-overlay", "-v", "-q"]).is_err());
    }

    #[test]
    fn test_args_run_subcommand() {
        let args = Args::parse_from(["esp-overlay", "run"]);
        assert!(matches!(args.command, Some(Command::Run)));
    }

    #[test]
    fn test_args_devices_subcommand() {
        let args = Args::parse_from(["esp-overlay", "devices"]);
        assert!(matches!(args.command, Some(Command::Devices)));
    }

    #[test]
    fn test_args_config_show_subcommand() {
        let args = Args::parse_from(["esp-overlay", "config", "show"]);
        match args.command {
            Some(Command::Config {
                action: ConfigAction::Show,
            }) => (),
            _ => panic!("Expected Config Show subcommand"),
        }
    }

    #[test]
    fn test_args_config_init_subcommand() {
        let args = Args::parse_from(["esp-overlay", "config", "init"]);
        match args.command {
            Some(Command::Config {
                action: ConfigAction::Init,
            }) => (),
            _ => panic!("Expected Config Init subcommand"),
        }
    }

    #[test]
    fn test_apply_overrides() {
        let args = Args::parse_from([
            "esp-overlay",
            "--capture",
            "screen",
            "--model",
            "models/custom.onnx",
            "--gpu",
            "--dry-run",
        ]);
        let mut config = Config::default();
        args.apply_overrides(&mut config);
        assert_eq!(config.capture.kind, CaptureKind::Screen);
        assert_eq!(config.ai.model_path, PathBuf::from("models/custom.onnx"));
        assert!(config.ai.use_gpu);
        assert!(config.aim.dry_run);
    }

    #[test]
    fn test_apply_overrides_keeps_file_values() {
        let args = Args::parse_from(["esp-overlay"]);
        let mut config = Config::default();
        config.ai.use_gpu = true;
        config.capture.kind = CaptureKind::Elgato;
        args.apply_overrides(&mut config);
        assert!(config.ai.use_gpu);
        assert_eq!(config.capture.kind, CaptureKind::Elgato);
    }
}
