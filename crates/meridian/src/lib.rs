//! # Meridian Movement Server - Main Entry Point
//!
//! Server-authoritative movement simulation for networked multiplayer games.
//! This entry point handles CLI parsing, configuration loading, and
//! application lifecycle management around the `movement_server` core.
//!
//! ## Quick Start
//!
//! ```bash
//! # Run with default configuration
//! meridian
//!
//! # Specify custom configuration
//! meridian --config production.toml
//!
//! # Override specific settings
//! meridian --tick-rate 30 --broadcast-rate 10 --log-level debug
//!
//! # JSON logging for production
//! meridian --json-logs
//! ```
//!
//! ## Configuration
//!
//! The server loads configuration from a TOML file (default: `config.toml`).
//! If the file doesn't exist, a default configuration will be created.
//!
//! ## Signal Handling
//!
//! The server handles graceful shutdown on SIGINT (Ctrl+C) and SIGTERM.

use tracing::error;

mod app;
mod cli;
mod config;
mod logging;
mod signals;

use app::Application;
use cli::CliArgs;
use config::AppConfig;

/// Main entry point for the Meridian Movement Server.
///
/// Handles the complete application lifecycle:
/// 1. Command-line argument parsing
/// 2. Configuration loading and validation
/// 3. Logging system initialization
/// 4. Application creation and execution
///
/// Note: called from an async context (`main` with `#[tokio::main]`), so it
/// must NOT carry `#[tokio::main]` itself.
pub async fn init() -> Result<(), Box<dyn std::error::Error>> {
    // Parse CLI arguments first
    let args = CliArgs::parse();

    // Load configuration to get logging settings
    let config = AppConfig::load_from_file(&args.config_path)
        .await
        .unwrap_or_default();

    // Setup logging before anything else
    if let Err(e) = logging::setup_logging(&config.logging, args.json_logs) {
        eprintln!("Failed to setup logging: {e}");
        std::process::exit(1);
    }

    // Create and run application
    match Application::new(args).await {
        Ok(app) => {
            if let Err(e) = app.run().await {
                error!("Application error: {:?}", e);
                std::process::exit(1);
            }
        }
        Err(e) => {
            error!("Failed to start application: {e:?}");
            std::process::exit(1);
        }
    }

    Ok(())
}

// Re-export main types for potential library usage
pub use config::{AppConfig as MeridianConfig, LoggingSettings};

#[cfg(test)]
mod tests {
    use super::*;
    use movement_server::Transport;
    use std::path::PathBuf;

    #[tokio::test]
    async fn test_default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.simulation.broadcast_rate_hz, 20.0);
    }

    #[test]
    fn test_cli_args_structure() {
        let args = CliArgs {
            config_path: PathBuf::from("test.toml"),
            log_level: Some("debug".to_string()),
            json_logs: true,
            tick_rate: Some(30.0),
            broadcast_rate: None,
        };

        assert_eq!(args.config_path, PathBuf::from("test.toml"));
        assert_eq!(args.log_level, Some("debug".to_string()));
        assert!(args.json_logs);
        assert_eq!(args.tick_rate, Some(30.0));
        assert!(args.broadcast_rate.is_none());
    }

    #[tokio::test]
    async fn test_application_creation_with_overrides() {
        let dir = tempfile::tempdir().expect("temp dir");
        let config_path = dir.path().join("meridian_test.toml");

        let args = CliArgs {
            config_path: config_path.clone(),
            log_level: None,
            json_logs: false,
            tick_rate: Some(32.0),
            broadcast_rate: Some(8.0),
        };

        let app = Application::new(args).await.expect("application builds");
        // Transport and sink handles are available for embedding hosts.
        assert!(app.transport().connected_clients().is_empty());
        assert_eq!(app.sink().receiver_count(), 0);
        assert!(config_path.exists());
    }
}
