//! Command-line interface handling for the Meridian movement server.
//!
//! This module provides command-line argument parsing using the `clap` crate,
//! allowing runtime overrides of the TOML configuration.

use clap::{Arg, Command};
use std::path::PathBuf;

/// Command line arguments parsed from user input.
///
/// Options here override the corresponding values from the configuration
/// file when present.
#[derive(Debug, Clone)]
pub struct CliArgs {
    /// Path to the configuration file
    pub config_path: PathBuf,
    /// Optional override for log level
    pub log_level: Option<String>,
    /// Whether to force JSON log output
    pub json_logs: bool,
    /// Optional override for the simulation tick rate
    pub tick_rate: Option<f32>,
    /// Optional override for the state broadcast rate
    pub broadcast_rate: Option<f32>,
}

impl CliArgs {
    /// Parses command line arguments using clap.
    ///
    /// # Panics
    ///
    /// Panics if required arguments are missing, though all arguments have
    /// defaults defined in the clap configuration.
    pub fn parse() -> Self {
        let matches = Command::new("Meridian Movement Server")
            .version("1.0.0")
            .about("Server-authoritative movement simulation for networked multiplayer games")
            .arg(
                Arg::new("config")
                    .short('c')
                    .long("config")
                    .value_name("FILE")
                    .help("Configuration file path")
                    .default_value("config.toml"),
            )
            .arg(
                Arg::new("log-level")
                    .short('l')
                    .long("log-level")
                    .value_name("LEVEL")
                    .help("Log level (trace, debug, info, warn, error)"),
            )
            .arg(
                Arg::new("json-logs")
                    .long("json-logs")
                    .help("Output logs in JSON format")
                    .action(clap::ArgAction::SetTrue),
            )
            .arg(
                Arg::new("tick-rate")
                    .long("tick-rate")
                    .value_name("HZ")
                    .help("Simulation tick rate in Hz")
                    .value_parser(clap::value_parser!(f32)),
            )
            .arg(
                Arg::new("broadcast-rate")
                    .long("broadcast-rate")
                    .value_name("HZ")
                    .help("State broadcast rate in Hz")
                    .value_parser(clap::value_parser!(f32)),
            )
            .get_matches();

        Self {
            config_path: PathBuf::from(
                matches
                    .get_one::<String>("config")
                    .expect("Default config path should always be set"),
            ),
            log_level: matches.get_one::<String>("log-level").cloned(),
            json_logs: matches.get_flag("json-logs"),
            tick_rate: matches.get_one::<f32>("tick-rate").copied(),
            broadcast_rate: matches.get_one::<f32>("broadcast-rate").copied(),
        }
    }
}
