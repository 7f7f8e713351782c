//! Main application logic and lifecycle management.
//!
//! This module contains the `Application` struct that orchestrates startup,
//! monitoring, and graceful shutdown around the simulation loop.

use crate::{cli::CliArgs, config::AppConfig, logging::display_banner, signals};
use movement_server::{
    ChannelSink, ClientId, CommandStore, FlatGroundScene, InMemoryTransport, SimulationLoop,
};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{error, info, warn};

/// Main application struct.
///
/// Manages the complete lifecycle of the Meridian server: configuration
/// loading and merging, pipeline construction, health monitoring, and
/// graceful shutdown handling.
pub struct Application {
    /// Loaded application configuration
    config: AppConfig,
    /// The simulation loop, ready to run
    sim: SimulationLoop,
    /// Transport integration point for embedding hosts
    transport: Arc<InMemoryTransport>,
    /// Broadcast sink connection handlers subscribe to
    sink: Arc<ChannelSink>,
}

impl Application {
    /// Creates a new application instance.
    ///
    /// Loads configuration, applies CLI overrides, validates the merged
    /// settings, and assembles the simulation pipeline.
    pub async fn new(args: CliArgs) -> Result<Self, Box<dyn std::error::Error>> {
        info!("Loading configuration from: {}", args.config_path.display());
        let mut config = AppConfig::load_from_file(&args.config_path).await?;

        // Apply CLI overrides
        if let Some(log_level) = args.log_level {
            config.logging.level = log_level;
        }
        if args.json_logs {
            config.logging.json_format = true;
        }
        if let Some(tick_rate) = args.tick_rate {
            config.simulation.tick_rate_hz = tick_rate;
        }
        if let Some(broadcast_rate) = args.broadcast_rate {
            config.simulation.broadcast_rate_hz = broadcast_rate;
        }

        if let Err(e) = config.validate() {
            return Err(format!("Configuration validation failed: {e}").into());
        }
        info!("Configuration loaded and validated successfully");

        display_banner();

        // Assemble the pipeline: shared command store, in-process transport,
        // flat-ground scene, and a broadcast channel sink.
        let store = Arc::new(CommandStore::new(config.simulation.command_set_capacity));
        let (transport, disconnects): (
            Arc<InMemoryTransport>,
            mpsc::UnboundedReceiver<ClientId>,
        ) = InMemoryTransport::new(Arc::clone(&store));
        let scene = Arc::new(FlatGroundScene::new(0.0));
        let sink = Arc::new(ChannelSink::new(256));

        let sim = SimulationLoop::new(
            config.simulation.clone(),
            transport.clone(),
            store,
            disconnects,
            scene,
            Arc::clone(&sink) as Arc<dyn movement_server::SnapshotSink>,
        )?;

        info!(
            "Simulation pipeline assembled: {} Hz ticks, {} Hz broadcasts, capacity {}",
            config.simulation.tick_rate_hz,
            config.simulation.broadcast_rate_hz,
            config.simulation.command_set_capacity
        );

        Ok(Self {
            config,
            sim,
            transport,
            sink,
        })
    }

    /// Transport integration point: embedding hosts feed connections and
    /// command batches through this handle.
    pub fn transport(&self) -> Arc<InMemoryTransport> {
        Arc::clone(&self.transport)
    }

    /// Broadcast sink handle: connection handlers subscribe here to forward
    /// snapshot payloads to their peers.
    pub fn sink(&self) -> Arc<ChannelSink> {
        Arc::clone(&self.sink)
    }

    /// Runs the application until a shutdown signal arrives.
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        info!("Starting Meridian Movement Server");
        self.log_configuration_summary();

        let stats = self.sim.stats();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        // Run the simulation loop in the background.
        let sim_handle = tokio::spawn(self.sim.run(shutdown_rx));

        // Periodic health reporting.
        let monitoring_handle = {
            let stats = Arc::clone(&stats);
            tokio::spawn(async move {
                let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(60));
                let mut last = stats.snapshot();

                loop {
                    interval.tick().await;
                    let current = stats.snapshot();
                    info!(
                        "Health - {} ticks/min | {} commands applied | {} batches sent",
                        current.ticks - last.ticks,
                        current.commands_applied - last.commands_applied,
                        current.batches_sent - last.batches_sent
                    );
                    if current.exhaustion_events > last.exhaustion_events {
                        warn!(
                            "{} command buffer exhaustions this period - sampling and \
                             replacement rates may be mismatched",
                            current.exhaustion_events - last.exhaustion_events
                        );
                    }
                    last = current;
                }
            })
        };

        info!("Meridian server is now running");
        info!("Press Ctrl+C to gracefully shutdown");

        // Wait for the shutdown signal.
        signals::wait_for_shutdown().await?;

        // A second signal skips the graceful path.
        tokio::spawn(async move {
            if let Err(e) = signals::wait_for_shutdown_silent().await {
                error!("Failed to set up second-signal handler: {e}");
                return;
            }
            warn!("Shutdown signal received again - exiting immediately");
            std::process::exit(1);
        });

        info!("Beginning graceful shutdown...");
        monitoring_handle.abort();

        // Stop scheduling ticks and wait for the loop to finish its final
        // iteration.
        if shutdown_tx.send(true).is_err() {
            warn!("Simulation loop already stopped");
        }
        match tokio::time::timeout(tokio::time::Duration::from_secs(8), sim_handle).await {
            Ok(Ok(final_stats)) => {
                info!("Final Statistics:");
                info!("  - Ticks executed: {}", final_stats.ticks);
                info!("  - Commands applied: {}", final_stats.commands_applied);
                info!("  - Batches sent: {}", final_stats.batches_sent);
                info!("  - Buffer exhaustions: {}", final_stats.exhaustion_events);
                info!("  - Clients pruned: {}", final_stats.pruned_clients);
            }
            Ok(Err(e)) => error!("Simulation loop task failed: {e}"),
            Err(_) => warn!("Simulation loop did not stop within timeout"),
        }

        info!("Meridian Movement Server shutdown complete");
        Ok(())
    }

    /// Logs the configuration summary at startup.
    fn log_configuration_summary(&self) {
        info!("Configuration Summary:");
        info!("  Tick rate: {} Hz", self.config.simulation.tick_rate_hz);
        info!(
            "  Broadcast rate: {} Hz",
            self.config.simulation.broadcast_rate_hz
        );
        info!(
            "  Input sampling rate: {} Hz",
            self.config.simulation.input_sampling_rate_hz
        );
        info!(
            "  Command set capacity: {}",
            self.config.simulation.command_set_capacity
        );
        info!(
            "  Spawn pose: {:?} (yaw {})",
            self.config.simulation.spawn.position, self.config.simulation.spawn.yaw
        );
    }
}
