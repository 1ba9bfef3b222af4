//! TFT Autopilot
//!
//! Watches the Teamfight Tactics store through a user-calibrated screen
//! rectangle, reads it with OCR, asks a local language model what to do
//! and carries the answer out with simulated mouse and keyboard input.

// Hide console window on Windows for release builds
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod automation;
mod calibration;
mod capture;
mod decision;
mod game;
mod geometry;
mod gui;
mod logging;
mod ocr;
mod paths;
mod platform;

use anyhow::{anyhow, Result};
use std::sync::mpsc::channel;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use automation::runner::join_with_timeout;
use automation::{AgentConfig, Orchestrator};

fn main() -> Result<()> {
    logging::install_panic_hook();
    paths::ensure_directories()?;

    let config_path = paths::resolve_config_path(std::env::args_os().nth(1));

    // The log level comes from the config, so loading it is logged to the
    // console only.
    let bootstrap = tracing_subscriber::fmt().with_target(false).finish();
    let config = tracing::subscriber::with_default(bootstrap, || AgentConfig::load(&config_path));
    logging::init(&config.logging.level)?;
    tracing::info!("TFT Autopilot starting (config: {})", config_path.display());

    platform::enable_dpi_awareness();
    let collaborators = platform::default_collaborators(&config)?;
    let orchestrator = Arc::new(Orchestrator::new(config, collaborators));

    let (sender, receiver) = channel();
    let worker = {
        let orchestrator = Arc::clone(&orchestrator);
        thread::Builder::new()
            .name("orchestrator".into())
            .spawn(move || {
                if let Err(e) = orchestrator.start(&receiver) {
                    tracing::error!("Orchestrator failed: {:#}", e);
                }
            })?
    };

    let overlay_result = gui::run_overlay(Arc::clone(&orchestrator), sender);

    // The overlay may close without a stop request, e.g. when the
    // platform tears the window down.
    let state = orchestrator.state();
    if state != automation::LifecycleState::Idle && state != automation::LifecycleState::Stopping {
        orchestrator.stop();
    }
    // The worker may be stuck in a generator request or an action sequence;
    // abandon it after the configured bound so the process can exit.
    let join_timeout = Duration::from_millis(orchestrator.config().runtime.join_timeout_ms);
    join_with_timeout(worker, join_timeout);

    match overlay_result {
        Ok(()) => {
            tracing::info!("TFT Autopilot exited normally");
            Ok(())
        }
        Err(e) => {
            tracing::error!("Overlay error: {}", e);
            Err(anyhow!("Overlay error: {}", e))
        }
    }
}
