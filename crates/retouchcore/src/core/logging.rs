//! Logging initialization and startup diagnostics
//!
//! This module provides:
//! - Logger initialization (console + file)
//! - Configuration summary logged at startup

use anyhow::Result;
use simplelog::*;
use std::fs::File;

use crate::core::config;

/// Parses a level name, defaulting to `Info` for anything unrecognised.
pub fn parse_level(raw: &str) -> LevelFilter {
    raw.trim().parse().unwrap_or(LevelFilter::Info)
}

/// Initialize logger for both console and file output
///
/// # Arguments
/// * `log_file_path` - Path to the log file
///
/// # Returns
/// * `Ok(())` - Logger initialized successfully
/// * `Err(anyhow::Error)` - Failed to create the file or a logger was already set
pub fn init_logger(log_file_path: &str) -> Result<()> {
    let log_file = File::create(log_file_path).map_err(|e| anyhow::anyhow!("Failed to create log file: {}", e))?;
    let level = parse_level(&config::LOG_LEVEL);

    CombinedLogger::init(vec![
        TermLogger::new(level, Config::default(), TerminalMode::Mixed, ColorChoice::Auto),
        WriteLogger::new(level, Config::default(), log_file),
    ])
    .map_err(|e| anyhow::anyhow!("Failed to initialize logger: {}", e))?;

    Ok(())
}

/// Logs the effective processing configuration at application startup
pub fn log_startup_configuration() {
    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    log::info!("🖼️  Retouch configuration");
    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    log::info!("Workers: {}", *config::queue::WORKER_COUNT);
    log::info!("Queue capacity: {}", *config::queue::CAPACITY);
    log::info!("Processing timeout: {}s", *config::queue::PROCESSING_TIMEOUT_SECS);
    log::info!("Temp dir: {}", config::TEMP_FILES_DIR.display());
    log::info!("Processor backend: {}", config::processing::BACKEND.as_str());
    if config::processing::BACKEND.as_str() == "remote" {
        log::info!("Remote API endpoint: {}", config::processing::API_ENDPOINT.as_str());
    }
    log::info!("Default mode: {}", config::processing::DEFAULT_MODE.as_str());

    if config::BOT_TOKEN.is_empty() {
        log::warn!("⚠️  BOT_TOKEN is not set - the Telegram bot cannot start");
    }
    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
}
