#![cfg(not(tarpaulin_include))]

use csvgrid::app;
use csvgrid::config::Config;

/// Main entry point for the web application
///
/// Reads the server settings, initialises logging and serves the upload page
/// until the process is stopped.
///
/// # Arguments
/// * `[host] [port]` - Optional positional overrides for the bind address
///
/// # Returns
/// * `Result<(), Box<dyn std::error::Error>>` - Success or error object
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::from_env()?;
    log::info!(
        "Starting csvgrid (uploads up to {} bytes, temp dir {})",
        config.max_upload_bytes,
        config.temp_dir.display()
    );

    app::run(config).await
}
