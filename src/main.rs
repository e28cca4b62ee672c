mod config;
mod constants;
mod core_buffer;
mod core_cli;
mod core_ftpcommand;
mod core_network;
mod core_path;
mod core_transfer;
mod helpers;
mod server;
mod session;

use crate::config::FtpConfig;
use crate::constants::FTPDCONFIG;
use crate::core_cli::Cli;
use anyhow::Result;
use clap::Parser;
use env_logger::{Builder, Env};
use log::info;
use std::io::Write;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let args = Cli::parse();

    // Initialize the logger with a custom format
    let default_level = if args.verbose { "debug" } else { "info" };
    Builder::from_env(Env::default().default_filter_or(default_level))
        .format(|buf, record| {
            let timestamp = buf.timestamp();
            writeln!(
                buf,
                "[{}] [{}] {}",
                timestamp,
                record.level(),
                record.args()
            )
        })
        .init();

    // Load configuration, with CLI overrides on top
    let config_path = if args.config.is_empty() {
        FTPDCONFIG
    } else {
        args.config.as_str()
    };
    let mut config = FtpConfig::load_from_file(config_path).await?;

    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(root) = args.root {
        config.root_dir = root;
    }

    log_config(&config);

    // Run the FTP server
    server::run(config).await?;

    Ok(())
}

fn log_config(config: &FtpConfig) {
    info!("  Listen Port: {}", config.port);
    info!("  Root Directory: {}", config.root_dir);
    info!(
        "  User: {}",
        if config.user.is_empty() {
            "(anonymous)"
        } else {
            config.user.as_str()
        }
    );
    info!("  Deflate Level: {}", config.deflate_level);
    info!("  Hostname: {}", config.hostname);
}
