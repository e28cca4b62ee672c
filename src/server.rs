use anyhow::Result;
use log::{error, info};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::sync::Mutex as TokioMutex;

use crate::config::{FtpConfig, SharedConfig};
use crate::core_network::network;
use crate::helpers::{format_free_space, get_site_free_space};

/// Process-wide state every session can see: when the server came up and
/// how much room is left under the root. The free-space figure is cached
/// and refreshed whenever a session mutates the filesystem.
pub struct ServerState {
    start_time: Instant,
    root: PathBuf,
    free_space: Mutex<u64>,
}

impl ServerState {
    pub fn new(root: PathBuf) -> Arc<Self> {
        let state = Arc::new(Self {
            start_time: Instant::now(),
            root,
            free_space: Mutex::new(0),
        });
        state.update_free_space();
        state
    }

    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    pub fn free_space(&self) -> u64 {
        *self.free_space.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn update_free_space(&self) {
        match get_site_free_space(&self.root) {
            Ok(space) => {
                *self.free_space.lock().unwrap_or_else(|e| e.into_inner()) = space;
                info!("Free space: {}", format_free_space(space));
            }
            Err(e) => error!("Failed to get free space: {}", e),
        }
    }
}

/// Runs the FTP server with the provided configuration.
pub async fn run(config: FtpConfig) -> Result<()> {
    info!("Starting server on port {}", config.port);

    let state = ServerState::new(PathBuf::from(&config.root_dir));
    let shared: SharedConfig = Arc::new(TokioMutex::new(config));

    match network::start_server(shared, state).await {
        Ok(()) => info!("Server stopped."),
        Err(e) => {
            error!("Failed to start server: {}", e);
            return Err(e);
        }
    }

    Ok(())
}
