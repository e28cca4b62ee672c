use anyhow::{Context, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Server configuration, shared by every session and mutated through the
/// SITE commands. The whole record sits behind one lock; every read or write
/// takes it.
pub type SharedConfig = Arc<Mutex<FtpConfig>>;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FtpConfig {
    /// Configured user; empty means any USER is accepted.
    pub user: String,
    /// Configured password; empty means any PASS is accepted.
    pub pass: String,
    /// Command-channel listen port.
    pub port: u16,
    /// MODE Z compression level, 0-9.
    pub deflate_level: u32,
    /// Advertised host name.
    pub hostname: String,
    /// Whether to trust filesystem mtimes on archive-backed media.
    pub get_mtime: bool,
    /// Directory the FTP namespace is rooted at.
    pub root_dir: String,
}

impl Default for FtpConfig {
    fn default() -> Self {
        Self {
            user: String::new(),
            pass: String::new(),
            port: 5000,
            deflate_level: 6,
            hostname: String::from("pocketftpd"),
            get_mtime: true,
            root_dir: String::from("/"),
        }
    }
}

impl FtpConfig {
    /// Load the configuration file, falling back to defaults when it does
    /// not exist yet.
    pub async fn load_from_file(path: &str) -> Result<Self> {
        let config_str = match tokio::fs::read_to_string(path).await {
            Ok(config_str) => config_str,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Configuration file {} not found, using defaults", path);
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read configuration file: {}", path));
            }
        };

        let config = toml::from_str(&config_str)
            .with_context(|| format!("Failed to parse configuration file: {}", path))?;

        Ok(config)
    }

    /// Rewrite the configuration file; used by SITE SAVE.
    pub async fn save(&self, path: &str) -> std::io::Result<()> {
        let serialized = toml::to_string(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        tokio::fs::write(path, serialized).await?;

        info!("Configuration saved to {}", path);
        Ok(())
    }

    /// Set the MODE Z level from a decimal string, rejecting anything
    /// outside 0-9.
    pub fn set_deflate_level(&mut self, arg: &str) -> bool {
        match arg.trim().parse::<u32>() {
            Ok(level) if level <= 9 => {
                self.deflate_level = level;
                true
            }
            _ => false,
        }
    }

    /// Set the listen port from a decimal string.
    pub fn set_port(&mut self, arg: &str) -> bool {
        match arg.trim().parse::<u16>() {
            Ok(port) if port != 0 => {
                self.port = port;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = FtpConfig::default();
        assert_eq!(config.port, 5000);
        assert_eq!(config.deflate_level, 6);
        assert!(config.user.is_empty());
        assert!(config.pass.is_empty());
    }

    #[test]
    fn test_set_deflate_level_bounds() {
        let mut config = FtpConfig::default();
        assert!(config.set_deflate_level("9"));
        assert_eq!(config.deflate_level, 9);
        assert!(!config.set_deflate_level("10"));
        assert!(!config.set_deflate_level("x"));
        assert_eq!(config.deflate_level, 9);
    }

    #[test]
    fn test_set_port_rejects_zero() {
        let mut config = FtpConfig::default();
        assert!(config.set_port("2121"));
        assert_eq!(config.port, 2121);
        assert!(!config.set_port("0"));
        assert!(!config.set_port("banana"));
    }

    #[tokio::test]
    async fn test_save_and_reload() {
        let path = std::env::temp_dir().join(format!("pocketftpd-conf-{}", std::process::id()));
        let path_str = path.to_str().unwrap();

        let mut config = FtpConfig::default();
        config.user = String::from("carol");
        config.port = 2121;
        config.save(path_str).await.unwrap();

        let reloaded = FtpConfig::load_from_file(path_str).await.unwrap();
        assert_eq!(reloaded.user, "carol");
        assert_eq!(reloaded.port, 2121);

        std::fs::remove_file(path).ok();
    }

    #[tokio::test]
    async fn test_load_missing_file_uses_defaults() {
        let config = FtpConfig::load_from_file("/no/such/pocketftpd.conf")
            .await
            .unwrap();
        assert_eq!(config.port, FtpConfig::default().port);
    }
}
