//! Configuration loading and root folder resolution
//!
//! Resolution priority for every tunable:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable (`LABELCONV_*`)
//! 3. TOML config file
//! 4. Compiled default (fallback)

use crate::{Error, Result};
use serde::Deserialize;
use std::path::PathBuf;

/// Default HTTP port for the conversion request service
pub const DEFAULT_PORT: u16 = 5780;

/// Maximum number of example files accepted per submission
pub const DEFAULT_MAX_UPLOAD_FILES: usize = 5;

/// Request body cap for the upload endpoint (5 files x 10 MiB plus slack)
pub const DEFAULT_MAX_BODY_BYTES: usize = 55 * 1024 * 1024;

/// Contents of the optional `config.toml`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    pub root_folder: Option<String>,
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub upload: UploadSection,
    #[serde(default)]
    pub storage: StorageSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerSection {
    pub host: Option<String>,
    pub port: Option<u16>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UploadSection {
    pub max_files: Option<usize>,
    pub max_body_bytes: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StorageSection {
    /// Total attempts per storage write; 1 disables retrying
    pub retry_attempts: Option<u32>,
    /// Base delay between attempts, doubled after each failure
    pub retry_delay_ms: Option<u64>,
}

/// Fully resolved service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub root_folder: PathBuf,
    pub bind_host: String,
    pub bind_port: u16,
    pub max_upload_files: usize,
    pub max_body_bytes: usize,
    pub storage_retry_attempts: u32,
    pub storage_retry_delay_ms: u64,
}

impl ServiceConfig {
    /// Resolve configuration from CLI arguments, environment, TOML and defaults
    pub fn resolve(cli_root: Option<&str>, cli_port: Option<u16>) -> Result<ServiceConfig> {
        let toml_config = load_toml_config()?;

        let root_folder = resolve_root_folder(cli_root, &toml_config);

        let bind_host = std::env::var("LABELCONV_HOST")
            .ok()
            .or_else(|| toml_config.server.host.clone())
            .unwrap_or_else(|| "127.0.0.1".to_string());

        let bind_port = cli_port
            .or_else(|| {
                std::env::var("LABELCONV_PORT")
                    .ok()
                    .and_then(|p| p.parse().ok())
            })
            .or(toml_config.server.port)
            .unwrap_or(DEFAULT_PORT);

        let config = ServiceConfig {
            root_folder,
            bind_host,
            bind_port,
            max_upload_files: toml_config
                .upload
                .max_files
                .unwrap_or(DEFAULT_MAX_UPLOAD_FILES),
            max_body_bytes: toml_config
                .upload
                .max_body_bytes
                .unwrap_or(DEFAULT_MAX_BODY_BYTES),
            storage_retry_attempts: toml_config.storage.retry_attempts.unwrap_or(3),
            storage_retry_delay_ms: toml_config.storage.retry_delay_ms.unwrap_or(250),
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.max_upload_files == 0 {
            return Err(Error::Config(
                "upload.max_files must be at least 1".to_string(),
            ));
        }
        if self.storage_retry_attempts == 0 {
            return Err(Error::Config(
                "storage.retry_attempts must be at least 1 (1 disables retrying)".to_string(),
            ));
        }
        Ok(())
    }

    /// Path of the SQLite database under the root folder
    pub fn database_path(&self) -> PathBuf {
        self.root_folder.join("labelconv.db")
    }

    /// Root directory of the filesystem-backed object store
    pub fn storage_root(&self) -> PathBuf {
        self.root_folder.join("storage")
    }

    /// Ensure the root folder exists on disk
    pub fn ensure_root_folder(&self) -> Result<()> {
        std::fs::create_dir_all(&self.root_folder)?;
        Ok(())
    }
}

/// Root folder priority: CLI argument, environment, TOML, platform default
fn resolve_root_folder(cli_arg: Option<&str>, toml_config: &TomlConfig) -> PathBuf {
    if let Some(path) = cli_arg {
        return PathBuf::from(path);
    }

    if let Ok(path) = std::env::var("LABELCONV_ROOT_FOLDER") {
        return PathBuf::from(path);
    }

    if let Some(path) = &toml_config.root_folder {
        return PathBuf::from(path);
    }

    default_root_folder()
}

/// OS-dependent default root folder path
fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("labelconv"))
        .unwrap_or_else(|| PathBuf::from("./labelconv_data"))
}

/// Load the config file if one exists; absence is not an error
fn load_toml_config() -> Result<TomlConfig> {
    let Some(path) = find_config_file() else {
        return Ok(TomlConfig::default());
    };

    let content = std::fs::read_to_string(&path)
        .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;
    parse_toml_config(&content)
        .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))
}

/// Parse TOML config content
pub fn parse_toml_config(content: &str) -> std::result::Result<TomlConfig, toml::de::Error> {
    toml::from_str(content)
}

/// Locate config.toml: user config dir first, then /etc on Linux
fn find_config_file() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("LABELCONV_CONFIG") {
        let path = PathBuf::from(path);
        if path.exists() {
            return Some(path);
        }
    }

    if let Some(user_config) = dirs::config_dir().map(|d| d.join("labelconv").join("config.toml")) {
        if user_config.exists() {
            return Some(user_config);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/labelconv/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toml_sections_are_optional() {
        let config = parse_toml_config("root_folder = \"/srv/labelconv\"").unwrap();
        assert_eq!(config.root_folder.as_deref(), Some("/srv/labelconv"));
        assert!(config.server.port.is_none());
        assert!(config.upload.max_files.is_none());
    }

    #[test]
    fn full_toml_round_trip() {
        let content = r#"
            root_folder = "/data/labelconv"

            [server]
            host = "0.0.0.0"
            port = 8080

            [upload]
            max_files = 3
            max_body_bytes = 1048576

            [storage]
            retry_attempts = 1
            retry_delay_ms = 50
        "#;
        let config = parse_toml_config(content).unwrap();
        assert_eq!(config.server.host.as_deref(), Some("0.0.0.0"));
        assert_eq!(config.server.port, Some(8080));
        assert_eq!(config.upload.max_files, Some(3));
        assert_eq!(config.storage.retry_attempts, Some(1));
        assert_eq!(config.storage.retry_delay_ms, Some(50));
    }

    #[test]
    fn malformed_toml_is_rejected() {
        assert!(parse_toml_config("root_folder = [not valid").is_err());
    }
}
