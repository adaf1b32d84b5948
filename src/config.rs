//! Server configuration.
//!
//! Loaded from a YAML file named by `SWITCHYARD_CONFIG` (defaults apply when
//! unset), then `LISTEN=host:port` overrides the listen address.

use std::net::{SocketAddr, ToSocketAddrs};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::server::ServerOptions;

pub const CONFIG_ENV: &str = "SWITCHYARD_CONFIG";
pub const LISTEN_ENV: &str = "LISTEN";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Which scheduler serves connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheduler {
    /// Single-threaded non-blocking event loop.
    #[default]
    Reactor,
    /// Fixed pool of worker threads, one task per connection.
    Pool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub scheduler: Scheduler,
    /// Worker threads for the pool scheduler.
    pub threads: usize,
    pub max_connections: usize,
    pub idle_timeout_secs: u64,
    pub force_close: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        let options = ServerOptions::default();
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            scheduler: Scheduler::default(),
            threads: 8,
            max_connections: options.max_connections,
            idle_timeout_secs: options.idle_timeout.as_secs(),
            force_close: options.force_close,
        }
    }
}

impl ServerConfig {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn options(&self) -> ServerOptions {
        ServerOptions {
            max_connections: self.max_connections,
            idle_timeout: self.idle_timeout(),
            force_close: self.force_close,
        }
    }
}

/// Where the static file handler is mounted and what it serves.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StaticFilesConfig {
    /// First path segment routed to the handler.
    pub mount: String,
    pub root: PathBuf,
}

impl Default for StaticFilesConfig {
    fn default() -> Self {
        Self {
            mount: "site".to_string(),
            root: PathBuf::from("./public"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub static_files: StaticFilesConfig,
}

impl Config {
    /// Reads the file named by `SWITCHYARD_CONFIG` if set, applies the
    /// `LISTEN` override, and validates the result.
    pub fn load() -> Result<Self, ConfigError> {
        let mut cfg = match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        if let Ok(listen) = std::env::var(LISTEN_ENV) {
            cfg.set_listen(&listen)?;
        }

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&text)
    }

    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Overrides host and port from a `host:port` string.
    pub fn set_listen(&mut self, listen: &str) -> Result<(), ConfigError> {
        let (host, port) = listen
            .rsplit_once(':')
            .ok_or_else(|| ConfigError::Invalid(format!("listen address {listen:?} has no port")))?;
        let port = port
            .parse()
            .map_err(|_| ConfigError::Invalid(format!("bad port in listen address {listen:?}")))?;

        self.server.host = host.trim_start_matches('[').trim_end_matches(']').to_string();
        self.server.port = port;
        Ok(())
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Resolves the listen address.
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        (self.server.host.as_str(), self.server.port)
            .to_socket_addrs()
            .map_err(|e| ConfigError::Invalid(format!("cannot resolve {}: {e}", self.listen_addr())))?
            .next()
            .ok_or_else(|| ConfigError::Invalid(format!("{} resolves to nothing", self.listen_addr())))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.threads == 0 {
            return Err(ConfigError::Invalid("threads must be at least 1".into()));
        }
        if self.server.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "max_connections must be at least 1".into(),
            ));
        }
        if self.server.idle_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "idle_timeout_secs must be at least 1".into(),
            ));
        }
        if self.static_files.mount.is_empty() || self.static_files.mount.contains('/') {
            return Err(ConfigError::Invalid(format!(
                "static_files.mount {:?} must be a single path segment",
                self.static_files.mount
            )));
        }
        self.socket_addr()?;
        Ok(())
    }
}
