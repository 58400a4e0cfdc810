use serde::Deserialize;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};

use crate::chatbot::engine::EngineLimits;
use crate::chatbot::message::{DEFAULT_TIME_FORMAT, is_valid_time_format};
use crate::chatbot::service::ServiceConfig;

/// Errors that can occur when loading configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to read the config file.
    ReadFile { path: PathBuf, source: std::io::Error },
    /// Failed to parse JSON.
    ParseJson { path: PathBuf, source: serde_json::Error },
    /// Validation error.
    Validation(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadFile { path, source } => {
                write!(f, "failed to read config file '{}': {}", path.display(), source)
            }
            Self::ParseJson { path, source } => {
                write!(f, "failed to parse config file '{}': {}", path.display(), source)
            }
            Self::Validation(msg) => write!(f, "config validation error: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ReadFile { source, .. } => Some(source),
            Self::ParseJson { source, .. } => Some(source),
            Self::Validation(_) => None,
        }
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    #[serde(default = "default_listen_addr")]
    listen_addr: String,
    #[serde(default = "default_port")]
    port: u16,
    /// Directory for state files (transcript, learned responses, logs).
    data_dir: Option<String>,
    #[serde(default = "default_true")]
    persist_transcript: bool,
    #[serde(default = "default_true")]
    persist_learned: bool,
    /// Log rejected messages in the transcript as "error" bot messages.
    #[serde(default)]
    record_rejections: bool,
    #[serde(default = "default_min_length")]
    min_length: usize,
    #[serde(default = "default_max_length")]
    max_length: usize,
    /// chrono format string for message timestamps.
    time_format: Option<String>,
    /// Directory of client files served at `/`.
    static_dir: Option<String>,
    log_dir: Option<String>,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            port: default_port(),
            data_dir: None,
            persist_transcript: true,
            persist_learned: true,
            record_rejections: false,
            min_length: default_min_length(),
            max_length: default_max_length(),
            time_format: None,
            static_dir: None,
            log_dir: None,
        }
    }
}

fn default_listen_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_true() -> bool {
    true
}

fn default_min_length() -> usize {
    2
}

fn default_max_length() -> usize {
    100
}

#[derive(Debug, Clone)]
pub struct Config {
    pub listen_addr: IpAddr,
    pub port: u16,
    /// Directory for state files.
    pub data_dir: PathBuf,
    pub persist_transcript: bool,
    pub persist_learned: bool,
    pub record_rejections: bool,
    pub limits: EngineLimits,
    pub time_format: String,
    pub static_dir: Option<PathBuf>,
    pub log_dir: PathBuf,
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config_path = path.as_ref().to_path_buf();
        let content = std::fs::read_to_string(&config_path)
            .map_err(|e| ConfigError::ReadFile { path: config_path.clone(), source: e })?;
        let file: ConfigFile = serde_json::from_str(&content)
            .map_err(|e| ConfigError::ParseJson { path: config_path.clone(), source: e })?;
        Self::from_file(file)
    }

    /// Load `path` if it exists, otherwise use the built-in defaults.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Self::from_file(ConfigFile::default())
        }
    }

    fn from_file(file: ConfigFile) -> Result<Self, ConfigError> {
        let listen_addr: IpAddr = file.listen_addr.parse().map_err(|_| {
            ConfigError::Validation(format!("listen_addr '{}' is not an IP address", file.listen_addr))
        })?;
        if file.port == 0 {
            return Err(ConfigError::Validation("port must be non-zero".into()));
        }
        if file.min_length == 0 {
            return Err(ConfigError::Validation("min_length must be at least 1".into()));
        }
        if file.min_length > file.max_length {
            return Err(ConfigError::Validation(format!(
                "min_length ({}) must not exceed max_length ({})",
                file.min_length, file.max_length
            )));
        }

        let time_format = file.time_format.unwrap_or_else(|| DEFAULT_TIME_FORMAT.to_string());
        if time_format.trim().is_empty() {
            return Err(ConfigError::Validation("time_format must not be empty".into()));
        }
        if !is_valid_time_format(&time_format) {
            return Err(ConfigError::Validation(format!(
                "time_format '{time_format}' is not a valid chrono format"
            )));
        }

        let data_dir = file
            .data_dir
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("data"));
        let log_dir = file
            .log_dir
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("logs"));

        Ok(Self {
            listen_addr,
            port: file.port,
            data_dir,
            persist_transcript: file.persist_transcript,
            persist_learned: file.persist_learned,
            record_rejections: file.record_rejections,
            limits: EngineLimits { min_length: file.min_length, max_length: file.max_length },
            time_format,
            static_dir: file.static_dir.map(PathBuf::from),
            log_dir,
        })
    }

    /// Apply a `PORT` override, e.g. from the environment.
    pub fn with_port_override(mut self, port: Option<&str>) -> Result<Self, ConfigError> {
        if let Some(raw) = port {
            self.port = match raw.trim().parse::<u16>() {
                Ok(p) if p != 0 => p,
                _ => return Err(ConfigError::Validation(format!("PORT '{raw}' is not a valid port"))),
            };
        }
        Ok(self)
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.listen_addr, self.port)
    }

    pub fn transcript_path(&self) -> PathBuf {
        self.data_dir.join("messages.json")
    }

    pub fn learned_path(&self) -> PathBuf {
        self.data_dir.join("learned.json")
    }

    pub fn service_config(&self) -> ServiceConfig {
        ServiceConfig {
            limits: self.limits,
            time_format: self.time_format.clone(),
            transcript_path: self.persist_transcript.then(|| self.transcript_path()),
            learned_path: self.persist_learned.then(|| self.learned_path()),
            record_rejections: self.record_rejections,
            seed: None,
        }
    }
}
