//! Server configuration types.
//!
//! [`ServerConfig`] is the single source of truth for all runtime settings.
//! It starts from defaults, is optionally overlaid with a TOML file
//! (`--config <path>`), and finally with explicit command-line flags (see
//! `main.rs`).  [`ServerConfig::validate`] runs once before anything is
//! started; an invalid configuration is a fatal startup error.
//!
//! # File format
//!
//! Every section and every field is optional:
//!
//! ```toml
//! [network]
//! bind_address = "0.0.0.0"
//! port = 10034
//!
//! [capture]
//! window = "0x3a00007"   # omit to capture the whole display
//! multiplier = 2.0
//!
//! [stream]
//! target_fps = 60
//! size_budget_kib = 60
//!
//! [diagnostics]
//! verbose = false
//! interval_ms = 1000
//! ```

use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use screen_relay_core::domain::session::{
    budget_bytes_from_kib, DEFAULT_CAPTURE_MULTIPLIER, DEFAULT_SIZE_BUDGET_BYTES,
    DEFAULT_TARGET_FPS,
};
use screen_relay_core::{SessionError, SessionParams};

/// Default WebSocket listening port.
pub const DEFAULT_PORT: u16 = 10034;

/// Error type for configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("I/O error reading config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// A window id was not a hexadecimal number.
    #[error("invalid window id {0:?}: expected a hexadecimal X11 window id")]
    InvalidWindowId(String),

    /// The bind address did not parse as an IP address.
    #[error("invalid bind address {0:?}")]
    InvalidBindAddress(String),

    /// A stream parameter violates a session invariant.
    #[error("invalid stream parameters: {0}")]
    Session(#[from] SessionError),

    #[error("diagnostics interval must be at least 1 ms")]
    InvalidDiagnosticsInterval,
}

// ── CaptureTarget ─────────────────────────────────────────────────────────────

/// What the capture gateway rasterizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaptureTarget {
    /// The root window of the default screen, i.e. the whole display.
    #[default]
    RootWindow,
    /// One X11 window, by id.
    Window(u64),
}

impl CaptureTarget {
    /// Parses an X11 window id given in hexadecimal, with or without `0x`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidWindowId`] if `raw` is not hexadecimal
    /// or names window 0.
    pub fn parse_window_id(raw: &str) -> Result<Self, ConfigError> {
        let trimmed = raw.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);
        match u64::from_str_radix(digits, 16) {
            Ok(0) | Err(_) => Err(ConfigError::InvalidWindowId(raw.to_string())),
            Ok(id) => Ok(CaptureTarget::Window(id)),
        }
    }

    pub fn is_root(&self) -> bool {
        matches!(self, CaptureTarget::RootWindow)
    }
}

impl fmt::Display for CaptureTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureTarget::RootWindow => f.write_str("root window"),
            CaptureTarget::Window(id) => write!(f, "window {id:#x}"),
        }
    }
}

// ── ServerConfig ──────────────────────────────────────────────────────────────

/// All runtime configuration for the streaming server.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    /// Address the WebSocket listener binds to.
    pub bind_addr: SocketAddr,
    pub capture_target: CaptureTarget,
    /// Capture rate ÷ broadcast rate.
    pub capture_multiplier: f64,
    /// Initial broadcast frame rate; viewers can change it with `f N`.
    pub target_fps: u32,
    /// Initial encoded size budget in KiB; viewers can change it with `q N`.
    pub size_budget_kib: u32,
    /// Enables the periodic diagnostic reporter.
    pub verbose: bool,
    /// How often the diagnostic reporter logs.
    pub diagnostics_interval: Duration,
}

impl Default for ServerConfig {
    /// | Field                | Default          |
    /// |----------------------|------------------|
    /// | bind_addr            | `0.0.0.0:10034`  |
    /// | capture_target       | root window      |
    /// | capture_multiplier   | 2.0              |
    /// | target_fps           | 60               |
    /// | size_budget_kib      | 60               |
    /// | verbose              | false            |
    /// | diagnostics_interval | 1 second         |
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::new(IpAddr::from([0, 0, 0, 0]), DEFAULT_PORT),
            capture_target: CaptureTarget::RootWindow,
            capture_multiplier: DEFAULT_CAPTURE_MULTIPLIER,
            target_fps: DEFAULT_TARGET_FPS,
            size_budget_kib: (DEFAULT_SIZE_BUDGET_BYTES / 1024) as u32,
            verbose: false,
            diagnostics_interval: Duration::from_secs(1),
        }
    }
}

impl ServerConfig {
    /// Loads a TOML file and overlays it onto the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Parse`] for malformed TOML, and
    /// [`ConfigError::InvalidWindowId`] / [`ConfigError::InvalidBindAddress`]
    /// for unparseable values.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let file: FileConfig = toml::from_str(&content)?;
        let mut config = Self::default();
        config.apply_file(&file)?;
        Ok(config)
    }

    /// Overlays every value of `file` onto `self`.
    ///
    /// # Errors
    ///
    /// See [`ServerConfig::from_file`].
    pub fn apply_file(&mut self, file: &FileConfig) -> Result<(), ConfigError> {
        let ip: IpAddr = file
            .network
            .bind_address
            .parse()
            .map_err(|_| ConfigError::InvalidBindAddress(file.network.bind_address.clone()))?;
        self.bind_addr = SocketAddr::new(ip, file.network.port);
        self.capture_target = match file.capture.window.as_deref() {
            Some(raw) => CaptureTarget::parse_window_id(raw)?,
            None => CaptureTarget::RootWindow,
        };
        self.capture_multiplier = file.capture.multiplier;
        self.target_fps = file.stream.target_fps;
        self.size_budget_kib = file.stream.size_budget_kib;
        self.verbose = file.diagnostics.verbose;
        self.diagnostics_interval = Duration::from_millis(file.diagnostics.interval_ms);
        Ok(())
    }

    /// Checks every value once, before the session starts.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Session`] for an FPS, budget or multiplier the
    /// session would reject, and [`ConfigError::InvalidDiagnosticsInterval`]
    /// for a zero reporter interval.
    pub fn validate(&self) -> Result<(), ConfigError> {
        budget_bytes_from_kib(self.size_budget_kib)?;
        self.session_params().validate()?;
        if self.diagnostics_interval.is_zero() {
            return Err(ConfigError::InvalidDiagnosticsInterval);
        }
        Ok(())
    }

    /// The initial session parameters described by this configuration.
    pub fn session_params(&self) -> SessionParams {
        SessionParams {
            target_fps: self.target_fps,
            capture_multiplier: self.capture_multiplier,
            // An unrepresentable budget becomes 0, which `validate` rejects.
            size_budget_bytes: budget_bytes_from_kib(self.size_budget_kib).unwrap_or(0),
        }
    }
}

// ── File schema ───────────────────────────────────────────────────────────────

/// On-disk configuration.  Missing sections and fields take their defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct FileConfig {
    #[serde(default)]
    pub network: NetworkSection,
    #[serde(default)]
    pub capture: CaptureSection,
    #[serde(default)]
    pub stream: StreamSection,
    #[serde(default)]
    pub diagnostics: DiagnosticsSection,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NetworkSection {
    /// IP address to bind.  `"0.0.0.0"` binds all interfaces.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CaptureSection {
    /// Hexadecimal X11 window id; absent means the whole display.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window: Option<String>,
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StreamSection {
    #[serde(default = "default_target_fps")]
    pub target_fps: u32,
    #[serde(default = "default_size_budget_kib")]
    pub size_budget_kib: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiagnosticsSection {
    #[serde(default)]
    pub verbose: bool,
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_multiplier() -> f64 {
    DEFAULT_CAPTURE_MULTIPLIER
}
fn default_target_fps() -> u32 {
    DEFAULT_TARGET_FPS
}
fn default_size_budget_kib() -> u32 {
    (DEFAULT_SIZE_BUDGET_BYTES / 1024) as u32
}
fn default_interval_ms() -> u64 {
    1000
}

impl Default for NetworkSection {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
        }
    }
}

impl Default for CaptureSection {
    fn default() -> Self {
        Self {
            window: None,
            multiplier: default_multiplier(),
        }
    }
}

impl Default for StreamSection {
    fn default() -> Self {
        Self {
            target_fps: default_target_fps(),
            size_budget_kib: default_size_budget_kib(),
        }
    }
}

impl Default for DiagnosticsSection {
    fn default() -> Self {
        Self {
            verbose: false,
            interval_ms: default_interval_ms(),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
