//! Runtime configuration for the dispatch board.
//!
//! Fixed values live on unit structs as associated constants; the handful of
//! knobs an operator may want to turn are read from `DISPATCH_*` environment
//! variables by [`Config::from_env`].

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use directories::BaseDirs;

use crate::dispatch::DEFAULT_CAPACITY;
use crate::entity::Order;
use crate::error::ConfigError;

/// Application-level constants.
pub struct AppConfig;

impl AppConfig {
    pub const APP_NAME: &'static str = "Dispatch Manager";
    /// Folder created beneath the user's home directory.
    pub const DATA_DIR_NAME: &'static str = ".dispatch-manager";
    pub const LOG_FILE_NAME: &'static str = "dispatch.log";
    pub const DEFAULT_LOG_FILTER: &'static str = "info";
}

/// Terminal UI timing.
pub struct UiConfig;

impl UiConfig {
    pub const POLL_INTERVAL: Duration = Duration::from_millis(250);
}

/// Names of the environment variables [`Config::from_env`] reads.
pub struct EnvVars;

impl EnvVars {
    pub const FLEET: &'static str = "DISPATCH_FLEET";
    pub const ORDER: &'static str = "DISPATCH_ORDER";
    pub const CAPACITY: &'static str = "DISPATCH_CAPACITY";
    pub const GENERATE: &'static str = "DISPATCH_GENERATE";
    pub const LOG: &'static str = "DISPATCH_LOG";
}

/// Which kind of entity the board manages for this session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Fleet {
    Trains,
    #[default]
    Flights,
    Drones,
}

impl Fleet {
    pub fn label(self) -> &'static str {
        match self {
            Fleet::Trains => "trains",
            Fleet::Flights => "flights",
            Fleet::Drones => "drones",
        }
    }
}

impl fmt::Display for Fleet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Fleet {
    type Err = ConfigError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "train" | "trains" => Ok(Fleet::Trains),
            "flight" | "flights" => Ok(Fleet::Flights),
            "drone" | "drones" => Ok(Fleet::Drones),
            _ => Err(ConfigError::InvalidValue {
                name: "fleet",
                value: raw.to_string(),
                expected: "trains, flights or drones",
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub fleet: Fleet,
    /// Overrides the fleet's usual ordering when set.
    pub order: Option<Order>,
    pub capacity: usize,
    /// Random flights to add on startup. Ignored for other fleets.
    pub generate: usize,
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            fleet: Fleet::default(),
            order: None,
            capacity: DEFAULT_CAPACITY,
            generate: 0,
            log_filter: AppConfig::DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a config from any variable source. Unset and blank variables
    /// keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let mut config = Config::default();

        if let Some(raw) = read(EnvVars::FLEET) {
            config.fleet = raw.parse()?;
        }
        if let Some(raw) = read(EnvVars::ORDER) {
            config.order = Some(raw.parse()?);
        }
        if let Some(raw) = read(EnvVars::CAPACITY) {
            config.capacity = parse_count("capacity", &raw)?;
        }
        if let Some(raw) = read(EnvVars::GENERATE) {
            config.generate = parse_count("generate", &raw)?;
        }
        if let Some(raw) = read(EnvVars::LOG) {
            config.log_filter = raw;
        }
        Ok(config)
    }

    /// Ordering for the session: the override if one was given, otherwise
    /// `fallback`.
    pub fn order_or(&self, fallback: Order) -> Order {
        self.order.unwrap_or(fallback)
    }
}

fn parse_count(name: &'static str, raw: &str) -> Result<usize, ConfigError> {
    raw.trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue {
            name,
            value: raw.to_string(),
            expected: "a non-negative integer",
        })
}

/// Absolute path of the application data directory inside the user's home.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let base_dirs = BaseDirs::new().ok_or(ConfigError::NoHomeDirectory)?;
    Ok(base_dirs.home_dir().join(AppConfig::DATA_DIR_NAME))
}
