//! Process configuration.
//!
//! Read once at startup from JSON. Every field has a default, so a partial
//! file only overrides what it names.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::handoff::QueueOrder;
use crate::patchbay::OverflowPolicy;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Slots in the handoff queue
    pub capacity: usize,
    pub order: QueueOrder,
    pub overflow: OverflowPolicy,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            capacity: 256,
            order: QueueOrder::Lifo,
            overflow: OverflowPolicy::Block,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Client name shown by the audio graph service
    pub client_name: String,
    /// Ports whose links are policed, as `node:port`
    pub monitored_ports: Vec<String>,
    /// Destinations the monitored ports may be linked to, dealt round-robin
    pub approved_destinations: Vec<String>,
    pub poll_interval_ms: u64,
    pub queue: QueueConfig,
    /// Also react to link removal notifications
    pub enforce_on_disconnect: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            client_name: "portguard".to_string(),
            monitored_ports: vec!["system:capture_1".into(), "system:capture_2".into()],
            approved_destinations: vec![
                "ardour:Mic/audio_in 1".into(),
                "ardour:Mic/audio_in 2".into(),
                "ardour:Mic loopback/audio_in 1".into(),
                "ardour:Mic loopback/audio_in 2".into(),
            ],
            poll_interval_ms: 1000,
            queue: QueueConfig::default(),
            enforce_on_disconnect: true,
        }
    }
}

impl Config {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("portguard").join("config.json"))
    }

    /// Load from `path`, or from the default location when `None`.
    ///
    /// An explicit path must exist. A missing default file yields the
    /// built-in defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::from_file(&path)?,
                _ => {
                    log::info!("No config file found, using built-in defaults");
                    Self::default()
                }
            },
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_json(&text)?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.monitored_ports.is_empty() {
            return Err(Error::Config("monitored_ports is empty".into()));
        }
        if self.queue.capacity == 0 {
            return Err(Error::Config("queue.capacity must be at least 1".into()));
        }
        if self.poll_interval_ms == 0 {
            return Err(Error::Config("poll_interval_ms must be at least 1".into()));
        }
        if self.client_name.is_empty() {
            return Err(Error::Config("client_name is empty".into()));
        }
        Ok(())
    }
}
