//! Relay configuration.
//!
//! ## Sources (later wins)
//!
//! 1. Built-in defaults ([`RelayConfig::default`])
//! 2. Optional TOML file
//! 3. Environment variables prefixed `RELAY_` (e.g. `RELAY_QUEUE_CAPACITY=64`)
//!
//! | Key                  | Default                                 | Description                         |
//! |----------------------|-----------------------------------------|-------------------------------------|
//! | `avatar_url`         | `https://mc-heads.net/avatar/{id}/128`  | Icon URL template, `{id}` = participant id |
//! | `queue_capacity`     | `256`                                   | Bounded queue between bus and worker |
//! | `relay_joins`        | `true`                                  | Relay `ParticipantJoined`           |
//! | `relay_leaves`       | `true`                                  | Relay `ParticipantLeft`             |
//! | `relay_deaths`       | `true`                                  | Relay `ParticipantDied`             |
//! | `relay_achievements` | `true`                                  | Relay announced completions         |
//! | `relay_server_status`| `true`                                  | Relay server started / stopped      |

use crate::error::Result;
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const ENV_PREFIX: &str = "RELAY";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub avatar_url: String,
    pub queue_capacity: usize,
    pub relay_joins: bool,
    pub relay_leaves: bool,
    pub relay_deaths: bool,
    pub relay_achievements: bool,
    pub relay_server_status: bool,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            avatar_url: "https://mc-heads.net/avatar/{id}/128".into(),
            queue_capacity: 256,
            relay_joins: true,
            relay_leaves: true,
            relay_deaths: true,
            relay_achievements: true,
            relay_server_status: true,
        }
    }
}

impl RelayConfig {
    /// Load defaults, then `path` (if given), then `RELAY_*` env vars.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).format(FileFormat::Toml));
        }
        let settings = builder
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?;
        Ok(settings.try_deserialize()?)
    }

    /// Parse a TOML document on top of the defaults (no env overrides).
    pub fn from_toml_str(toml: &str) -> Result<Self> {
        let settings = Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?;
        Ok(settings.try_deserialize()?)
    }

    /// Icon URL for a participant id.
    pub fn avatar_url_for(&self, participant_id: &str) -> String {
        self.avatar_url.replace("{id}", participant_id)
    }
}
