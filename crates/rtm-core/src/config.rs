// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Bridge configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::LogFilter;

/// Persistent bridge settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Method channel name; event channels are derived from it.
    pub channel_name: String,
    /// Capacity of the inbound request queue.
    pub request_queue_depth: usize,
    /// Capacity of the outbound event broadcast buffer.
    pub event_queue_depth: usize,
    /// Upper bound on simultaneously live client handles.
    pub max_clients: u32,
    /// SDK log settings applied to every newly created client.
    pub log: LogConfig,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            channel_name: "io.agora.rtm".into(),
            request_queue_depth: 256,
            event_queue_depth: 1024,
            max_clients: u32::MAX,
            log: LogConfig::default(),
        }
    }
}

/// SDK log pass-through settings. `None` leaves the SDK default in place.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub file: Option<PathBuf>,
    pub filter: Option<LogFilter>,
    pub file_size_kb: Option<u32>,
}

impl BridgeConfig {
    /// Read a JSON config file. Missing fields take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read_to_string(path.as_ref())?;
        Ok(serde_json::from_str(&data)?)
    }

    /// Write the config as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), json)?;
        Ok(())
    }

    /// Event channel name for a client.
    pub fn client_event_channel(&self, client: crate::ClientIndex) -> String {
        format!("{}.client{}", self.channel_name, client)
    }

    /// Event channel name for a channel owned by a client.
    pub fn channel_event_channel(&self, client: crate::ClientIndex, channel_id: &str) -> String {
        format!("{}.client{}.channel{}", self.channel_name, client, channel_id)
    }
}
