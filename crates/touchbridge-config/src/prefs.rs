// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Persisted bridge preferences (device, socket, dispatch policy, logging).

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

/// Key the bridge preferences are stored under.
pub const PREFS_KEY: &str = "bridge";

/// Default Unix socket path: `$XDG_RUNTIME_DIR/touchbridge.sock`, or `/tmp`.
pub fn default_socket_path() -> PathBuf {
    let base = std::env::var_os("XDG_RUNTIME_DIR")
        .map_or_else(|| PathBuf::from("/tmp"), PathBuf::from);
    base.join("touchbridge.sock")
}

/// When the dispatcher runs a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum DispatchMode {
    /// Fixed timer.
    Tick {
        /// Milliseconds between cycles.
        interval_ms: u64,
    },
    /// One cycle per upstream frame signal.
    Frame,
}

impl Default for DispatchMode {
    fn default() -> Self {
        Self::Tick { interval_ms: 10 }
    }
}

impl DispatchMode {
    /// Tick interval, `None` in frame mode.
    pub const fn tick_interval(self) -> Option<Duration> {
        match self {
            Self::Tick { interval_ms } => Some(Duration::from_millis(interval_ms)),
            Self::Frame => None,
        }
    }
}

/// Saved preferences for the bridge service.
///
/// Missing fields fall back to their defaults, so older files keep loading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgePrefs {
    /// HID device node the reports are written to.
    pub device_path: PathBuf,
    /// Unix socket producers connect to.
    pub socket_path: PathBuf,
    /// Dispatch policy.
    pub dispatch: DispatchMode,
    /// Ids reserved per input source.
    pub id_span: u16,
    /// `tracing` filter directive used when `RUST_LOG` is unset.
    pub log_filter: String,
}

impl Default for BridgePrefs {
    fn default() -> Self {
        Self {
            device_path: PathBuf::from("/dev/hidraw0"),
            socket_path: default_socket_path(),
            dispatch: DispatchMode::default(),
            id_span: 4,
            log_filter: "info".to_owned(),
        }
    }
}

impl BridgePrefs {
    /// Reject values the bridge cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if matches!(self.dispatch, DispatchMode::Tick { interval_ms: 0 }) {
            return Err(ConfigError::Invalid("tick interval must be non-zero".into()));
        }
        if self.id_span == 0 {
            return Err(ConfigError::Invalid("id span must be non-zero".into()));
        }
        Ok(())
    }
}
