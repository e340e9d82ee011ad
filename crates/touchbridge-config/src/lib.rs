// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Config service, storage port and persisted preferences for TouchBridge.
//! Storage adapters live in their own crates (see `touchbridge-config-fs`).

pub mod config;
pub mod prefs;

pub use config::{ConfigError, ConfigService, ConfigStore};
pub use prefs::{default_socket_path, BridgePrefs, DispatchMode, PREFS_KEY};
