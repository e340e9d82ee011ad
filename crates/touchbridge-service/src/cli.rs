// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Command line flags and how they override saved preferences.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use touchbridge_config::{BridgePrefs, ConfigService, ConfigStore, DispatchMode, PREFS_KEY};
use touchbridge_core::DispatchPolicy;

/// Command line flags. Anything left unset falls back to the saved prefs.
#[derive(Parser, Debug, Default)]
#[command(author, version, about = "TouchBridge virtual digitizer service")]
pub struct Args {
    /// HID device node to write reports to (e.g. /dev/hidraw3)
    #[arg(long)]
    pub device: Option<PathBuf>,
    /// Unix socket producers connect to
    #[arg(long)]
    pub socket: Option<PathBuf>,
    /// Run one cycle every N milliseconds
    #[arg(long, conflicts_with = "frame_mode")]
    pub tick_ms: Option<u64>,
    /// Run one cycle per {"type":"frame"} line instead of on a timer
    #[arg(long)]
    pub frame_mode: bool,
    /// Contact ids reserved per client connection
    #[arg(long)]
    pub id_span: Option<u16>,
    /// Log filter used when RUST_LOG is unset (e.g. "debug")
    #[arg(long)]
    pub log_filter: Option<String>,
    /// Neither read nor write the saved preferences
    #[arg(long)]
    pub no_config: bool,
}

impl Args {
    /// `prefs` with every flag that was given applied on top.
    pub fn apply(&self, mut prefs: BridgePrefs) -> BridgePrefs {
        if let Some(device) = &self.device {
            prefs.device_path.clone_from(device);
        }
        if let Some(socket) = &self.socket {
            prefs.socket_path.clone_from(socket);
        }
        if let Some(interval_ms) = self.tick_ms {
            prefs.dispatch = DispatchMode::Tick { interval_ms };
        }
        if self.frame_mode {
            prefs.dispatch = DispatchMode::Frame;
        }
        if let Some(span) = self.id_span {
            prefs.id_span = span;
        }
        if let Some(filter) = &self.log_filter {
            prefs.log_filter.clone_from(filter);
        }
        prefs
    }
}

/// Saved prefs from `config`, persisting the defaults when none exist yet.
///
/// Loading is best effort: on any store or parse failure the defaults are
/// returned together with the reason, and nothing is written back.
pub fn saved_prefs<S: ConfigStore>(config: &ConfigService<S>) -> (BridgePrefs, Option<String>) {
    match config.load_or_init::<BridgePrefs>(PREFS_KEY) {
        Ok(prefs) => (prefs, None),
        Err(err) => (BridgePrefs::default(), Some(err.to_string())),
    }
}

/// Dispatch policy for a saved dispatch mode.
pub const fn policy_for(mode: DispatchMode) -> DispatchPolicy {
    match mode {
        DispatchMode::Tick { interval_ms } => {
            DispatchPolicy::Tick(Duration::from_millis(interval_ms))
        }
        DispatchMode::Frame => DispatchPolicy::Frame,
    }
}
