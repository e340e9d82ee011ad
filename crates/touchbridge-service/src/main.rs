// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! TouchBridge service: Unix-socket contact intake feeding the virtual
//! multi-touch digitizer.

use std::io::BufReader;
use std::os::unix::net::UnixListener;
use std::thread;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use touchbridge_config::{BridgePrefs, ConfigService};
use touchbridge_config_fs::FsConfigStore;
use touchbridge_core::{DispatchLoop, HidrawTransport, InboundQueue, ReportDispatcher};
use touchbridge_service::{policy_for, saved_prefs, Args, ClientSession, SourceRegistry};

/// Saved prefs, or defaults plus the reason they could not be loaded.
fn load_prefs(args: &Args) -> (BridgePrefs, Option<String>) {
    if args.no_config {
        return (BridgePrefs::default(), None);
    }
    match FsConfigStore::new() {
        Ok(store) => saved_prefs(&ConfigService::new(store)),
        Err(err) => (BridgePrefs::default(), Some(err.to_string())),
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    let (saved, config_problem) = load_prefs(&args);
    let prefs = args.apply(saved);

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&prefs.log_filter))
        .context("invalid log filter")?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if let Some(problem) = config_problem {
        warn!(%problem, "saved preferences unavailable, using defaults");
    }
    prefs.validate().context("invalid preferences")?;

    let mut dispatcher = ReportDispatcher::new(
        InboundQueue::new(),
        HidrawTransport::new(&prefs.device_path),
    );
    dispatcher
        .connect()
        .with_context(|| format!("failed to open {}", prefs.device_path.display()))?;
    let handle = DispatchLoop::spawn(dispatcher, policy_for(prefs.dispatch))?;

    // Remove stale socket if present
    let _ = std::fs::remove_file(&prefs.socket_path);
    let listener = UnixListener::bind(&prefs.socket_path)
        .with_context(|| format!("failed to bind {}", prefs.socket_path.display()))?;
    info!(
        socket = %prefs.socket_path.display(),
        device = %prefs.device_path.display(),
        dispatch = ?prefs.dispatch,
        "touchbridge listening"
    );

    let registry = SourceRegistry::new(prefs.id_span);
    for stream in listener.incoming() {
        let stream = match stream {
            Ok(stream) => stream,
            Err(err) => {
                warn!(error = %err, "accept failed");
                continue;
            }
        };
        let Some(lease) = registry.acquire() else {
            warn!("no free id span, connection refused");
            continue;
        };
        let source = lease.source();
        let session = ClientSession::new(handle.sink(), lease.span(), handle.trigger());
        let spawned = thread::Builder::new()
            .name(format!("touchbridge-client-{source}"))
            .spawn(move || {
                info!(source, "client connected");
                match session.serve(BufReader::new(stream)) {
                    Ok(summary) => info!(source, ?summary, "client disconnected"),
                    Err(err) => warn!(source, error = %err, "client connection failed"),
                }
                drop(lease);
            });
        if let Err(err) = spawned {
            warn!(source, error = %err, "failed to spawn client thread");
        }
    }

    let mut dispatcher = handle.stop()?;
    dispatcher.disconnect();
    Ok(())
}
