// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Scenario loading, deterministic replay, golden files and the CLI.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use comfy_table::{presets::UTF8_FULL, Cell, Color, Table};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use touchbridge_core::{
    ContactEvent, ContactId, ContactPhase, ContactSize, InboundQueue, ManualClock, Position,
    ReportDispatcher,
};
use touchbridge_dry_tests::RecordingTransport;
use touchbridge_proto::{MultiTouchReport, REPORT_LENGTH};

/// Golden file format version written by [`Golden::from_run`].
pub const GOLDEN_FORMAT_VERSION: u16 = 1;

/// Command line interface.
#[derive(Parser, Debug)]
#[command(name = "touchbridge-replay")]
#[command(about = "Replay contact scenarios and verify the exact report bytes")]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Commands,
}

/// Harness subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a scenario and optionally check it against a golden file
    Run {
        /// Path to the scenario JSON
        scenario: PathBuf,
        /// Optional golden file to verify against
        #[arg(long)]
        golden: Option<PathBuf>,
    },
    /// Run a scenario and write its golden file
    Record {
        /// Path to the scenario JSON
        scenario: PathBuf,
        /// Output golden file
        #[arg(long)]
        out: PathBuf,
    },
    /// Print every decoded report of a scenario as a table
    Inspect {
        /// Path to the scenario JSON
        scenario: PathBuf,
    },
}

/// Recorded input: one dispatch cycle per frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// Clock advance between cycles.
    #[serde(default = "default_frame_interval")]
    pub frame_interval_ms: u32,
    /// Clock value of the first cycle.
    #[serde(default)]
    pub start_ms: u32,
    /// Frames in order.
    pub frames: Vec<Frame>,
}

const fn default_frame_interval() -> u32 {
    16
}

/// Events submitted before one cycle.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Frame {
    /// Events in submission order.
    #[serde(default)]
    pub events: Vec<ScenarioEvent>,
}

/// Phase spelled the way scenario files spell it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Contact appeared.
    Start,
    /// Contact still present.
    Move,
    /// Contact lifted.
    End,
}

impl From<Phase> for ContactPhase {
    fn from(phase: Phase) -> Self {
        match phase {
            Phase::Start => Self::Start,
            Phase::Move => Self::Move,
            Phase::End => Self::End,
        }
    }
}

/// One contact event in a scenario file.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScenarioEvent {
    /// Contact id (non-zero).
    pub id: u16,
    /// Observed phase.
    pub phase: Phase,
    /// Horizontal position.
    pub x: u16,
    /// Vertical position.
    pub y: u16,
    /// Footprint width.
    #[serde(default)]
    pub width: u16,
    /// Footprint height.
    #[serde(default)]
    pub height: u16,
}

impl ScenarioEvent {
    fn to_event(self) -> Result<ContactEvent> {
        let id = ContactId::new(self.id).context("contact id 0 is reserved")?;
        Ok(
            ContactEvent::new(id, self.phase.into(), Position::new(self.x, self.y)).with_size(
                ContactSize {
                    width: self.width,
                    height: self.height,
                },
            ),
        )
    }
}

impl Scenario {
    /// Read a scenario file.
    pub fn load(path: &Path) -> Result<Self> {
        let f = File::open(path)
            .with_context(|| format!("failed to open scenario {}", path.display()))?;
        serde_json::from_reader(BufReader::new(f)).context("failed to parse scenario")
    }
}

/// Reports sent by every cycle of one replay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayRun {
    /// `cycles[i]` holds the reports of cycle `i`, in send order.
    pub cycles: Vec<Vec<Vec<u8>>>,
}

impl ReplayRun {
    /// blake3 over every report of every cycle, in order.
    pub fn digest(&self) -> blake3::Hash {
        let mut hasher = blake3::Hasher::new();
        for report in self.cycles.iter().flatten() {
            hasher.update(report);
        }
        hasher.finalize()
    }

    /// Reports across all cycles.
    pub fn report_count(&self) -> usize {
        self.cycles.iter().map(Vec::len).sum()
    }
}

/// Expected output of a scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Golden {
    /// File format version.
    pub format_version: u16,
    /// Report length the bytes were produced with.
    pub report_length: usize,
    /// Hex of every report, grouped per cycle.
    pub cycles: Vec<Vec<String>>,
    /// blake3 over all reports in order, hex.
    pub digest_hex: String,
}

impl Golden {
    /// Golden data describing `run`.
    pub fn from_run(run: &ReplayRun) -> Self {
        Self {
            format_version: GOLDEN_FORMAT_VERSION,
            report_length: REPORT_LENGTH,
            cycles: run
                .cycles
                .iter()
                .map(|cycle| cycle.iter().map(hex::encode).collect())
                .collect(),
            digest_hex: run.digest().to_hex().to_string(),
        }
    }

    /// Read a golden file.
    pub fn load(path: &Path) -> Result<Self> {
        let f = File::open(path).context("failed to open golden file")?;
        serde_json::from_reader(BufReader::new(f)).context("failed to parse golden file")
    }

    /// Check `run` against this golden, naming the first divergence.
    pub fn verify(&self, run: &ReplayRun) -> Result<()> {
        if self.format_version != GOLDEN_FORMAT_VERSION {
            bail!(
                "golden format version {} is not supported (expected {})",
                self.format_version,
                GOLDEN_FORMAT_VERSION
            );
        }
        if self.report_length != REPORT_LENGTH {
            bail!(
                "golden report length {} differs from the wire layout ({})",
                self.report_length,
                REPORT_LENGTH
            );
        }
        let actual = Self::from_run(run);
        for (i, (got, want)) in actual.cycles.iter().zip(&self.cycles).enumerate() {
            if got != want {
                bail!("report mismatch at cycle {i}.\nActual:   {got:?}\nExpected: {want:?}");
            }
        }
        if actual.cycles.len() != self.cycles.len() {
            bail!(
                "cycle count mismatch. Run has {}, golden has {}.",
                actual.cycles.len(),
                self.cycles.len()
            );
        }
        if actual.digest_hex != self.digest_hex {
            bail!(
                "digest mismatch.\nActual:   {}\nExpected: {}",
                actual.digest_hex,
                self.digest_hex
            );
        }
        Ok(())
    }
}

/// Replay a scenario file.
pub fn run_scenario(path: &Path) -> Result<ReplayRun> {
    let scenario = Scenario::load(path)?;
    replay(&scenario)
}

/// Replay an in-memory scenario: one cycle per frame, the clock advancing by
/// `frame_interval_ms` after every cycle.
pub fn replay(scenario: &Scenario) -> Result<ReplayRun> {
    let transport = RecordingTransport::connected();
    let clock = ManualClock::starting_at(scenario.start_ms);
    let mut dispatcher =
        ReportDispatcher::with_clock(InboundQueue::new(), transport.clone(), clock.clone());

    let mut cycles = Vec::with_capacity(scenario.frames.len());
    for (index, frame) in scenario.frames.iter().enumerate() {
        let events = frame
            .events
            .iter()
            .copied()
            .map(ScenarioEvent::to_event)
            .collect::<Result<Vec<_>>>()
            .with_context(|| format!("invalid event in frame {index}"))?;
        let outcome = dispatcher
            .process_frame(events)
            .with_context(|| format!("cycle for frame {index} failed"))?;
        debug!(frame = index, contacts = outcome.contacts, "frame replayed");
        cycles.push(transport.take_sent());
        clock.advance(scenario.frame_interval_ms);
    }
    Ok(ReplayRun { cycles })
}

/// Decoded view of every report in `run`.
pub fn inspect_table(run: &ReplayRun) -> Result<Table> {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec![
        Cell::new("cycle").fg(Color::Cyan),
        Cell::new("report").fg(Color::Cyan),
        Cell::new("count"),
        Cell::new("id"),
        Cell::new("state"),
        Cell::new("x"),
        Cell::new("y"),
        Cell::new("w"),
        Cell::new("h"),
        Cell::new("t_ms"),
    ]);
    for (cycle, reports) in run.cycles.iter().enumerate() {
        if reports.is_empty() {
            table.add_row(vec![Cell::new(cycle), Cell::new("idle").fg(Color::DarkGrey)]);
            continue;
        }
        for (index, bytes) in reports.iter().enumerate() {
            let report = MultiTouchReport::decode(bytes)
                .with_context(|| format!("cycle {cycle} report {index} does not decode"))?;
            for record in report.contacts() {
                table.add_row(vec![
                    Cell::new(cycle),
                    Cell::new(index),
                    Cell::new(report.true_contact_count()),
                    Cell::new(record.contact_id),
                    Cell::new(format!("{:?}", record.state)),
                    Cell::new(record.x),
                    Cell::new(record.y),
                    Cell::new(record.width),
                    Cell::new(record.height),
                    Cell::new(record.timestamp_ms),
                ]);
            }
        }
    }
    Ok(table)
}

/// Parse the command line and run it.
#[allow(clippy::print_stdout)]
pub fn entrypoint() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("warn".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run { scenario, golden } => {
            let run = run_scenario(&scenario)?;
            if let Some(golden_path) = golden {
                Golden::load(&golden_path)?.verify(&run)?;
                println!(
                    "REPLAY: OK. {} cycles, {} reports verified.",
                    run.cycles.len(),
                    run.report_count()
                );
            } else {
                println!(
                    "REPLAY: Run complete. {} cycles, {} reports, digest {}.",
                    run.cycles.len(),
                    run.report_count(),
                    run.digest().to_hex()
                );
            }
        }
        Commands::Record { scenario, out } => {
            let run = run_scenario(&scenario)?;
            let golden = Golden::from_run(&run);
            let f = File::create(&out).context("failed to create output file")?;
            serde_json::to_writer_pretty(f, &golden)?;
            info!(out = %out.display(), "golden recorded");
            println!(
                "REPLAY: Recorded {} cycles to {}",
                golden.cycles.len(),
                out.display()
            );
        }
        Commands::Inspect { scenario } => {
            let run = run_scenario(&scenario)?;
            println!("{}", inspect_table(&run)?);
        }
    }
    Ok(())
}
