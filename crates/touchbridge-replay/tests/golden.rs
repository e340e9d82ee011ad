// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Every scenario under `testdata/scenarios` must reproduce its golden file.
#![allow(clippy::unwrap_used)]

use std::path::{Path, PathBuf};

use anyhow::Result;
use touchbridge_proto::{decode_sequence, WireState};
use touchbridge_replay::replay::{
    replay, run_scenario, Frame, Golden, Phase, Scenario, ScenarioEvent,
};

fn testdata() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("testdata")
}

fn scenarios() -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(testdata().join("scenarios"))
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
        .collect();
    paths.sort();
    paths
}

#[test]
fn scenarios_match_goldens() -> Result<()> {
    let update = std::env::var("TOUCHBRIDGE_UPDATE_GOLDEN").is_ok();
    let paths = scenarios();
    assert!(!paths.is_empty(), "no scenarios found");

    for path in paths {
        let run = run_scenario(&path)?;
        let golden_path = testdata().join("golden").join(path.file_name().unwrap());
        if update {
            let f = std::fs::File::create(&golden_path)?;
            serde_json::to_writer_pretty(f, &Golden::from_run(&run))?;
            continue;
        }
        Golden::load(&golden_path)?.verify(&run)?;
    }
    Ok(())
}

#[test]
fn replay_is_deterministic() -> Result<()> {
    for path in scenarios() {
        assert_eq!(run_scenario(&path)?, run_scenario(&path)?);
    }
    Ok(())
}

#[test]
fn every_cycle_is_a_valid_sequence() -> Result<()> {
    for path in scenarios() {
        for cycle in run_scenario(&path)?.cycles {
            if !cycle.is_empty() {
                decode_sequence(&cycle)?;
            }
        }
    }
    Ok(())
}

#[test]
fn verify_names_the_diverging_cycle() -> Result<()> {
    let path = testdata().join("scenarios").join("two_finger_tap.json");
    let mut golden = Golden::load(&testdata().join("golden").join("two_finger_tap.json"))?;
    golden.cycles[2][0].replace_range(0..2, "ff");
    let err = golden.verify(&run_scenario(&path)?).unwrap_err();
    assert!(err.to_string().contains("cycle 2"), "{err}");
    Ok(())
}

#[test]
fn in_memory_scenario_stamps_clock_per_cycle() -> Result<()> {
    let tap = |phase| ScenarioEvent {
        id: 3,
        phase,
        x: 7,
        y: 8,
        width: 0,
        height: 0,
    };
    let scenario = Scenario {
        frame_interval_ms: 5,
        start_ms: 100,
        frames: vec![
            Frame {
                events: vec![tap(Phase::Start)],
            },
            Frame {
                events: vec![tap(Phase::End)],
            },
            Frame::default(),
            Frame::default(),
        ],
    };
    let run = replay(&scenario)?;
    let cycles: Vec<_> = run
        .cycles
        .iter()
        .filter(|c| !c.is_empty())
        .map(|c| decode_sequence(c).unwrap())
        .collect();
    assert_eq!(cycles.len(), 3);
    let seen: Vec<(WireState, u32)> = cycles
        .iter()
        .map(|c| (c[0].state, c[0].timestamp_ms))
        .collect();
    assert_eq!(
        seen,
        vec![
            (WireState::Adding, 100),
            (WireState::Removing, 105),
            (WireState::Removed, 110)
        ]
    );
    assert!(run.cycles[3].is_empty());
    Ok(())
}

#[test]
fn zero_contact_id_is_rejected() {
    let scenario: Scenario = serde_json::from_str(
        r#"{"frames":[{"events":[{"id":0,"phase":"start","x":1,"y":1}]}]}"#,
    )
    .unwrap();
    assert_eq!(scenario.frame_interval_ms, 16);
    assert!(replay(&scenario).is_err());
}
