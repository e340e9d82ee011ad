// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! CLI entry point for the replay harness.

use anyhow::Result;
use touchbridge_replay::replay::entrypoint;

fn main() -> Result<()> {
    entrypoint()
}
