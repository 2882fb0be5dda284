//! Parallel determinism verification of a scenario.
//!
//! Every run plays the same scenario on its own core, so runs are spread
//! across the rayon pool. Beyond comparing final hashes, the verifier
//! checks that a mid-game snapshot resumes in lockstep, that simulating
//! ahead leaves the original untouched, and that the recorded replay
//! reproduces the final state.

use rayon::prelude::*;
use serde::Serialize;
use tracing::{info, warn};

use gridlock_core::prelude::*;

use crate::runner::play_scenario;
use crate::scenario::{Scenario, ScenarioError};

/// Outcome of [`verify_scenario`].
#[derive(Debug, Clone, Serialize)]
pub struct VerifyReport {
    /// Number of parallel runs.
    pub runs: usize,
    /// Ticks per run.
    pub ticks: u32,
    /// Final state hash of every run.
    pub hashes: Vec<u64>,
    /// A snapshot taken halfway resumed to the same state as the original.
    pub snapshot_ok: bool,
    /// Simulating ahead changed nothing in the source core.
    pub anticipation_ok: bool,
    /// The recorded replay reproduced the final hash.
    pub replay_ok: bool,
}

impl VerifyReport {
    /// All runs agree.
    #[must_use]
    pub fn is_deterministic(&self) -> bool {
        self.hashes.windows(2).all(|w| w[0] == w[1])
    }

    /// Every check passed.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.is_deterministic() && self.snapshot_ok && self.anticipation_ok && self.replay_ok
    }
}

/// Play `scenario` `runs` times for `ticks` ticks and run the lockstep
/// checks.
pub fn verify_scenario(
    scenario: &Scenario,
    runs: usize,
    ticks: u32,
) -> Result<VerifyReport, ScenarioError> {
    let outcomes = (0..runs.max(1))
        .into_par_iter()
        .map(|_| play_scenario(scenario, Some(ticks), |_, _| {}))
        .collect::<Result<Vec<_>, ScenarioError>>()?;
    let hashes: Vec<u64> = outcomes.iter().map(|o| o.core.state_hash()).collect();

    let half = ticks / 2;
    let midgame = play_scenario(scenario, Some(half), |_, _| {})?.core;
    let snapshot_ok = check_snapshot(&midgame, ticks - half)?;
    let anticipation_ok = check_anticipation(&midgame, ticks - half)?;

    let replay_ok = match outcomes.into_iter().next() {
        Some(outcome) => ReplayPlayer::new(outcome.replay)?.verify()?,
        None => false,
    };

    let report = VerifyReport {
        runs: hashes.len(),
        ticks,
        hashes,
        snapshot_ok,
        anticipation_ok,
        replay_ok,
    };
    if report.is_ok() {
        info!(name = %scenario.name, runs = report.runs, ticks, "Scenario is deterministic");
    } else {
        warn!(
            name = %scenario.name,
            deterministic = report.is_deterministic(),
            snapshot_ok,
            anticipation_ok,
            replay_ok,
            "Scenario verification failed"
        );
    }
    Ok(report)
}

/// Restore a snapshot of `core` and run both for `ticks` ticks.
fn check_snapshot(core: &Core, ticks: u32) -> Result<bool, ScenarioError> {
    let bytes = core.serialize()?;
    let restored = Core::deserialize(&bytes)?;
    if restored.state_hash() != core.state_hash() {
        return Ok(false);
    }
    let original = core.simulate_ahead(ticks)?;
    let resumed = restored.simulate_ahead(ticks)?;
    Ok(original.state_hash() == resumed.state_hash())
}

/// Simulate ahead and confirm the source core did not move.
fn check_anticipation(core: &Core, ticks: u32) -> Result<bool, ScenarioError> {
    let before = core.state_hash();
    let ahead = core.simulate_ahead(ticks)?;
    Ok(core.state_hash() == before
        && ahead.current_tick() == core.current_tick().wrapping_add(ticks))
}
