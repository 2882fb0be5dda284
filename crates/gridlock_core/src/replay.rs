//! Replay system for recording and playing back games.
//!
//! A replay stores a snapshot of the core at the moment recording began and
//! every successfully applied [`Action`] tagged with the tick it was applied
//! at. Because the simulation is deterministic, re-applying the actions at
//! the same ticks reproduces the game exactly; the recorded final hash
//! checks that it did.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::actions::Action;
use crate::error::{GameError, Result};
use crate::events::TickEvents;
use crate::simulation::Core;

/// Replay file format version for compatibility.
pub const REPLAY_VERSION: u32 = 1;

/// A single action record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayAction {
    /// Clock value when the action was applied, before that tick ran.
    pub tick: u32,
    /// The applied action.
    pub action: Action,
}

/// Complete replay data structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Replay {
    /// Replay format version.
    pub version: u32,
    /// Scenario identifier or name.
    pub scenario_id: String,
    /// Snapshot of the core when recording began.
    pub initial_state: Vec<u8>,
    /// Actions in the order they were applied.
    pub actions: Vec<ReplayAction>,
    /// Clock value when recording ended.
    pub final_tick: u32,
    /// State hash when recording ended.
    pub final_hash: u64,
}

impl Replay {
    /// Start a replay from the current state of `core`.
    pub fn new(scenario_id: impl Into<String>, core: &Core) -> Result<Self> {
        Ok(Self {
            version: REPLAY_VERSION,
            scenario_id: scenario_id.into(),
            initial_state: core.serialize()?,
            actions: Vec::new(),
            final_tick: core.current_tick(),
            final_hash: core.state_hash(),
        })
    }

    /// Record an action applied at `tick`.
    pub fn record_action(&mut self, tick: u32, action: Action) {
        self.actions.push(ReplayAction { tick, action });
    }

    /// Seal the replay with the end-of-game clock and hash.
    pub fn finalize(&mut self, final_tick: u32, final_hash: u64) {
        self.final_tick = final_tick;
        self.final_hash = final_hash;
    }

    /// Save the replay to a file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let bytes = bincode::serialize(self)
            .map_err(|e| GameError::Serialization(format!("Failed to serialize replay: {e}")))?;
        std::fs::write(path, bytes).map_err(|e| GameError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        debug!(path = %path.display(), actions = self.actions.len(), "Replay saved");
        Ok(())
    }

    /// Load a replay from a file, rejecting other format versions.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| GameError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let replay: Self = bincode::deserialize(&bytes)
            .map_err(|e| GameError::Serialization(format!("Failed to deserialize replay: {e}")))?;
        if replay.version != REPLAY_VERSION {
            return Err(GameError::ReplayVersionMismatch {
                expected: REPLAY_VERSION,
                found: replay.version,
            });
        }
        Ok(replay)
    }

    /// The core as it was when recording began.
    pub fn restore_initial_state(&self) -> Result<Core> {
        Core::deserialize(&self.initial_state)
    }

    /// Actions applied at `tick`.
    #[must_use]
    pub fn actions_at_tick(&self, tick: u32) -> Vec<&ReplayAction> {
        self.actions.iter().filter(|a| a.tick == tick).collect()
    }

    /// Number of recorded actions.
    #[must_use]
    pub fn action_count(&self) -> usize {
        self.actions.len()
    }
}

/// A core that records every action applied through it.
#[derive(Debug)]
pub struct ReplayRecorder {
    core: Core,
    replay: Replay,
}

impl ReplayRecorder {
    /// Begin recording from the current state of `core`.
    pub fn new(scenario_id: impl Into<String>, core: Core) -> Result<Self> {
        let replay = Replay::new(scenario_id, &core)?;
        Ok(Self { core, replay })
    }

    /// Apply an action; it is recorded only if it succeeds.
    pub fn apply(&mut self, action: Action) -> Result<Option<u8>> {
        let result = self.core.apply(&action)?;
        self.replay.record_action(self.core.current_tick(), action);
        Ok(result)
    }

    /// Advance the recorded core by one tick.
    pub fn tick(&mut self) -> Result<TickEvents> {
        tick_hashed(&mut self.core)
    }

    /// The recorded core.
    #[must_use]
    pub const fn core(&self) -> &Core {
        &self.core
    }

    /// Stop recording. Returns the final core and the sealed replay.
    pub fn finish(self) -> (Core, Replay) {
        let Self { core, mut replay } = self;
        replay.finalize(core.current_tick(), core.state_hash());
        (core, replay)
    }
}

/// Replay playback controller.
#[derive(Debug)]
pub struct ReplayPlayer {
    replay: Replay,
    core: Core,
    action_index: usize,
}

impl ReplayPlayer {
    /// Prepare playback from the replay's initial state.
    pub fn new(replay: Replay) -> Result<Self> {
        let core = replay.restore_initial_state()?;
        Ok(Self {
            replay,
            core,
            action_index: 0,
        })
    }

    /// Apply the actions due at the current tick, then run the tick.
    ///
    /// Returns `Ok(true)` while there are more ticks to play. A recorded
    /// action that fails on playback means the replay does not match this
    /// engine and is returned as an error.
    pub fn advance(&mut self) -> Result<bool> {
        if self.is_finished() {
            return Ok(false);
        }
        let now = self.core.current_tick();
        while let Some(record) = self.replay.actions.get(self.action_index) {
            if record.tick > now {
                break;
            }
            self.core.apply(&record.action)?;
            self.action_index += 1;
        }
        tick_hashed(&mut self.core)?;
        Ok(!self.is_finished())
    }

    /// Restart from the initial state and play until `target_tick` or the
    /// end of the replay, whichever comes first.
    pub fn seek(&mut self, target_tick: u32) -> Result<()> {
        self.core = self.replay.restore_initial_state()?;
        self.action_index = 0;
        while self.core.current_tick() < target_tick && self.advance()? {}
        Ok(())
    }

    /// Play the whole replay and compare the final hash.
    pub fn verify(&mut self) -> Result<bool> {
        self.seek(self.replay.final_tick)?;
        // Actions applied after the last tick still belong to the final state.
        while let Some(record) = self.replay.actions.get(self.action_index) {
            self.core.apply(&record.action)?;
            self.action_index += 1;
        }
        let actual = self.core.state_hash();
        if actual != self.replay.final_hash {
            warn!(
                tick = self.core.current_tick(),
                expected = self.replay.final_hash,
                actual,
                "Replay diverged"
            );
        }
        Ok(actual == self.replay.final_hash)
    }

    /// The playback clock.
    #[must_use]
    pub const fn current_tick(&self) -> u32 {
        self.core.current_tick()
    }

    /// The core being played.
    #[must_use]
    pub const fn core(&self) -> &Core {
        &self.core
    }

    /// The replay being played.
    #[must_use]
    pub const fn replay(&self) -> &Replay {
        &self.replay
    }

    /// True once the clock reaches the recorded final tick.
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.core.current_tick() >= self.replay.final_tick
    }
}

/// Tick `core`, logging the resulting state hash in debug builds.
fn tick_hashed(core: &mut Core) -> Result<TickEvents> {
    let events = core.tick()?;
    #[cfg(debug_assertions)]
    debug!(
        tick = core.current_tick(),
        state_hash = core.state_hash(),
        "Simulation state hash"
    );
    Ok(events)
}
