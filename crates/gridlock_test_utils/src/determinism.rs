//! Lockstep checks for Gridlock cores.
//!
//! Every client of a shared game runs its own [`Core`] and must end with the
//! same store having seen the same events. A run is summarized as a
//! [`RunDigest`]: the final [`Core::state_hash`] plus a hash folded over the
//! events of every tick, so two runs that reach the same store by different
//! routes still disagree.
//!
//! Typical culprits:
//!
//! - an unordered map or set somewhere in the tick path
//! - state kept outside the store (cached rows, undrained events) that a
//!   later tick reads
//! - a snapshot round trip that drops a field
//!
//! [`run_script`] and [`strategies`] drive cores with random order scripts
//! for the proptest suites.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::thread;

use gridlock_core::prelude::*;

use crate::fixtures::{ARMORY, CRYSTAL_1, CRYSTAL_2, DEPOT, DRONE, JET, TANK};

/// How one core ended after a determinism run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RunDigest {
    /// [`Core::state_hash`] after the last tick.
    pub state_hash: u64,
    /// Hash of every tick's events, in tick order.
    pub event_hash: u64,
    /// Clock after the last tick.
    pub tick: u32,
}

impl RunDigest {
    /// Tick `core` `ticks` times and digest the run.
    ///
    /// # Panics
    ///
    /// Panics if a tick fails.
    #[must_use]
    pub fn play(mut core: Core, ticks: u32) -> Self {
        let mut events = DefaultHasher::new();
        for _ in 0..ticks {
            let tick = core.tick().expect("tick");
            tick.tick.hash(&mut events);
            tick.events.hash(&mut events);
        }
        Self {
            state_hash: core.state_hash(),
            event_hash: events.finish(),
            tick: core.current_tick(),
        }
    }
}

/// Digests of several runs from the same setup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// One digest per run, in run order.
    pub runs: Vec<RunDigest>,
    /// Ticks played by each run.
    pub ticks: u32,
}

impl DeterminismResult {
    /// Whether every run produced the same digest.
    #[must_use]
    pub fn is_deterministic(&self) -> bool {
        self.runs.windows(2).all(|w| w[0] == w[1])
    }

    /// Distinct final state hashes, sorted.
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.runs.iter().map(|r| r.state_hash).collect();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// # Panics
    ///
    /// Panics, listing every run, if the runs disagree.
    pub fn assert_deterministic(&self) {
        if self.is_deterministic() {
            return;
        }
        let listing: Vec<String> = self
            .runs
            .iter()
            .enumerate()
            .map(|(i, r)| {
                format!(
                    "  run {i}: tick {} state {:016x} events {:016x}",
                    r.tick, r.state_hash, r.event_hash
                )
            })
            .collect();
        panic!(
            "Cores diverged after {} ticks ({} distinct states)\n{}",
            self.ticks,
            self.unique_hashes().len(),
            listing.join("\n")
        );
    }
}

/// Play two cores built by `setup_fn` one after the other for `num_ticks`
/// ticks.
///
/// # Panics
///
/// Panics if a tick fails.
pub fn verify_core_determinism<F>(setup_fn: F, num_ticks: u32) -> DeterminismResult
where
    F: Fn() -> Core,
{
    DeterminismResult {
        runs: (0..2)
            .map(|_| RunDigest::play(setup_fn(), num_ticks))
            .collect(),
        ticks: num_ticks,
    }
}

/// Play `num_cores` cores on scoped threads.
///
/// # Panics
///
/// Panics if a tick fails or a thread panics.
pub fn run_parallel_cores<F>(setup_fn: F, num_cores: usize, num_ticks: u32) -> DeterminismResult
where
    F: Fn() -> Core + Sync,
{
    let runs = thread::scope(|s| {
        let handles: Vec<_> = (0..num_cores)
            .map(|_| s.spawn(|| RunDigest::play(setup_fn(), num_ticks)))
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().expect("simulation thread"))
            .collect()
    });
    DeterminismResult {
        runs,
        ticks: num_ticks,
    }
}

/// Compare two runs tick-by-tick and return the first tick after which the
/// hashes differ, or `None` if they never do.
///
/// # Panics
///
/// Panics if a tick fails.
pub fn find_first_divergence<F>(setup_fn: F, num_ticks: u32) -> Option<u32>
where
    F: Fn() -> Core,
{
    let mut a = setup_fn();
    let mut b = setup_fn();
    if a.state_hash() != b.state_hash() {
        return Some(0);
    }
    for tick in 1..=num_ticks {
        a.tick().expect("tick");
        b.tick().expect("tick");
        if a.state_hash() != b.state_hash() {
            return Some(tick);
        }
    }
    None
}

/// Snapshot a core midway and check that the restored copy stays in
/// lockstep with the original for another `num_ticks` ticks.
///
/// # Panics
///
/// Panics if a tick fails.
pub fn verify_snapshot_determinism(core: &Core, num_ticks: u32) -> bool {
    let Ok(bytes) = core.serialize() else {
        return false;
    };
    let Ok(mut restored) = Core::deserialize(&bytes) else {
        return false;
    };
    if restored.state_hash() != core.state_hash() {
        return false;
    }
    let mut original = core.clone();
    for _ in 0..num_ticks {
        original.tick().expect("tick");
        restored.tick().expect("tick");
    }
    original.state_hash() == restored.state_hash()
}

/// A player order generated for scripted games.
///
/// Ids are small and often invalid on purpose: rejected orders must leave
/// the store untouched, which the determinism checks also cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptedOrder {
    /// Queue a unit.
    CreateUnit {
        /// Owner.
        player: u8,
        /// Unit type.
        unit_type: u8,
    },
    /// Place a building.
    Place {
        /// Owner.
        player: u8,
        /// Building type.
        building_type: u8,
        /// Origin x.
        x: u16,
        /// Origin y.
        y: u16,
    },
    /// Send a worker to its player's crystal field.
    Gather {
        /// Owner.
        player: u8,
        /// Unit id.
        unit: u8,
    },
    /// Send a fighter to a tile.
    Hold {
        /// Owner.
        player: u8,
        /// Unit id.
        unit: u8,
        /// Target x.
        x: u16,
        /// Target y.
        y: u16,
    },
    /// Send a fighter at the enemy core.
    AttackCore {
        /// Owner.
        player: u8,
        /// Unit id.
        unit: u8,
    },
}

impl ScriptedOrder {
    /// Apply the order; rejected orders are ignored.
    pub fn apply(self, core: &mut Core) {
        let _ = match self {
            Self::CreateUnit { player, unit_type } => core.create_unit(player, unit_type).map(drop),
            Self::Place {
                player,
                building_type,
                x,
                y,
            } => core.place_building(player, building_type, x, y).map(drop),
            Self::Gather { player, unit } => {
                let crystal = if player == 1 { CRYSTAL_1 } else { CRYSTAL_2 };
                core.assign_worker(
                    player,
                    unit,
                    WorkerCommand::Gather {
                        player: 0,
                        building: crystal,
                    },
                )
            }
            Self::Hold { player, unit, x, y } => core.assign_fighter(
                player,
                unit,
                FighterCommand::HoldPosition { x, y },
                CommandPath::EMPTY,
            ),
            Self::AttackCore { player, unit } => core.assign_fighter(
                player,
                unit,
                FighterCommand::AttackBuilding {
                    player: 3 - player,
                    building: 1,
                },
                CommandPath::EMPTY,
            ),
        };
    }
}

/// Play `script` against `core`: at each tick, apply the orders scheduled
/// for it, then tick. Runs for `ticks` ticks in total.
///
/// # Panics
///
/// Panics if a tick fails.
pub fn run_script(core: &mut Core, script: &[(u32, ScriptedOrder)], ticks: u32) {
    let start = core.current_tick();
    for offset in 0..ticks {
        for (_, order) in script.iter().filter(|(at, _)| *at == offset) {
            order.apply(core);
        }
        core.tick().expect("tick");
    }
    debug_assert_eq!(core.current_tick(), start + ticks);
}

/// Proptest strategies for determinism testing.
///
/// These strategies generate random but reproducible inputs for
/// property-based testing of simulation determinism.
pub mod strategies {
    use proptest::prelude::*;

    use super::{ScriptedOrder, ARMORY, DEPOT, DRONE, JET, TANK};
    use gridlock_core::prelude::*;

    /// A player id, occasionally invalid.
    pub fn arb_player() -> impl Strategy<Value = u8> {
        prop_oneof![4 => 1u8..=2, 1 => Just(3u8)]
    }

    /// A unit id within the first few created.
    pub fn arb_unit_id() -> impl Strategy<Value = u8> {
        1u8..=6
    }

    /// A board coordinate on the standard map.
    pub fn arb_coord() -> impl Strategy<Value = u16> {
        0u16..32
    }

    /// A point on a `width` x `height` board.
    pub fn arb_point(width: u16, height: u16) -> impl Strategy<Value = Point> {
        (0..i32::from(width), 0..i32::from(height)).prop_map(|(x, y)| Point::new(x, y))
    }

    /// Up to four waypoints on the standard map.
    pub fn arb_command_path() -> impl Strategy<Value = CommandPath> {
        prop::collection::vec(arb_point(32, 32), 0..=4)
            .prop_map(|points| CommandPath::from_points(&points))
    }

    /// Any raw worker command word, including unknown types.
    pub fn arb_worker_word() -> impl Strategy<Value = u64> {
        (0u8..4, any::<u8>(), any::<u8>()).prop_map(|(kind, player, building)| {
            u64::from(kind) << 16 | u64::from(player) << 8 | u64::from(building)
        })
    }

    /// Any fighter command.
    pub fn arb_fighter_command() -> impl Strategy<Value = FighterCommand> {
        prop_oneof![
            (arb_coord(), arb_coord()).prop_map(|(x, y)| FighterCommand::HoldPosition { x, y }),
            (0u8..=3, 0u8..=3)
                .prop_map(|(player, building)| FighterCommand::AttackBuilding { player, building }),
        ]
    }

    /// One scripted order.
    pub fn arb_order() -> impl Strategy<Value = ScriptedOrder> {
        prop_oneof![
            3 => (arb_player(), prop_oneof![Just(DRONE), Just(TANK), Just(JET)])
                .prop_map(|(player, unit_type)| ScriptedOrder::CreateUnit { player, unit_type }),
            1 => (arb_player(), prop_oneof![Just(DEPOT), Just(ARMORY)], arb_coord(), arb_coord())
                .prop_map(|(player, building_type, x, y)| ScriptedOrder::Place {
                    player,
                    building_type,
                    x,
                    y,
                }),
            2 => (arb_player(), arb_unit_id())
                .prop_map(|(player, unit)| ScriptedOrder::Gather { player, unit }),
            2 => (arb_player(), arb_unit_id(), arb_coord(), arb_coord())
                .prop_map(|(player, unit, x, y)| ScriptedOrder::Hold { player, unit, x, y }),
            1 => (arb_player(), arb_unit_id())
                .prop_map(|(player, unit)| ScriptedOrder::AttackCore { player, unit }),
        ]
    }

    /// A script of orders, each scheduled at a tick below `max_tick`.
    pub fn arb_script(
        max_len: usize,
        max_tick: u32,
    ) -> impl Strategy<Value = Vec<(u32, ScriptedOrder)>> {
        prop::collection::vec((0..max_tick, arb_order()), 0..max_len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{lobby, started_with};
    use proptest::prelude::*;

    #[test]
    fn test_event_stream_is_part_of_the_digest() {
        let quiet = RunDigest::play(started_with(&[]), 10);
        let mut core = started_with(&[]);
        core.create_unit(1, DRONE).unwrap();
        let busy = RunDigest::play(core, 10);
        assert_eq!(quiet.tick, 10);
        assert_ne!(quiet.event_hash, busy.event_hash);

        let mut same_state = busy;
        same_state.event_hash ^= 1;
        let result = DeterminismResult {
            runs: vec![busy, same_state],
            ticks: 10,
        };
        assert!(!result.is_deterministic());
        assert_eq!(result.unique_hashes().len(), 1);
    }

    #[test]
    #[should_panic(expected = "Cores diverged after 5 ticks")]
    fn test_divergence_panics_with_runs() {
        let a = RunDigest::play(started_with(&[]), 5);
        let b = RunDigest::play(started_with(&[(2, TANK)]), 5);
        DeterminismResult {
            runs: vec![a, b],
            ticks: 5,
        }
        .assert_deterministic();
    }

    #[test]
    fn test_empty_game_determinism() {
        let result = verify_core_determinism(
            || {
                let mut core = lobby();
                core.start().unwrap();
                core
            },
            50,
        );
        result.assert_deterministic();
    }

    #[test]
    fn test_skirmish_parallel() {
        let result = run_parallel_cores(|| started_with(&[(1, TANK), (1, DRONE), (2, JET)]), 4, 60);
        result.assert_deterministic();
        assert_eq!(result.runs.len(), 4);
    }

    #[test]
    fn test_no_divergence() {
        assert_eq!(
            find_first_divergence(|| started_with(&[(1, TANK), (2, TANK)]), 40),
            None
        );
    }

    #[test]
    fn test_snapshot_midgame() {
        let mut core = started_with(&[(1, DRONE), (2, DRONE)]);
        ScriptedOrder::Gather { player: 1, unit: 1 }.apply(&mut core);
        for _ in 0..15 {
            core.tick().unwrap();
        }
        assert!(verify_snapshot_determinism(&core, 30));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn prop_scripts_are_deterministic(script in strategies::arb_script(24, 40)) {
            let run = || {
                let mut core = started_with(&[(1, DRONE), (1, TANK), (2, DRONE), (2, TANK)]);
                run_script(&mut core, &script, 60);
                core.state_hash()
            };
            prop_assert_eq!(run(), run());
        }
    }
}
