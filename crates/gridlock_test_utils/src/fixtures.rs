//! Test fixtures and helpers.
//!
//! Pre-built game states on the standard prototype tables for consistent
//! testing. The standard map is 32x32 with two players in opposite
//! corners:
//!
//! ```text
//! player 1: spawn (1,1) 4x4, core at (6,1), port (2,6), crystal at (2,10)
//! player 2: spawn (27,27) 4x4, core at (23,28), port (29,25), crystal at (29,21)
//! ```

use serde::Serialize;
use tracing::debug;

use gridlock_core::prelude::*;

/// Standard prototype tables.
pub const STANDARD_DATA: &str = include_str!("../../../assets/data/prototypes.ron");

/// Worker unit type.
pub const DRONE: u8 = 1;
/// Land fighter.
pub const TANK: u8 = 2;
/// Air assault fighter.
pub const JET: u8 = 3;
/// Land anti-air fighter.
pub const FLAK: u8 = 4;

/// Main building type.
pub const CORE: u8 = 1;
/// Environment resource field.
pub const CRYSTAL: u8 = 2;
/// Storage and compute building.
pub const DEPOT: u8 = 3;
/// Armory.
pub const ARMORY: u8 = 4;

/// Standard board edge length.
pub const BOARD_SIZE: u16 = 32;

/// Player 1's crystal field (environment building id 1).
pub const CRYSTAL_1: u8 = 1;
/// Player 2's crystal field (environment building id 2).
pub const CRYSTAL_2: u8 = 2;

/// Parse [`STANDARD_DATA`].
///
/// # Panics
///
/// Panics if the bundled data file is invalid.
#[must_use]
pub fn standard_data() -> GameData {
    GameData::from_ron_str(STANDARD_DATA, "prototypes.ron").expect("bundled prototypes parse")
}

/// Spawn and port layout of player 1.
#[must_use]
pub const fn player_one() -> PlayerSetup {
    PlayerSetup {
        spawn_x: 1,
        spawn_y: 1,
        spawn_width: 4,
        spawn_height: 4,
        port_x: 2,
        port_y: 6,
    }
}

/// Spawn and port layout of player 2.
#[must_use]
pub const fn player_two() -> PlayerSetup {
    PlayerSetup {
        spawn_x: 27,
        spawn_y: 27,
        spawn_width: 4,
        spawn_height: 4,
        port_x: 29,
        port_y: 25,
    }
}

/// The standard map in its genesis phase: prototypes, both players, their
/// cores and one crystal field each. Not started.
///
/// # Panics
///
/// Panics if the fixture cannot be built.
#[must_use]
pub fn lobby() -> Core {
    let mut core = Core::in_memory();
    core.initialize(BOARD_SIZE, BOARD_SIZE).expect("initialize");
    standard_data().register(&mut core).expect("register prototypes");
    core.add_player(player_one()).expect("player 1");
    core.add_player(player_two()).expect("player 2");
    core.place_building(1, CORE, 6, 1).expect("core 1");
    core.place_building(2, CORE, 23, 28).expect("core 2");
    core.place_building(0, CRYSTAL, 2, 10).expect("crystal 1");
    core.place_building(0, CRYSTAL, 29, 21).expect("crystal 2");
    core.take_events();
    debug!("Lobby fixture ready");
    core
}

/// [`lobby`] with `units` spawned during genesis and the game started.
/// Each entry is `(player, unit_type)`; units spawn immediately.
///
/// # Panics
///
/// Panics if a unit cannot be created.
#[must_use]
pub fn started_with(units: &[(u8, u8)]) -> Core {
    let mut core = lobby();
    for &(player, unit_type) in units {
        core.create_unit(player, unit_type).expect("genesis unit");
    }
    core.start().expect("start");
    core.take_events();
    core
}

/// Run `n` ticks and collect every event.
///
/// # Panics
///
/// Panics if a tick fails.
pub fn run_ticks(core: &mut Core, n: u32) -> Vec<GameEvent> {
    let mut events = Vec::new();
    for _ in 0..n {
        events.extend(core.tick().expect("tick").events);
    }
    events
}

/// Tick until `done` holds, up to `max` ticks. Returns the number of ticks
/// run, or `None` if the condition never held.
///
/// # Panics
///
/// Panics if a tick fails.
pub fn tick_until(core: &mut Core, max: u32, mut done: impl FnMut(&Core) -> bool) -> Option<u32> {
    for n in 0..=max {
        if done(core) {
            return Some(n);
        }
        if n < max {
            core.tick().expect("tick");
        }
    }
    None
}

/// Order a fighter to hold `(x, y)` and tick until it stands there.
///
/// # Panics
///
/// Panics if the order is rejected or the unit does not arrive within
/// `max` ticks.
pub fn march(core: &mut Core, player: u8, unit: u8, x: u16, y: u16, max: u32) {
    core.assign_fighter(
        player,
        unit,
        FighterCommand::HoldPosition { x, y },
        CommandPath::EMPTY,
    )
    .expect("hold order");
    let target = Point::from_u16(x, y);
    let arrived = tick_until(core, max, |c| {
        matches!(c.unit(player, unit), Ok(u) if u.position() == target)
    });
    assert!(
        arrived.is_some(),
        "unit {player}/{unit} did not reach ({x}, {y}) in {max} ticks:\n{}",
        describe(core)
    );
}

#[derive(Serialize)]
struct UnitSummary {
    player: u8,
    unit: u8,
    unit_type: u8,
    state: UnitState,
    x: u16,
    y: u16,
    integrity: u8,
    load: u8,
}

#[derive(Serialize)]
struct CoreSummary {
    tick: u32,
    players: Vec<PlayerRow>,
    units: Vec<UnitSummary>,
}

/// Human-readable RON dump of players and units, for assertion messages.
#[must_use]
pub fn describe(core: &Core) -> String {
    let player_count = core.meta().map(|m| m.player_count).unwrap_or(0);
    let mut summary = CoreSummary {
        tick: core.current_tick(),
        players: Vec::new(),
        units: Vec::new(),
    };
    for player in 1..=player_count {
        let Ok(row) = core.player(player) else {
            continue;
        };
        for unit in 1..=row.unit_count {
            if let Ok(u) = core.unit(player, unit) {
                summary.units.push(UnitSummary {
                    player,
                    unit,
                    unit_type: u.unit_type,
                    state: u.state,
                    x: u.x,
                    y: u.y,
                    integrity: u.integrity,
                    load: u.load,
                });
            }
        }
        summary.players.push(row);
    }
    ron::ser::to_string_pretty(&summary, ron::ser::PrettyConfig::default())
        .unwrap_or_else(|e| format!("<unprintable: {e}>"))
}
