//! Core simulation loop.
//!
//! [`Core`] wraps a [`Datastore`] and a tick clock. Actions (see
//! [`crate::actions`]) validate and mutate the store directly; [`Core::tick`]
//! advances the world by exactly one step.
//!
//! # Tick order
//!
//! 1. **Economy** - every player in id order pays for queued units and
//!    buildings and hands pending construction to idle workers.
//! 2. **Preliminary** - every unit: spawn completion, pre-tick skip, worker
//!    activation and deactivation.
//! 3. **Action** - units that passed preliminary, fighters before workers.
//! 4. **Intermediate** - every unit: units at zero integrity die.
//! 5. **Movement** - units that passed both action and intermediate,
//!    fighters before workers.
//!
//! Phases 2-5 visit players in a rotated order starting at
//! `tick % player_count`, so no player permanently acts first.
//!
//! # Determinism
//!
//! There is no randomness, no floating point and no hash-map iteration: ids
//! are visited as dense integer ranges and the store is ordered. Two cores
//! that receive the same actions at the same ticks hold byte-identical
//! stores.
//!
//! # Example
//!
//! ```
//! use gridlock_core::prelude::*;
//!
//! let mut core = Core::in_memory();
//! core.initialize(16, 16).unwrap();
//! assert!(core.tick().is_err()); // not started yet
//! core.start().unwrap();
//! let events = core.tick().unwrap();
//! assert!(events.is_empty());
//! assert_eq!(core.current_tick(), 1);
//! ```

use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeSet;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{GameError, Result};
use crate::events::{GameEvent, TickEvents};
use crate::geometry::{Area, Point};
use crate::storage::{read_row, tile_key, write_row, Datastore, MemoryStore};
use crate::tables::{
    BuildingPrototype, BuildingRow, MetaRow, PlayerRow, TileRow, UnitPrototype, UnitRow,
};

/// The simulation engine bound to one datastore.
#[derive(Debug, Clone, Default)]
pub struct Core<S = MemoryStore> {
    store: S,
    tick: u32,
    events: Vec<GameEvent>,
}

/// Serialized form of an in-memory core.
#[derive(Serialize, Deserialize)]
struct Snapshot {
    tick: u32,
    store: MemoryStore,
}

impl Core<MemoryStore> {
    /// A core over a fresh in-memory store at tick 0.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(MemoryStore::new())
    }

    /// Serialize the clock and the full store.
    ///
    /// Events not yet drained by [`Core::tick`] are not part of the snapshot.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        let snapshot = Snapshot {
            tick: self.tick,
            store: self.store.clone(),
        };
        bincode::serialize(&snapshot)
            .map_err(|e| GameError::Serialization(format!("Failed to serialize core: {e}")))
    }

    /// Restore a core from [`Core::serialize`] output.
    pub fn deserialize(data: &[u8]) -> Result<Self> {
        let snapshot: Snapshot = bincode::deserialize(data)
            .map_err(|e| GameError::Serialization(format!("Failed to deserialize core: {e}")))?;
        Ok(Self::at_tick(snapshot.store, snapshot.tick))
    }
}

impl<S: Datastore> Core<S> {
    /// Wrap `store` with the clock at 0.
    pub fn new(store: S) -> Self {
        Self::at_tick(store, 0)
    }

    /// Wrap `store` with the clock at `tick`.
    pub fn at_tick(store: S, tick: u32) -> Self {
        Self {
            store,
            tick,
            events: Vec::new(),
        }
    }

    /// The current clock value, used as `now` by every timestamp.
    #[must_use]
    pub const fn current_tick(&self) -> u32 {
        self.tick
    }

    /// Borrow the backing store.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Unwrap the backing store.
    pub fn into_store(self) -> S {
        self.store
    }

    /// Take the events emitted since the last drain.
    pub fn take_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    pub(crate) fn emit(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    /// Advance the world by one tick.
    ///
    /// Returns every event emitted since the previous drain, including
    /// those produced by actions applied before this tick. Fails without
    /// advancing the clock when the game is not initialized or not started,
    /// or when a stored row cannot be decoded.
    pub fn tick(&mut self) -> Result<TickEvents> {
        let meta = self.meta()?;
        if !meta.is_initialized {
            warn!(tick = self.tick, "Tick rejected: game not initialized");
            return Err(GameError::NotInitialized);
        }
        if !meta.has_started {
            warn!(tick = self.tick, "Tick rejected: game not started");
            return Err(GameError::NotStarted);
        }

        self.run_phases(meta.player_count)?;

        let tick = self.tick;
        self.tick = self.tick.wrapping_add(1);
        let events = self.take_events();
        debug!(tick, events = events.len(), "Tick complete");
        Ok(TickEvents { tick, events })
    }

    fn run_phases(&mut self, player_count: u8) -> Result<()> {
        if player_count == 0 {
            return Ok(());
        }
        for player in 1..=player_count {
            self.tick_player(player)?;
        }

        let order = rotated_player_order(self.tick, player_count);

        let mut pre_passers = Vec::new();
        for &player in &order {
            for unit in 1..=self.player(player)?.unit_count {
                if self.tick_unit_preliminary(player, unit)? {
                    pre_passers.push((player, unit));
                }
            }
        }

        let mut passed_action = BTreeSet::new();
        for workers in [false, true] {
            for &(player, unit) in &pre_passers {
                if self.is_worker(player, unit)? != workers {
                    continue;
                }
                let passed = if workers {
                    self.tick_worker_action(player, unit)?
                } else {
                    self.tick_fighter_action(player, unit)?
                };
                if passed {
                    passed_action.insert((player, unit));
                }
            }
        }

        let mut inter_passers = Vec::new();
        for &player in &order {
            for unit in 1..=self.player(player)?.unit_count {
                if self.tick_unit_intermediate(player, unit)? {
                    inter_passers.push((player, unit));
                }
            }
        }

        for workers in [false, true] {
            for &(player, unit) in &inter_passers {
                if !passed_action.contains(&(player, unit)) || self.is_worker(player, unit)? != workers
                {
                    continue;
                }
                if workers {
                    self.tick_worker_movement(player, unit)?;
                } else {
                    self.tick_fighter_movement(player, unit)?;
                }
            }
        }
        Ok(())
    }

    /// Run the full per-unit sequence for one unit, outside the global
    /// phase order. Used when an external command is assigned.
    pub(crate) fn tick_unit(&mut self, player: u8, unit: u8) -> Result<()> {
        let worker = self.is_worker(player, unit)?;
        let pre = self.tick_unit_preliminary(player, unit)?;
        let act = if pre {
            if worker {
                self.tick_worker_action(player, unit)?
            } else {
                self.tick_fighter_action(player, unit)?
            }
        } else {
            false
        };
        let inter = self.tick_unit_intermediate(player, unit)?;
        if act && inter {
            if worker {
                self.tick_worker_movement(player, unit)?;
            } else {
                self.tick_fighter_movement(player, unit)?;
            }
        }
        Ok(())
    }

    /// Run `ticks` ticks on a copy of this core, leaving `self` untouched.
    pub fn simulate_ahead(&self, ticks: u32) -> Result<Self>
    where
        S: Clone,
    {
        let mut ahead = self.clone();
        for _ in 0..ticks {
            ahead.tick()?;
        }
        Ok(ahead)
    }

    // --- rows -----------------------------------------------------------

    /// Game metadata.
    pub fn meta(&self) -> Result<MetaRow> {
        read_row(&self.store, &[])
    }

    pub(crate) fn set_meta(&mut self, row: &MetaRow) -> Result<()> {
        write_row(&mut self.store, &[], row)
    }

    /// A player's row. Unknown ids read as the default row.
    pub fn player(&self, player: u8) -> Result<PlayerRow> {
        read_row(&self.store, &[player])
    }

    pub(crate) fn set_player(&mut self, player: u8, row: &PlayerRow) -> Result<()> {
        write_row(&mut self.store, &[player], row)
    }

    /// A unit's row.
    pub fn unit(&self, player: u8, unit: u8) -> Result<UnitRow> {
        read_row(&self.store, &[player, unit])
    }

    pub(crate) fn set_unit(&mut self, player: u8, unit: u8, row: &UnitRow) -> Result<()> {
        write_row(&mut self.store, &[player, unit], row)
    }

    /// A building's row.
    pub fn building(&self, player: u8, building: u8) -> Result<BuildingRow> {
        read_row(&self.store, &[player, building])
    }

    pub(crate) fn set_building(&mut self, player: u8, building: u8, row: &BuildingRow) -> Result<()> {
        write_row(&mut self.store, &[player, building], row)
    }

    /// A unit prototype.
    pub fn unit_prototype(&self, unit_type: u8) -> Result<UnitPrototype> {
        read_row(&self.store, &[unit_type])
    }

    pub(crate) fn set_unit_prototype(&mut self, unit_type: u8, row: &UnitPrototype) -> Result<()> {
        write_row(&mut self.store, &[unit_type], row)
    }

    /// A building prototype.
    pub fn building_prototype(&self, building_type: u8) -> Result<BuildingPrototype> {
        read_row(&self.store, &[building_type])
    }

    pub(crate) fn set_building_prototype(
        &mut self,
        building_type: u8,
        row: &BuildingPrototype,
    ) -> Result<()> {
        write_row(&mut self.store, &[building_type], row)
    }

    /// The tile at `position`.
    pub fn tile(&self, position: Point) -> Result<TileRow> {
        let (x, y) = tile_coords(position)?;
        read_row(&self.store, &tile_key(x, y))
    }

    pub(crate) fn set_tile(&mut self, position: Point, row: &TileRow) -> Result<()> {
        let (x, y) = tile_coords(position)?;
        write_row(&mut self.store, &tile_key(x, y), row)
    }

    /// Read-modify-write a tile.
    pub(crate) fn update_tile(
        &mut self,
        position: Point,
        update: impl FnOnce(&mut TileRow),
    ) -> Result<()> {
        let mut tile = self.tile(position)?;
        update(&mut tile);
        self.set_tile(position, &tile)
    }

    /// Read-modify-write a player.
    pub(crate) fn update_player(
        &mut self,
        player: u8,
        update: impl FnOnce(&mut PlayerRow),
    ) -> Result<()> {
        let mut row = self.player(player)?;
        update(&mut row);
        self.set_player(player, &row)
    }

    /// Read-modify-write a unit.
    pub(crate) fn update_unit(
        &mut self,
        player: u8,
        unit: u8,
        update: impl FnOnce(&mut UnitRow),
    ) -> Result<()> {
        let mut row = self.unit(player, unit)?;
        update(&mut row);
        self.set_unit(player, unit, &row)
    }

    /// Read-modify-write a building.
    pub(crate) fn update_building(
        &mut self,
        player: u8,
        building: u8,
        update: impl FnOnce(&mut BuildingRow),
    ) -> Result<()> {
        let mut row = self.building(player, building)?;
        update(&mut row);
        self.set_building(player, building, &row)
    }

    // --- derived lookups ------------------------------------------------

    /// True if the game has been initialized.
    pub fn is_initialized(&self) -> Result<bool> {
        Ok(self.meta()?.is_initialized)
    }

    /// True if the game has been started.
    pub fn has_started(&self) -> Result<bool> {
        Ok(self.meta()?.has_started)
    }

    /// The unit's prototype.
    pub fn unit_proto_of(&self, player: u8, unit: u8) -> Result<UnitPrototype> {
        self.unit_prototype(self.unit(player, unit)?.unit_type)
    }

    pub(crate) fn is_worker(&self, player: u8, unit: u8) -> Result<bool> {
        Ok(self.unit_proto_of(player, unit)?.is_worker)
    }

    /// Footprint of a building.
    pub fn building_area(&self, player: u8, building: u8) -> Result<Area> {
        let row = self.building(player, building)?;
        let proto = self.building_prototype(row.building_type)?;
        Ok(proto.footprint(row.position()))
    }

    /// Footprint of the player's main building (building 1).
    pub fn main_building_area(&self, player: u8) -> Result<Area> {
        self.building_area(player, 1)
    }

    /// The player's worker port as a single-tile area.
    pub fn worker_port_area(&self, player: u8) -> Result<Area> {
        Ok(Area::tile(self.player(player)?.worker_port()))
    }

    /// The player's spawn area.
    pub fn spawn_area(&self, player: u8) -> Result<Area> {
        Ok(self.player(player)?.spawn_area())
    }

    /// The whole board.
    pub fn board_area(&self) -> Result<Area> {
        Ok(self.meta()?.board_area())
    }

    /// True if `position` lies on the board.
    pub fn is_in_board(&self, position: Point) -> Result<bool> {
        Ok(self.board_area()?.contains(position))
    }
}

impl<S: Datastore + Hash> Core<S> {
    /// Deterministic hash of the clock and every stored row.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.tick.hash(&mut hasher);
        self.store.hash(&mut hasher);
        hasher.finish()
    }
}

/// Player ids in the order phases visit them at `tick`.
#[must_use]
pub fn rotated_player_order(tick: u32, player_count: u8) -> Vec<u8> {
    if player_count == 0 {
        return Vec::new();
    }
    let n = u32::from(player_count);
    let start = tick % n;
    (0..n)
        .filter_map(|i| u8::try_from((start + i) % n + 1).ok())
        .collect()
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn tile_coords(position: Point) -> Result<(u16, u16)> {
    match (u16::try_from(position.x), u16::try_from(position.y)) {
        (Ok(x), Ok(y)) => Ok((x, y)),
        _ => Err(GameError::AreaOutOfBounds {
            x: position.x.clamp(0, i32::from(u16::MAX)) as u16,
            y: position.y.clamp(0, i32::from(u16::MAX)) as u16,
        }),
    }
}
