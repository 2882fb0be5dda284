//! Unit lifecycle.
//!
//! ```text
//! Nil -> Unpaid -> Spawning -> Active <-> Inactive
//!                     |          |           |
//!                     +----------+-----------+--> Dead
//! ```
//!
//! Unpaid units already stand on their spawn tile but are invisible to the
//! economy. Dead units keep their row; ids are never reused.

use tracing::{debug, trace};

use crate::board::Layer;
use crate::buildings::BuildingState;
use crate::command::{CommandPath, FighterCommand, WorkerCommand};
use crate::error::{GameError, Result};
use crate::events::{GameEvent, ObjectRef};
use crate::geometry::Point;
use crate::storage::Datastore;
use crate::simulation::Core;
use crate::tables::UnitRow;

wire_enum! {
    /// Lifecycle state of a unit.
    pub enum UnitState {
        /// No unit.
        #[default]
        Nil = 0,
        /// Created, waiting in the pay queue.
        Unpaid = 1,
        /// Paid, waiting for its spawn time.
        Spawning = 2,
        /// Acting.
        Active = 3,
        /// Parked at the worker port, off the board.
        Inactive = 4,
        /// Terminal.
        Dead = 5,
    }
}

impl UnitState {
    /// Payment has happened at some point.
    #[must_use]
    pub const fn is_paid(self) -> bool {
        matches!(
            self,
            Self::Spawning | Self::Active | Self::Inactive | Self::Dead
        )
    }

    /// Spawning has completed at some point.
    #[must_use]
    pub const fn has_spawned(self) -> bool {
        matches!(self, Self::Active | Self::Inactive | Self::Dead)
    }

    /// Paid and not yet dead.
    #[must_use]
    pub const fn is_alive(self) -> bool {
        matches!(self, Self::Spawning | Self::Active | Self::Inactive)
    }

    /// Not currently targetable.
    #[must_use]
    pub const fn is_dead_or_inactive(self) -> bool {
        matches!(self, Self::Inactive | Self::Dead)
    }
}

impl<S: Datastore> Core<S> {
    /// The nearest free tile of the player's spawn area.
    ///
    /// Tiles are scanned x-major; a tile qualifies only if all three layers
    /// are empty, and ties keep the first tile found.
    pub fn spawn_point(&self, player: u8) -> Result<Option<Point>> {
        let spawn_area = self.spawn_area(player)?;
        let main_area = self.main_building_area(player)?;
        let board = self.board_area()?;
        let mut nearest: Option<(Point, i32)> = None;
        for tile in spawn_area.tiles() {
            if !board.contains(tile) || !self.tile(tile)?.is_empty_all_layers() {
                continue;
            }
            let distance = tile.distance_to_area(main_area);
            if nearest.map_or(true, |(_, best)| distance < best) {
                nearest = Some((tile, distance));
            }
        }
        Ok(nearest.map(|(tile, _)| tile))
    }

    /// Append an unpaid unit on the spawn point. Validation is the caller's.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub(crate) fn create_unit_row(&mut self, player: u8, unit_type: u8) -> Result<u8> {
        let proto = self.unit_prototype(unit_type)?;
        let position = self
            .spawn_point(player)?
            .ok_or(GameError::NoSpawnPoint(player))?;
        let mut player_row = self.player(player)?;
        let unit = player_row
            .unit_count
            .checked_add(1)
            .ok_or(GameError::UnitLimitReached(player))?;
        player_row.unit_count = unit;
        self.set_player(player, &player_row)?;

        let command = if proto.is_worker {
            WorkerCommand::Idle.encode()
        } else {
            FighterCommand::hold(position).encode()
        };
        let row = UnitRow {
            x: position.x as u16,
            y: position.y as u16,
            unit_type,
            state: UnitState::Unpaid,
            load: 0,
            integrity: proto.max_integrity,
            timestamp: self.current_tick(),
            command,
            command_extra: 0,
            command_meta: 0,
            is_pre_ticked: false,
        };
        self.set_unit(player, unit, &row)?;
        self.update_tile(position, |tile| tile.set_unit(proto.layer, player, unit))?;
        debug!(player, unit, unit_type, x = row.x, y = row.y, "Unit created");
        Ok(unit)
    }

    /// Mark a unit paid: reserve compute, start the spawn timer and move
    /// the pay pointer past it.
    pub(crate) fn set_unit_spawning(&mut self, player: u8, unit: u8) -> Result<()> {
        let proto = self.unit_proto_of(player, unit)?;
        self.update_player(player, |row| {
            row.unit_pay_pointer = unit.saturating_add(1);
            row.add_compute_demand(proto.compute_cost);
        })?;
        let now = self.current_tick();
        self.update_unit(player, unit, |row| {
            row.state = UnitState::Spawning;
            row.timestamp = now;
        })
    }

    pub(crate) fn set_unit_spawned(&mut self, player: u8, unit: u8) -> Result<()> {
        let now = self.current_tick();
        self.update_unit(player, unit, |row| {
            row.state = UnitState::Active;
            row.timestamp = now;
        })?;
        trace!(player, unit, "Unit spawned");
        self.emit(GameEvent::Spawned {
            unit: ObjectRef::unit(player, unit),
        });
        Ok(())
    }

    pub(crate) fn set_unit_dead(&mut self, player: u8, unit: u8) -> Result<()> {
        let mut row = self.unit(player, unit)?;
        let proto = self.unit_prototype(row.unit_type)?;
        row.state = UnitState::Dead;
        self.set_unit(player, unit, &row)?;

        // Parked workers are off the board; their tile may belong to someone else.
        let position = row.position();
        let mut tile = self.tile(position)?;
        if tile.unit_at(proto.layer).map(|o| (o.player, o.id)) == Some((player, unit)) {
            tile.clear(proto.layer);
            self.set_tile(position, &tile)?;
        }
        self.update_player(player, |p| p.sub_compute_demand(proto.compute_cost))?;
        self.reset_building_process_if_any(player, unit)?;
        debug!(player, unit, "Unit killed");
        self.emit(GameEvent::Killed {
            unit: ObjectRef::unit(player, unit),
        });
        Ok(())
    }

    /// A worker standing in the footprint of the building it is
    /// constructing loses that building's progress.
    pub(crate) fn reset_building_process_if_any(&mut self, player: u8, unit: u8) -> Result<()> {
        let row = self.unit(player, unit)?;
        if !self.unit_prototype(row.unit_type)?.is_worker {
            return Ok(());
        }
        let WorkerCommand::Build { building, .. } = WorkerCommand::decode(row.command)? else {
            return Ok(());
        };
        if self.building(player, building)?.state != BuildingState::Building {
            return Ok(());
        }
        if self.building_area(player, building)?.contains(row.position()) {
            self.update_building(player, building, |b| b.timestamp = 0)?;
            trace!(player, unit, building, "Build progress reset");
        }
        Ok(())
    }

    /// Replace a unit's command, clearing any waypoint path.
    pub(crate) fn assign_command(&mut self, player: u8, unit: u8, command: u64) -> Result<()> {
        if self.unit(player, unit)?.command != command {
            self.reset_building_process_if_any(player, unit)?;
        }
        self.update_unit(player, unit, |row| {
            row.command = command;
            row.command_extra = 0;
            row.command_meta = 0;
        })
    }

    /// Apply an externally issued command: run the unit's tick now, then
    /// store the command and path and skip the unit's next preliminary.
    pub(crate) fn assign_command_external(
        &mut self,
        player: u8,
        unit: u8,
        command: u64,
        path: CommandPath,
    ) -> Result<()> {
        self.tick_unit(player, unit)?;
        self.update_unit(player, unit, |row| row.is_pre_ticked = true)?;
        self.assign_command(player, unit, command)?;
        self.update_unit(player, unit, |row| {
            row.command_extra = path.raw();
            row.command_meta = path.meta();
        })
    }

    pub(crate) fn set_worker_idle(&mut self, player: u8, unit: u8) -> Result<()> {
        self.assign_command(player, unit, WorkerCommand::Idle.encode())
    }

    pub(crate) fn set_worker_to_build(&mut self, player: u8, unit: u8, building: u8) -> Result<()> {
        debug!(player, unit, building, "Worker assigned to build");
        self.assign_command(player, unit, WorkerCommand::Build { player, building }.encode())
    }

    /// Preliminary phase. Returns true if the unit may act this tick.
    pub(crate) fn tick_unit_preliminary(&mut self, player: u8, unit: u8) -> Result<bool> {
        let row = self.unit(player, unit)?;
        let proto = self.unit_prototype(row.unit_type)?;

        if row.is_pre_ticked {
            self.update_unit(player, unit, |r| r.is_pre_ticked = false)?;
            return Ok(false);
        }
        if row.state == UnitState::Spawning {
            let elapsed = self.current_tick().wrapping_sub(row.timestamp);
            if elapsed >= u32::from(proto.spawn_time) {
                self.set_unit_spawned(player, unit)?;
            }
            return Ok(false);
        }
        if !row.state.is_alive() || !row.state.is_paid() {
            return Ok(false);
        }
        if self.building(player, 1)?.integrity == 0 {
            return Ok(false);
        }
        if proto.is_worker {
            let command = WorkerCommand::decode(row.command)?;
            let position = row.position();
            if row.state == UnitState::Inactive {
                if command.is_busy() && self.tile(position)?.is_empty(proto.layer) {
                    self.update_tile(position, |t| t.set_unit(proto.layer, player, unit))?;
                    self.update_unit(player, unit, |r| r.state = UnitState::Active)?;
                    trace!(player, unit, "Worker activated");
                }
                return Ok(false);
            }
            if command == WorkerCommand::Idle
                && position == self.player(player)?.worker_port()
                && row.load == 0
            {
                self.update_tile(position, |t| t.clear(proto.layer))?;
                self.update_unit(player, unit, |r| r.state = UnitState::Inactive)?;
                trace!(player, unit, "Worker parked");
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Intermediate phase. Kills units at zero integrity; returns true if
    /// the unit is still alive.
    pub(crate) fn tick_unit_intermediate(&mut self, player: u8, unit: u8) -> Result<bool> {
        let row = self.unit(player, unit)?;
        if !row.state.is_alive() {
            return Ok(false);
        }
        if row.integrity == 0 {
            self.set_unit_dead(player, unit)?;
            return Ok(false);
        }
        Ok(true)
    }

    /// Lifecycle state of a unit.
    pub fn unit_state(&self, player: u8, unit: u8) -> Result<UnitState> {
        Ok(self.unit(player, unit)?.state)
    }

    /// Ids of a player's units that are paid and not dead.
    pub fn alive_units(&self, player: u8) -> Result<Vec<u8>> {
        let mut alive = Vec::new();
        for unit in 1..=self.player(player)?.unit_count {
            if self.unit(player, unit)?.state.is_alive() {
                alive.push(unit);
            }
        }
        Ok(alive)
    }

    /// The layer a unit moves on.
    pub fn unit_layer(&self, player: u8, unit: u8) -> Result<Layer> {
        Ok(self.unit_proto_of(player, unit)?.layer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::PlayerSetup;
    use crate::data::GameData;

    const DRONE: u8 = 1;
    const CORE: u8 = 1;
    const DEPOT: u8 = 3;

    fn standard_game() -> Core {
        let data = GameData::from_ron_str(
            include_str!("../../../assets/data/prototypes.ron"),
            "prototypes.ron",
        )
        .unwrap();
        let mut core = Core::in_memory();
        core.initialize(32, 32).unwrap();
        data.register(&mut core).unwrap();
        for (spawn, port) in [((1, 1), (2, 6)), ((27, 27), (29, 25))] {
            core.add_player(PlayerSetup {
                spawn_x: spawn.0,
                spawn_y: spawn.1,
                spawn_width: 4,
                spawn_height: 4,
                port_x: port.0,
                port_y: port.1,
            })
            .unwrap();
        }
        core.place_building(1, CORE, 6, 1).unwrap();
        core.place_building(2, CORE, 23, 28).unwrap();
        core
    }

    #[test]
    fn test_builder_dying_on_site_resets_progress() {
        let mut core = standard_game();
        core.create_unit(1, DRONE).unwrap();
        core.start().unwrap();
        let depot = core.place_building(1, DEPOT, 10, 5).unwrap();

        let mut started = false;
        for _ in 0..60 {
            core.tick().unwrap();
            if core.building(1, depot).unwrap().timestamp != 0 {
                started = true;
                break;
            }
        }
        assert!(started);
        let worker = core.unit(1, 1).unwrap();
        assert!(core.building_area(1, depot).unwrap().contains(worker.position()));

        core.update_unit(1, 1, |row| row.integrity = 0).unwrap();
        let events = core.tick().unwrap();
        assert_eq!(core.unit_state(1, 1).unwrap(), UnitState::Dead);
        assert!(events.events.contains(&GameEvent::Killed {
            unit: ObjectRef::unit(1, 1)
        }));
        let building = core.building(1, depot).unwrap();
        assert_eq!(building.state, BuildingState::Building);
        assert_eq!(building.timestamp, 0);
    }

    #[test]
    fn test_state_predicates() {
        use UnitState::*;
        assert!(!Unpaid.is_paid());
        assert!(Dead.is_paid());
        assert!(!Spawning.has_spawned());
        assert!(Inactive.has_spawned());
        assert!(Spawning.is_alive());
        assert!(!Dead.is_alive());
        assert!(!Unpaid.is_alive());
        assert!(Inactive.is_dead_or_inactive());
        assert!(!Active.is_dead_or_inactive());
    }

    #[test]
    fn test_state_bytes() {
        assert_eq!(u8::from(UnitState::Dead), 5);
        assert_eq!(UnitState::try_from(3), Ok(UnitState::Active));
        assert!(UnitState::try_from(6).is_err());
    }
}
