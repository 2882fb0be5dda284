//! Building lifecycle.
//!
//! `Nil -> Unpaid -> Building -> Built -> Destroyed`. Building 1 of every
//! player is its main building: losing it freezes all of that player's
//! units and blocks further actions.

use tracing::debug;

use crate::board::{Layer, ObjectType};
use crate::error::{GameError, Result};
use crate::events::{GameEvent, ObjectRef};
use crate::geometry::{Area, Point};
use crate::simulation::Core;
use crate::storage::Datastore;
use crate::tables::BuildingRow;

wire_enum! {
    /// Lifecycle state of a building.
    pub enum BuildingState {
        /// No building.
        #[default]
        Nil = 0,
        /// Placed, waiting in the pay queue.
        Unpaid = 1,
        /// Paid, waiting for a worker to finish it.
        Building = 2,
        /// Complete and contributing to the economy.
        Built = 3,
        /// Terminal.
        Destroyed = 4,
    }
}

impl BuildingState {
    /// Construction finished at some point.
    #[must_use]
    pub const fn has_been_built(self) -> bool {
        matches!(self, Self::Built | Self::Destroyed)
    }
}

impl<S: Datastore> Core<S> {
    /// True if `area` is on the board, clear of every spawn area and free
    /// of land occupants.
    pub fn is_buildable_area(&self, area: Area) -> Result<bool> {
        let meta = self.meta()?;
        if area.is_empty() || !area.within(&meta.board_area()) {
            return Ok(false);
        }
        for player in 1..=meta.player_count {
            if area.overlaps(&self.spawn_area(player)?) {
                return Ok(false);
            }
        }
        for tile in area.tiles() {
            if !self.tile(tile)?.is_empty(Layer::Land) {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Append an unpaid building and claim its footprint. Validation is the
    /// caller's.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub(crate) fn place_building_row(
        &mut self,
        player: u8,
        building_type: u8,
        origin: Point,
    ) -> Result<u8> {
        let proto = self.building_prototype(building_type)?;
        let mut player_row = self.player(player)?;
        let building = player_row
            .building_count
            .checked_add(1)
            .ok_or(GameError::BuildingLimitReached(player))?;
        player_row.building_count = building;
        self.set_player(player, &player_row)?;

        let row = BuildingRow {
            x: origin.x as u16,
            y: origin.y as u16,
            building_type,
            state: BuildingState::Unpaid,
            integrity: proto.max_integrity,
            timestamp: 0,
        };
        self.set_building(player, building, &row)?;
        for tile in proto.footprint(origin).tiles() {
            self.update_tile(tile, |t| {
                t.set_land_object(ObjectType::Building, player, building);
            })?;
        }
        debug!(player, building, building_type, x = row.x, y = row.y, "Building placed");
        Ok(building)
    }

    /// Mark a building paid and move the pay pointer past it.
    pub(crate) fn set_building_building(&mut self, player: u8, building: u8) -> Result<()> {
        self.update_player(player, |row| {
            row.building_pay_pointer = building.saturating_add(1);
        })?;
        self.update_building(player, building, |row| row.state = BuildingState::Building)
    }

    /// Finish construction and apply the building's contributions.
    pub(crate) fn set_building_built(&mut self, player: u8, building: u8) -> Result<()> {
        let now = self.current_tick();
        let mut row = self.building(player, building)?;
        row.state = BuildingState::Built;
        row.timestamp = now;
        self.set_building(player, building, &row)?;

        let proto = self.building_prototype(row.building_type)?;
        if !proto.is_environment {
            self.update_player(player, |p| {
                p.add_storage(proto.resource_capacity);
                p.add_compute_supply(proto.compute_capacity);
                if proto.is_armory {
                    p.add_armory();
                }
                if building == 1 {
                    p.add_resource(proto.resource_capacity);
                }
            })?;
        }
        debug!(player, building, "Building built");
        self.emit(GameEvent::Built {
            building: ObjectRef::building(player, building),
        });
        Ok(())
    }

    /// Destroy a building, free its footprint and revoke its contributions.
    pub(crate) fn set_building_destroyed(&mut self, player: u8, building: u8) -> Result<()> {
        let mut row = self.building(player, building)?;
        let was_built = row.state == BuildingState::Built;
        row.state = BuildingState::Destroyed;
        self.set_building(player, building, &row)?;

        let proto = self.building_prototype(row.building_type)?;
        for tile in proto.footprint(row.position()).tiles() {
            self.update_tile(tile, |t| t.clear(Layer::Land))?;
        }
        if was_built && !proto.is_environment {
            self.update_player(player, |p| {
                p.sub_storage(proto.resource_capacity);
                p.sub_compute_supply(proto.compute_capacity);
                if proto.is_armory {
                    p.sub_armory();
                }
            })?;
        }
        debug!(player, building, "Building destroyed");
        self.emit(GameEvent::Destroyed {
            building: ObjectRef::building(player, building),
        });
        Ok(())
    }

    /// Lifecycle state of a building.
    pub fn building_state(&self, player: u8, building: u8) -> Result<BuildingState> {
        Ok(self.building(player, building)?.state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_been_built() {
        assert!(!BuildingState::Unpaid.has_been_built());
        assert!(!BuildingState::Building.has_been_built());
        assert!(BuildingState::Built.has_been_built());
        assert!(BuildingState::Destroyed.has_been_built());
    }
}
