//! Player economy.
//!
//! Resources are a `u16` stock bounded by storage capacity; compute is a
//! `u8` supply/demand pair. Every counter saturates instead of wrapping.
//!
//! Purchases are strictly FIFO. Each tick a player pays for at most one
//! unit per built armory (minimum one) and one building, always the one at
//! the head of its queue. A head that cannot be afforded blocks the queue
//! until it can.

use tracing::{debug, trace};

use crate::buildings::BuildingState;
use crate::command::WorkerCommand;
use crate::error::Result;
use crate::simulation::Core;
use crate::storage::Datastore;
use crate::tables::PlayerRow;
use crate::units::UnitState;

impl PlayerRow {
    /// Raise storage capacity.
    pub fn add_storage(&mut self, amount: u16) {
        self.max_resource = self.max_resource.saturating_add(amount);
    }

    /// Lower storage capacity; the stock is clamped to the new capacity.
    pub fn sub_storage(&mut self, amount: u16) {
        self.max_resource = self.max_resource.saturating_sub(amount);
        self.cur_resource = self.cur_resource.min(self.max_resource);
    }

    /// Add to the stock, up to capacity.
    pub fn add_resource(&mut self, amount: u16) {
        self.cur_resource = self
            .cur_resource
            .saturating_add(amount)
            .min(self.max_resource);
    }

    /// Spend from the stock.
    pub fn sub_resource(&mut self, amount: u16) {
        self.cur_resource = self.cur_resource.saturating_sub(amount);
    }

    /// Raise compute supply.
    pub fn add_compute_supply(&mut self, amount: u8) {
        self.compute_supply = self.compute_supply.saturating_add(amount);
    }

    /// Lower compute supply.
    pub fn sub_compute_supply(&mut self, amount: u8) {
        self.compute_supply = self.compute_supply.saturating_sub(amount);
    }

    /// Raise compute demand.
    pub fn add_compute_demand(&mut self, amount: u8) {
        self.compute_demand = self.compute_demand.saturating_add(amount);
    }

    /// Lower compute demand.
    pub fn sub_compute_demand(&mut self, amount: u8) {
        self.compute_demand = self.compute_demand.saturating_sub(amount);
    }

    /// Count one more armory.
    pub fn add_armory(&mut self) {
        self.cur_armories = self.cur_armories.saturating_add(1);
    }

    /// Count one less armory.
    pub fn sub_armory(&mut self) {
        self.cur_armories = self.cur_armories.saturating_sub(1);
    }

    /// Unreserved compute.
    #[must_use]
    pub const fn compute_surplus(&self) -> u8 {
        self.compute_supply.saturating_sub(self.compute_demand)
    }

    /// Demand above supply halves unloaded resources.
    #[must_use]
    pub const fn is_over_compute(&self) -> bool {
        self.compute_demand > self.compute_supply
    }
}

impl<S: Datastore> Core<S> {
    /// Economy pass for one player.
    pub(crate) fn tick_player(&mut self, player: u8) -> Result<()> {
        let armories = self.player(player)?.cur_armories;
        self.pay_for_units(player)?;
        for _ in 1..armories {
            self.pay_for_units(player)?;
        }
        self.pay_for_and_assign_buildings(player)
    }

    /// Try to pay for the unit at the head of the queue.
    pub(crate) fn pay_for_units(&mut self, player: u8) -> Result<()> {
        let mut row = self.player(player)?;
        let unit = row.unit_pay_pointer;
        if unit == 0 || unit > row.unit_count {
            return Ok(());
        }
        let unit_row = self.unit(player, unit)?;
        // The pointer saturates at 255; never pay twice for the last id.
        if unit_row.state != UnitState::Unpaid {
            return Ok(());
        }
        let proto = self.unit_prototype(unit_row.unit_type)?;
        if row.cur_resource < proto.resource_cost || row.compute_surplus() < proto.compute_cost {
            trace!(player, unit, "Unit payment stalled");
            return Ok(());
        }
        row.sub_resource(proto.resource_cost);
        self.set_player(player, &row)?;
        self.set_unit_spawning(player, unit)?;
        debug!(player, unit, cost = proto.resource_cost, "Unit paid");
        Ok(())
    }

    /// Try to pay for the building at the head of the queue, then make sure
    /// every paid, unfinished building has a worker on it.
    pub(crate) fn pay_for_and_assign_buildings(&mut self, player: u8) -> Result<()> {
        let mut row = self.player(player)?;
        let pay_pointer = row.building_pay_pointer;
        if pay_pointer != 0 && pay_pointer <= row.building_count {
            let building = self.building(player, pay_pointer)?;
            let proto = self.building_prototype(building.building_type)?;
            if building.state == BuildingState::Unpaid && row.cur_resource >= proto.resource_cost {
                row.sub_resource(proto.resource_cost);
                self.set_player(player, &row)?;
                self.set_building_building(player, pay_pointer)?;
                debug!(player, building = pay_pointer, "Building paid");
            }
        }

        // A building paid this tick gets its worker next tick.
        let mut build_pointer = self.player(player)?.building_build_pointer;
        for building in build_pointer..pay_pointer {
            if self.building(player, building)?.state.has_been_built() {
                if building == build_pointer {
                    build_pointer = build_pointer.saturating_add(1);
                }
                continue;
            }
            if self.builder_of(player, building)?.is_some() {
                continue;
            }
            let area = self.building_area(player, building)?;
            let idle = self.idle_workers(player)?;
            let Some(nearest) = self.nearest_unit(player, &idle, area)? else {
                break;
            };
            self.set_worker_to_build(player, nearest.id, building)?;
        }
        self.update_player(player, |p| p.building_build_pointer = build_pointer)
    }

    /// The worker already constructing `building`, if any.
    fn builder_of(&self, player: u8, building: u8) -> Result<Option<u8>> {
        for unit in 1..=self.player(player)?.unit_count {
            let row = self.unit(player, unit)?;
            if !row.state.has_spawned() || !row.state.is_alive() {
                continue;
            }
            if !self.unit_prototype(row.unit_type)?.is_worker {
                continue;
            }
            if let WorkerCommand::Build { building: target, .. } = WorkerCommand::decode(row.command)?
            {
                if target == building {
                    return Ok(Some(unit));
                }
            }
        }
        Ok(None)
    }

    /// Spawned, living workers with no Gather or Build command.
    fn idle_workers(&self, player: u8) -> Result<Vec<u8>> {
        let mut idle = Vec::new();
        for unit in 1..=self.player(player)?.unit_count {
            let row = self.unit(player, unit)?;
            if !row.state.has_spawned() || !row.state.is_alive() {
                continue;
            }
            if !self.unit_prototype(row.unit_type)?.is_worker {
                continue;
            }
            if !WorkerCommand::decode(row.command)?.is_busy() {
                idle.push(unit);
            }
        }
        Ok(idle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_clamps_to_storage() {
        let mut p = PlayerRow::default();
        p.add_resource(10);
        assert_eq!(p.cur_resource, 0);
        p.add_storage(100);
        p.add_resource(150);
        assert_eq!(p.cur_resource, 100);
        p.sub_resource(500);
        assert_eq!(p.cur_resource, 0);
    }

    #[test]
    fn test_sub_storage_clamps_stock_to_new_capacity() {
        let mut p = PlayerRow::default();
        p.add_storage(100);
        p.add_resource(80);
        p.sub_storage(50);
        assert_eq!(p.max_resource, 50);
        assert_eq!(p.cur_resource, 50);
        p.sub_storage(60);
        assert_eq!(p.max_resource, 0);
        assert_eq!(p.cur_resource, 0);
    }

    #[test]
    fn test_storage_saturates() {
        let mut p = PlayerRow::default();
        p.add_storage(u16::MAX);
        p.add_storage(10);
        assert_eq!(p.max_resource, u16::MAX);
    }

    #[test]
    fn test_compute_surplus_saturates() {
        let mut p = PlayerRow::default();
        p.add_compute_supply(3);
        p.add_compute_demand(5);
        assert_eq!(p.compute_surplus(), 0);
        assert!(p.is_over_compute());
        p.sub_compute_demand(10);
        assert_eq!(p.compute_demand, 0);
        assert_eq!(p.compute_surplus(), 3);
    }

    #[test]
    fn test_armories_saturate_at_zero() {
        let mut p = PlayerRow::default();
        p.sub_armory();
        assert_eq!(p.cur_armories, 0);
        p.add_armory();
        p.add_armory();
        p.sub_armory();
        assert_eq!(p.cur_armories, 1);
    }
}
