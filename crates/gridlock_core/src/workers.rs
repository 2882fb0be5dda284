//! Worker behaviour: harvesting, hauling and construction.

use tracing::{debug, trace};

use crate::buildings::BuildingState;
use crate::command::WorkerCommand;
use crate::error::Result;
use crate::simulation::Core;
use crate::storage::Datastore;

impl<S: Datastore> Core<S> {
    /// Worker action phase. Returns true if the worker should move.
    pub(crate) fn tick_worker_action(&mut self, player: u8, unit: u8) -> Result<bool> {
        let mut worker = self.unit(player, unit)?;
        let position = worker.position();

        if worker.load > 0 {
            if !self.main_building_area(player)?.contains(position) {
                return Ok(true);
            }
            let load = u16::from(worker.load);
            let mut player_row = self.player(player)?;
            let delivered = if player_row.is_over_compute() {
                load / 2
            } else {
                load
            };
            player_row.add_resource(delivered);
            self.set_player(player, &player_row)?;
            worker.load = 0;
            self.set_unit(player, unit, &worker)?;
            trace!(player, unit, delivered, "Worker unloaded");
            return Ok(false);
        }

        let command = WorkerCommand::decode(worker.command)?;
        let Some((target_player, target_building)) = command.target() else {
            return Ok(true);
        };
        let mut target = self.building(target_player, target_building)?;
        if matches!(command, WorkerCommand::Build { .. }) && target.state != BuildingState::Building
        {
            self.set_worker_idle(player, unit)?;
            return Ok(true);
        }
        let target_proto = self.building_prototype(target.building_type)?;
        if !target_proto.footprint(target.position()).contains(position) {
            return Ok(true);
        }

        let now = self.current_tick();
        let elapsed = now.wrapping_sub(target.timestamp);
        match command {
            WorkerCommand::Gather { .. } => {
                if elapsed < u32::from(target_proto.mine_time) {
                    return Ok(false);
                }
                target.timestamp = now;
                self.set_building(target_player, target_building, &target)?;
                worker.load = target_proto.resource_mine;
                self.set_unit(player, unit, &worker)?;
                trace!(player, unit, load = worker.load, "Worker loaded");
                Ok(false)
            }
            WorkerCommand::Build { .. } => {
                if target.timestamp == 0 {
                    // First tick on site: progress is counted from the previous tick.
                    target.timestamp = now.wrapping_sub(1);
                    self.set_building(target_player, target_building, &target)?;
                    return Ok(false);
                }
                if elapsed < u32::from(target_proto.building_time) {
                    return Ok(false);
                }
                self.set_building_built(target_player, target_building)?;
                self.set_worker_idle(player, unit)?;
                debug!(player, unit, building = target_building, "Construction finished");
                Ok(false)
            }
            WorkerCommand::Idle => Ok(true),
        }
    }

    /// Worker movement phase: towards the worker port when idle, the main
    /// building when loaded, the target building otherwise.
    pub(crate) fn tick_worker_movement(&mut self, player: u8, unit: u8) -> Result<bool> {
        let worker = self.unit(player, unit)?;
        let command = WorkerCommand::decode(worker.command)?;
        let target = match command.target() {
            None => self.worker_port_area(player)?,
            Some(_) if worker.load > 0 => self.main_building_area(player)?,
            Some((target_player, target_building)) => {
                self.building_area(target_player, target_building)?
            }
        };
        if target.contains(worker.position()) {
            return Ok(true);
        }
        self.move_unit_to_target(player, unit, target)?;
        Ok(false)
    }
}
