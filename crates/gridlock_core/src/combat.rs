//! Fighter targeting and damage.
//!
//! A fighter whose cooldown has elapsed shoots the best enemy unit in range
//! before considering its building target. "Best" is decided per layer:
//! the nearest enemy on each layer is a candidate, candidates are weighed
//! in the order Land, Air, Hover, and the one the fighter hits hardest
//! wins. Hover units (workers) are only shot when nothing else is in reach.

use tracing::{debug, trace};

use crate::board::Layer;
use crate::buildings::BuildingState;
use crate::command::FighterCommand;
use crate::error::Result;
use crate::events::{GameEvent, ObjectRef};
use crate::geometry::{Area, Point};
use crate::simulation::Core;
use crate::storage::Datastore;

/// Layers in targeting priority order.
const TARGET_ORDER: [Layer; 3] = [Layer::Land, Layer::Air, Layer::Hover];

/// An enemy unit matched by distance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnemyMatch {
    /// Owner of the matched unit.
    pub player: u8,
    /// Matched unit id.
    pub unit: u8,
    /// Chebyshev distance from the searcher.
    pub distance: i32,
}

impl<S: Datastore> Core<S> {
    /// Nearest targetable enemy unit on each layer, indexed by layer.
    ///
    /// Enemies are scanned by ascending player then unit id; ties keep the
    /// first found. Only spawned units that are neither parked nor dead
    /// count.
    pub fn nearest_enemy_units(&self, player: u8, position: Point) -> Result<[Option<EnemyMatch>; 3]> {
        let mut matches = [None; 3];
        for enemy in 1..=self.meta()?.player_count {
            if enemy == player {
                continue;
            }
            for unit in 1..=self.player(enemy)?.unit_count {
                let row = self.unit(enemy, unit)?;
                if !row.state.has_spawned() || row.state.is_dead_or_inactive() {
                    continue;
                }
                let layer = self.unit_prototype(row.unit_type)?.layer;
                let distance = position.chebyshev(row.position());
                let slot: &mut Option<EnemyMatch> = &mut matches[usize::from(u8::from(layer))];
                if slot.map_or(true, |m| distance < m.distance) {
                    *slot = Some(EnemyMatch {
                        player: enemy,
                        unit,
                        distance,
                    });
                }
            }
        }
        Ok(matches)
    }

    /// The enemy unit this fighter would shoot now, ignoring cooldown.
    pub fn unit_to_fire_at(&self, player: u8, unit: u8) -> Result<Option<EnemyMatch>> {
        let fighter = self.unit(player, unit)?;
        let proto = self.unit_prototype(fighter.unit_type)?;
        let matches = self.nearest_enemy_units(player, fighter.position())?;

        let mut chosen: Option<(EnemyMatch, u8)> = None;
        for layer in TARGET_ORDER {
            let Some(candidate) = matches[usize::from(u8::from(layer))] else {
                continue;
            };
            if layer == Layer::Hover && chosen.is_some() {
                continue;
            }
            let strength = proto.strength(layer);
            if candidate.distance > i32::from(proto.attack_range) || strength == 0 {
                continue;
            }
            if chosen.map_or(true, |(_, best)| strength > best) {
                chosen = Some((candidate, strength));
            }
        }
        Ok(chosen.map(|(target, _)| target))
    }

    fn shoot_unit(&mut self, player: u8, unit: u8, target: EnemyMatch) -> Result<()> {
        let attacker_proto = self.unit_proto_of(player, unit)?;
        let mut victim = self.unit(target.player, target.unit)?;
        let layer = self.unit_prototype(victim.unit_type)?.layer;
        let strength = attacker_proto.strength(layer);
        victim.integrity = victim.integrity.saturating_sub(strength);
        self.set_unit(target.player, target.unit, &victim)?;

        let now = self.current_tick();
        self.update_unit(player, unit, |row| row.timestamp = now)?;
        trace!(
            player,
            unit,
            target_player = target.player,
            target_unit = target.unit,
            integrity = victim.integrity,
            "Unit shot"
        );
        self.emit(GameEvent::Shot {
            attacker: ObjectRef::unit(player, unit),
            target: ObjectRef::unit(target.player, target.unit),
        });
        Ok(())
    }

    fn shoot_building(&mut self, player: u8, unit: u8, target_player: u8, target_building: u8) -> Result<()> {
        let strength = self.unit_proto_of(player, unit)?.strength(Layer::Land);
        let mut building = self.building(target_player, target_building)?;
        building.integrity = building.integrity.saturating_sub(strength);
        self.set_building(target_player, target_building, &building)?;

        let now = self.current_tick();
        self.update_unit(player, unit, |row| row.timestamp = now)?;
        if building.integrity == 0 {
            self.set_building_destroyed(target_player, target_building)?;
            let position = self.unit(player, unit)?.position();
            self.assign_command(player, unit, FighterCommand::hold(position).encode())?;
            debug!(player, unit, target_player, target_building, "Building razed");
        }
        self.emit(GameEvent::Shot {
            attacker: ObjectRef::unit(player, unit),
            target: ObjectRef::building(target_player, target_building),
        });
        Ok(())
    }

    /// Fighter action phase. Returns true if the fighter should move.
    pub(crate) fn tick_fighter_action(&mut self, player: u8, unit: u8) -> Result<bool> {
        let fighter = self.unit(player, unit)?;
        let proto = self.unit_prototype(fighter.unit_type)?;

        let elapsed = self.current_tick().wrapping_sub(fighter.timestamp);
        if elapsed < u32::from(proto.attack_cooldown) {
            return Ok(true);
        }

        if let Some(target) = self.unit_to_fire_at(player, unit)? {
            self.shoot_unit(player, unit, target)?;
            return Ok(proto.is_assault);
        }

        let FighterCommand::AttackBuilding {
            player: target_player,
            building: target_building,
        } = FighterCommand::decode(fighter.command)?
        else {
            return Ok(true);
        };
        let target = self.building(target_player, target_building)?;
        if target.state == BuildingState::Destroyed {
            self.assign_command(player, unit, FighterCommand::hold(fighter.position()).encode())?;
            return Ok(false);
        }
        let area = self.building_area(target_player, target_building)?;
        if fighter.position().distance_to_area(area) > i32::from(proto.attack_range) {
            return Ok(true);
        }
        self.shoot_building(player, unit, target_player, target_building)?;
        Ok(false)
    }

    /// Fighter movement phase: towards the attacked building until in
    /// range, or onto the held tile.
    pub(crate) fn tick_fighter_movement(&mut self, player: u8, unit: u8) -> Result<bool> {
        let fighter = self.unit(player, unit)?;
        let proto = self.unit_prototype(fighter.unit_type)?;
        let position = fighter.position();
        let command = FighterCommand::decode(fighter.command)?;
        let target = match command {
            FighterCommand::AttackBuilding { player, building } => self.building_area(player, building)?,
            FighterCommand::HoldPosition { x, y } => Area::tile(Point::from_u16(x, y)),
        };
        if target.contains(position) {
            return Ok(true);
        }
        if matches!(command, FighterCommand::AttackBuilding { .. })
            && position.distance_to_area(target) <= i32::from(proto.attack_range)
        {
            return Ok(true);
        }
        self.move_unit_to_target(player, unit, target)?;
        Ok(false)
    }
}
