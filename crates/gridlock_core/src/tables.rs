//! Row layouts for every table.
//!
//! | Table               | Key                 | Size |
//! |---------------------|---------------------|------|
//! | Meta                | `[]`                | 13   |
//! | Players             | `[player]`          | 22   |
//! | Board               | `[x:u16, y:u16]`    | 7    |
//! | Units               | `[player, unit]`    | 30   |
//! | Buildings           | `[player, building]`| 11   |
//! | UnitPrototypes      | `[type]`            | 13   |
//! | BuildingPrototypes  | `[type]`            | 13   |
//!
//! Field order is the encoding order; do not reorder fields.

use serde::{Deserialize, Serialize};

use crate::board::{Layer, ObjectType};
use crate::buildings::BuildingState;
use crate::geometry::{Area, Point};
use crate::storage::{Row, TableId};
use crate::units::UnitState;

/// Singleton game metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct MetaRow {
    /// Board width in tiles.
    pub board_width: u16,
    /// Board height in tiles.
    pub board_height: u16,
    /// Number of registered players.
    pub player_count: u8,
    /// Number of registered unit prototypes.
    pub unit_prototype_count: u8,
    /// Number of registered building prototypes.
    pub building_prototype_count: u8,
    /// Set once by `initialize`.
    pub is_initialized: bool,
    /// Set once by `start`.
    pub has_started: bool,
    /// Clock value at initialization.
    pub creation_tick: u32,
}

impl Row for MetaRow {
    const TABLE: TableId = TableId::Meta;
    const SIZE: usize = 13;
}

impl MetaRow {
    /// The whole board as an area.
    #[must_use]
    pub const fn board_area(&self) -> Area {
        Area::new(
            Point::ZERO,
            self.board_width as i32,
            self.board_height as i32,
        )
    }
}

/// Per-player economy and queue state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct PlayerRow {
    /// Spawn area origin x.
    pub spawn_area_x: u16,
    /// Spawn area origin y.
    pub spawn_area_y: u16,
    /// Spawn area width.
    pub spawn_area_width: u8,
    /// Spawn area height.
    pub spawn_area_height: u8,
    /// Tile idle workers return to.
    pub worker_port_x: u16,
    /// Tile idle workers return to.
    pub worker_port_y: u16,
    /// Spendable resource.
    pub cur_resource: u16,
    /// Resource storage capacity.
    pub max_resource: u16,
    /// Built armories, each granting one extra unit payment per tick.
    pub cur_armories: u8,
    /// Compute provided by built buildings.
    pub compute_supply: u8,
    /// Compute consumed by paid, living units.
    pub compute_demand: u8,
    /// Units created so far; ids are `1..=unit_count`.
    pub unit_count: u8,
    /// Buildings placed so far; ids are `1..=building_count`.
    pub building_count: u8,
    /// Next building to pay for.
    pub building_pay_pointer: u8,
    /// Oldest building that may still need a builder.
    pub building_build_pointer: u8,
    /// Next unit to pay for.
    pub unit_pay_pointer: u8,
}

impl Row for PlayerRow {
    const TABLE: TableId = TableId::Players;
    const SIZE: usize = 22;
}

impl PlayerRow {
    /// Area in which this player's units appear.
    #[must_use]
    pub const fn spawn_area(&self) -> Area {
        Area::new(
            Point::from_u16(self.spawn_area_x, self.spawn_area_y),
            self.spawn_area_width as i32,
            self.spawn_area_height as i32,
        )
    }

    /// Worker port tile.
    #[must_use]
    pub const fn worker_port(&self) -> Point {
        Point::from_u16(self.worker_port_x, self.worker_port_y)
    }
}

/// Occupancy of one board tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct TileRow {
    /// Kind of land occupant.
    pub land_object_type: ObjectType,
    /// Owner of the land occupant.
    pub land_player_id: u8,
    /// Unit or building id of the land occupant.
    pub land_object_id: u8,
    /// Owner of the hover unit.
    pub hover_player_id: u8,
    /// Hover unit id.
    pub hover_unit_id: u8,
    /// Owner of the air unit.
    pub air_player_id: u8,
    /// Air unit id.
    pub air_unit_id: u8,
}

impl Row for TileRow {
    const TABLE: TableId = TableId::Board;
    const SIZE: usize = 7;
}

/// A unit. Rows are never removed; dead units keep their row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct UnitRow {
    /// Tile x.
    pub x: u16,
    /// Tile y.
    pub y: u16,
    /// Unit prototype id.
    pub unit_type: u8,
    /// Lifecycle state.
    pub state: UnitState,
    /// Carried resource (workers).
    pub load: u8,
    /// Remaining hit points.
    pub integrity: u8,
    /// Spawn start, spawn completion or last shot, depending on state.
    pub timestamp: u32,
    /// Packed worker or fighter command.
    pub command: u64,
    /// Packed waypoint path.
    pub command_extra: u64,
    /// Waypoint path length and pointer.
    pub command_meta: u8,
    /// Set when an external assignment already ran this unit's tick.
    pub is_pre_ticked: bool,
}

impl Row for UnitRow {
    const TABLE: TableId = TableId::Units;
    const SIZE: usize = 30;
}

impl UnitRow {
    /// Current tile.
    #[must_use]
    pub const fn position(&self) -> Point {
        Point::from_u16(self.x, self.y)
    }
}

/// A building.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct BuildingRow {
    /// Footprint origin x.
    pub x: u16,
    /// Footprint origin y.
    pub y: u16,
    /// Building prototype id.
    pub building_type: u8,
    /// Lifecycle state.
    pub state: BuildingState,
    /// Remaining hit points.
    pub integrity: u8,
    /// Build progress start, or last harvest for environment buildings.
    /// Zero means no progress.
    pub timestamp: u32,
}

impl Row for BuildingRow {
    const TABLE: TableId = TableId::Buildings;
    const SIZE: usize = 11;
}

impl BuildingRow {
    /// Footprint origin.
    #[must_use]
    pub const fn position(&self) -> Point {
        Point::from_u16(self.x, self.y)
    }
}

/// Static stats of a unit type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct UnitPrototype {
    /// Movement layer.
    pub layer: Layer,
    /// Resource paid before spawning.
    pub resource_cost: u16,
    /// Compute reserved while alive.
    pub compute_cost: u8,
    /// Ticks from payment to activation.
    pub spawn_time: u8,
    /// Starting integrity.
    pub max_integrity: u8,
    /// Damage against land targets and buildings.
    pub land_strength: u8,
    /// Damage against hover targets.
    pub hover_strength: u8,
    /// Damage against air targets.
    pub air_strength: u8,
    /// Chebyshev firing range.
    pub attack_range: u8,
    /// Ticks between shots.
    pub attack_cooldown: u8,
    /// Assault units may move in the tick they fire.
    pub is_assault: bool,
    /// Workers use worker commands; everything else is a fighter.
    pub is_worker: bool,
}

impl Row for UnitPrototype {
    const TABLE: TableId = TableId::UnitPrototypes;
    const SIZE: usize = 13;
}

impl UnitPrototype {
    /// Damage dealt to a target on `layer`.
    #[must_use]
    pub const fn strength(&self, layer: Layer) -> u8 {
        match layer {
            Layer::Land => self.land_strength,
            Layer::Hover => self.hover_strength,
            Layer::Air => self.air_strength,
        }
    }
}

/// Static stats of a building type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct BuildingPrototype {
    /// Footprint width.
    pub width: u8,
    /// Footprint height.
    pub height: u8,
    /// Resource paid before construction.
    pub resource_cost: u16,
    /// Storage added when built.
    pub resource_capacity: u16,
    /// Compute supply added when built.
    pub compute_capacity: u8,
    /// Resource a worker loads per harvest (environment).
    pub resource_mine: u8,
    /// Ticks between harvests (environment).
    pub mine_time: u8,
    /// Starting integrity.
    pub max_integrity: u8,
    /// Ticks of worker presence needed to finish.
    pub building_time: u8,
    /// Armories add unit payments per tick.
    pub is_armory: bool,
    /// Environment buildings belong to player 0 and can be mined.
    pub is_environment: bool,
}

impl Row for BuildingPrototype {
    const TABLE: TableId = TableId::BuildingPrototypes;
    const SIZE: usize = 13;
}

impl BuildingPrototype {
    /// Footprint of a building of this type placed at `origin`.
    #[must_use]
    pub const fn footprint(&self, origin: Point) -> Area {
        Area::new(origin, self.width as i32, self.height as i32)
    }
}
