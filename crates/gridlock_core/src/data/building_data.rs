//! Building type definitions.

use serde::{Deserialize, Serialize};

use crate::tables::BuildingPrototype;

/// Data-driven building definition.
///
/// # Example RON
///
/// ```ron
/// BuildingData(
///     id: "crystal_field",
///     width: 2,
///     height: 2,
///     resource_mine: 5,
///     mine_time: 3,
///     max_integrity: 255,
///     is_environment: true,
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildingData {
    /// Unique string identifier, referenced by scenarios.
    pub id: String,

    /// Footprint width.
    pub width: u8,

    /// Footprint height.
    pub height: u8,

    /// Resource paid before construction.
    #[serde(default)]
    pub resource_cost: u16,

    /// Storage added when built.
    #[serde(default)]
    pub resource_capacity: u16,

    /// Compute supply added when built.
    #[serde(default)]
    pub compute_capacity: u8,

    /// Resource loaded per harvest.
    #[serde(default)]
    pub resource_mine: u8,

    /// Ticks between harvests.
    #[serde(default)]
    pub mine_time: u8,

    /// Starting integrity.
    pub max_integrity: u8,

    /// Ticks of worker presence needed to finish.
    #[serde(default)]
    pub building_time: u8,

    /// Grants one extra unit payment per tick.
    #[serde(default)]
    pub is_armory: bool,

    /// Owned by player 0 and harvestable.
    #[serde(default)]
    pub is_environment: bool,
}

impl BuildingData {
    /// The stored prototype row.
    #[must_use]
    pub const fn prototype(&self) -> BuildingPrototype {
        BuildingPrototype {
            width: self.width,
            height: self.height,
            resource_cost: self.resource_cost,
            resource_capacity: self.resource_capacity,
            compute_capacity: self.compute_capacity,
            resource_mine: self.resource_mine,
            mine_time: self.mine_time,
            max_integrity: self.max_integrity,
            building_time: self.building_time,
            is_armory: self.is_armory,
            is_environment: self.is_environment,
        }
    }

    /// Harvestable environment building.
    #[must_use]
    pub const fn is_mine(&self) -> bool {
        self.is_environment && self.resource_mine > 0
    }
}
