//! Unit type definitions.

use serde::{Deserialize, Serialize};

use crate::board::Layer;
use crate::tables::UnitPrototype;

/// Data-driven unit definition.
///
/// # Example RON
///
/// ```ron
/// UnitData(
///     id: "tank",
///     layer: "Land",
///     resource_cost: 40,
///     compute_cost: 2,
///     spawn_time: 5,
///     max_integrity: 30,
///     land_strength: 6,
///     hover_strength: 3,
///     attack_range: 3,
///     attack_cooldown: 4,
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitData {
    /// Unique string identifier, referenced by scenarios.
    pub id: String,

    /// Movement layer.
    pub layer: Layer,

    /// Resource paid before spawning.
    pub resource_cost: u16,

    /// Compute reserved while alive.
    #[serde(default)]
    pub compute_cost: u8,

    /// Ticks from payment to activation.
    pub spawn_time: u8,

    /// Starting integrity.
    pub max_integrity: u8,

    /// Damage against land units and buildings.
    #[serde(default)]
    pub land_strength: u8,

    /// Damage against hover units.
    #[serde(default)]
    pub hover_strength: u8,

    /// Damage against air units.
    #[serde(default)]
    pub air_strength: u8,

    /// Chebyshev firing range.
    #[serde(default)]
    pub attack_range: u8,

    /// Ticks between shots.
    #[serde(default)]
    pub attack_cooldown: u8,

    /// May move in the tick it fires.
    #[serde(default)]
    pub is_assault: bool,

    /// Takes worker commands.
    #[serde(default)]
    pub is_worker: bool,
}

impl UnitData {
    /// Can damage something.
    #[must_use]
    pub const fn is_combatant(&self) -> bool {
        self.land_strength > 0 || self.hover_strength > 0 || self.air_strength > 0
    }

    /// The stored prototype row.
    #[must_use]
    pub const fn prototype(&self) -> UnitPrototype {
        UnitPrototype {
            layer: self.layer,
            resource_cost: self.resource_cost,
            compute_cost: self.compute_cost,
            spawn_time: self.spawn_time,
            max_integrity: self.max_integrity,
            land_strength: self.land_strength,
            hover_strength: self.hover_strength,
            air_strength: self.air_strength,
            attack_range: self.attack_range,
            attack_cooldown: self.attack_cooldown,
            is_assault: self.is_assault,
            is_worker: self.is_worker,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_ron() {
        let unit: UnitData = ron::from_str(
            r#"UnitData(id: "drone", layer: "Hover", resource_cost: 10, spawn_time: 2, max_integrity: 8, is_worker: true)"#,
        )
        .unwrap();
        assert_eq!(unit.layer, Layer::Hover);
        assert_eq!(unit.attack_range, 0);
        assert!(unit.is_worker);
        assert!(!unit.is_combatant());
        assert_eq!(unit.prototype().max_integrity, 8);
    }

    #[test]
    fn test_unknown_layer_rejected() {
        let result: Result<UnitData, _> = ron::from_str(
            r#"UnitData(id: "x", layer: "Underground", resource_cost: 1, spawn_time: 1, max_integrity: 1)"#,
        );
        assert!(result.is_err());
    }
}
