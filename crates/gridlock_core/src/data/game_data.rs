//! The full prototype table set.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::building_data::BuildingData;
use super::unit_data::UnitData;
use crate::error::{GameError, Result};
use crate::simulation::Core;
use crate::storage::Datastore;

/// Every unit and building type of a game.
///
/// # Example RON
///
/// ```ron
/// GameData(
///     units: [UnitData(id: "drone", ...)],
///     buildings: [BuildingData(id: "core", ...)],
/// )
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameData {
    /// Unit types; the first entry becomes type id 1.
    pub units: Vec<UnitData>,

    /// Building types; the first entry becomes type id 1.
    pub buildings: Vec<BuildingData>,
}

/// Type ids assigned by [`GameData::register`], keyed by string id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeIds {
    units: BTreeMap<String, u8>,
    buildings: BTreeMap<String, u8>,
}

impl TypeIds {
    /// Type id of a unit.
    #[must_use]
    pub fn unit(&self, id: &str) -> Option<u8> {
        self.units.get(id).copied()
    }

    /// Type id of a building.
    #[must_use]
    pub fn building(&self, id: &str) -> Option<u8> {
        self.buildings.get(id).copied()
    }
}

impl GameData {
    /// Parse RON text and validate it.
    pub fn from_ron_str(source: &str, origin: &str) -> Result<Self> {
        let data: Self = ron::from_str(source).map_err(|e| GameError::DataParseError {
            path: origin.to_string(),
            message: e.to_string(),
        })?;
        let errors = data.validate();
        if !errors.is_empty() {
            return Err(GameError::DataParseError {
                path: origin.to_string(),
                message: errors.join("; "),
            });
        }
        Ok(data)
    }

    /// Load and validate a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let origin = path.display().to_string();
        let source = std::fs::read_to_string(path).map_err(|e| GameError::Io {
            path: origin.clone(),
            message: e.to_string(),
        })?;
        let data = Self::from_ron_str(&source, &origin)?;
        info!(
            "Loaded game data '{}' with {} units, {} buildings",
            origin,
            data.units.len(),
            data.buildings.len()
        );
        Ok(data)
    }

    /// Find a unit by its id.
    #[must_use]
    pub fn get_unit(&self, id: &str) -> Option<&UnitData> {
        self.units.iter().find(|u| u.id == id)
    }

    /// Find a building by its id.
    #[must_use]
    pub fn get_building(&self, id: &str) -> Option<&BuildingData> {
        self.buildings.iter().find(|b| b.id == id)
    }

    /// Problems that would make registration fail or produce unusable
    /// types. Empty when the data is sound.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.units.len() > usize::from(u8::MAX) {
            errors.push(format!("{} unit types, at most 255 allowed", self.units.len()));
        }
        if self.buildings.len() > usize::from(u8::MAX) {
            errors.push(format!(
                "{} building types, at most 255 allowed",
                self.buildings.len()
            ));
        }

        let mut seen = BTreeSet::new();
        for unit in &self.units {
            if !seen.insert(unit.id.as_str()) {
                errors.push(format!("duplicate unit id '{}'", unit.id));
            }
            if unit.max_integrity == 0 {
                errors.push(format!("unit '{}' has zero integrity", unit.id));
            }
        }
        let mut seen = BTreeSet::new();
        for building in &self.buildings {
            if !seen.insert(building.id.as_str()) {
                errors.push(format!("duplicate building id '{}'", building.id));
            }
            if building.width == 0 || building.height == 0 {
                errors.push(format!("building '{}' has an empty footprint", building.id));
            }
        }
        errors
    }

    /// Add every prototype to `core` in list order and return the ids they
    /// received.
    pub fn register<S: Datastore>(&self, core: &mut Core<S>) -> Result<TypeIds> {
        let mut ids = TypeIds::default();
        for unit in &self.units {
            let type_id = core.add_unit_prototype(unit.prototype())?;
            ids.units.insert(unit.id.clone(), type_id);
        }
        for building in &self.buildings {
            let type_id = core.add_building_prototype(building.prototype())?;
            ids.buildings.insert(building.id.clone(), type_id);
        }
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
GameData(
    units: [
        UnitData(id: "drone", layer: "Hover", resource_cost: 10, compute_cost: 1,
                 spawn_time: 2, max_integrity: 8, is_worker: true),
        UnitData(id: "tank", layer: "Land", resource_cost: 40, compute_cost: 2,
                 spawn_time: 5, max_integrity: 30, land_strength: 6,
                 hover_strength: 3, attack_range: 3, attack_cooldown: 4),
    ],
    buildings: [
        BuildingData(id: "core", width: 3, height: 3, resource_capacity: 200,
                     compute_capacity: 6, max_integrity: 80, building_time: 1),
        BuildingData(id: "crystal", width: 1, height: 1, resource_mine: 5,
                     mine_time: 3, max_integrity: 255, is_environment: true),
    ],
)
"#;

    #[test]
    fn test_parse_sample() {
        let data = GameData::from_ron_str(SAMPLE, "sample").unwrap();
        assert_eq!(data.units.len(), 2);
        assert_eq!(data.get_unit("tank").map(|u| u.attack_range), Some(3));
        assert!(data.get_building("crystal").is_some_and(BuildingData::is_mine));
        assert!(data.get_unit("missing").is_none());
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let source = r#"GameData(units: [], buildings: [
            BuildingData(id: "a", width: 1, height: 1, max_integrity: 1),
            BuildingData(id: "a", width: 1, height: 1, max_integrity: 1),
        ])"#;
        let err = GameData::from_ron_str(source, "dup").unwrap_err();
        assert!(err.to_string().contains("duplicate building id 'a'"));
    }

    #[test]
    fn test_parse_error_names_origin() {
        let err = GameData::from_ron_str("GameData(units: [", "broken.ron").unwrap_err();
        assert!(matches!(err, GameError::DataParseError { ref path, .. } if path == "broken.ron"));
    }

    #[test]
    fn test_register_assigns_ids_in_order() {
        let data = GameData::from_ron_str(SAMPLE, "sample").unwrap();
        let mut core = Core::in_memory();
        core.initialize(8, 8).unwrap();
        let ids = data.register(&mut core).unwrap();
        assert_eq!(ids.unit("drone"), Some(1));
        assert_eq!(ids.unit("tank"), Some(2));
        assert_eq!(ids.building("crystal"), Some(2));
        assert_eq!(core.unit_prototype(2).unwrap().land_strength, 6);
        assert_eq!(core.meta().unwrap().building_prototype_count, 2);
    }
}
