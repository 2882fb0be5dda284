//! Board tiles and their three occupancy layers.
//!
//! Every tile carries independent Land, Hover and Air slots. The land slot
//! holds at most one building or unit, the other two hold at most one unit
//! each. A cleared slot stores the nil ids `0`.

use crate::tables::TileRow;

wire_enum! {
    /// Movement layer of a unit. Buildings always occupy [`Layer::Land`].
    pub enum Layer {
        /// Ground units and buildings.
        #[default]
        Land = 0,
        /// Hovering units (workers).
        Hover = 1,
        /// Flying units.
        Air = 2,
    }
}

wire_enum! {
    /// What occupies a tile's land slot.
    pub enum ObjectType {
        /// Nothing.
        #[default]
        Nil = 0,
        /// A building footprint tile.
        Building = 1,
        /// A land unit.
        Unit = 2,
    }
}

/// A tile occupant: owner and object id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Occupant {
    /// Owning player (0 for the environment).
    pub player: u8,
    /// Unit or building id.
    pub id: u8,
}

impl TileRow {
    /// Put a building or unit into the land slot.
    pub fn set_land_object(&mut self, kind: ObjectType, player: u8, id: u8) {
        self.land_object_type = kind;
        self.land_player_id = player;
        self.land_object_id = id;
    }

    /// Put a unit into the slot of its movement layer.
    pub fn set_unit(&mut self, layer: Layer, player: u8, unit: u8) {
        match layer {
            Layer::Land => self.set_land_object(ObjectType::Unit, player, unit),
            Layer::Hover => {
                self.hover_player_id = player;
                self.hover_unit_id = unit;
            }
            Layer::Air => {
                self.air_player_id = player;
                self.air_unit_id = unit;
            }
        }
    }

    /// Reset a layer to the nil occupant.
    pub fn clear(&mut self, layer: Layer) {
        match layer {
            Layer::Land => self.set_land_object(ObjectType::Nil, 0, 0),
            Layer::Hover => {
                self.hover_player_id = 0;
                self.hover_unit_id = 0;
            }
            Layer::Air => {
                self.air_player_id = 0;
                self.air_unit_id = 0;
            }
        }
    }

    /// True if nothing occupies `layer`.
    #[must_use]
    pub fn is_empty(&self, layer: Layer) -> bool {
        match layer {
            Layer::Land => self.land_object_type == ObjectType::Nil,
            Layer::Hover => self.hover_unit_id == 0,
            Layer::Air => self.air_unit_id == 0,
        }
    }

    /// True if all three layers are free.
    #[must_use]
    pub fn is_empty_all_layers(&self) -> bool {
        Layer::ALL.iter().all(|&layer| self.is_empty(layer))
    }

    /// The unit standing in `layer`, if any. A building in the land slot is
    /// not a unit.
    #[must_use]
    pub fn unit_at(&self, layer: Layer) -> Option<Occupant> {
        let occupant = match layer {
            Layer::Land if self.land_object_type == ObjectType::Unit => Occupant {
                player: self.land_player_id,
                id: self.land_object_id,
            },
            Layer::Land => return None,
            Layer::Hover => Occupant {
                player: self.hover_player_id,
                id: self.hover_unit_id,
            },
            Layer::Air => Occupant {
                player: self.air_player_id,
                id: self.air_unit_id,
            },
        };
        (occupant.id != 0).then_some(occupant)
    }

    /// The building covering this tile, if any.
    #[must_use]
    pub fn building_at(&self) -> Option<Occupant> {
        (self.land_object_type == ObjectType::Building).then_some(Occupant {
            player: self.land_player_id,
            id: self.land_object_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layers_are_independent() {
        let mut tile = TileRow::default();
        tile.set_unit(Layer::Hover, 1, 4);
        assert!(!tile.is_empty(Layer::Hover));
        assert!(tile.is_empty(Layer::Land));
        assert!(tile.is_empty(Layer::Air));
        tile.set_unit(Layer::Air, 2, 7);
        assert_eq!(tile.unit_at(Layer::Air), Some(Occupant { player: 2, id: 7 }));
        tile.clear(Layer::Hover);
        assert!(tile.is_empty(Layer::Hover));
        assert_eq!(tile.hover_player_id, 0);
        assert!(!tile.is_empty_all_layers());
    }

    #[test]
    fn test_building_is_not_a_unit() {
        let mut tile = TileRow::default();
        tile.set_land_object(ObjectType::Building, 1, 1);
        assert!(!tile.is_empty(Layer::Land));
        assert_eq!(tile.unit_at(Layer::Land), None);
        assert_eq!(tile.building_at(), Some(Occupant { player: 1, id: 1 }));
        tile.clear(Layer::Land);
        assert!(tile.is_empty_all_layers());
    }
}
