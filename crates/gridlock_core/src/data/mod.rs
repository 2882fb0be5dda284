//! Data-driven prototype tables.
//!
//! Unit and building types are authored in RON with string ids and
//! registered with a [`crate::simulation::Core`] in file order, so type id
//! `n` is the `n`-th entry of its list.

mod building_data;
mod game_data;
mod unit_data;

pub use building_data::BuildingData;
pub use game_data::{GameData, TypeIds};
pub use unit_data::UnitData;
