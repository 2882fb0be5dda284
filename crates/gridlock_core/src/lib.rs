//! # Gridlock Core
//!
//! Deterministic tick-driven simulation core for the Gridlock RTS.
//!
//! This crate contains **only** deterministic logic:
//! - No rendering
//! - No network IO
//! - No randomness
//! - No floating-point math (every quantity is a small unsigned integer)
//!
//! All state lives in fixed-width rows inside a [`storage::Datastore`], so
//! the same engine runs against an in-memory map, a replicated store or a
//! scratch copy used to simulate ahead.
//!
//! ## Crate Structure
//!
//! - [`simulation`] - The [`simulation::Core`] and its tick phases
//! - [`actions`] - Validated state-changing requests
//! - [`economy`] - Resource, compute and the pay queues
//! - [`units`] / [`buildings`] - Lifecycle state machines
//! - [`workers`] / [`combat`] - Per-unit behaviour
//! - [`pathfinding`] - Greedy single-step movement
//! - [`command`] - Bit-packed command words and waypoint paths
//! - [`storage`] / [`tables`] / [`board`] - Rows and their keys
//! - [`replay`] - Recording and verifying action streams
//! - [`data`] - Prototype tables loaded from RON

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

#[macro_use]
pub mod wire;

pub mod actions;
pub mod board;
pub mod buildings;
pub mod combat;
pub mod command;
pub mod data;
pub mod economy;
pub mod error;
pub mod events;
pub mod geometry;
pub mod pathfinding;
pub mod replay;
pub mod simulation;
pub mod storage;
pub mod tables;
pub mod units;
pub mod workers;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::actions::{Action, PlayerSetup};
    pub use crate::board::{Layer, ObjectType, Occupant};
    pub use crate::buildings::BuildingState;
    pub use crate::combat::EnemyMatch;
    pub use crate::command::{
        CommandPath, FighterCommand, FighterCommandType, WorkerCommand, WorkerCommandType,
    };
    pub use crate::data::{BuildingData, GameData, TypeIds, UnitData};
    pub use crate::error::{ErrorKind, GameError, Result};
    pub use crate::events::{GameEvent, ObjectRef, TickEvents};
    pub use crate::geometry::{Area, Point};
    pub use crate::pathfinding::{NearestMatch, PathStep};
    pub use crate::replay::{Replay, ReplayAction, ReplayPlayer, ReplayRecorder};
    pub use crate::simulation::Core;
    pub use crate::storage::{Datastore, MemoryStore, TableId};
    pub use crate::tables::{
        BuildingPrototype, BuildingRow, MetaRow, PlayerRow, TileRow, UnitPrototype, UnitRow,
    };
    pub use crate::units::UnitState;
}
