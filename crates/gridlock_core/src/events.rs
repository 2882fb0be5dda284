//! Events emitted by state transitions.
//!
//! The engine never calls back into the caller; events accumulate on the
//! core and are handed out by [`crate::simulation::Core::tick`].

use serde::{Deserialize, Serialize};

use crate::board::ObjectType;

/// A reference to a unit or building.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectRef {
    /// Unit or building.
    pub kind: ObjectType,
    /// Owning player.
    pub player: u8,
    /// Object id within the player.
    pub id: u8,
}

impl ObjectRef {
    /// Reference a unit.
    #[must_use]
    pub const fn unit(player: u8, id: u8) -> Self {
        Self {
            kind: ObjectType::Unit,
            player,
            id,
        }
    }

    /// Reference a building.
    #[must_use]
    pub const fn building(player: u8, id: u8) -> Self {
        Self {
            kind: ObjectType::Building,
            player,
            id,
        }
    }
}

/// Something observable happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum GameEvent {
    /// A unit fired at a unit or building.
    Shot {
        /// The shooter.
        attacker: ObjectRef,
        /// The unit or building hit.
        target: ObjectRef,
    },
    /// A unit finished spawning.
    Spawned {
        /// The new unit.
        unit: ObjectRef,
    },
    /// A unit died.
    Killed {
        /// The dead unit.
        unit: ObjectRef,
    },
    /// A building finished construction.
    Built {
        /// The building.
        building: ObjectRef,
    },
    /// A building was destroyed.
    Destroyed {
        /// The building.
        building: ObjectRef,
    },
}

impl GameEvent {
    /// Stable numeric event id.
    #[must_use]
    pub const fn event_id(&self) -> u8 {
        match self {
            Self::Shot { .. } => 0,
            Self::Spawned { .. } => 1,
            Self::Killed { .. } => 2,
            Self::Built { .. } => 3,
            Self::Destroyed { .. } => 4,
        }
    }
}

/// Events returned from one tick.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickEvents {
    /// The tick that produced these events.
    pub tick: u32,
    /// Events in emission order.
    pub events: Vec<GameEvent>,
}

impl TickEvents {
    /// True if nothing happened.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Number of events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Units that finished spawning.
    pub fn spawned(&self) -> impl Iterator<Item = ObjectRef> + '_ {
        self.events.iter().filter_map(|e| match e {
            GameEvent::Spawned { unit } => Some(*unit),
            _ => None,
        })
    }

    /// Units that died.
    pub fn killed(&self) -> impl Iterator<Item = ObjectRef> + '_ {
        self.events.iter().filter_map(|e| match e {
            GameEvent::Killed { unit } => Some(*unit),
            _ => None,
        })
    }

    /// Buildings that finished construction.
    pub fn built(&self) -> impl Iterator<Item = ObjectRef> + '_ {
        self.events.iter().filter_map(|e| match e {
            GameEvent::Built { building } => Some(*building),
            _ => None,
        })
    }

    /// Buildings that were destroyed.
    pub fn destroyed(&self) -> impl Iterator<Item = ObjectRef> + '_ {
        self.events.iter().filter_map(|e| match e {
            GameEvent::Destroyed { building } => Some(*building),
            _ => None,
        })
    }

    /// Shots fired, as (attacker, target).
    pub fn shots(&self) -> impl Iterator<Item = (ObjectRef, ObjectRef)> + '_ {
        self.events.iter().filter_map(|e| match e {
            GameEvent::Shot { attacker, target } => Some((*attacker, *target)),
            _ => None,
        })
    }
}
