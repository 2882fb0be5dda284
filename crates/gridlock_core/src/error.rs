//! Error types for the game simulation.
//!
//! Every action validates before it mutates, so an `Err` always means the
//! store was left untouched.

use thiserror::Error;

use crate::storage::TableId;

/// Result type alias using [`GameError`].
pub type Result<T, E = GameError> = std::result::Result<T, E>;

/// Coarse classification of a [`GameError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The game is in the wrong lifecycle phase for the action.
    Precondition,
    /// A fixed-width counter or the spawn area is exhausted.
    Capacity,
    /// The action referenced something that does not exist or is not allowed.
    Validation,
    /// A row, snapshot or replay could not be encoded, decoded or persisted.
    Storage,
}

/// Top-level error type for all game simulation errors.
#[derive(Debug, Error)]
pub enum GameError {
    /// The game has not been initialized.
    #[error("Game not initialized")]
    NotInitialized,

    /// The game has not been started.
    #[error("Game not started")]
    NotStarted,

    /// `initialize` was called twice.
    #[error("Game already initialized")]
    AlreadyInitialized,

    /// The action is only allowed before the game starts.
    #[error("Game already started")]
    AlreadyStarted,

    /// No more player ids are available.
    #[error("Player limit reached")]
    PlayerLimitReached,

    /// The player has no more unit ids available.
    #[error("Unit limit reached for player {0}")]
    UnitLimitReached(u8),

    /// The player has no more building ids available.
    #[error("Building limit reached for player {0}")]
    BuildingLimitReached(u8),

    /// No more unit prototype ids are available.
    #[error("Unit prototype limit reached")]
    UnitPrototypeLimitReached,

    /// No more building prototype ids are available.
    #[error("Building prototype limit reached")]
    BuildingPrototypeLimitReached,

    /// Every tile of the player's spawn area is occupied.
    #[error("No free spawn tile for player {0}")]
    NoSpawnPoint(u8),

    /// The player id does not name an existing player.
    #[error("Nonexistent player: {0}")]
    InvalidPlayerId(u8),

    /// The unit id does not name an existing unit of the player.
    #[error("Invalid unit ID: {player}/{unit}")]
    InvalidUnitId {
        /// Owning player.
        player: u8,
        /// Offending unit id.
        unit: u8,
    },

    /// The building id does not name an existing building of the player.
    #[error("Invalid building ID: {player}/{building}")]
    InvalidBuildingId {
        /// Owning player.
        player: u8,
        /// Offending building id.
        building: u8,
    },

    /// The unit type is not a registered prototype.
    #[error("Invalid unit type: {0}")]
    InvalidUnitType(u8),

    /// The building type is not a registered prototype.
    #[error("Invalid building type: {0}")]
    InvalidBuildingType(u8),

    /// The player has not placed a main building yet.
    #[error("Player {0} has no main building")]
    MissingMainBuilding(u8),

    /// The player's main building has been destroyed.
    #[error("Main building of player {0} destroyed")]
    MainBuildingDestroyed(u8),

    /// The footprint overlaps a spawn area or an occupied land tile.
    #[error("Area not buildable at ({x}, {y})")]
    AreaNotBuildable {
        /// Footprint origin x.
        x: u16,
        /// Footprint origin y.
        y: u16,
    },

    /// The position or footprint leaves the board.
    #[error("Area out of bounds at ({x}, {y})")]
    AreaOutOfBounds {
        /// Origin x.
        x: u16,
        /// Origin y.
        y: u16,
    },

    /// The unit is dead and can no longer receive commands.
    #[error("Unit {player}/{unit} is dead")]
    UnitDead {
        /// Owning player.
        player: u8,
        /// Dead unit id.
        unit: u8,
    },

    /// The command names a target that the unit may not act on.
    #[error("Illegal command target: {0}")]
    IllegalCommandTarget(&'static str),

    /// The command type is not one the unit understands.
    #[error("Command not assignable: {0:#x}")]
    CommandNotAssignable(u64),

    /// The waypoint path metadata is malformed.
    #[error("Invalid command path: {0}")]
    InvalidCommandPath(&'static str),

    /// A prototype with stats the simulation cannot use.
    #[error("Invalid prototype: {0}")]
    InvalidPrototype(&'static str),

    /// The board dimensions are zero or do not fit the tile key space.
    #[error("Invalid board size {width}x{height}")]
    InvalidBoardSize {
        /// Requested width.
        width: u16,
        /// Requested height.
        height: u16,
    },

    /// A stored row could not be decoded.
    #[error("Corrupt row in table {table:?}: {message}")]
    CorruptRow {
        /// Table the row was read from.
        table: TableId,
        /// Decoder message.
        message: String,
    },

    /// Snapshot or replay (de)serialization failed.
    #[error("Serialization failed: {0}")]
    Serialization(String),

    /// Data file parsing error.
    #[error("Failed to parse data file '{path}': {message}")]
    DataParseError {
        /// Path to the file that failed to parse.
        path: String,
        /// Error message.
        message: String,
    },

    /// Replay or snapshot file IO failed.
    #[error("IO error on '{path}': {message}")]
    Io {
        /// Path involved.
        path: String,
        /// Error message.
        message: String,
    },

    /// A replay written by an incompatible version.
    #[error("Replay version mismatch: expected {expected}, got {found}")]
    ReplayVersionMismatch {
        /// Version this build understands.
        expected: u32,
        /// Version found in the file.
        found: u32,
    },
}

impl GameError {
    /// Classify this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::NotInitialized
            | Self::NotStarted
            | Self::AlreadyInitialized
            | Self::AlreadyStarted => ErrorKind::Precondition,
            Self::PlayerLimitReached
            | Self::UnitLimitReached(_)
            | Self::BuildingLimitReached(_)
            | Self::UnitPrototypeLimitReached
            | Self::BuildingPrototypeLimitReached
            | Self::NoSpawnPoint(_) => ErrorKind::Capacity,
            Self::CorruptRow { .. }
            | Self::Serialization(_)
            | Self::DataParseError { .. }
            | Self::Io { .. }
            | Self::ReplayVersionMismatch { .. } => ErrorKind::Storage,
            _ => ErrorKind::Validation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(GameError::NotStarted.kind(), ErrorKind::Precondition);
        assert_eq!(GameError::NoSpawnPoint(1).kind(), ErrorKind::Capacity);
        assert_eq!(
            GameError::IllegalCommandTarget("x").kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            GameError::CorruptRow {
                table: TableId::Units,
                message: String::new()
            }
            .kind(),
            ErrorKind::Storage
        );
    }

    #[test]
    fn test_error_display() {
        let err = GameError::InvalidUnitId { player: 2, unit: 9 };
        assert_eq!(err.to_string(), "Invalid unit ID: 2/9");
    }
}
