//! Bit-packed unit commands.
//!
//! Commands travel and persist as a raw `u64` word whose layout depends on
//! whether the unit is a worker or a fighter:
//!
//! ```text
//! worker:  [63..24 unused][23..16 type][15..8 player][7..0 building]
//! fighter: [63..40 unused][39..32 type][31..16 alpha][15..0 beta]
//! ```
//!
//! Fighters may additionally carry a [`CommandPath`] of up to four
//! waypoints, packed into a second `u64` plus a one-byte meta field.

use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};
use crate::geometry::Point;

wire_enum! {
    /// Worker command discriminant (bits 16..24).
    pub enum WorkerCommandType {
        /// Return to the worker port and go inactive.
        #[default]
        Idle = 0,
        /// Harvest an environment building.
        Gather = 1,
        /// Construct one of the player's own buildings.
        Build = 2,
    }
}

impl WorkerCommandType {
    /// Busy workers stay active.
    #[must_use]
    pub const fn is_busy(self) -> bool {
        matches!(self, Self::Gather | Self::Build)
    }
}

wire_enum! {
    /// Fighter command discriminant (bits 32..40).
    pub enum FighterCommandType {
        /// Move to and stay on a tile.
        #[default]
        HoldPosition = 0,
        /// Move into range of a building and shoot it.
        AttackBuilding = 1,
    }
}

/// A decoded worker command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum WorkerCommand {
    /// No task.
    #[default]
    Idle,
    /// Harvest `(player, building)`.
    Gather {
        /// Owner of the target, 0 for environment buildings.
        player: u8,
        /// Target building id.
        building: u8,
    },
    /// Construct `(player, building)`.
    Build {
        /// Owner of the target.
        player: u8,
        /// Target building id.
        building: u8,
    },
}

#[allow(clippy::cast_possible_truncation)]
const fn byte(word: u64, shift: u32) -> u8 {
    (word >> shift & 0xFF) as u8
}

#[allow(clippy::cast_possible_truncation)]
const fn half(word: u64, shift: u32) -> u16 {
    (word >> shift & 0xFFFF) as u16
}

impl WorkerCommand {
    /// Decode a raw word. Unused bits are ignored.
    pub fn decode(word: u64) -> Result<Self> {
        let kind = WorkerCommandType::try_from(byte(word, 16))
            .map_err(|_| GameError::CommandNotAssignable(word))?;
        let player = byte(word, 8);
        let building = byte(word, 0);
        Ok(match kind {
            WorkerCommandType::Idle => Self::Idle,
            WorkerCommandType::Gather => Self::Gather { player, building },
            WorkerCommandType::Build => Self::Build { player, building },
        })
    }

    /// Encode to the canonical raw word.
    #[must_use]
    pub const fn encode(self) -> u64 {
        let (kind, player, building) = match self {
            Self::Idle => (WorkerCommandType::Idle, 0, 0),
            Self::Gather { player, building } => (WorkerCommandType::Gather, player, building),
            Self::Build { player, building } => (WorkerCommandType::Build, player, building),
        };
        (kind as u64) << 16 | (player as u64) << 8 | building as u64
    }

    /// The discriminant.
    #[must_use]
    pub const fn kind(self) -> WorkerCommandType {
        match self {
            Self::Idle => WorkerCommandType::Idle,
            Self::Gather { .. } => WorkerCommandType::Gather,
            Self::Build { .. } => WorkerCommandType::Build,
        }
    }

    /// Target building, if any.
    #[must_use]
    pub const fn target(self) -> Option<(u8, u8)> {
        match self {
            Self::Idle => None,
            Self::Gather { player, building } | Self::Build { player, building } => {
                Some((player, building))
            }
        }
    }

    /// True for Gather and Build.
    #[must_use]
    pub const fn is_busy(self) -> bool {
        self.kind().is_busy()
    }
}

/// A decoded fighter command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FighterCommand {
    /// Move to and stay on `(x, y)`.
    HoldPosition {
        /// Target column.
        x: u16,
        /// Target row.
        y: u16,
    },
    /// Attack building `(player, building)`.
    AttackBuilding {
        /// Target owner.
        player: u8,
        /// Target building id.
        building: u8,
    },
}

impl Default for FighterCommand {
    fn default() -> Self {
        Self::HoldPosition { x: 0, y: 0 }
    }
}

impl FighterCommand {
    /// Hold the tile at `position`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub const fn hold(position: Point) -> Self {
        Self::HoldPosition {
            x: position.x as u16,
            y: position.y as u16,
        }
    }

    /// Decode a raw word. The building form keeps only the low byte of
    /// alpha and beta.
    pub fn decode(word: u64) -> Result<Self> {
        let kind = FighterCommandType::try_from(byte(word, 32))
            .map_err(|_| GameError::CommandNotAssignable(word))?;
        let alpha = half(word, 16);
        let beta = half(word, 0);
        Ok(match kind {
            FighterCommandType::HoldPosition => Self::HoldPosition { x: alpha, y: beta },
            #[allow(clippy::cast_possible_truncation)]
            FighterCommandType::AttackBuilding => Self::AttackBuilding {
                player: alpha as u8,
                building: beta as u8,
            },
        })
    }

    /// Encode to the canonical raw word.
    #[must_use]
    pub const fn encode(self) -> u64 {
        let (kind, alpha, beta) = match self {
            Self::HoldPosition { x, y } => (FighterCommandType::HoldPosition, x, y),
            Self::AttackBuilding { player, building } => (
                FighterCommandType::AttackBuilding,
                player as u16,
                building as u16,
            ),
        };
        (kind as u64) << 32 | (alpha as u64) << 16 | beta as u64
    }

    /// The discriminant.
    #[must_use]
    pub const fn kind(self) -> FighterCommandType {
        match self {
            Self::HoldPosition { .. } => FighterCommandType::HoldPosition,
            Self::AttackBuilding { .. } => FighterCommandType::AttackBuilding,
        }
    }
}

/// Up to four waypoints a fighter visits before its command target.
///
/// Meta byte: low nibble is the path length, high nibble the index of the
/// next waypoint. Waypoint `i` lives at bits `16i` (x) and `16i + 8` (y).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct CommandPath {
    path: u64,
    meta: u8,
}

impl CommandPath {
    /// Maximum number of waypoints.
    pub const MAX_LEN: u8 = 4;

    /// No waypoints.
    pub const EMPTY: Self = Self { path: 0, meta: 0 };

    /// Wrap raw fields without validation.
    #[must_use]
    pub const fn from_raw(path: u64, meta: u8) -> Self {
        Self { path, meta }
    }

    /// Pack waypoints, keeping at most the first four. Coordinates keep
    /// their low byte.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn from_points(points: &[Point]) -> Self {
        let points = &points[..points.len().min(usize::from(Self::MAX_LEN))];
        let mut path = 0u64;
        for (i, p) in points.iter().enumerate() {
            let shift = i * 16;
            path |= u64::from(p.x as u8) << shift;
            path |= u64::from(p.y as u8) << (shift + 8);
        }
        Self {
            path,
            meta: points.len() as u8 & 0x0F,
        }
    }

    /// Reject lengths above four and pointers past the end.
    pub fn validate(&self) -> Result<()> {
        if self.len() > Self::MAX_LEN {
            return Err(GameError::InvalidCommandPath("more than four waypoints"));
        }
        if self.pointer() > self.len() {
            return Err(GameError::InvalidCommandPath("pointer past end of path"));
        }
        Ok(())
    }

    /// Raw packed waypoints.
    #[must_use]
    pub const fn raw(&self) -> u64 {
        self.path
    }

    /// Raw meta byte.
    #[must_use]
    pub const fn meta(&self) -> u8 {
        self.meta
    }

    /// Number of waypoints.
    #[must_use]
    pub const fn len(&self) -> u8 {
        self.meta & 0x0F
    }

    /// True if there are no waypoints.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Index of the next waypoint.
    #[must_use]
    pub const fn pointer(&self) -> u8 {
        self.meta >> 4
    }

    /// True once every waypoint has been reached.
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.pointer() >= self.len()
    }

    /// Move to the next waypoint. Never passes the end.
    pub fn advance(&mut self) {
        let pointer = self.pointer();
        if pointer < self.len() {
            self.meta = (self.meta & 0x0F) | ((pointer + 1) << 4);
        }
    }

    /// Waypoint `i`, if inside the path.
    #[must_use]
    pub fn point(&self, i: u8) -> Option<Point> {
        if i >= self.len() {
            return None;
        }
        let shift = u32::from(i) * 16;
        Some(Point::new(
            i32::from(byte(self.path, shift)),
            i32::from(byte(self.path, shift + 8)),
        ))
    }

    /// The next waypoint, if any remain.
    #[must_use]
    pub fn current(&self) -> Option<Point> {
        self.point(self.pointer())
    }

    /// All waypoints.
    #[must_use]
    pub fn points(&self) -> Vec<Point> {
        (0..self.len()).filter_map(|i| self.point(i)).collect()
    }
}
