//! Scenario loading and configuration.
//!
//! Scenarios describe a whole game in RON: the board, the prototype tables,
//! each player's spawn layout and genesis placements, environment
//! buildings, and a script of orders applied at given ticks.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use gridlock_core::prelude::*;

/// Prototype tables shipped with the game.
pub const STANDARD_DATA: &str = include_str!("../../../assets/data/prototypes.ron");

/// Error type for scenario operations.
#[derive(Error, Debug)]
pub enum ScenarioError {
    /// File not found.
    #[error("Scenario file not found: {0}")]
    FileNotFound(String),
    /// Failed to read file.
    #[error("Failed to read scenario file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse RON.
    #[error("Failed to parse scenario: {0}")]
    ParseError(#[from] ron::error::SpannedError),
    /// The engine rejected a genesis step or a replay operation failed.
    #[error("Game error: {0}")]
    Game(#[from] GameError),
    /// A unit kind missing from the prototype tables.
    #[error("Unknown unit kind: {0}")]
    UnknownUnit(String),
    /// A building kind missing from the prototype tables.
    #[error("Unknown building kind: {0}")]
    UnknownBuilding(String),
    /// An order that cannot be expressed as an engine action.
    #[error("Invalid order at tick {tick}: {reason}")]
    InvalidOrder {
        /// Scheduled tick of the order.
        tick: u32,
        /// What is wrong with it.
        reason: String,
    },
}

/// Where the prototype tables come from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataSource {
    /// [`STANDARD_DATA`].
    #[default]
    Standard,
    /// A RON file, relative to the working directory.
    File(PathBuf),
    /// Tables written into the scenario itself.
    Inline(GameData),
}

impl DataSource {
    /// Parse the tables.
    pub fn load(&self) -> Result<GameData, ScenarioError> {
        Ok(match self {
            Self::Standard => GameData::from_ron_str(STANDARD_DATA, "standard prototypes")?,
            Self::File(path) => GameData::load(path)?,
            Self::Inline(data) => {
                let errors = data.validate();
                if !errors.is_empty() {
                    return Err(GameError::DataParseError {
                        path: "inline data".to_string(),
                        message: errors.join("; "),
                    }
                    .into());
                }
                data.clone()
            }
        })
    }
}

/// A complete scenario configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name, also used as the replay id.
    pub name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Board dimensions (width, height) in tiles.
    pub board: (u16, u16),
    /// Prototype tables.
    #[serde(default)]
    pub data: DataSource,
    /// Players in id order.
    pub players: Vec<PlayerSpec>,
    /// Environment buildings, owned by player 0.
    #[serde(default)]
    pub environment: Vec<BuildingPlacement>,
    /// Orders applied after the game starts.
    #[serde(default)]
    pub script: Vec<ScheduledOrder>,
    /// Default number of ticks to run.
    #[serde(default = "default_ticks")]
    pub ticks: u32,
}

fn default_ticks() -> u32 {
    200
}

impl Scenario {
    /// Load a scenario from a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ScenarioError::FileNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        let scenario: Scenario = ron::from_str(&contents)?;
        info!(name = %scenario.name, path = %path.display(), "Scenario loaded");
        Ok(scenario)
    }

    /// Load from a RON string (useful for embedded scenarios).
    pub fn from_ron_str(ron: &str) -> Result<Self, ScenarioError> {
        let scenario: Scenario = ron::from_str(ron)?;
        Ok(scenario)
    }

    /// The standard 32x32 two-player skirmish.
    ///
    /// Each side starts with two drones, a tank and a jet next to its core
    /// and a crystal field nearby; the script sets the drones gathering and
    /// sends the fighters at the enemy core.
    #[must_use]
    pub fn skirmish() -> Self {
        let mut script = Vec::new();
        for (player, crystal) in [(1, 1), (2, 2)] {
            for unit in [1, 2] {
                script.push(ScheduledOrder {
                    tick: 0,
                    order: Order::Gather {
                        player,
                        unit,
                        building: crystal,
                    },
                });
            }
            for unit in [3, 4] {
                script.push(ScheduledOrder {
                    tick: 5,
                    order: Order::Attack {
                        player,
                        unit,
                        target: (3 - player, 1),
                        waypoints: Vec::new(),
                    },
                });
            }
            script.push(ScheduledOrder {
                tick: 10,
                order: Order::CreateUnit {
                    player,
                    kind: "flak".to_string(),
                },
            });
        }

        Self {
            name: "skirmish".to_string(),
            description: "Standard 1v1 on the 32x32 map".to_string(),
            board: (32, 32),
            data: DataSource::Standard,
            players: vec![
                PlayerSpec::new((1, 1), (2, 6), BuildingPlacement::new("core", 6, 1)),
                PlayerSpec::new((27, 27), (29, 25), BuildingPlacement::new("core", 23, 28)),
            ],
            environment: vec![
                BuildingPlacement::new("crystal", 2, 10),
                BuildingPlacement::new("crystal", 29, 21),
            ],
            script,
            ticks: default_ticks(),
        }
    }

    /// Build the genesis state: board, prototypes, players, placements and
    /// starting units, then start the game. Returns the started core and
    /// the type ids of the prototype tables.
    pub fn genesis(&self) -> Result<(Core, TypeIds), ScenarioError> {
        let mut core = Core::in_memory();
        core.initialize(self.board.0, self.board.1)?;
        let ids = self.data.load()?.register(&mut core)?;

        for spec in &self.players {
            core.add_player(spec.setup())?;
        }
        for (index, spec) in self.players.iter().enumerate() {
            let player = u8::try_from(index + 1).map_err(|_| GameError::PlayerLimitReached)?;
            for placement in std::iter::once(&spec.main_building).chain(&spec.buildings) {
                let building_type = building_id(&ids, &placement.kind)?;
                let (x, y) = placement.position;
                core.place_building(player, building_type, x, y)?;
            }
        }
        for placement in &self.environment {
            let building_type = building_id(&ids, &placement.kind)?;
            let (x, y) = placement.position;
            core.place_building(0, building_type, x, y)?;
        }
        for (index, spec) in self.players.iter().enumerate() {
            let player = u8::try_from(index + 1).map_err(|_| GameError::PlayerLimitReached)?;
            for placement in &spec.units {
                let unit_type = unit_id(&ids, &placement.kind)?;
                for _ in 0..placement.count {
                    core.create_unit(player, unit_type)?;
                }
            }
        }

        core.start()?;
        let events = core.take_events();
        debug!(name = %self.name, events = events.len(), "Genesis complete");
        Ok((core, ids))
    }

    /// Translate the script into engine actions, ordered by tick.
    pub fn compile(&self, ids: &TypeIds) -> Result<Vec<(u32, Action)>, ScenarioError> {
        let mut actions = self
            .script
            .iter()
            .map(|scheduled| Ok((scheduled.tick, scheduled.order.to_action(scheduled.tick, ids)?)))
            .collect::<Result<Vec<_>, ScenarioError>>()?;
        actions.sort_by_key(|(tick, _)| *tick);
        Ok(actions)
    }
}

fn unit_id(ids: &TypeIds, kind: &str) -> Result<u8, ScenarioError> {
    ids.unit(kind)
        .ok_or_else(|| ScenarioError::UnknownUnit(kind.to_string()))
}

fn building_id(ids: &TypeIds, kind: &str) -> Result<u8, ScenarioError> {
    ids.building(kind)
        .ok_or_else(|| ScenarioError::UnknownBuilding(kind.to_string()))
}

/// Setup for a single player.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerSpec {
    /// Spawn area origin.
    pub spawn: (u16, u16),
    /// Spawn area size.
    #[serde(default = "default_spawn_size")]
    pub spawn_size: (u8, u8),
    /// Worker port tile.
    pub port: (u16, u16),
    /// The player's first building.
    pub main_building: BuildingPlacement,
    /// Further buildings, complete at start.
    #[serde(default)]
    pub buildings: Vec<BuildingPlacement>,
    /// Units spawned at start.
    #[serde(default)]
    pub units: Vec<UnitPlacement>,
}

fn default_spawn_size() -> (u8, u8) {
    (4, 4)
}

impl PlayerSpec {
    /// A player with the default 4x4 spawn area, two drones, a tank and a
    /// jet.
    #[must_use]
    pub fn new(spawn: (u16, u16), port: (u16, u16), main_building: BuildingPlacement) -> Self {
        Self {
            spawn,
            spawn_size: default_spawn_size(),
            port,
            main_building,
            buildings: Vec::new(),
            units: vec![
                UnitPlacement::new("drone", 2),
                UnitPlacement::new("tank", 1),
                UnitPlacement::new("jet", 1),
            ],
        }
    }

    /// Engine-level spawn layout.
    #[must_use]
    pub const fn setup(&self) -> PlayerSetup {
        PlayerSetup {
            spawn_x: self.spawn.0,
            spawn_y: self.spawn.1,
            spawn_width: self.spawn_size.0,
            spawn_height: self.spawn_size.1,
            port_x: self.port.0,
            port_y: self.port.1,
        }
    }
}

/// Units of one kind spawned at start.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitPlacement {
    /// Unit kind.
    pub kind: String,
    /// How many.
    pub count: u8,
}

impl UnitPlacement {
    /// Create a new unit placement.
    #[must_use]
    pub fn new(kind: impl Into<String>, count: u8) -> Self {
        Self {
            kind: kind.into(),
            count,
        }
    }
}

/// Placement of a building at scenario start.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildingPlacement {
    /// Building kind.
    pub kind: String,
    /// Footprint origin (x, y).
    pub position: (u16, u16),
}

impl BuildingPlacement {
    /// Create a new building placement.
    #[must_use]
    pub fn new(kind: impl Into<String>, x: u16, y: u16) -> Self {
        Self {
            kind: kind.into(),
            position: (x, y),
        }
    }
}

/// An order applied before the given tick runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledOrder {
    /// Clock value at which to apply the order.
    pub tick: u32,
    /// The order.
    pub order: Order,
}

/// A player order in scenario terms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Order {
    /// Queue a unit.
    CreateUnit {
        /// Owner.
        player: u8,
        /// Unit kind.
        kind: String,
    },
    /// Place a building to be paid for and built.
    PlaceBuilding {
        /// Owner.
        player: u8,
        /// Building kind.
        kind: String,
        /// Footprint origin.
        position: (u16, u16),
    },
    /// Send a worker to harvest an environment building.
    Gather {
        /// Owner.
        player: u8,
        /// Worker id.
        unit: u8,
        /// Environment building id.
        building: u8,
    },
    /// Send a worker to construct one of its player's buildings.
    Build {
        /// Owner.
        player: u8,
        /// Worker id.
        unit: u8,
        /// Building id.
        building: u8,
    },
    /// Send a worker back to its port.
    Idle {
        /// Owner.
        player: u8,
        /// Worker id.
        unit: u8,
    },
    /// Move a fighter onto a tile.
    Hold {
        /// Owner.
        player: u8,
        /// Fighter id.
        unit: u8,
        /// Target tile.
        position: (u16, u16),
        /// Up to four waypoints visited first.
        #[serde(default)]
        waypoints: Vec<(u16, u16)>,
    },
    /// Send a fighter at an enemy building.
    Attack {
        /// Owner.
        player: u8,
        /// Fighter id.
        unit: u8,
        /// Target (player, building).
        target: (u8, u8),
        /// Up to four waypoints visited first.
        #[serde(default)]
        waypoints: Vec<(u16, u16)>,
    },
}

impl Order {
    /// The engine action for this order. `tick` is only used in errors.
    pub fn to_action(&self, tick: u32, ids: &TypeIds) -> Result<Action, ScenarioError> {
        let worker = worker_action;
        let fighter = |player, unit, command, waypoints: &[(u16, u16)]| {
            fighter_action(player, unit, command, waypoints).ok_or_else(|| {
                ScenarioError::InvalidOrder {
                    tick,
                    reason: format!("{} waypoints, at most 4 allowed", waypoints.len()),
                }
            })
        };

        match self {
            Self::CreateUnit { player, kind } => Ok(Action::CreateUnit {
                player: *player,
                unit_type: unit_id(ids, kind)?,
            }),
            Self::PlaceBuilding {
                player,
                kind,
                position: (x, y),
            } => Ok(Action::PlaceBuilding {
                player: *player,
                building_type: building_id(ids, kind)?,
                x: *x,
                y: *y,
            }),
            Self::Gather {
                player,
                unit,
                building,
            } => Ok(worker(
                *player,
                *unit,
                WorkerCommand::Gather {
                    player: 0,
                    building: *building,
                },
            )),
            Self::Build {
                player,
                unit,
                building,
            } => Ok(worker(
                *player,
                *unit,
                WorkerCommand::Build {
                    player: *player,
                    building: *building,
                },
            )),
            Self::Idle { player, unit } => Ok(worker(*player, *unit, WorkerCommand::Idle)),
            Self::Hold {
                player,
                unit,
                position: (x, y),
                waypoints,
            } => fighter(
                *player,
                *unit,
                FighterCommand::HoldPosition { x: *x, y: *y },
                waypoints,
            ),
            Self::Attack {
                player,
                unit,
                target: (target_player, building),
                waypoints,
            } => fighter(
                *player,
                *unit,
                FighterCommand::AttackBuilding {
                    player: *target_player,
                    building: *building,
                },
                waypoints,
            ),
        }
    }
}

/// An `AssignUnit` action for a worker.
#[must_use]
pub const fn worker_action(player: u8, unit: u8, command: WorkerCommand) -> Action {
    Action::AssignUnit {
        player,
        unit,
        command: command.encode(),
        command_extra: 0,
        command_meta: 0,
    }
}

/// An `AssignUnit` action for a fighter with up to four waypoints. `None`
/// if there are more.
#[must_use]
pub fn fighter_action(
    player: u8,
    unit: u8,
    command: FighterCommand,
    waypoints: &[(u16, u16)],
) -> Option<Action> {
    if waypoints.len() > usize::from(CommandPath::MAX_LEN) {
        return None;
    }
    let points: Vec<Point> = waypoints
        .iter()
        .map(|&(x, y)| Point::from_u16(x, y))
        .collect();
    let path = CommandPath::from_points(&points);
    Some(Action::AssignUnit {
        player,
        unit,
        command: command.encode(),
        command_extra: path.raw(),
        command_meta: path.meta(),
    })
}
