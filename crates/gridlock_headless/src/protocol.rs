//! JSON protocol for headless game communication.
//!
//! The runner speaks JSON lines, one object per line:
//!
//! **Input (stdin):** commands from a controller or script
//! **Output (stdout):** responses and state
//!
//! # Example Session
//!
//! ```text
//! <- {"type":"ready","version":"1.0","tick":0}
//! -> {"cmd":"create_unit","player":1,"unit_type":"tank"}
//! <- {"type":"created","kind":"unit","player":1,"id":5}
//! -> {"cmd":"assign_fighter","player":1,"unit":5,"command":{"HoldPosition":{"x":9,"y":4}}}
//! <- {"type":"ack","cmd":"assign_fighter"}
//! -> {"cmd":"tick","count":10}
//! <- {"type":"ticked","tick":10,"events":[{"event":"spawned","unit":{...}}]}
//! -> {"cmd":"hash"}
//! <- {"type":"state_hash","tick":10,"hash":1234567890}
//! ```

use serde::{Deserialize, Serialize};

use gridlock_core::prelude::*;

/// Protocol version announced in [`Response::Ready`].
pub const PROTOCOL_VERSION: &str = "1.0";

// ============================================================================
// Input Commands (controller -> runner)
// ============================================================================

/// Commands accepted by the runner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum Command {
    /// Advance the simulation by `count` ticks (default 1).
    Tick {
        /// Number of ticks.
        #[serde(default = "default_tick_count")]
        count: u32,
    },
    /// Queue a unit by prototype name.
    CreateUnit {
        /// Owner.
        player: u8,
        /// Unit kind from the prototype tables.
        unit_type: String,
    },
    /// Place a building by prototype name.
    PlaceBuilding {
        /// Owner, 0 for the environment.
        player: u8,
        /// Building kind from the prototype tables.
        building_type: String,
        /// Footprint origin x.
        x: u16,
        /// Footprint origin y.
        y: u16,
    },
    /// Give a worker a new task.
    AssignWorker {
        /// Owner.
        player: u8,
        /// Worker id.
        unit: u8,
        /// The task.
        command: WorkerCommand,
    },
    /// Give a fighter a new order.
    AssignFighter {
        /// Owner.
        player: u8,
        /// Fighter id.
        unit: u8,
        /// The order.
        command: FighterCommand,
        /// Up to four waypoints visited first.
        #[serde(default)]
        waypoints: Vec<(u16, u16)>,
    },
    /// Full state without advancing time.
    State,
    /// State hash (for determinism checks).
    Hash,
    /// ASCII rendering of the board.
    Render,
    /// Stop serving.
    Quit,
}

fn default_tick_count() -> u32 {
    1
}

impl Command {
    /// Parse a command from a JSON line.
    pub fn from_json(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line)
    }

    /// The `cmd` tag, for acks and errors.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Tick { .. } => "tick",
            Self::CreateUnit { .. } => "create_unit",
            Self::PlaceBuilding { .. } => "place_building",
            Self::AssignWorker { .. } => "assign_worker",
            Self::AssignFighter { .. } => "assign_fighter",
            Self::State => "state",
            Self::Hash => "hash",
            Self::Render => "render",
            Self::Quit => "quit",
        }
    }
}

// ============================================================================
// Output Responses (runner -> controller)
// ============================================================================

/// Responses written by the runner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// The runner accepts commands.
    Ready {
        /// Protocol version.
        version: String,
        /// Current clock.
        tick: u32,
    },
    /// A command succeeded and has nothing else to report.
    Ack {
        /// The acknowledged command.
        cmd: String,
    },
    /// A unit or building was allocated.
    Created {
        /// `"unit"` or `"building"`.
        kind: String,
        /// Owner.
        player: u8,
        /// New id.
        id: u8,
    },
    /// A command failed; nothing changed.
    Error {
        /// What went wrong.
        message: String,
        /// The failed command, if it parsed.
        cmd: Option<String>,
    },
    /// Events of one tick.
    Ticked {
        /// Clock after the tick.
        tick: u32,
        /// Events in emission order.
        events: Vec<GameEvent>,
    },
    /// Full game state.
    State(GameState),
    /// State hash.
    StateHash {
        /// Current clock.
        tick: u32,
        /// Hash of the clock and every row.
        hash: u64,
    },
    /// ASCII board.
    Board {
        /// Rendered rows separated by newlines.
        text: String,
    },
    /// The runner is stopping.
    Bye {
        /// Final clock.
        tick: u32,
    },
}

impl Response {
    /// A ready announcement at `tick`.
    #[must_use]
    pub fn ready(tick: u32) -> Self {
        Self::Ready {
            version: PROTOCOL_VERSION.to_string(),
            tick,
        }
    }

    /// An acknowledgement of `cmd`.
    #[must_use]
    pub fn ack(cmd: &str) -> Self {
        Self::Ack {
            cmd: cmd.to_string(),
        }
    }

    /// An error, optionally tied to a command.
    #[must_use]
    pub fn error(message: impl Into<String>, cmd: Option<&str>) -> Self {
        Self::Error {
            message: message.into(),
            cmd: cmd.map(String::from),
        }
    }

    /// Serialize as one JSON line without the trailing newline.
    pub fn to_json_line(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

// ============================================================================
// State views
// ============================================================================

/// Whether the game is still being decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum GameStatus {
    /// More than one player still has a main building.
    Running,
    /// Only `winner` still has a main building.
    Won {
        /// The surviving player.
        winner: u8,
    },
    /// Every main building is gone.
    Draw,
}

/// Snapshot of everything a controller can observe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameState {
    /// Current clock.
    pub tick: u32,
    /// State hash.
    pub hash: u64,
    /// Board width.
    pub width: u16,
    /// Board height.
    pub height: u16,
    /// Outcome so far.
    pub status: GameStatus,
    /// Players in id order.
    pub players: Vec<PlayerView>,
    /// Environment buildings.
    pub environment: Vec<BuildingView>,
}

/// One player's economy and objects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerView {
    /// Player id.
    pub id: u8,
    /// Stored resource.
    pub resource: u16,
    /// Resource capacity.
    pub max_resource: u16,
    /// Compute provided by built buildings.
    pub compute_supply: u8,
    /// Compute used by paid units.
    pub compute_demand: u8,
    /// Built armories.
    pub armories: u8,
    /// Every unit that is not dead.
    pub units: Vec<UnitView>,
    /// Every building that is not destroyed.
    pub buildings: Vec<BuildingView>,
}

/// A unit as seen by a controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitView {
    /// Unit id.
    pub id: u8,
    /// Prototype id.
    pub unit_type: u8,
    /// Lifecycle state.
    pub state: UnitState,
    /// Movement layer.
    pub layer: Layer,
    /// Column.
    pub x: u16,
    /// Row.
    pub y: u16,
    /// Remaining integrity.
    pub integrity: u8,
    /// Carried resource.
    pub load: u8,
}

/// A building as seen by a controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildingView {
    /// Building id.
    pub id: u8,
    /// Prototype id.
    pub building_type: u8,
    /// Lifecycle state.
    pub state: BuildingState,
    /// Footprint origin x.
    pub x: u16,
    /// Footprint origin y.
    pub y: u16,
    /// Remaining integrity.
    pub integrity: u8,
}

impl GameState {
    /// Read the whole observable state of `core`.
    pub fn capture(core: &Core) -> Result<Self> {
        let meta = core.meta()?;
        let mut players = Vec::with_capacity(usize::from(meta.player_count));
        for id in 1..=meta.player_count {
            let row = core.player(id)?;
            players.push(PlayerView {
                id,
                resource: row.cur_resource,
                max_resource: row.max_resource,
                compute_supply: row.compute_supply,
                compute_demand: row.compute_demand,
                armories: row.cur_armories,
                units: unit_views(core, id, row.unit_count)?,
                buildings: building_views(core, id, row.building_count)?,
            });
        }
        let environment = building_views(core, 0, core.player(0)?.building_count)?;

        Ok(Self {
            tick: core.current_tick(),
            hash: core.state_hash(),
            width: meta.board_width,
            height: meta.board_height,
            status: status(core, meta.player_count)?,
            players,
            environment,
        })
    }

    /// A player's view, if the id exists.
    #[must_use]
    pub fn player(&self, id: u8) -> Option<&PlayerView> {
        self.players.iter().find(|p| p.id == id)
    }
}

fn unit_views(core: &Core, player: u8, count: u8) -> Result<Vec<UnitView>> {
    let mut views = Vec::new();
    for id in 1..=count {
        let row = core.unit(player, id)?;
        if row.state == UnitState::Dead {
            continue;
        }
        views.push(UnitView {
            id,
            unit_type: row.unit_type,
            state: row.state,
            layer: core.unit_layer(player, id)?,
            x: row.x,
            y: row.y,
            integrity: row.integrity,
            load: row.load,
        });
    }
    Ok(views)
}

fn building_views(core: &Core, player: u8, count: u8) -> Result<Vec<BuildingView>> {
    let mut views = Vec::new();
    for id in 1..=count {
        let row = core.building(player, id)?;
        if row.state == BuildingState::Destroyed {
            continue;
        }
        views.push(BuildingView {
            id,
            building_type: row.building_type,
            state: row.state,
            x: row.x,
            y: row.y,
            integrity: row.integrity,
        });
    }
    Ok(views)
}

/// A player is out once their main building is destroyed.
fn status(core: &Core, player_count: u8) -> Result<GameStatus> {
    let mut standing = Vec::new();
    for player in 1..=player_count {
        let has_main = core.player(player)?.building_count > 0;
        if !has_main || core.building_state(player, 1)? != BuildingState::Destroyed {
            standing.push(player);
        }
    }
    Ok(match standing.as_slice() {
        [] if player_count > 0 => GameStatus::Draw,
        [winner] if player_count > 1 => GameStatus::Won { winner: *winner },
        _ => GameStatus::Running,
    })
}
