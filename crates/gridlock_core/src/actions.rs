//! Player and administrative actions.
//!
//! Every action validates completely before it writes, so a rejected
//! action leaves the store untouched. Actions issued before [`Core::start`]
//! form the genesis phase: units spawn and buildings complete instantly.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::buildings::BuildingState;
use crate::command::{CommandPath, FighterCommand, WorkerCommand};
use crate::error::{GameError, Result};
use crate::geometry::{Area, Point};
use crate::simulation::Core;
use crate::storage::Datastore;
use crate::tables::{BuildingPrototype, MetaRow, PlayerRow, UnitPrototype};
use crate::units::UnitState;

/// Spawn area and worker port of a new player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct PlayerSetup {
    /// Spawn area origin x.
    pub spawn_x: u16,
    /// Spawn area origin y.
    pub spawn_y: u16,
    /// Spawn area width.
    pub spawn_width: u8,
    /// Spawn area height.
    pub spawn_height: u8,
    /// Worker port x.
    pub port_x: u16,
    /// Worker port y.
    pub port_y: u16,
}

impl PlayerSetup {
    /// The spawn area.
    #[must_use]
    pub const fn spawn_area(&self) -> Area {
        Area::new(
            Point::from_u16(self.spawn_x, self.spawn_y),
            self.spawn_width as i32,
            self.spawn_height as i32,
        )
    }

    /// The worker port tile.
    #[must_use]
    pub const fn worker_port(&self) -> Point {
        Point::from_u16(self.port_x, self.port_y)
    }
}

/// Any state-changing request except the tick itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    /// Create the board.
    Initialize {
        /// Board width.
        width: u16,
        /// Board height.
        height: u16,
    },
    /// Register a player.
    AddPlayer(PlayerSetup),
    /// End the genesis phase.
    Start,
    /// Register a unit type.
    AddUnitPrototype(UnitPrototype),
    /// Register a building type.
    AddBuildingPrototype(BuildingPrototype),
    /// Queue a unit.
    CreateUnit {
        /// Owner.
        player: u8,
        /// Unit prototype id.
        unit_type: u8,
    },
    /// Place a building; player 0 places environment buildings.
    PlaceBuilding {
        /// Owner.
        player: u8,
        /// Building prototype id.
        building_type: u8,
        /// Footprint origin x.
        x: u16,
        /// Footprint origin y.
        y: u16,
    },
    /// Give a unit a raw command word and optional waypoint path.
    AssignUnit {
        /// Owner.
        player: u8,
        /// Unit id.
        unit: u8,
        /// Packed command.
        command: u64,
        /// Packed waypoints.
        command_extra: u64,
        /// Waypoint length and pointer.
        command_meta: u8,
    },
}

impl Action {
    /// Short name for logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Initialize { .. } => "initialize",
            Self::AddPlayer(_) => "add_player",
            Self::Start => "start",
            Self::AddUnitPrototype(_) => "add_unit_prototype",
            Self::AddBuildingPrototype(_) => "add_building_prototype",
            Self::CreateUnit { .. } => "create_unit",
            Self::PlaceBuilding { .. } => "place_building",
            Self::AssignUnit { .. } => "assign_unit",
        }
    }
}

impl<S: Datastore> Core<S> {
    /// Apply an [`Action`]. Returns the id allocated by the action, if any.
    pub fn apply(&mut self, action: &Action) -> Result<Option<u8>> {
        debug!(tick = self.current_tick(), action = action.name(), "Applying action");
        match *action {
            Action::Initialize { width, height } => self.initialize(width, height).map(|()| None),
            Action::AddPlayer(setup) => self.add_player(setup).map(Some),
            Action::Start => self.start().map(|()| None),
            Action::AddUnitPrototype(proto) => self.add_unit_prototype(proto).map(Some),
            Action::AddBuildingPrototype(proto) => self.add_building_prototype(proto).map(Some),
            Action::CreateUnit { player, unit_type } => self.create_unit(player, unit_type).map(Some),
            Action::PlaceBuilding {
                player,
                building_type,
                x,
                y,
            } => self.place_building(player, building_type, x, y).map(Some),
            Action::AssignUnit {
                player,
                unit,
                command,
                command_extra,
                command_meta,
            } => self
                .assign_unit(player, unit, command, command_extra, command_meta)
                .map(|()| None),
        }
    }

    /// Create a `width` x `height` board.
    pub fn initialize(&mut self, width: u16, height: u16) -> Result<()> {
        let mut meta = self.meta()?;
        if meta.is_initialized {
            return Err(GameError::AlreadyInitialized);
        }
        if width == 0 || height == 0 {
            return Err(GameError::InvalidBoardSize { width, height });
        }
        meta = MetaRow {
            board_width: width,
            board_height: height,
            is_initialized: true,
            creation_tick: self.current_tick(),
            ..meta
        };
        self.set_meta(&meta)?;
        info!(width, height, "Game initialized");
        Ok(())
    }

    /// Register a player. Only allowed before the game starts. Returns the
    /// new player id.
    pub fn add_player(&mut self, setup: PlayerSetup) -> Result<u8> {
        let mut meta = self.require_initialized()?;
        if meta.has_started {
            return Err(GameError::AlreadyStarted);
        }
        let player = meta
            .player_count
            .checked_add(1)
            .ok_or(GameError::PlayerLimitReached)?;
        let board = meta.board_area();
        if setup.spawn_area().is_empty() || !setup.spawn_area().within(&board) {
            return Err(GameError::AreaOutOfBounds {
                x: setup.spawn_x,
                y: setup.spawn_y,
            });
        }
        if !board.contains(setup.worker_port()) {
            return Err(GameError::AreaOutOfBounds {
                x: setup.port_x,
                y: setup.port_y,
            });
        }

        meta.player_count = player;
        self.set_meta(&meta)?;
        let row = PlayerRow {
            spawn_area_x: setup.spawn_x,
            spawn_area_y: setup.spawn_y,
            spawn_area_width: setup.spawn_width,
            spawn_area_height: setup.spawn_height,
            worker_port_x: setup.port_x,
            worker_port_y: setup.port_y,
            building_pay_pointer: 1,
            building_build_pointer: 1,
            unit_pay_pointer: 1,
            ..PlayerRow::default()
        };
        self.set_player(player, &row)?;
        info!(player, "Player added");
        Ok(player)
    }

    /// End the genesis phase. Ticks are rejected until this is called.
    pub fn start(&mut self) -> Result<()> {
        let mut meta = self.require_initialized()?;
        if meta.has_started {
            return Err(GameError::AlreadyStarted);
        }
        meta.has_started = true;
        self.set_meta(&meta)?;
        info!(tick = self.current_tick(), players = meta.player_count, "Game started");
        Ok(())
    }

    /// Register a unit type. Returns its id.
    pub fn add_unit_prototype(&mut self, proto: UnitPrototype) -> Result<u8> {
        let mut meta = self.require_initialized()?;
        let unit_type = meta
            .unit_prototype_count
            .checked_add(1)
            .ok_or(GameError::UnitPrototypeLimitReached)?;
        if proto.max_integrity == 0 {
            return Err(GameError::InvalidPrototype("unit max integrity is zero"));
        }
        meta.unit_prototype_count = unit_type;
        self.set_meta(&meta)?;
        self.set_unit_prototype(unit_type, &proto)?;
        debug!(unit_type, layer = %proto.layer, "Unit prototype added");
        Ok(unit_type)
    }

    /// Register a building type. Returns its id.
    pub fn add_building_prototype(&mut self, proto: BuildingPrototype) -> Result<u8> {
        let mut meta = self.require_initialized()?;
        let building_type = meta
            .building_prototype_count
            .checked_add(1)
            .ok_or(GameError::BuildingPrototypeLimitReached)?;
        if proto.width == 0 || proto.height == 0 {
            return Err(GameError::InvalidPrototype("building footprint is empty"));
        }
        meta.building_prototype_count = building_type;
        self.set_meta(&meta)?;
        self.set_building_prototype(building_type, &proto)?;
        debug!(building_type, "Building prototype added");
        Ok(building_type)
    }

    /// Queue a unit on the player's spawn point. Before the game starts the
    /// unit is spawned at once without payment. Returns the unit id.
    pub fn create_unit(&mut self, player: u8, unit_type: u8) -> Result<u8> {
        let meta = self.require_initialized()?;
        require_player(&meta, player)?;
        if unit_type == 0 || unit_type > meta.unit_prototype_count {
            return Err(GameError::InvalidUnitType(unit_type));
        }
        self.require_main_building(player)?;

        let unit = self.create_unit_row(player, unit_type)?;
        if !meta.has_started {
            self.set_unit_spawning(player, unit)?;
            self.set_unit_spawned(player, unit)?;
        }
        Ok(unit)
    }

    /// Place a building with its origin at `(x, y)`. Environment buildings
    /// belong to player 0 and are complete at once, as is everything placed
    /// before the game starts. Returns the building id.
    pub fn place_building(&mut self, player: u8, building_type: u8, x: u16, y: u16) -> Result<u8> {
        let meta = self.require_initialized()?;
        if player > meta.player_count {
            return Err(GameError::InvalidPlayerId(player));
        }
        if building_type == 0 || building_type > meta.building_prototype_count {
            return Err(GameError::InvalidBuildingType(building_type));
        }
        let proto = self.building_prototype(building_type)?;
        if proto.is_environment != (player == 0) {
            return Err(GameError::InvalidPlayerId(player));
        }
        if player != 0 && self.player(player)?.building_count > 0 {
            self.require_main_building(player)?;
        }

        let area = proto.footprint(Point::from_u16(x, y));
        if !area.within(&meta.board_area()) {
            return Err(GameError::AreaOutOfBounds { x, y });
        }
        if !self.is_buildable_area(area)? {
            return Err(GameError::AreaNotBuildable { x, y });
        }

        let building = self.place_building_row(player, building_type, area.min)?;
        if !meta.has_started || proto.is_environment {
            self.set_building_building(player, building)?;
            self.set_building_built(player, building)?;
        }
        Ok(building)
    }

    /// Give a unit a raw command. Workers take a worker command and no
    /// path; fighters take a fighter command and an optional waypoint path.
    ///
    /// The unit's tick for the current step runs immediately and its next
    /// preliminary phase is skipped.
    pub fn assign_unit(
        &mut self,
        player: u8,
        unit: u8,
        command: u64,
        command_extra: u64,
        command_meta: u8,
    ) -> Result<()> {
        let meta = self.require_started()?;
        require_player(&meta, player)?;
        let player_row = self.player(player)?;
        if unit == 0 || unit > player_row.unit_count {
            return Err(GameError::InvalidUnitId { player, unit });
        }
        self.require_main_building(player)?;
        let row = self.unit(player, unit)?;
        if row.state == UnitState::Dead {
            return Err(GameError::UnitDead { player, unit });
        }

        let (command, path) = if self.unit_prototype(row.unit_type)?.is_worker {
            let command = WorkerCommand::decode(command)?;
            self.validate_worker_command(player, command)?;
            (command.encode(), CommandPath::EMPTY)
        } else {
            let command = FighterCommand::decode(command)?;
            self.validate_fighter_command(&meta, player, command)?;
            let path = CommandPath::from_raw(command_extra, command_meta);
            path.validate()?;
            (command.encode(), path)
        };

        debug!(player, unit, command, "Unit assigned");
        self.assign_command_external(player, unit, command, path)
    }

    /// Typed form of [`Core::assign_unit`] for workers.
    pub fn assign_worker(&mut self, player: u8, unit: u8, command: WorkerCommand) -> Result<()> {
        self.assign_unit(player, unit, command.encode(), 0, 0)
    }

    /// Typed form of [`Core::assign_unit`] for fighters.
    pub fn assign_fighter(
        &mut self,
        player: u8,
        unit: u8,
        command: FighterCommand,
        path: CommandPath,
    ) -> Result<()> {
        self.assign_unit(player, unit, command.encode(), path.raw(), path.meta())
    }

    fn validate_worker_command(&self, player: u8, command: WorkerCommand) -> Result<()> {
        match command {
            WorkerCommand::Idle => Ok(()),
            WorkerCommand::Gather {
                player: target_player,
                building,
            } => {
                self.require_building(target_player, building)?;
                let target = self.building(target_player, building)?;
                if !self.building_prototype(target.building_type)?.is_environment {
                    return Err(GameError::IllegalCommandTarget(
                        "gather target is not an environment building",
                    ));
                }
                Ok(())
            }
            WorkerCommand::Build {
                player: target_player,
                building,
            } => {
                if target_player != player {
                    return Err(GameError::IllegalCommandTarget(
                        "build target belongs to another player",
                    ));
                }
                self.require_building(target_player, building)?;
                if self.building(target_player, building)?.state != BuildingState::Building {
                    return Err(GameError::IllegalCommandTarget(
                        "build target is not under construction",
                    ));
                }
                Ok(())
            }
        }
    }

    fn validate_fighter_command(&self, meta: &MetaRow, player: u8, command: FighterCommand) -> Result<()> {
        match command {
            FighterCommand::HoldPosition { x, y } => {
                if !meta.board_area().contains(Point::from_u16(x, y)) {
                    return Err(GameError::AreaOutOfBounds { x, y });
                }
                Ok(())
            }
            FighterCommand::AttackBuilding {
                player: target_player,
                building,
            } => {
                if target_player == player {
                    return Err(GameError::IllegalCommandTarget("cannot attack own building"));
                }
                if target_player == 0 {
                    return Err(GameError::IllegalCommandTarget(
                        "cannot attack environment buildings",
                    ));
                }
                require_player(meta, target_player)?;
                self.require_building(target_player, building)?;
                let target = self.building(target_player, building)?;
                if self.building_prototype(target.building_type)?.is_environment {
                    return Err(GameError::IllegalCommandTarget(
                        "cannot attack environment buildings",
                    ));
                }
                match target.state {
                    BuildingState::Destroyed => Err(GameError::IllegalCommandTarget(
                        "target building already destroyed",
                    )),
                    BuildingState::Unpaid => {
                        Err(GameError::IllegalCommandTarget("target building not placed yet"))
                    }
                    _ => Ok(()),
                }
            }
        }
    }

    fn require_initialized(&self) -> Result<MetaRow> {
        let meta = self.meta()?;
        if !meta.is_initialized {
            return Err(GameError::NotInitialized);
        }
        Ok(meta)
    }

    fn require_started(&self) -> Result<MetaRow> {
        let meta = self.require_initialized()?;
        if !meta.has_started {
            return Err(GameError::NotStarted);
        }
        Ok(meta)
    }

    fn require_building(&self, player: u8, building: u8) -> Result<()> {
        if building == 0 || building > self.player(player)?.building_count {
            return Err(GameError::InvalidBuildingId { player, building });
        }
        Ok(())
    }

    /// The player owns building 1 and it still stands.
    fn require_main_building(&self, player: u8) -> Result<()> {
        if self.player(player)?.building_count == 0 {
            return Err(GameError::MissingMainBuilding(player));
        }
        if self.building(player, 1)?.integrity == 0 {
            return Err(GameError::MainBuildingDestroyed(player));
        }
        Ok(())
    }
}

fn require_player(meta: &MetaRow, player: u8) -> Result<()> {
    if player == 0 || player > meta.player_count {
        return Err(GameError::InvalidPlayerId(player));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Layer;
    use crate::events::GameEvent;

    const WORKER: u8 = 1;
    const TANK: u8 = 2;
    const MAIN: u8 = 1;
    const MINE: u8 = 2;

    fn setup() -> Core {
        let mut core = Core::in_memory();
        core.initialize(20, 20).unwrap();
        core.add_unit_prototype(UnitPrototype {
            layer: Layer::Hover,
            resource_cost: 10,
            compute_cost: 1,
            spawn_time: 2,
            max_integrity: 10,
            is_worker: true,
            ..UnitPrototype::default()
        })
        .unwrap();
        core.add_unit_prototype(UnitPrototype {
            layer: Layer::Land,
            resource_cost: 20,
            compute_cost: 1,
            spawn_time: 3,
            max_integrity: 20,
            land_strength: 5,
            hover_strength: 2,
            attack_range: 2,
            attack_cooldown: 2,
            ..UnitPrototype::default()
        })
        .unwrap();
        core.add_building_prototype(BuildingPrototype {
            width: 3,
            height: 3,
            resource_capacity: 100,
            compute_capacity: 5,
            max_integrity: 50,
            building_time: 1,
            ..BuildingPrototype::default()
        })
        .unwrap();
        core.add_building_prototype(BuildingPrototype {
            width: 1,
            height: 1,
            resource_mine: 5,
            mine_time: 3,
            max_integrity: 255,
            is_environment: true,
            ..BuildingPrototype::default()
        })
        .unwrap();
        core.add_player(PlayerSetup {
            spawn_x: 0,
            spawn_y: 0,
            spawn_width: 3,
            spawn_height: 3,
            port_x: 1,
            port_y: 4,
        })
        .unwrap();
        core.add_player(PlayerSetup {
            spawn_x: 17,
            spawn_y: 17,
            spawn_width: 3,
            spawn_height: 3,
            port_x: 18,
            port_y: 15,
        })
        .unwrap();
        core.place_building(1, MAIN, 4, 0).unwrap();
        core.place_building(2, MAIN, 13, 17).unwrap();
        core
    }

    #[test]
    fn test_initialize_twice_fails() {
        let mut core = Core::in_memory();
        core.initialize(10, 10).unwrap();
        assert!(matches!(core.initialize(10, 10), Err(GameError::AlreadyInitialized)));
    }

    #[test]
    fn test_initialize_rejects_empty_board() {
        let mut core = Core::in_memory();
        assert!(matches!(
            core.initialize(0, 10),
            Err(GameError::InvalidBoardSize { .. })
        ));
        assert!(!core.is_initialized().unwrap());
    }

    #[test]
    fn test_actions_require_initialized() {
        let mut core = Core::in_memory();
        assert!(matches!(core.start(), Err(GameError::NotInitialized)));
        assert!(matches!(
            core.add_player(PlayerSetup::default()),
            Err(GameError::NotInitialized)
        ));
        assert!(matches!(core.create_unit(1, 1), Err(GameError::NotInitialized)));
    }

    #[test]
    fn test_add_player_after_start_fails() {
        let mut core = setup();
        core.start().unwrap();
        assert!(matches!(
            core.add_player(PlayerSetup {
                spawn_width: 1,
                spawn_height: 1,
                ..PlayerSetup::default()
            }),
            Err(GameError::AlreadyStarted)
        ));
        assert!(matches!(core.start(), Err(GameError::AlreadyStarted)));
    }

    #[test]
    fn test_add_player_initializes_pointers() {
        let core = setup();
        let row = core.player(1).unwrap();
        assert_eq!(row.unit_pay_pointer, 1);
        assert_eq!(row.building_pay_pointer, 2);
        assert_eq!(row.building_build_pointer, 1);
        assert_eq!(core.meta().unwrap().player_count, 2);
    }

    #[test]
    fn test_add_player_rejects_spawn_area_off_board() {
        let mut core = setup();
        let result = core.add_player(PlayerSetup {
            spawn_x: 19,
            spawn_y: 0,
            spawn_width: 3,
            spawn_height: 1,
            port_x: 0,
            port_y: 0,
        });
        assert!(matches!(result, Err(GameError::AreaOutOfBounds { .. })));
        assert_eq!(core.meta().unwrap().player_count, 2);
    }

    #[test]
    fn test_prototype_validation() {
        let mut core = Core::in_memory();
        core.initialize(4, 4).unwrap();
        assert!(matches!(
            core.add_unit_prototype(UnitPrototype::default()),
            Err(GameError::InvalidPrototype(_))
        ));
        assert!(matches!(
            core.add_building_prototype(BuildingPrototype::default()),
            Err(GameError::InvalidPrototype(_))
        ));
        assert_eq!(core.meta().unwrap().unit_prototype_count, 0);
    }

    #[test]
    fn test_genesis_building_is_built_with_contributions() {
        let mut core = setup();
        let events = core.take_events();
        assert!(events
            .iter()
            .any(|e| matches!(e, GameEvent::Built { building } if building.player == 1)));
        assert_eq!(core.building_state(1, 1).unwrap(), BuildingState::Built);
        let row = core.player(1).unwrap();
        assert_eq!(row.max_resource, 100);
        assert_eq!(row.cur_resource, 100);
        assert_eq!(row.compute_supply, 5);
    }

    #[test]
    fn test_genesis_unit_spawns_immediately() {
        let mut core = setup();
        let unit = core.create_unit(1, WORKER).unwrap();
        assert_eq!(unit, 1);
        let row = core.unit(1, unit).unwrap();
        assert_eq!(row.state, UnitState::Active);
        // Nearest spawn tile to the main building, first in x-major order.
        assert_eq!(row.position(), Point::new(2, 0));
        assert_eq!(core.tile(Point::new(2, 0)).unwrap().hover_unit_id, 1);
        assert_eq!(core.player(1).unwrap().compute_demand, 1);
        assert_eq!(core.player(1).unwrap().unit_pay_pointer, 2);
    }

    #[test]
    fn test_unit_created_after_start_is_unpaid() {
        let mut core = setup();
        core.start().unwrap();
        let unit = core.create_unit(1, TANK).unwrap();
        assert_eq!(core.unit_state(1, unit).unwrap(), UnitState::Unpaid);
        assert_eq!(core.player(1).unwrap().cur_resource, 100);
    }

    #[test]
    fn test_create_unit_validation() {
        let mut core = setup();
        assert!(matches!(core.create_unit(3, WORKER), Err(GameError::InvalidPlayerId(3))));
        assert!(matches!(core.create_unit(0, WORKER), Err(GameError::InvalidPlayerId(0))));
        assert!(matches!(core.create_unit(1, 9), Err(GameError::InvalidUnitType(9))));
        assert_eq!(core.player(1).unwrap().unit_count, 0);
    }

    #[test]
    fn test_create_unit_requires_main_building() {
        let mut core = Core::in_memory();
        core.initialize(8, 8).unwrap();
        core.add_unit_prototype(UnitPrototype {
            max_integrity: 1,
            ..UnitPrototype::default()
        })
        .unwrap();
        core.add_player(PlayerSetup {
            spawn_width: 2,
            spawn_height: 2,
            ..PlayerSetup::default()
        })
        .unwrap();
        assert!(matches!(core.create_unit(1, 1), Err(GameError::MissingMainBuilding(1))));
    }

    #[test]
    fn test_spawn_area_full() {
        let mut core = setup();
        for _ in 0..9 {
            core.create_unit(1, TANK).unwrap();
        }
        assert!(matches!(core.create_unit(1, TANK), Err(GameError::NoSpawnPoint(1))));
        assert_eq!(core.player(1).unwrap().unit_count, 9);
    }

    #[test]
    fn test_place_building_ownership_rules() {
        let mut core = setup();
        assert!(matches!(
            core.place_building(1, MINE, 10, 10),
            Err(GameError::InvalidPlayerId(1))
        ));
        assert!(matches!(
            core.place_building(0, MAIN, 10, 10),
            Err(GameError::InvalidPlayerId(0))
        ));
        assert!(matches!(
            core.place_building(7, MAIN, 10, 10),
            Err(GameError::InvalidPlayerId(7))
        ));
        assert!(matches!(
            core.place_building(1, 42, 10, 10),
            Err(GameError::InvalidBuildingType(42))
        ));
    }

    #[test]
    fn test_place_building_area_rules() {
        let mut core = setup();
        assert!(matches!(
            core.place_building(1, MAIN, 18, 10),
            Err(GameError::AreaOutOfBounds { x: 18, y: 10 })
        ));
        // Overlaps the existing main building.
        assert!(matches!(
            core.place_building(1, MAIN, 5, 1),
            Err(GameError::AreaNotBuildable { .. })
        ));
        // Overlaps a spawn area.
        assert!(matches!(
            core.place_building(1, MAIN, 1, 1),
            Err(GameError::AreaNotBuildable { .. })
        ));
        assert_eq!(core.player(1).unwrap().building_count, 1);
    }

    #[test]
    fn test_environment_building_built_after_start() {
        let mut core = setup();
        core.start().unwrap();
        let mine = core.place_building(0, MINE, 10, 10).unwrap();
        assert_eq!(core.building_state(0, mine).unwrap(), BuildingState::Built);
        let tile = core.tile(Point::new(10, 10)).unwrap();
        assert_eq!(tile.building_at().map(|o| (o.player, o.id)), Some((0, mine)));
    }

    #[test]
    fn test_building_after_start_is_unpaid() {
        let mut core = setup();
        core.start().unwrap();
        let id = core.place_building(1, MAIN, 8, 0).unwrap();
        assert_eq!(core.building_state(1, id).unwrap(), BuildingState::Unpaid);
    }

    #[test]
    fn test_assign_requires_started() {
        let mut core = setup();
        core.create_unit(1, WORKER).unwrap();
        assert!(matches!(
            core.assign_worker(1, 1, WorkerCommand::Idle),
            Err(GameError::NotStarted)
        ));
    }

    #[test]
    fn test_assign_rejects_unknown_unit() {
        let mut core = setup();
        core.start().unwrap();
        assert!(matches!(
            core.assign_worker(1, 1, WorkerCommand::Idle),
            Err(GameError::InvalidUnitId { player: 1, unit: 1 })
        ));
    }

    #[test]
    fn test_gather_requires_environment_target() {
        let mut core = setup();
        core.create_unit(1, WORKER).unwrap();
        core.start().unwrap();
        let result = core.assign_worker(
            1,
            1,
            WorkerCommand::Gather {
                player: 2,
                building: 1,
            },
        );
        assert!(matches!(result, Err(GameError::IllegalCommandTarget(_))));
    }

    #[test]
    fn test_build_requires_own_building_under_construction() {
        let mut core = setup();
        core.create_unit(1, WORKER).unwrap();
        core.start().unwrap();
        let built = core.assign_worker(
            1,
            1,
            WorkerCommand::Build {
                player: 1,
                building: 1,
            },
        );
        assert!(matches!(built, Err(GameError::IllegalCommandTarget(_))));
        let foreign = core.assign_worker(
            1,
            1,
            WorkerCommand::Build {
                player: 2,
                building: 1,
            },
        );
        assert!(matches!(foreign, Err(GameError::IllegalCommandTarget(_))));
    }

    #[test]
    fn test_worker_command_is_canonical() {
        let mut core = setup();
        core.place_building(0, MINE, 10, 10).unwrap();
        core.create_unit(1, WORKER).unwrap();
        core.start().unwrap();
        // Idle with stray target bits.
        core.assign_unit(1, 1, 0x0000_0000_0000_0101, 0xFFFF, 0x11).unwrap();
        let row = core.unit(1, 1).unwrap();
        assert_eq!(row.command, 0);
        assert_eq!(row.command_extra, 0);
        assert_eq!(row.command_meta, 0);
        assert!(row.is_pre_ticked);
    }

    #[test]
    fn test_unknown_command_type_rejected() {
        let mut core = setup();
        core.create_unit(1, WORKER).unwrap();
        core.start().unwrap();
        assert!(matches!(
            core.assign_unit(1, 1, 7 << 16, 0, 0),
            Err(GameError::CommandNotAssignable(_))
        ));
    }

    #[test]
    fn test_attack_validation() {
        let mut core = setup();
        core.place_building(0, MINE, 10, 10).unwrap();
        core.create_unit(1, TANK).unwrap();
        core.start().unwrap();
        let own = FighterCommand::AttackBuilding {
            player: 1,
            building: 1,
        };
        let env = FighterCommand::AttackBuilding {
            player: 0,
            building: 1,
        };
        let missing = FighterCommand::AttackBuilding {
            player: 2,
            building: 5,
        };
        assert!(matches!(
            core.assign_fighter(1, 1, own, CommandPath::EMPTY),
            Err(GameError::IllegalCommandTarget(_))
        ));
        assert!(matches!(
            core.assign_fighter(1, 1, env, CommandPath::EMPTY),
            Err(GameError::IllegalCommandTarget(_))
        ));
        assert!(matches!(
            core.assign_fighter(1, 1, missing, CommandPath::EMPTY),
            Err(GameError::InvalidBuildingId { player: 2, building: 5 })
        ));
        let enemy = FighterCommand::AttackBuilding {
            player: 2,
            building: 1,
        };
        core.assign_fighter(1, 1, enemy, CommandPath::EMPTY).unwrap();
        assert_eq!(core.unit(1, 1).unwrap().command, enemy.encode());
    }

    #[test]
    fn test_hold_position_must_be_on_board() {
        let mut core = setup();
        core.create_unit(1, TANK).unwrap();
        core.start().unwrap();
        let off = FighterCommand::HoldPosition { x: 20, y: 3 };
        assert!(matches!(
            core.assign_fighter(1, 1, off, CommandPath::EMPTY),
            Err(GameError::AreaOutOfBounds { x: 20, y: 3 })
        ));
    }

    #[test]
    fn test_malformed_path_rejected() {
        let mut core = setup();
        core.create_unit(1, TANK).unwrap();
        core.start().unwrap();
        let hold = FighterCommand::HoldPosition { x: 5, y: 5 };
        assert!(matches!(
            core.assign_unit(1, 1, hold.encode(), 0, 0x05),
            Err(GameError::InvalidCommandPath(_))
        ));
        assert!(matches!(
            core.assign_unit(1, 1, hold.encode(), 0, 0x32),
            Err(GameError::InvalidCommandPath(_))
        ));
        let path = CommandPath::from_points(&[Point::new(6, 6), Point::new(8, 8)]);
        core.assign_fighter(1, 1, hold, path).unwrap();
        let row = core.unit(1, 1).unwrap();
        assert_eq!(row.command_extra, path.raw());
        assert_eq!(row.command_meta, path.meta());
    }

    #[test]
    fn test_apply_dispatches() {
        let mut core = Core::in_memory();
        assert_eq!(
            core.apply(&Action::Initialize {
                width: 8,
                height: 8
            })
            .unwrap(),
            None
        );
        let id = core
            .apply(&Action::AddPlayer(PlayerSetup {
                spawn_width: 2,
                spawn_height: 2,
                ..PlayerSetup::default()
            }))
            .unwrap();
        assert_eq!(id, Some(1));
        assert_eq!(core.apply(&Action::Start).unwrap(), None);
        assert!(core.has_started().unwrap());
    }

    #[test]
    fn test_action_bincode_round_trip() {
        let action = Action::AssignUnit {
            player: 1,
            unit: 2,
            command: 1 << 32,
            command_extra: 0x0807,
            command_meta: 1,
        };
        let bytes = bincode::serialize(&action).unwrap();
        let back: Action = bincode::deserialize(&bytes).unwrap();
        assert_eq!(back, action);
    }
}
