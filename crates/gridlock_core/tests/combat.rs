//! Targeting, damage, death and building destruction.

use gridlock_core::prelude::*;
use gridlock_core::simulation::rotated_player_order;
use gridlock_test_utils::fixtures::{
    describe, standard_data, started_with, tick_until, CORE, DEPOT, DRONE, FLAK, JET, TANK,
};

/// A 12x12 board whose spawn columns touch, so fresh units are already in
/// each other's range.
///
/// ```text
/// player 1: spawn (0,0) 1x3, core at (4,6)
/// player 2: spawn (1,0) 1x3, core at (8,6)
/// ```
fn duel(units: &[(u8, u8)]) -> Core {
    let mut core = Core::in_memory();
    core.initialize(12, 12).unwrap();
    standard_data().register(&mut core).unwrap();
    for x in [0, 1] {
        core.add_player(PlayerSetup {
            spawn_x: x,
            spawn_y: 0,
            spawn_width: 1,
            spawn_height: 3,
            port_x: x,
            port_y: 4,
        })
        .unwrap();
    }
    core.place_building(1, CORE, 4, 6).unwrap();
    core.place_building(2, CORE, 8, 6).unwrap();
    for &(player, unit_type) in units {
        core.create_unit(player, unit_type).unwrap();
    }
    core.start().unwrap();
    core.take_events();
    core
}

#[test]
fn test_anti_air_prefers_air_target() {
    let core = duel(&[(1, FLAK), (2, TANK), (2, JET)]);
    let nearest = core
        .nearest_enemy_units(1, core.unit(1, 1).unwrap().position())
        .unwrap();
    assert_eq!(nearest[usize::from(u8::from(Layer::Land))].map(|m| m.unit), Some(1));
    assert_eq!(nearest[usize::from(u8::from(Layer::Air))].map(|m| m.unit), Some(2));
    assert_eq!(nearest[usize::from(u8::from(Layer::Hover))], None);

    let target = core.unit_to_fire_at(1, 1).unwrap().unwrap();
    assert_eq!((target.player, target.unit), (2, 2));
}

#[test]
fn test_workers_are_shot_last() {
    let core = duel(&[(1, TANK), (2, DRONE), (2, TANK)]);
    let target = core.unit_to_fire_at(1, 1).unwrap().unwrap();
    assert_eq!((target.player, target.unit), (2, 2));

    let core = duel(&[(1, TANK), (2, DRONE)]);
    let target = core.unit_to_fire_at(1, 1).unwrap().unwrap();
    assert_eq!((target.player, target.unit), (2, 1));
}

#[test]
fn test_no_target_without_strength() {
    // Tanks cannot hit air units.
    let core = duel(&[(1, TANK), (2, JET)]);
    assert_eq!(core.unit_to_fire_at(1, 1).unwrap(), None);
}

#[test]
fn test_tanks_trade_until_death() {
    let mut core = duel(&[(1, TANK), (2, TANK)]);
    let positions = [
        core.unit(1, 1).unwrap().position(),
        core.unit(2, 1).unwrap().position(),
    ];

    let mut events = Vec::new();
    for _ in 0..40 {
        events.extend(core.tick().unwrap().events);
    }

    // Equal stats and cooldowns: both fire on the same ticks and fall together.
    let shots = events
        .iter()
        .filter(|e| matches!(e, GameEvent::Shot { .. }))
        .count();
    assert_eq!(shots, 10, "{}", describe(&core));
    for (player, position) in [(1, positions[0]), (2, positions[1])] {
        assert_eq!(core.unit_state(player, 1).unwrap(), UnitState::Dead);
        assert_eq!(core.unit(player, 1).unwrap().integrity, 0);
        assert!(events.contains(&GameEvent::Killed {
            unit: ObjectRef::unit(player, 1)
        }));
        assert!(core.tile(position).unwrap().is_empty(Layer::Land));
    }
    assert_eq!(core.player(1).unwrap().compute_demand, 0);
    assert!(core.alive_units(2).unwrap().is_empty());
}

#[test]
fn test_firing_order_rotates_between_ticks() {
    let mut core = duel(&[(1, TANK), (2, TANK)]);

    let mut volleys = Vec::new();
    for _ in 0..15 {
        let events = core.tick().unwrap();
        let shooters: Vec<u8> = events.shots().map(|(attacker, _)| attacker.player).collect();
        if shooters.len() == 2 {
            volleys.push((events.tick, shooters));
        }
    }

    // Both tanks fire on the same ticks; the first shooter follows the
    // rotation start of that tick.
    assert!(volleys.len() >= 3, "{volleys:?}\n{}", describe(&core));
    for (tick, shooters) in &volleys {
        assert_eq!(shooters, &rotated_player_order(*tick, 2), "tick {tick}");
    }
    for pair in volleys.windows(2) {
        assert_ne!(pair[0].1, pair[1].1, "{volleys:?}");
    }
}

#[test]
fn test_dead_unit_rejects_orders() {
    let mut core = duel(&[(1, TANK), (2, TANK)]);
    tick_until(&mut core, 40, |c| {
        c.unit_state(1, 1).unwrap() == UnitState::Dead
    })
    .unwrap();
    assert!(matches!(
        core.assign_fighter(1, 1, FighterCommand::HoldPosition { x: 0, y: 0 }, CommandPath::EMPTY),
        Err(GameError::UnitDead { player: 1, unit: 1 })
    ));
}

#[test]
fn test_razing_the_enemy_core() {
    let mut core = started_with(&[(1, JET)]);
    core.assign_fighter(
        1,
        1,
        FighterCommand::AttackBuilding {
            player: 2,
            building: 1,
        },
        CommandPath::EMPTY,
    )
    .unwrap();

    let mut events = Vec::new();
    for _ in 0..200 {
        events.extend(core.tick().unwrap().events);
        if core.building_state(2, 1).unwrap() == BuildingState::Destroyed {
            break;
        }
    }
    assert_eq!(
        core.building_state(2, 1).unwrap(),
        BuildingState::Destroyed,
        "{}",
        describe(&core)
    );

    let target = ObjectRef::building(2, 1);
    let destroyed = events
        .iter()
        .position(|e| *e == GameEvent::Destroyed { building: target })
        .unwrap();
    assert_eq!(
        events.get(destroyed + 1),
        Some(&GameEvent::Shot {
            attacker: ObjectRef::unit(1, 1),
            target,
        })
    );

    let jet = core.unit(1, 1).unwrap();
    assert_eq!(
        FighterCommand::decode(jet.command).unwrap(),
        FighterCommand::hold(jet.position())
    );

    let player = core.player(2).unwrap();
    assert_eq!(player.max_resource, 0);
    assert_eq!(player.cur_resource, 0);
    assert_eq!(player.compute_supply, 0);
    for tile in core.building_area(2, 1).unwrap().tiles() {
        assert!(core.tile(tile).unwrap().is_empty(Layer::Land));
    }

    assert!(matches!(
        core.create_unit(2, DRONE),
        Err(GameError::MainBuildingDestroyed(2))
    ));
    assert!(matches!(
        core.assign_fighter(
            1,
            1,
            FighterCommand::AttackBuilding {
                player: 2,
                building: 1
            },
            CommandPath::EMPTY
        ),
        Err(GameError::IllegalCommandTarget(_))
    ));
}

#[test]
fn test_attack_target_validation() {
    let mut core = started_with(&[(1, TANK)]);
    let attack = |player, building| FighterCommand::AttackBuilding { player, building };

    assert!(matches!(
        core.assign_fighter(1, 1, attack(1, 1), CommandPath::EMPTY),
        Err(GameError::IllegalCommandTarget(_))
    ));
    assert!(matches!(
        core.assign_fighter(1, 1, attack(0, 1), CommandPath::EMPTY),
        Err(GameError::IllegalCommandTarget(_))
    ));
    assert!(matches!(
        core.assign_fighter(1, 1, attack(3, 1), CommandPath::EMPTY),
        Err(GameError::InvalidPlayerId(3))
    ));

    let depot = core.place_building(2, DEPOT, 20, 20).unwrap();
    assert!(matches!(
        core.assign_fighter(1, 1, attack(2, depot), CommandPath::EMPTY),
        Err(GameError::IllegalCommandTarget(_))
    ));
    core.assign_fighter(1, 1, attack(2, 1), CommandPath::EMPTY)
        .unwrap();
}

#[test]
fn test_waypoints_are_visited_in_order() {
    let mut core = started_with(&[(1, JET)]);
    let path = CommandPath::from_points(&[Point::new(4, 8)]);
    core.assign_fighter(1, 1, FighterCommand::HoldPosition { x: 10, y: 1 }, path)
        .unwrap();

    let mut deepest = 0;
    let mut pointer = 0;
    let arrived = tick_until(&mut core, 40, |c| {
        let jet = c.unit(1, 1).unwrap();
        let path = CommandPath::from_raw(jet.command_extra, jet.command_meta);
        assert!(path.pointer() >= pointer && path.pointer() <= path.len());
        pointer = path.pointer();
        deepest = deepest.max(jet.y);
        jet.position() == Point::new(10, 1)
    });
    assert!(arrived.is_some(), "{}", describe(&core));
    assert!(deepest >= 7);
    assert_eq!(pointer, 1);
}

#[test]
fn test_malformed_paths_are_rejected() {
    let mut core = started_with(&[(1, TANK)]);
    let hold = FighterCommand::HoldPosition { x: 5, y: 5 }.encode();
    assert!(matches!(
        core.assign_unit(1, 1, hold, 0, 0x05),
        Err(GameError::InvalidCommandPath(_))
    ));
    assert!(matches!(
        core.assign_unit(1, 1, hold, 0, 0x21),
        Err(GameError::InvalidCommandPath(_))
    ));
    assert!(matches!(
        core.assign_fighter(1, 1, FighterCommand::HoldPosition { x: 40, y: 0 }, CommandPath::EMPTY),
        Err(GameError::AreaOutOfBounds { x: 40, y: 0 })
    ));
}
