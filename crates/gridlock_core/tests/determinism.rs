//! Lockstep guarantees: identical inputs give identical stores.

use gridlock_core::prelude::*;
use gridlock_core::simulation::rotated_player_order;
use gridlock_test_utils::determinism::{
    find_first_divergence, run_parallel_cores, verify_core_determinism,
    verify_snapshot_determinism,
};
use gridlock_test_utils::fixtures::{
    lobby, run_ticks, started_with, CRYSTAL_1, CRYSTAL_2, DEPOT, DRONE, JET, TANK,
};

fn skirmish() -> Core {
    let mut core = started_with(&[
        (1, DRONE),
        (1, TANK),
        (1, JET),
        (2, DRONE),
        (2, TANK),
        (2, JET),
    ]);
    for (player, crystal) in [(1, CRYSTAL_1), (2, CRYSTAL_2)] {
        core.assign_worker(
            player,
            1,
            WorkerCommand::Gather {
                player: 0,
                building: crystal,
            },
        )
        .unwrap();
        for unit in [2, 3] {
            core.assign_fighter(
                player,
                unit,
                FighterCommand::AttackBuilding {
                    player: 3 - player,
                    building: 1,
                },
                CommandPath::EMPTY,
            )
            .unwrap();
        }
    }
    core.place_building(1, DEPOT, 10, 5).unwrap();
    core.create_unit(2, TANK).unwrap();
    core
}

#[test]
fn test_skirmish_is_deterministic() {
    verify_core_determinism(skirmish, 150).assert_deterministic();
}

#[test]
fn test_skirmish_parallel_runs_agree() {
    let result = run_parallel_cores(skirmish, 4, 150);
    result.assert_deterministic();
    assert_eq!(result.unique_hashes().len(), 1);
}

#[test]
fn test_skirmish_never_diverges() {
    assert_eq!(find_first_divergence(skirmish, 120), None);
}

#[test]
fn test_snapshot_resumes_in_lockstep() {
    let mut core = skirmish();
    run_ticks(&mut core, 40);
    assert!(verify_snapshot_determinism(&core, 80));

    let bytes = core.serialize().unwrap();
    let restored = Core::deserialize(&bytes).unwrap();
    assert_eq!(restored.current_tick(), core.current_tick());
    assert_eq!(restored.store().iter().count(), core.store().iter().count());
    assert_eq!(restored.serialize().unwrap(), bytes);
}

#[test]
fn test_events_match_across_runs() {
    let mut a = skirmish();
    let mut b = skirmish();
    for _ in 0..100 {
        assert_eq!(a.tick().unwrap(), b.tick().unwrap());
    }
}

#[test]
fn test_simulate_ahead_leaves_original() {
    let core = skirmish();
    let before = core.state_hash();
    let ahead = core.simulate_ahead(30).unwrap();
    assert_eq!(core.state_hash(), before);
    assert_eq!(core.current_tick(), 0);
    assert_eq!(ahead.current_tick(), 30);
    assert_ne!(ahead.state_hash(), before);

    let mut replayed = core.clone();
    run_ticks(&mut replayed, 30);
    assert_eq!(replayed.state_hash(), ahead.state_hash());
}

#[test]
fn test_rejected_actions_leave_no_trace() {
    let mut core = skirmish();
    let before = core.serialize().unwrap();
    assert!(core.create_unit(3, TANK).is_err());
    assert!(core.place_building(1, DEPOT, 2, 2).is_err());
    assert!(core
        .assign_worker(1, 1, WorkerCommand::Gather { player: 1, building: 1 })
        .is_err());
    assert!(core.add_player(gridlock_test_utils::fixtures::player_one()).is_err());
    assert_eq!(core.serialize().unwrap(), before);
}

#[test]
fn test_unstarted_game_rejects_ticks() {
    let mut core = lobby();
    assert!(matches!(core.tick(), Err(GameError::NotStarted)));
    assert_eq!(core.current_tick(), 0);

    let mut empty = Core::in_memory();
    assert!(matches!(empty.tick(), Err(GameError::NotInitialized)));
}

#[test]
fn test_player_order_rotates() {
    assert_eq!(rotated_player_order(0, 2), vec![1, 2]);
    assert_eq!(rotated_player_order(1, 2), vec![2, 1]);
    assert_eq!(rotated_player_order(5, 3), vec![3, 1, 2]);
    assert!(rotated_player_order(7, 0).is_empty());
}
