//! Scenario files, replay files and the command loop end to end.

use std::path::PathBuf;

use gridlock_core::prelude::*;
use gridlock_headless::protocol::GameStatus;
use gridlock_headless::scenario::DataSource;
use gridlock_headless::{
    play_scenario, verify_scenario, Command, GameState, HeadlessConfig, HeadlessRunner,
    Response, Scenario, ScenarioError,
};
use gridlock_test_utils::fixtures;

fn workspace_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../..")
}

fn bundled(name: &str) -> Scenario {
    let mut scenario =
        Scenario::load(workspace_root().join("assets/scenarios").join(name)).unwrap();
    if let DataSource::File(path) = &scenario.data {
        scenario.data = DataSource::File(workspace_root().join(path));
    }
    scenario
}

#[test]
fn test_bundled_skirmish_matches_builtin() {
    let from_file = bundled("skirmish.ron");
    let builtin = Scenario::skirmish();
    assert_eq!(from_file.name, builtin.name);
    assert_eq!(from_file.ticks, builtin.ticks);

    let (core_a, ids) = from_file.genesis().unwrap();
    let (core_b, _) = builtin.genesis().unwrap();
    assert_eq!(core_a.state_hash(), core_b.state_hash());
    assert_eq!(
        from_file.compile(&ids).unwrap(),
        builtin.compile(&ids).unwrap()
    );
}

#[test]
fn test_skirmish_uses_the_standard_map() {
    let scenario = Scenario::skirmish();
    assert_eq!(scenario.players[0].setup(), fixtures::player_one());
    assert_eq!(scenario.players[1].setup(), fixtures::player_two());
    assert_eq!(scenario.data.load().unwrap(), fixtures::standard_data());
    assert_eq!(scenario.board, (fixtures::BOARD_SIZE, fixtures::BOARD_SIZE));
}

#[test]
fn test_expansion_builds_a_depot() {
    let scenario = bundled("expansion.ron");
    let outcome = play_scenario(&scenario, None, |_, _| {}).unwrap();
    assert_eq!(outcome.core.current_tick(), 150);

    let depot = outcome.core.building(1, 2).unwrap();
    assert_eq!(depot.state, BuildingState::Built);
    let player = outcome.core.player(1).unwrap();
    assert!(player.max_resource >= 300);

    let state = GameState::capture(&outcome.core).unwrap();
    assert_eq!(state.status, GameStatus::Running);
}

#[test]
fn test_missing_scenario_file() {
    let err = Scenario::load("/definitely/not/here.ron").unwrap_err();
    assert!(matches!(err, ScenarioError::FileNotFound(_)));
}

#[test]
fn test_malformed_scenario_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.ron");
    std::fs::write(&path, "Scenario(name: \"broken\", board: (").unwrap();
    assert!(matches!(
        Scenario::load(&path),
        Err(ScenarioError::ParseError(_))
    ));
}

#[test]
fn test_scenario_written_and_reloaded() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("skirmish.ron");
    let text = ron::ser::to_string_pretty(&Scenario::skirmish(), ron::ser::PrettyConfig::default())
        .unwrap();
    std::fs::write(&path, text).unwrap();

    let loaded = Scenario::load(&path).unwrap();
    let a = play_scenario(&loaded, Some(40), |_, _| {}).unwrap();
    let b = play_scenario(&Scenario::skirmish(), Some(40), |_, _| {}).unwrap();
    assert_eq!(a.core.state_hash(), b.core.state_hash());
}

#[test]
fn test_replay_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("game.bin");

    let outcome = play_scenario(&Scenario::skirmish(), Some(80), |_, _| {}).unwrap();
    outcome.replay.save(&path).unwrap();

    let replay = Replay::load(&path).unwrap();
    assert_eq!(replay.scenario_id, "skirmish");
    assert_eq!(replay.final_tick, 80);
    let mut player = ReplayPlayer::new(replay).unwrap();
    assert!(player.verify().unwrap());
    assert_eq!(player.core().state_hash(), outcome.core.state_hash());

    player.seek(20).unwrap();
    let partial = play_scenario(&Scenario::skirmish(), Some(20), |_, _| {}).unwrap();
    assert_eq!(player.core().state_hash(), partial.core.state_hash());
}

#[test]
fn test_tampered_replay_is_detected() {
    let outcome = play_scenario(&Scenario::skirmish(), Some(30), |_, _| {}).unwrap();
    let mut replay = outcome.replay;
    replay.final_hash ^= 1;
    assert!(!ReplayPlayer::new(replay).unwrap().verify().unwrap());
}

#[test]
fn test_served_session_replays() {
    let mut runner = HeadlessRunner::new(&Scenario::skirmish(), HeadlessConfig::default()).unwrap();
    let commands = [
        Command::AssignWorker {
            player: 1,
            unit: 1,
            command: WorkerCommand::Gather {
                player: 0,
                building: 1,
            },
        },
        Command::CreateUnit {
            player: 2,
            unit_type: "jet".to_string(),
        },
        Command::Tick { count: 15 },
        Command::AssignFighter {
            player: 2,
            unit: 5,
            command: FighterCommand::AttackBuilding {
                player: 1,
                building: 1,
            },
            waypoints: vec![(16, 16)],
        },
        Command::Tick { count: 15 },
    ];
    for command in commands {
        let responses = runner.handle(command);
        assert!(
            !responses.iter().any(|r| matches!(r, Response::Error { .. })),
            "{responses:?}"
        );
    }

    let (core, replay) = runner.finish();
    assert_eq!(core.current_tick(), 30);
    assert_eq!(replay.action_count(), 3);
    assert!(ReplayPlayer::new(replay).unwrap().verify().unwrap());
}

#[test]
fn test_verify_bundled_scenarios() {
    for name in ["skirmish.ron", "expansion.ron"] {
        let report = verify_scenario(&bundled(name), 4, 50).unwrap();
        assert!(report.is_ok(), "{name}: {report:?}");
    }
}
