//! Scenario playback and the JSON-lines command loop.

use std::io::{self, BufRead, Write};

use tracing::{debug, info, warn};

use gridlock_core::prelude::*;

use crate::ascii::{render_board, AsciiConfig};
use crate::protocol::{Command, GameState, Response};
use crate::scenario::{fighter_action, worker_action, Scenario, ScenarioError};

/// Result of playing a scenario.
#[derive(Debug)]
pub struct ScenarioOutcome {
    /// The core after the last tick.
    pub core: Core,
    /// Every applied action, starting from the genesis state.
    pub replay: Replay,
    /// Scheduled orders the engine refused.
    pub rejected: usize,
}

/// Play `scenario` for `ticks` ticks (its own default when `None`).
///
/// Orders scheduled at tick `t` are applied right before tick `t` runs. An
/// order the engine rejects is logged and skipped; the game goes on.
/// `observe` sees the core and the events after every tick.
pub fn play_scenario<F>(
    scenario: &Scenario,
    ticks: Option<u32>,
    mut observe: F,
) -> Result<ScenarioOutcome, ScenarioError>
where
    F: FnMut(&Core, &TickEvents),
{
    let ticks = ticks.unwrap_or(scenario.ticks);
    let (core, ids) = scenario.genesis()?;
    let actions = scenario.compile(&ids)?;
    let mut recorder = ReplayRecorder::new(scenario.name.clone(), core)?;

    let mut pending = actions.into_iter().peekable();
    let mut rejected = 0;
    for _ in 0..ticks {
        let now = recorder.core().current_tick();
        while let Some((_, action)) = pending.next_if(|(tick, _)| *tick <= now) {
            if let Err(e) = recorder.apply(action.clone()) {
                warn!(tick = now, action = action.name(), error = %e, "Scheduled order rejected");
                rejected += 1;
            }
        }
        let events = recorder.tick()?;
        observe(recorder.core(), &events);
    }

    let (core, replay) = recorder.finish();
    info!(
        name = %scenario.name,
        tick = core.current_tick(),
        actions = replay.action_count(),
        rejected,
        "Scenario finished"
    );
    Ok(ScenarioOutcome {
        core,
        replay,
        rejected,
    })
}

/// Runner configuration.
#[derive(Debug, Clone, Default)]
pub struct HeadlessConfig {
    /// Send the full state after every `tick` command.
    pub auto_state: bool,
    /// Board rendering for `render`.
    pub ascii: AsciiConfig,
}

/// Serves the JSON-lines protocol against a recorded core.
#[derive(Debug)]
pub struct HeadlessRunner {
    recorder: ReplayRecorder,
    ids: TypeIds,
    config: HeadlessConfig,
}

impl HeadlessRunner {
    /// Start from the genesis state of `scenario`. Its script is not
    /// applied; the controller drives the game.
    pub fn new(scenario: &Scenario, config: HeadlessConfig) -> Result<Self, ScenarioError> {
        let (core, ids) = scenario.genesis()?;
        let recorder = ReplayRecorder::new(scenario.name.clone(), core)?;
        Ok(Self {
            recorder,
            ids,
            config,
        })
    }

    /// The current core.
    #[must_use]
    pub const fn core(&self) -> &Core {
        self.recorder.core()
    }

    /// Stop serving. Returns the final core and the session replay.
    #[must_use]
    pub fn finish(self) -> (Core, Replay) {
        self.recorder.finish()
    }

    /// Execute one command.
    pub fn handle(&mut self, command: Command) -> Vec<Response> {
        let name = command.name();
        match self.execute(command) {
            Ok(responses) => responses,
            Err(message) => {
                debug!(cmd = name, %message, "Command failed");
                vec![Response::error(message, Some(name))]
            }
        }
    }

    fn execute(&mut self, command: Command) -> Result<Vec<Response>, String> {
        let name = command.name();
        match command {
            Command::Tick { count } => {
                let mut responses = Vec::new();
                for _ in 0..count {
                    match self.recorder.tick() {
                        Ok(events) => responses.push(Response::Ticked {
                            tick: self.core().current_tick(),
                            events: events.events,
                        }),
                        Err(e) => {
                            responses.push(Response::error(e.to_string(), Some(name)));
                            return Ok(responses);
                        }
                    }
                }
                if self.config.auto_state {
                    responses.push(self.state()?);
                }
                Ok(responses)
            }
            Command::CreateUnit { player, unit_type } => {
                let unit_type_id = self
                    .ids
                    .unit(&unit_type)
                    .ok_or_else(|| format!("unknown unit type: {unit_type}"))?;
                let id = self.apply(Action::CreateUnit {
                    player,
                    unit_type: unit_type_id,
                })?;
                Ok(vec![created("unit", player, id, name)])
            }
            Command::PlaceBuilding {
                player,
                building_type,
                x,
                y,
            } => {
                let building_type_id = self
                    .ids
                    .building(&building_type)
                    .ok_or_else(|| format!("unknown building type: {building_type}"))?;
                let id = self.apply(Action::PlaceBuilding {
                    player,
                    building_type: building_type_id,
                    x,
                    y,
                })?;
                Ok(vec![created("building", player, id, name)])
            }
            Command::AssignWorker {
                player,
                unit,
                command,
            } => {
                self.apply(worker_action(player, unit, command))?;
                Ok(vec![Response::ack(name)])
            }
            Command::AssignFighter {
                player,
                unit,
                command,
                waypoints,
            } => {
                let action = fighter_action(player, unit, command, &waypoints)
                    .ok_or_else(|| format!("{} waypoints, at most 4 allowed", waypoints.len()))?;
                self.apply(action)?;
                Ok(vec![Response::ack(name)])
            }
            Command::State => Ok(vec![self.state()?]),
            Command::Hash => Ok(vec![Response::StateHash {
                tick: self.core().current_tick(),
                hash: self.core().state_hash(),
            }]),
            Command::Render => {
                let text = render_board(self.core(), &self.config.ascii).map_err(|e| e.to_string())?;
                Ok(vec![Response::Board { text }])
            }
            Command::Quit => Ok(vec![Response::Bye {
                tick: self.core().current_tick(),
            }]),
        }
    }

    fn apply(&mut self, action: Action) -> Result<Option<u8>, String> {
        self.recorder.apply(action).map_err(|e| e.to_string())
    }

    fn state(&self) -> Result<Response, String> {
        GameState::capture(self.core())
            .map(Response::State)
            .map_err(|e| e.to_string())
    }

    /// Read commands from `input` until `quit` or end of input, writing one
    /// response per line to `output`.
    pub fn serve<R: BufRead, W: Write>(&mut self, input: R, mut output: W) -> io::Result<()> {
        write_response(&mut output, &Response::ready(self.core().current_tick()))?;

        for line in input.lines() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let command = match Command::from_json(line) {
                Ok(command) => command,
                Err(e) => {
                    write_response(&mut output, &Response::error(format!("invalid command: {e}"), None))?;
                    continue;
                }
            };
            let quit = command == Command::Quit;
            for response in self.handle(command) {
                write_response(&mut output, &response)?;
            }
            if quit {
                break;
            }
        }
        Ok(())
    }
}

fn created(kind: &str, player: u8, id: Option<u8>, cmd: &str) -> Response {
    match id {
        Some(id) => Response::Created {
            kind: kind.to_string(),
            player,
            id,
        },
        None => Response::ack(cmd),
    }
}

fn write_response<W: Write>(output: &mut W, response: &Response) -> io::Result<()> {
    let line = response.to_json_line().map_err(io::Error::other)?;
    writeln!(output, "{line}")?;
    output.flush()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runner() -> HeadlessRunner {
        HeadlessRunner::new(&Scenario::skirmish(), HeadlessConfig::default()).unwrap()
    }

    #[test]
    fn test_play_skirmish() {
        let mut ticks = 0;
        let outcome = play_scenario(&Scenario::skirmish(), Some(30), |_, _| ticks += 1).unwrap();
        assert_eq!(ticks, 30);
        assert_eq!(outcome.core.current_tick(), 30);
        assert_eq!(outcome.rejected, 0);
        assert_eq!(outcome.replay.action_count(), 10);
        assert_eq!(outcome.replay.final_hash, outcome.core.state_hash());
        // Both flak orders at tick 10 went through.
        assert_eq!(outcome.core.player(1).unwrap().unit_count, 5);
    }

    #[test]
    fn test_rejected_orders_are_skipped() {
        let mut scenario = Scenario::skirmish();
        scenario.script.push(crate::scenario::ScheduledOrder {
            tick: 2,
            order: crate::scenario::Order::Idle { player: 1, unit: 9 },
        });
        let outcome = play_scenario(&scenario, Some(5), |_, _| {}).unwrap();
        assert_eq!(outcome.rejected, 1);
        assert_eq!(outcome.replay.action_count(), 4);
    }

    #[test]
    fn test_handle_create_and_tick() {
        let mut runner = runner();
        let responses = runner.handle(Command::CreateUnit {
            player: 1,
            unit_type: "tank".to_string(),
        });
        assert_eq!(
            responses,
            vec![Response::Created {
                kind: "unit".to_string(),
                player: 1,
                id: 5
            }]
        );

        let responses = runner.handle(Command::Tick { count: 3 });
        assert_eq!(responses.len(), 3);
        assert!(matches!(responses[2], Response::Ticked { tick: 3, .. }));
    }

    #[test]
    fn test_handle_errors() {
        let mut runner = runner();
        let responses = runner.handle(Command::CreateUnit {
            player: 1,
            unit_type: "mech".to_string(),
        });
        assert!(matches!(
            &responses[..],
            [Response::Error { cmd: Some(cmd), .. }] if cmd == "create_unit"
        ));

        let responses = runner.handle(Command::AssignWorker {
            player: 1,
            unit: 1,
            command: WorkerCommand::Gather {
                player: 2,
                building: 1,
            },
        });
        assert!(matches!(&responses[..], [Response::Error { .. }]));

        let responses = runner.handle(Command::AssignFighter {
            player: 1,
            unit: 3,
            command: FighterCommand::HoldPosition { x: 3, y: 3 },
            waypoints: vec![(0, 0); 5],
        });
        assert!(matches!(&responses[..], [Response::Error { .. }]));
    }

    #[test]
    fn test_auto_state_after_tick() {
        let config = HeadlessConfig {
            auto_state: true,
            ..HeadlessConfig::default()
        };
        let mut runner = HeadlessRunner::new(&Scenario::skirmish(), config).unwrap();
        let responses = runner.handle(Command::Tick { count: 2 });
        assert_eq!(responses.len(), 3);
        assert!(matches!(&responses[2], Response::State(state) if state.tick == 2));
    }

    #[test]
    fn test_serve_session() {
        let input = [
            r#"{"cmd":"assign_worker","player":1,"unit":1,"command":{"Gather":{"player":0,"building":1}}}"#,
            "",
            "garbage",
            r#"{"cmd":"tick","count":2}"#,
            r#"{"cmd":"hash"}"#,
            r#"{"cmd":"quit"}"#,
            r#"{"cmd":"tick"}"#,
        ]
        .join("\n");

        let mut runner = runner();
        let mut output = Vec::new();
        runner.serve(input.as_bytes(), &mut output).unwrap();

        let lines: Vec<serde_json::Value> = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        let types: Vec<&str> = lines.iter().map(|v| v["type"].as_str().unwrap()).collect();
        assert_eq!(
            types,
            ["ready", "ack", "error", "ticked", "ticked", "state_hash", "bye"]
        );
        assert_eq!(lines[5]["hash"], runner.core().state_hash());

        let (core, replay) = runner.finish();
        assert_eq!(core.current_tick(), 2);
        assert_eq!(replay.action_count(), 1);
    }
}
