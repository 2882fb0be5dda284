//! Headless local client for the Gridlock engine.
//!
//! Runs games without graphics, driven either by a RON scenario script or
//! by JSON commands on stdin:
//!
//! - **Scenario runs**: play a scripted game and print the final state
//! - **Interactive serving**: a controller drives the game over JSON lines
//! - **Determinism checks**: parallel runs, snapshots and replays must agree
//!
//! # Protocol
//!
//! - **stdin**: commands from the controller (tick, create_unit, ...)
//! - **stdout**: responses and state (JSON)
//! - **stderr**: logs (human-readable)
//!
//! See [`protocol`] for the full command/response format.
//!
//! # Example
//!
//! ```bash
//! # Serve the standard skirmish
//! echo '{"cmd":"tick","count":10}' | cargo run -p gridlock_headless
//!
//! # Play a scenario and keep the replay
//! cargo run -p gridlock_headless -- run --scenario assets/scenarios/skirmish.ron --replay out.bin
//!
//! # Check it
//! cargo run -p gridlock_headless -- replay --file out.bin
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod ascii;
pub mod protocol;
pub mod runner;
pub mod scenario;
pub mod verify;

pub use ascii::{render_board, AsciiConfig};
pub use protocol::{Command, GameState, Response};
pub use runner::{play_scenario, HeadlessConfig, HeadlessRunner, ScenarioOutcome};
pub use scenario::{Scenario, ScenarioError};
pub use verify::{verify_scenario, VerifyReport};
