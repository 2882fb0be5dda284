//! Headless Gridlock client.
//!
//! # Usage
//!
//! ```bash
//! # Serve JSON commands on stdin (default)
//! cargo run -p gridlock_headless
//!
//! # Play a scenario, print the final state, keep the replay
//! cargo run -p gridlock_headless -- run --scenario assets/scenarios/skirmish.ron --replay game.bin
//!
//! # Check determinism on 8 parallel runs
//! cargo run -p gridlock_headless -- verify --runs 8
//!
//! # Verify a replay
//! cargo run -p gridlock_headless -- replay --file game.bin
//!
//! # Draw the board after 50 ticks
//! cargo run -p gridlock_headless -- render --ticks 50
//! ```
//!
//! # Protocol
//!
//! Input (stdin): JSON commands, one per line
//! Output (stdout): JSON responses, one per line
//! Logs (stderr): debug information

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use gridlock_core::prelude::*;
use gridlock_headless::{
    play_scenario, render_board, verify_scenario, AsciiConfig, GameState, HeadlessConfig,
    HeadlessRunner, Scenario,
};

#[derive(Parser)]
#[command(name = "gridlock_headless")]
#[command(about = "Headless Gridlock client for scripted games and determinism checks")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a scenario and print the final state
    Run {
        /// Scenario file (defaults to the built-in skirmish)
        #[arg(short, long)]
        scenario: Option<PathBuf>,

        /// Ticks to run (defaults to the scenario's own)
        #[arg(short, long)]
        ticks: Option<u32>,

        /// Print the state after every tick
        #[arg(long)]
        every_tick: bool,

        /// Write the replay to this file
        #[arg(long)]
        replay: Option<PathBuf>,
    },

    /// Serve the JSON-lines protocol on stdin/stdout
    Serve {
        /// Scenario whose genesis state to start from
        #[arg(short, long)]
        scenario: Option<PathBuf>,

        /// Output state after every tick command
        #[arg(long)]
        auto_state: bool,

        /// Write the session replay to this file on exit
        #[arg(long)]
        record: Option<PathBuf>,
    },

    /// Run a scenario on parallel copies and compare hashes
    Verify {
        /// Scenario file (defaults to the built-in skirmish)
        #[arg(short, long)]
        scenario: Option<PathBuf>,

        /// Number of parallel runs
        #[arg(short, long, default_value = "4")]
        runs: usize,

        /// Ticks per run (defaults to the scenario's own)
        #[arg(short, long)]
        ticks: Option<u32>,
    },

    /// Verify a recorded replay
    Replay {
        /// Replay file path
        #[arg(short, long)]
        file: PathBuf,

        /// Print the board at this tick instead of verifying
        #[arg(long)]
        seek: Option<u32>,
    },

    /// Draw the board as ASCII
    Render {
        /// Scenario file (defaults to the built-in skirmish)
        #[arg(short, long)]
        scenario: Option<PathBuf>,

        /// Ticks to play before drawing
        #[arg(short, long, default_value = "0")]
        ticks: u32,

        /// Use ANSI colors
        #[arg(long)]
        color: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    // Logs go to stderr; stdout is for the protocol.
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .with(filter)
        .init();

    match cli.command {
        Some(Commands::Run {
            scenario,
            ticks,
            every_tick,
            replay,
        }) => cmd_run(scenario.as_deref(), ticks, every_tick, replay.as_deref()),
        Some(Commands::Serve {
            scenario,
            auto_state,
            record,
        }) => cmd_serve(scenario.as_deref(), auto_state, record.as_deref()),
        Some(Commands::Verify {
            scenario,
            runs,
            ticks,
        }) => cmd_verify(scenario.as_deref(), runs, ticks),
        Some(Commands::Replay { file, seek }) => cmd_replay(&file, seek),
        Some(Commands::Render {
            scenario,
            ticks,
            color,
        }) => cmd_render(scenario.as_deref(), ticks, color),
        None => cmd_serve(None, false, None),
    }
}

fn load_scenario(path: Option<&Path>) -> Scenario {
    let Some(path) = path else {
        return Scenario::skirmish();
    };
    match Scenario::load(path) {
        Ok(scenario) => scenario,
        Err(e) => {
            eprintln!("Failed to load scenario: {e}");
            std::process::exit(1);
        }
    }
}

fn print_state(core: &Core) {
    let line = GameState::capture(core)
        .map_err(|e| e.to_string())
        .and_then(|state| serde_json::to_string(&state).map_err(|e| e.to_string()));
    match line {
        Ok(line) => println!("{line}"),
        Err(e) => {
            eprintln!("Failed to read state: {e}");
            std::process::exit(1);
        }
    }
}

/// Play a scenario to the end
fn cmd_run(scenario: Option<&Path>, ticks: Option<u32>, every_tick: bool, replay: Option<&Path>) {
    let scenario = load_scenario(scenario);
    tracing::info!("Running scenario: {}", scenario.name);

    let outcome = match play_scenario(&scenario, ticks, |core, _| {
        if every_tick {
            print_state(core);
        }
    }) {
        Ok(outcome) => outcome,
        Err(e) => {
            eprintln!("Scenario failed: {e}");
            std::process::exit(1);
        }
    };

    if !every_tick {
        print_state(&outcome.core);
    }
    if outcome.rejected > 0 {
        eprintln!("{} scheduled orders were rejected", outcome.rejected);
    }
    if let Some(path) = replay {
        if let Err(e) = outcome.replay.save(path) {
            eprintln!("Failed to save replay: {e}");
            std::process::exit(1);
        }
        eprintln!("Replay saved to {}", path.display());
    }
}

/// Serve the JSON protocol
fn cmd_serve(scenario: Option<&Path>, auto_state: bool, record: Option<&Path>) {
    let scenario = load_scenario(scenario);
    tracing::info!("Starting session from scenario: {}", scenario.name);

    let config = HeadlessConfig {
        auto_state,
        ..HeadlessConfig::default()
    };
    let mut runner = match HeadlessRunner::new(&scenario, config) {
        Ok(runner) => runner,
        Err(e) => {
            eprintln!("Failed to set up scenario: {e}");
            std::process::exit(1);
        }
    };

    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    if let Err(e) = runner.serve(stdin.lock(), stdout.lock()) {
        eprintln!("IO error: {e}");
        std::process::exit(1);
    }

    let (_, replay) = runner.finish();
    if let Some(path) = record {
        if let Err(e) = replay.save(path) {
            eprintln!("Failed to save replay: {e}");
            std::process::exit(1);
        }
        eprintln!("Replay saved to {}", path.display());
    }
}

/// Check determinism of a scenario
fn cmd_verify(scenario: Option<&Path>, runs: usize, ticks: Option<u32>) {
    let scenario = load_scenario(scenario);
    let ticks = ticks.unwrap_or(scenario.ticks);
    tracing::info!(
        "Verifying determinism: {} ({} runs, {} ticks)",
        scenario.name,
        runs,
        ticks
    );

    let report = match verify_scenario(&scenario, runs, ticks) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("Verification failed to run: {e}");
            std::process::exit(1);
        }
    };

    if let Ok(json) = serde_json::to_string(&report) {
        println!("{json}");
    }
    if report.is_ok() {
        eprintln!("PASS: All {} runs produced identical results", report.runs);
    } else {
        eprintln!("FAIL: Non-determinism detected!");
        eprintln!("  Runs agree:       {}", report.is_deterministic());
        eprintln!("  Snapshot resumes: {}", report.snapshot_ok);
        eprintln!("  Anticipation:     {}", report.anticipation_ok);
        eprintln!("  Replay:           {}", report.replay_ok);
        std::process::exit(1);
    }
}

/// Verify a recorded game
fn cmd_replay(file: &Path, seek: Option<u32>) {
    tracing::info!("Loading replay: {}", file.display());

    let replay = match Replay::load(file) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Failed to load replay: {e}");
            std::process::exit(1);
        }
    };

    eprintln!("Loaded replay:");
    eprintln!("  Scenario: {}", replay.scenario_id);
    eprintln!("  Actions: {}", replay.action_count());
    eprintln!("  Final tick: {}", replay.final_tick);

    let mut player = match ReplayPlayer::new(replay) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Failed to create replay player: {e}");
            std::process::exit(1);
        }
    };

    if let Some(tick) = seek {
        if let Err(e) = player.seek(tick) {
            eprintln!("Replay failed: {e}");
            std::process::exit(1);
        }
        match render_board(player.core(), &AsciiConfig::default()) {
            Ok(text) => print!("{text}"),
            Err(e) => {
                eprintln!("Failed to render: {e}");
                std::process::exit(1);
            }
        }
        return;
    }

    match player.verify() {
        Ok(true) => {
            eprintln!("PASS: Replay verification successful");
            eprintln!("  Hash: {:016x}", player.replay().final_hash);
        }
        Ok(false) => {
            eprintln!("FAIL: Replay diverged");
            eprintln!("  Expected hash: {:016x}", player.replay().final_hash);
            eprintln!("  Actual hash:   {:016x}", player.core().state_hash());
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("Replay failed: {e}");
            std::process::exit(1);
        }
    }
}

/// Draw the board
fn cmd_render(scenario: Option<&Path>, ticks: u32, color: bool) {
    let scenario = load_scenario(scenario);
    let core = match play_scenario(&scenario, Some(ticks), |_, _| {}) {
        Ok(outcome) => outcome.core,
        Err(e) => {
            eprintln!("Scenario failed: {e}");
            std::process::exit(1);
        }
    };
    let config = AsciiConfig {
        show_legend: true,
        use_color: color,
    };
    match render_board(&core, &config) {
        Ok(text) => print!("{text}"),
        Err(e) => {
            eprintln!("Failed to render: {e}");
            std::process::exit(1);
        }
    }
}
