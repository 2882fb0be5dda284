//! ASCII board renderer for quick terminal review.
//!
//! One character per tile, top row first. The highest occupied layer wins:
//!
//! ```text
//! A a   air unit
//! T t   land unit
//! W w   hover unit
//! B b   built building
//! +     building not yet built
//! *     environment building
//! .     empty
//! ```
//!
//! Player 1 draws in uppercase, every other player in lowercase.

use std::fmt::Write as _;

use gridlock_core::prelude::*;

/// ASCII rendering configuration.
#[derive(Debug, Clone)]
pub struct AsciiConfig {
    /// Append a per-player summary below the board.
    pub show_legend: bool,
    /// Use colored output (ANSI).
    pub use_color: bool,
}

impl Default for AsciiConfig {
    fn default() -> Self {
        Self {
            show_legend: true,
            use_color: false,
        }
    }
}

/// ANSI color codes.
mod colors {
    pub const RESET: &str = "\x1b[0m";
    pub const DIM: &str = "\x1b[2m";

    pub const BLUE: &str = "\x1b[34m";
    pub const RED: &str = "\x1b[31m";
    pub const GREEN: &str = "\x1b[32m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const MAGENTA: &str = "\x1b[35m";
    pub const CYAN: &str = "\x1b[36m";

    pub const PLAYERS: [&str; 4] = [BLUE, RED, GREEN, YELLOW];
}

fn player_color(player: u8) -> &'static str {
    match player {
        0 => colors::CYAN,
        p => colors::PLAYERS
            .get(usize::from(p - 1))
            .copied()
            .unwrap_or(colors::MAGENTA),
    }
}

fn cased(glyph: char, player: u8) -> char {
    if player == 1 {
        glyph
    } else {
        glyph.to_ascii_lowercase()
    }
}

/// The glyph and owner shown for one tile.
fn tile_glyph(core: &Core, tile: &TileRow) -> Result<Option<(char, u8)>> {
    if let Some(unit) = tile.unit_at(Layer::Air) {
        return Ok(Some((cased('A', unit.player), unit.player)));
    }
    if let Some(unit) = tile.unit_at(Layer::Land) {
        return Ok(Some((cased('T', unit.player), unit.player)));
    }
    if let Some(unit) = tile.unit_at(Layer::Hover) {
        return Ok(Some((cased('W', unit.player), unit.player)));
    }
    if let Some(building) = tile.building_at() {
        let glyph = if building.player == 0 {
            '*'
        } else if core.building_state(building.player, building.id)? == BuildingState::Built {
            cased('B', building.player)
        } else {
            '+'
        };
        return Ok(Some((glyph, building.player)));
    }
    Ok(None)
}

/// Render the board of `core`.
pub fn render_board(core: &Core, config: &AsciiConfig) -> Result<String> {
    let meta = core.meta()?;
    let mut out = String::new();
    let _ = writeln!(
        out,
        "tick {}  {}x{}",
        core.current_tick(),
        meta.board_width,
        meta.board_height
    );

    for y in 0..meta.board_height {
        for x in 0..meta.board_width {
            let tile = core.tile(Point::from_u16(x, y))?;
            match tile_glyph(core, &tile)? {
                Some((glyph, player)) if config.use_color => {
                    let _ = write!(out, "{}{glyph}{}", player_color(player), colors::RESET);
                }
                Some((glyph, _)) => out.push(glyph),
                None if config.use_color => {
                    let _ = write!(out, "{}.{}", colors::DIM, colors::RESET);
                }
                None => out.push('.'),
            }
        }
        out.push('\n');
    }

    if config.show_legend {
        render_legend(core, meta.player_count, config, &mut out)?;
    }
    Ok(out)
}

fn render_legend(core: &Core, player_count: u8, config: &AsciiConfig, out: &mut String) -> Result<()> {
    for player in 1..=player_count {
        let row = core.player(player)?;
        let alive = core.alive_units(player)?.len();
        let (start, end) = if config.use_color {
            (player_color(player), colors::RESET)
        } else {
            ("", "")
        };
        let _ = writeln!(
            out,
            "{start}P{player}{end}  units {alive}  resource {}/{}  compute {}/{}",
            row.cur_resource, row.max_resource, row.compute_demand, row.compute_supply
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::Scenario;

    fn plain() -> AsciiConfig {
        AsciiConfig {
            show_legend: false,
            use_color: false,
        }
    }

    #[test]
    fn test_render_dimensions() {
        let (core, _) = Scenario::skirmish().genesis().unwrap();
        let text = render_board(&core, &plain()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "tick 0  32x32");
        assert_eq!(lines.len(), 33);
        assert!(lines[1..].iter().all(|line| line.len() == 32));
    }

    #[test]
    fn test_render_glyphs() {
        let (core, _) = Scenario::skirmish().genesis().unwrap();
        let text = render_board(&core, &plain()).unwrap();
        let rows: Vec<Vec<char>> = text.lines().skip(1).map(|l| l.chars().collect()).collect();

        // Cores and crystal fields.
        assert_eq!(rows[1][6], 'B');
        assert_eq!(rows[28][23], 'b');
        assert_eq!(rows[10][2], '*');

        let count = |c: char| rows.iter().flatten().filter(|&&g| g == c).count();
        assert_eq!(count('W'), 2);
        assert_eq!(count('w'), 2);
        assert_eq!(count('T'), 1);
        assert_eq!(count('a'), 1);
    }

    #[test]
    fn test_unbuilt_building_glyph() {
        let (mut core, ids) = Scenario::skirmish().genesis().unwrap();
        let depot = ids.building("depot").unwrap();
        core.place_building(1, depot, 10, 5).unwrap();
        let text = render_board(&core, &plain()).unwrap();
        let row: Vec<char> = text.lines().nth(6).unwrap().chars().collect();
        assert_eq!(row[10], '+');
    }

    #[test]
    fn test_legend_and_color() {
        let (core, _) = Scenario::skirmish().genesis().unwrap();
        let text = render_board(&core, &AsciiConfig::default()).unwrap();
        assert!(text.contains("P1  units 4  resource 200/"));
        assert!(text.contains("P2  units 4"));
        assert!(!text.contains('\x1b'));

        let colored = render_board(
            &core,
            &AsciiConfig {
                show_legend: false,
                use_color: true,
            },
        )
        .unwrap();
        assert!(colored.contains("\x1b[34mB\x1b[0m"));
    }
}
