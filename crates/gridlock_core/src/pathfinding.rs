//! Greedy bounded-depth pathfinding.
//!
//! Units never plan a full route. Each tick a moving unit takes the single
//! step that minimises its Chebyshev distance to the target area, looking
//! `depth` steps ahead. Ties are broken by path length and then Manhattan
//! distance, and candidate steps are always tried in the same order, so the
//! chosen step is a pure function of the board.

use tracing::trace;

use crate::board::{Layer, ObjectType};
use crate::command::CommandPath;
use crate::error::Result;
use crate::geometry::{Area, Point};
use crate::simulation::Core;
use crate::storage::Datastore;

/// Candidate steps in priority order: orthogonal first, then diagonal.
pub const STEPS: [Point; 8] = [
    Point::new(0, -1),
    Point::new(1, 0),
    Point::new(0, 1),
    Point::new(-1, 0),
    Point::new(1, -1),
    Point::new(1, 1),
    Point::new(-1, 1),
    Point::new(-1, -1),
];

/// Outcome of a greedy search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathStep {
    /// First step to take; zero when staying put is best.
    pub step: Point,
    /// Position after that first step.
    pub position: Point,
    /// Best Chebyshev distance to the target reachable within the depth.
    pub distance: i32,
    /// Number of steps to reach that distance.
    pub path_length: i32,
}

/// A unit matched by distance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NearestMatch {
    /// Matched unit id.
    pub id: u8,
    /// Chebyshev distance to the area.
    pub distance: i32,
}

impl<S: Datastore> Core<S> {
    /// True if a unit on `layer` may enter `position`.
    ///
    /// Hover units only collide with hover units. Land units collide with
    /// anything on land and with air units. Air units collide with air units
    /// and land units, but fly over buildings.
    pub fn unit_can_move_to(&self, position: Point, layer: Layer) -> Result<bool> {
        if !self.is_in_board(position)? {
            return Ok(false);
        }
        let tile = self.tile(position)?;
        Ok(match layer {
            Layer::Hover => tile.is_empty(Layer::Hover),
            Layer::Land => tile.is_empty(Layer::Land) && tile.is_empty(Layer::Air),
            Layer::Air => {
                tile.is_empty(Layer::Air) && tile.land_object_type != ObjectType::Unit
            }
        })
    }

    /// Search up to `depth` steps ahead for the best first step towards
    /// `target`.
    pub fn greedy_path_find(
        &self,
        layer: Layer,
        position: Point,
        target: Area,
        depth: u32,
        path_length: i32,
    ) -> Result<PathStep> {
        let mut best = PathStep {
            step: Point::ZERO,
            position,
            distance: position.distance_to_area(target),
            path_length,
        };
        if best.distance == 0 || depth == 0 {
            return Ok(best);
        }

        for step in STEPS {
            let candidate = position.offset(step);
            if !self.unit_can_move_to(candidate, layer)? {
                continue;
            }
            let ahead = self.greedy_path_find(layer, candidate, target, depth - 1, path_length + 1)?;

            let replace = if ahead.distance < best.distance {
                true
            } else if ahead.distance == best.distance {
                if ahead.path_length < best.path_length {
                    true
                } else if candidate.manhattan_to_area(target)
                    < best.position.manhattan_to_area(target)
                {
                    ahead.path_length == best.path_length
                        || (best.step == Point::ZERO && ahead.path_length == best.path_length + 1)
                } else {
                    false
                }
            } else {
                false
            };

            if replace {
                best = PathStep {
                    step,
                    position: candidate,
                    distance: ahead.distance,
                    path_length: ahead.path_length,
                };
                if depth == 1 && ahead.distance == 0 {
                    break;
                }
            }
        }
        Ok(best)
    }

    /// Move a unit one step towards `target`, following its waypoint path
    /// first if it is a fighter. Returns the unit's new position.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub(crate) fn move_unit_to_target(&mut self, player: u8, unit: u8, target: Area) -> Result<Point> {
        let mut row = self.unit(player, unit)?;
        let proto = self.unit_prototype(row.unit_type)?;
        let position = row.position();
        if target.contains(position) {
            return Ok(position);
        }

        let mut target = target;
        if !proto.is_worker {
            let mut path = CommandPath::from_raw(row.command_extra, row.command_meta);
            if !path.is_empty() {
                while let Some(waypoint) = path.current() {
                    let waypoint_area = Area::around(waypoint, 1);
                    if waypoint_area.contains(position) {
                        path.advance();
                    } else {
                        target = waypoint_area;
                        break;
                    }
                }
                row.command_meta = path.meta();
                self.set_unit(player, unit, &row)?;
            }
        }

        let next = self
            .greedy_path_find(proto.layer, position, target, 1, 0)?
            .position;
        if next == position {
            return Ok(position);
        }

        self.update_tile(position, |t| t.clear(proto.layer))?;
        self.update_tile(next, |t| t.set_unit(proto.layer, player, unit))?;
        row.x = next.x as u16;
        row.y = next.y as u16;
        self.set_unit(player, unit, &row)?;
        trace!(player, unit, x = next.x, y = next.y, "Unit moved");
        Ok(next)
    }

    /// The first unit among `candidates` with the smallest distance to
    /// `area`.
    pub fn nearest_unit(
        &self,
        player: u8,
        candidates: &[u8],
        area: Area,
    ) -> Result<Option<NearestMatch>> {
        let mut nearest: Option<NearestMatch> = None;
        for &id in candidates {
            let distance = self.unit(player, id)?.position().distance_to_area(area);
            if nearest.map_or(true, |m| distance < m.distance) {
                nearest = Some(NearestMatch { id, distance });
            }
            if distance == 0 {
                break;
            }
        }
        Ok(nearest)
    }
}
