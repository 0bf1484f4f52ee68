//! Game-rules collaborator.
//!
//! The move-selection core only ever looks at what these rules return: the
//! slid grid, the points gained and whether any move is left. `ClassicRules`
//! is the standard 2048 rule set.

use crate::game::direction::Direction;
use crate::game::game_state::GameState;
use crate::game::grid::{Grid, GRID_SIZE};
use crate::game::tile::{Tile, WINNING_TILE_VALUE};
use rand::{Rng, RngCore};

/// Result of sliding a grid in one direction, before any tile spawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlideOutcome {
    pub grid: Grid,
    pub score_gained: u64,
    /// Largest value created by a merge, `0` when nothing merged.
    pub merged_max: u32,
}

/// Callbacks the rules fire on the live game. All no-ops by default.
#[derive(Clone, Copy)]
pub struct RulesHooks {
    pub on_actuate: fn(&GameState),
    pub on_game_over: fn(&GameState),
}

fn ignore_state(_: &GameState) {}

impl std::fmt::Debug for RulesHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RulesHooks").finish_non_exhaustive()
    }
}

impl Default for RulesHooks {
    fn default() -> Self {
        Self {
            on_actuate: ignore_state,
            on_game_over: ignore_state,
        }
    }
}

pub trait GameRules {
    /// Slide and merge every tile towards `direction`.
    fn slide(&self, grid: &Grid, direction: Direction) -> SlideOutcome;

    /// Whether at least one direction would change the grid.
    fn moves_available(&self, grid: &Grid) -> bool;

    /// Put a new tile on a random empty cell. Returns `None` on a full grid.
    fn spawn_tile(&self, grid: &mut Grid, rng: &mut dyn RngCore) -> Option<Tile>;

    fn start_tiles(&self) -> usize {
        2
    }

    fn winning_value(&self) -> u32 {
        WINNING_TILE_VALUE
    }

    fn hooks(&self) -> RulesHooks {
        RulesHooks::default()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ClassicRules {
    /// Probability that a spawned tile is a 2 rather than a 4.
    pub two_probability: f64,
    pub hooks: RulesHooks,
}

impl Default for ClassicRules {
    fn default() -> Self {
        Self {
            two_probability: 0.9,
            hooks: RulesHooks::default(),
        }
    }
}

impl ClassicRules {
    pub fn with_hooks(hooks: RulesHooks) -> Self {
        Self {
            hooks,
            ..Self::default()
        }
    }
}

fn traversal(step: i32) -> [usize; GRID_SIZE] {
    if step == 1 {
        [3, 2, 1, 0]
    } else {
        [0, 1, 2, 3]
    }
}

/// Last empty cell before an obstacle, plus the cell right after it.
fn farthest_position(grid: &Grid, x: usize, y: usize, dx: i32, dy: i32) -> ((usize, usize), (i32, i32)) {
    let mut previous = (x as i32, y as i32);
    loop {
        let next = (previous.0 + dx, previous.1 + dy);
        if !Grid::within_bounds(next.0, next.1) || grid.cells[next.0 as usize][next.1 as usize].is_some() {
            return ((previous.0 as usize, previous.1 as usize), next);
        }
        previous = next;
    }
}

impl GameRules for ClassicRules {
    fn slide(&self, grid: &Grid, direction: Direction) -> SlideOutcome {
        let (dx, dy) = direction.vector();
        let mut result = *grid;
        let mut merged = [[false; GRID_SIZE]; GRID_SIZE];
        let mut score_gained = 0u64;
        let mut merged_max = 0u32;

        for x in traversal(dx) {
            for y in traversal(dy) {
                let tile = match result.cells[x][y] {
                    Some(tile) => tile,
                    None => continue,
                };
                let ((fx, fy), (nx, ny)) = farthest_position(&result, x, y, dx, dy);

                if Grid::within_bounds(nx, ny) {
                    let (nx, ny) = (nx as usize, ny as usize);
                    if let Some(other) = result.cells[nx][ny] {
                        if other.value == tile.value && !merged[nx][ny] {
                            let value = tile.value * 2;
                            result.cells[x][y] = None;
                            result.cells[nx][ny] = Some(Tile::new(value, nx, ny));
                            merged[nx][ny] = true;
                            score_gained += u64::from(value);
                            merged_max = merged_max.max(value);
                            continue;
                        }
                    }
                }

                if (fx, fy) != (x, y) {
                    result.cells[x][y] = None;
                    result.cells[fx][fy] = Some(Tile::new(tile.value, fx, fy));
                }
            }
        }

        SlideOutcome {
            grid: result,
            score_gained,
            merged_max,
        }
    }

    fn moves_available(&self, grid: &Grid) -> bool {
        for x in 0..GRID_SIZE {
            for y in 0..GRID_SIZE {
                let value = match grid.cells[x][y] {
                    Some(tile) => tile.value,
                    None => return true,
                };
                if x + 1 < GRID_SIZE && grid.value_at(x + 1, y) == value {
                    return true;
                }
                if y + 1 < GRID_SIZE && grid.value_at(x, y + 1) == value {
                    return true;
                }
            }
        }
        false
    }

    fn spawn_tile(&self, grid: &mut Grid, rng: &mut dyn RngCore) -> Option<Tile> {
        let available = grid.available_cells();
        if available.is_empty() {
            return None;
        }
        let position = available[rng.random_range(0..available.len())];
        let value = if rng.random::<f64>() < self.two_probability { 2 } else { 4 };
        let tile = Tile::new(value, position.x, position.y);
        grid.insert(tile);
        Some(tile)
    }

    fn hooks(&self) -> RulesHooks {
        self.hooks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn grid(rows: [[u32; 4]; 4]) -> Grid {
        Grid::from_rows(rows).unwrap()
    }

    #[test]
    fn test_slide_left_merges_once_per_tile() {
        let rules = ClassicRules::default();
        let outcome = rules.slide(&grid([[2, 2, 2, 2], [0; 4], [0; 4], [0; 4]]), Direction::Left);
        assert_eq!(outcome.grid.to_rows()[0], [4, 4, 0, 0]);
        assert_eq!(outcome.score_gained, 8);
        assert_eq!(outcome.merged_max, 4);
    }

    #[test]
    fn test_slide_right_merges_from_the_far_side() {
        let rules = ClassicRules::default();
        let outcome = rules.slide(&grid([[2, 2, 2, 0], [0; 4], [0; 4], [0; 4]]), Direction::Right);
        assert_eq!(outcome.grid.to_rows()[0], [0, 0, 2, 4]);
        assert_eq!(outcome.score_gained, 4);
    }

    #[test]
    fn test_slide_up_and_down_move_columns() {
        let rules = ClassicRules::default();
        let start = grid([[0, 0, 0, 0], [4, 0, 0, 0], [0, 0, 0, 0], [4, 0, 0, 8]]);
        let up = rules.slide(&start, Direction::Up);
        assert_eq!(up.grid.to_rows()[0], [8, 0, 0, 8]);
        assert_eq!(up.score_gained, 8);

        let down = rules.slide(&start, Direction::Down);
        assert_eq!(down.grid.to_rows()[3], [8, 0, 0, 8]);
    }

    #[test]
    fn test_slide_updates_tile_positions() {
        let rules = ClassicRules::default();
        let outcome = rules.slide(&grid([[0, 0, 0, 2], [0; 4], [0; 4], [0; 4]]), Direction::Left);
        let tile = outcome.grid.cell(0, 0).unwrap();
        assert_eq!((tile.position.x, tile.position.y), (0, 0));
    }

    #[test]
    fn test_merged_tiles_do_not_merge_again() {
        let rules = ClassicRules::default();
        let outcome = rules.slide(&grid([[4, 2, 2, 0], [0; 4], [0; 4], [0; 4]]), Direction::Left);
        assert_eq!(outcome.grid.to_rows()[0], [4, 4, 0, 0]);
    }

    #[test]
    fn test_moves_available() {
        let rules = ClassicRules::default();
        let locked = grid([[2, 4, 2, 4], [4, 2, 4, 2], [2, 4, 2, 4], [4, 2, 4, 2]]);
        assert!(!rules.moves_available(&locked));

        let mergeable = grid([[2, 4, 2, 4], [4, 2, 4, 2], [2, 4, 2, 4], [4, 2, 4, 4]]);
        assert!(rules.moves_available(&mergeable));
    }

    #[test]
    fn test_spawn_fills_an_empty_cell() {
        let rules = ClassicRules::default();
        let mut rng = StdRng::seed_from_u64(3);
        let mut board = grid([[2, 4, 2, 4], [4, 2, 4, 2], [2, 4, 2, 4], [4, 2, 4, 0]]);
        let tile = rules.spawn_tile(&mut board, &mut rng).unwrap();
        assert_eq!((tile.position.x, tile.position.y), (3, 3));
        assert!(tile.value == 2 || tile.value == 4);
        assert!(rules.spawn_tile(&mut board, &mut rng).is_none());
    }
}
