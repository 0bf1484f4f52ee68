use crate::game::tile::{is_valid_tile_value, Position, Tile};
use crate::{Auto2048Error, Result};
use serde::{Deserialize, Serialize};

/// Side length of the board.
pub const GRID_SIZE: usize = 4;

/// Number of cells on the board.
pub const CELL_COUNT: usize = GRID_SIZE * GRID_SIZE;

/// Board cells, addressed as `cells[x][y]` (column first).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Grid {
    pub cells: [[Option<Tile>; GRID_SIZE]; GRID_SIZE],
}

impl Default for Grid {
    fn default() -> Self {
        Self::empty()
    }
}

impl Grid {
    pub fn empty() -> Self {
        Self {
            cells: [[None; GRID_SIZE]; GRID_SIZE],
        }
    }

    /// Build a grid from row-major values (`rows[y][x]`, `0` = empty).
    pub fn from_rows(rows: [[u32; GRID_SIZE]; GRID_SIZE]) -> Result<Self> {
        let mut grid = Self::empty();
        for (y, row) in rows.iter().enumerate() {
            for (x, &value) in row.iter().enumerate() {
                if value == 0 {
                    continue;
                }
                if !is_valid_tile_value(value) {
                    return Err(Auto2048Error::Game(format!(
                        "invalid tile value {} at ({}, {})",
                        value, x, y
                    )));
                }
                grid.cells[x][y] = Some(Tile::new(value, x, y));
            }
        }
        Ok(grid)
    }

    /// Row-major values (`rows[y][x]`, `0` = empty).
    pub fn to_rows(&self) -> [[u32; GRID_SIZE]; GRID_SIZE] {
        let mut rows = [[0; GRID_SIZE]; GRID_SIZE];
        for (y, row) in rows.iter_mut().enumerate() {
            for (x, value) in row.iter_mut().enumerate() {
                *value = self.value_at(x, y);
            }
        }
        rows
    }

    /// Flat row-major values, index `y * GRID_SIZE + x`.
    pub fn values(&self) -> [u32; CELL_COUNT] {
        let mut values = [0; CELL_COUNT];
        for y in 0..GRID_SIZE {
            for x in 0..GRID_SIZE {
                values[y * GRID_SIZE + x] = self.value_at(x, y);
            }
        }
        values
    }

    pub fn cell(&self, x: usize, y: usize) -> Option<Tile> {
        self.cells[x][y]
    }

    pub fn value_at(&self, x: usize, y: usize) -> u32 {
        self.cells[x][y].map_or(0, |tile| tile.value)
    }

    pub fn within_bounds(x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as usize) < GRID_SIZE && (y as usize) < GRID_SIZE
    }

    pub fn insert(&mut self, tile: Tile) {
        self.cells[tile.position.x][tile.position.y] = Some(tile);
    }

    /// Position of the single tile that `after` gained over `self`, if the
    /// two grids differ by exactly one spawn: a cell empty here that holds
    /// a 2 or a 4 in `after`, with every other cell unchanged.
    pub fn spawned_cell(&self, after: &Grid) -> Option<Position> {
        let mut spawned = None;
        for x in 0..GRID_SIZE {
            for y in 0..GRID_SIZE {
                match (self.value_at(x, y), after.value_at(x, y)) {
                    (before, now) if before == now => {}
                    (0, 2 | 4) if spawned.is_none() => spawned = Some(Position { x, y }),
                    _ => return None,
                }
            }
        }
        spawned
    }

    pub fn available_cells(&self) -> Vec<Position> {
        let mut available = Vec::new();
        for x in 0..GRID_SIZE {
            for y in 0..GRID_SIZE {
                if self.cells[x][y].is_none() {
                    available.push(Position { x, y });
                }
            }
        }
        available
    }

    pub fn tiles(&self) -> impl Iterator<Item = Tile> + '_ {
        self.cells.iter().flatten().filter_map(|cell| *cell)
    }

    pub fn occupied_count(&self) -> usize {
        self.tiles().count()
    }

    pub fn max_value(&self) -> u32 {
        self.tiles().map(|tile| tile.value).max().unwrap_or(0)
    }

    /// Cell-by-cell value equality, ignoring anything but the values.
    pub fn values_equal(&self, other: &Grid) -> bool {
        self.values() == other.values()
    }
}

impl std::fmt::Display for Grid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for row in self.to_rows() {
            let line: Vec<String> = row
                .iter()
                .map(|&value| {
                    if value == 0 {
                        format!("{:>5}", ".")
                    } else {
                        format!("{:>5}", value)
                    }
                })
                .collect();
            writeln!(f, "{}", line.join(""))?;
        }
        Ok(())
    }
}
