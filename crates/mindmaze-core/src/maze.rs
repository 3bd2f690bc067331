//! Grid maze model
//!
//! Mazes are carved on a cell grid where odd coordinates are rooms and the
//! cells between them are walls that may be knocked through. Generation is
//! an iterative randomized depth-first search with an explicit stack, so it
//! never recurses and works in `no_std`.

use alloc::vec;
use alloc::vec::Vec;

use rand_core::RngCore;
use serde::{Deserialize, Serialize};

use crate::error::MazeError;
use crate::types::Direction;

/// A single maze cell.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Cell {
    /// Impassable
    Wall,
    /// Walkable
    Path,
}

/// Rectangular maze grid, row-major.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Maze {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl Maze {
    /// Starting cell of the carve and of the player
    pub const START: (usize, usize) = (1, 1);

    /// A grid made entirely of walls.
    ///
    /// # Errors
    ///
    /// Returns [`MazeError::TooSmall`] if either side is below 3 cells.
    pub fn walls(width: usize, height: usize) -> Result<Self, MazeError> {
        if width < 3 || height < 3 {
            return Err(MazeError::TooSmall { width, height });
        }
        Ok(Self { width, height, cells: vec![Cell::Wall; width * height] })
    }

    /// Carve a maze with randomized depth-first search starting at (1, 1).
    ///
    /// # Errors
    ///
    /// Returns [`MazeError::TooSmall`] if either side is below 3 cells.
    pub fn generate<R: RngCore + ?Sized>(
        width: usize,
        height: usize,
        rng: &mut R,
    ) -> Result<Self, MazeError> {
        let mut maze = Self::walls(width, height)?;
        let mut stack = vec![Self::START];

        while let Some(&(x, y)) = stack.last() {
            maze.set(x, y, Cell::Path);

            let neighbors = maze.unvisited_neighbors(x, y);
            if neighbors.is_empty() {
                stack.pop();
                continue;
            }

            let pick = (rng.next_u32() as usize) % neighbors.len();
            let (nx, ny) = neighbors[pick];
            maze.connect((x, y), (nx, ny));
            stack.push((nx, ny));
        }

        Ok(maze)
    }

    /// Build a maze from explicit rows, `'#'` for walls and anything else for paths.
    ///
    /// Intended for fixtures; rows shorter than the first are padded with walls.
    ///
    /// # Errors
    ///
    /// Returns [`MazeError::TooSmall`] if the layout is below 3x3.
    pub fn from_rows(rows: &[&str]) -> Result<Self, MazeError> {
        let height = rows.len();
        let width = rows.first().map_or(0, |r| r.chars().count());
        let mut maze = Self::walls(width, height)?;
        for (y, row) in rows.iter().enumerate() {
            for (x, ch) in row.chars().take(width).enumerate() {
                if ch != '#' {
                    maze.set(x, y, Cell::Path);
                }
            }
        }
        Ok(maze)
    }

    /// Width in cells
    #[inline]
    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Height in cells
    #[inline]
    #[must_use]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Cell at `(x, y)`, or `None` outside the grid
    #[must_use]
    pub fn cell(&self, x: i64, y: i64) -> Option<Cell> {
        if x < 0 || y < 0 {
            return None;
        }
        let (x, y) = (x as usize, y as usize);
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.cells[y * self.width + x])
    }

    /// True if `(x, y)` is inside the grid and walkable
    #[must_use]
    pub fn is_path(&self, x: i64, y: i64) -> bool {
        self.cell(x, y) == Some(Cell::Path)
    }

    /// Destination of a one-cell move, if it lands on a path
    #[must_use]
    pub fn step(&self, from: (usize, usize), direction: Direction) -> Option<(usize, usize)> {
        let (dx, dy) = direction.delta();
        let nx = from.0 as i64 + i64::from(dx);
        let ny = from.1 as i64 + i64::from(dy);
        self.is_path(nx, ny).then_some((nx as usize, ny as usize))
    }

    /// Iterate rows of cells, top to bottom
    pub fn rows(&self) -> impl Iterator<Item = &[Cell]> {
        self.cells.chunks(self.width)
    }

    /// Number of path cells
    #[must_use]
    pub fn path_count(&self) -> usize {
        self.cells.iter().filter(|&&c| c == Cell::Path).count()
    }

    fn set(&mut self, x: usize, y: usize, cell: Cell) {
        self.cells[y * self.width + x] = cell;
    }

    fn is_wall(&self, x: usize, y: usize) -> bool {
        self.cells[y * self.width + x] == Cell::Wall
    }

    /// Rooms two cells away that have not been carved yet.
    ///
    /// Candidates must stay strictly inside the border so the outer ring
    /// remains wall for even grid sizes too.
    fn unvisited_neighbors(&self, x: usize, y: usize) -> Vec<(usize, usize)> {
        let mut out = Vec::with_capacity(4);
        if x > 1 && self.is_wall(x - 2, y) {
            out.push((x - 2, y));
        }
        if x + 2 < self.width - 1 && self.is_wall(x + 2, y) {
            out.push((x + 2, y));
        }
        if y > 1 && self.is_wall(x, y - 2) {
            out.push((x, y - 2));
        }
        if y + 2 < self.height - 1 && self.is_wall(x, y + 2) {
            out.push((x, y + 2));
        }
        out
    }

    /// Knock through the wall between two rooms
    fn connect(&mut self, from: (usize, usize), to: (usize, usize)) {
        let (x, y) = from;
        let (nx, ny) = to;
        if nx == x {
            self.set(x, y.min(ny) + 1, Cell::Path);
        } else {
            self.set(x.min(nx) + 1, y, Cell::Path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::collections::VecDeque;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn reachable_from_start(maze: &Maze) -> usize {
        let mut seen = vec![false; maze.width() * maze.height()];
        let mut queue = VecDeque::from([Maze::START]);
        seen[Maze::START.1 * maze.width() + Maze::START.0] = true;
        let mut count = 0;
        while let Some(pos) = queue.pop_front() {
            count += 1;
            for dir in Direction::ALL {
                if let Some((nx, ny)) = maze.step(pos, dir) {
                    let idx = ny * maze.width() + nx;
                    if !seen[idx] {
                        seen[idx] = true;
                        queue.push_back((nx, ny));
                    }
                }
            }
        }
        count
    }

    #[test]
    fn test_rejects_tiny_grid() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(
            Maze::generate(2, 9, &mut rng),
            Err(MazeError::TooSmall { width: 2, height: 9 })
        );
    }

    #[test]
    fn test_generated_maze_is_connected_and_walled() {
        for seed in 0..8 {
            let mut rng = StdRng::seed_from_u64(seed);
            // Screen 800x600 with a 100px border and 40px cells
            let maze = Maze::generate(15, 10, &mut rng).unwrap();

            assert!(maze.is_path(1, 1));
            let (w, h) = (maze.width() as i64, maze.height() as i64);
            for x in 0..w {
                assert!(!maze.is_path(x, 0));
                assert!(!maze.is_path(x, h - 1));
            }
            for y in 0..h {
                assert!(!maze.is_path(0, y));
                assert!(!maze.is_path(w - 1, y));
            }
            assert_eq!(reachable_from_start(&maze), maze.path_count());
        }
    }

    #[test]
    fn test_odd_maze_carves_every_room() {
        let mut rng = StdRng::seed_from_u64(42);
        let maze = Maze::generate(11, 9, &mut rng).unwrap();
        for y in (1..9).step_by(2) {
            for x in (1..11).step_by(2) {
                assert!(maze.is_path(x, y), "room ({x}, {y}) not carved");
            }
        }
        // A perfect maze over 5x4 rooms has rooms + (rooms - 1) path cells
        assert_eq!(maze.path_count(), 20 + 19);
    }

    #[test]
    fn test_step_and_bounds() {
        let maze = Maze::from_rows(&["#####", "#..##", "#.###", "#####"]).unwrap();
        assert_eq!(maze.step((1, 1), Direction::Right), Some((2, 1)));
        assert_eq!(maze.step((1, 1), Direction::Down), Some((1, 2)));
        assert_eq!(maze.step((1, 1), Direction::Up), None);
        assert!(!maze.is_path(-1, 1));
        assert!(!maze.is_path(1, 99));
    }
}
