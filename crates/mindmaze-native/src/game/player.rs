//! Player token

use serde::{Deserialize, Serialize};

use mindmaze_core::{Direction, Maze};

/// Player position on the maze grid.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    x: usize,
    y: usize,
}

impl Player {
    /// Player at the maze start cell
    #[must_use]
    pub fn at_start() -> Self {
        let (x, y) = Maze::START;
        Self { x, y }
    }

    /// Grid position `(x, y)`
    #[must_use]
    pub fn position(&self) -> (usize, usize) {
        (self.x, self.y)
    }

    /// Move one cell if the destination is a path. Returns whether it moved.
    pub fn try_move(&mut self, maze: &Maze, direction: Direction) -> bool {
        match maze.step((self.x, self.y), direction) {
            Some((x, y)) => {
                self.x = x;
                self.y = y;
                true
            }
            None => false,
        }
    }
}

impl Default for Player {
    fn default() -> Self {
        Self::at_start()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_moves_only_onto_paths() {
        let maze = Maze::from_rows(&["#####", "#...#", "#.###", "#####"]).unwrap();
        let mut player = Player::at_start();
        assert_eq!(player.position(), (1, 1));

        assert!(!player.try_move(&maze, Direction::Up));
        assert!(!player.try_move(&maze, Direction::Left));
        assert_eq!(player.position(), (1, 1));

        assert!(player.try_move(&maze, Direction::Right));
        assert!(player.try_move(&maze, Direction::Right));
        assert!(!player.try_move(&maze, Direction::Right));
        assert_eq!(player.position(), (3, 1));
    }
}
