//! Screen geometry

use serde::{Deserialize, Serialize};

use mindmaze_core::Direction;

/// Screen size, maze cell size and the border that holds the stimuli.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameLayout {
    /// Window width (px)
    pub width: u32,
    /// Window height (px)
    pub height: u32,
    /// Maze cell edge (px)
    pub cell_size: u32,
    /// Gap around the maze (px)
    pub border: u32,
}

impl Default for GameLayout {
    fn default() -> Self {
        Self { width: 800, height: 600, cell_size: 40, border: 100 }
    }
}

impl GameLayout {
    /// Maze dimensions in cells that fit inside the border
    #[must_use]
    pub fn maze_size(&self) -> (usize, usize) {
        let inner = |side: u32| (side.saturating_sub(2 * self.border) / self.cell_size.max(1)) as usize;
        (inner(self.width), inner(self.height))
    }

    /// Top-left corner of maze cell `(x, y)` in pixels
    #[must_use]
    pub fn cell_origin(&self, x: usize, y: usize) -> (f32, f32) {
        let c = self.cell_size as f32;
        (self.border as f32 + x as f32 * c, self.border as f32 + y as f32 * c)
    }

    /// Centre of the border strip on the side a direction points to
    #[must_use]
    pub fn stimulus_center(&self, direction: Direction) -> (f32, f32) {
        let (w, h) = (self.width as f32, self.height as f32);
        let b = (self.border / 2) as f32;
        match direction {
            Direction::Up => (w / 2.0, b),
            Direction::Right => (w - b, h / 2.0),
            Direction::Down => (w / 2.0, h - b),
            Direction::Left => (b, h / 2.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_maze_size() {
        assert_eq!(GameLayout::default().maze_size(), (15, 10));
        let large = GameLayout { width: 1200, height: 800, ..GameLayout::default() };
        assert_eq!(large.maze_size(), (25, 15));
    }

    #[test]
    fn test_stimuli_sit_in_border() {
        let layout = GameLayout::default();
        assert_eq!(layout.stimulus_center(Direction::Up), (400.0, 50.0));
        assert_eq!(layout.stimulus_center(Direction::Right), (750.0, 300.0));
        assert_eq!(layout.stimulus_center(Direction::Down), (400.0, 550.0));
        assert_eq!(layout.stimulus_center(Direction::Left), (50.0, 300.0));
        assert_eq!(layout.cell_origin(1, 1), (140.0, 140.0));
    }
}
