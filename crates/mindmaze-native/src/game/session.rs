//! Game state advanced once per rendered frame

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::debug;

use mindmaze_core::{Direction, Maze, MazeError, StimulusTarget};

use super::layout::GameLayout;
use super::player::Player;
use super::stimulus::FlickeringStimulus;
use crate::classifier::MovementQueue;

/// What a frame did with a queued movement
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct QueuedMove {
    /// Direction taken from the queue
    pub direction: Direction,
    /// Whether the player actually moved (false when blocked by a wall)
    pub moved: bool,
}

/// Maze, player, stimuli and the optional classifier feed.
#[derive(Debug)]
pub struct GameSession {
    layout: GameLayout,
    maze: Maze,
    player: Player,
    stimuli: Vec<FlickeringStimulus>,
    queue: Option<MovementQueue>,
    elapsed_ms: f64,
    moves: u64,
}

impl GameSession {
    /// Generate a maze for `layout` and place the stimuli around it.
    ///
    /// # Errors
    ///
    /// Returns [`MazeError::TooSmall`] if the layout leaves less than 3x3
    /// cells inside the border.
    pub fn new(layout: GameLayout, targets: &[StimulusTarget], seed: u64) -> Result<Self, MazeError> {
        let (w, h) = layout.maze_size();
        let mut rng = StdRng::seed_from_u64(seed);
        let maze = Maze::generate(w, h, &mut rng)?;
        debug!(width = w, height = h, paths = maze.path_count(), "Generated maze");
        Ok(Self::with_maze(layout, maze, targets))
    }

    /// Build a session around an existing maze
    #[must_use]
    pub fn with_maze(layout: GameLayout, maze: Maze, targets: &[StimulusTarget]) -> Self {
        let stimuli = targets
            .iter()
            .map(|t| FlickeringStimulus::new(*t, layout.stimulus_center(t.direction)))
            .collect();
        Self {
            layout,
            maze,
            player: Player::at_start(),
            stimuli,
            queue: None,
            elapsed_ms: 0.0,
            moves: 0,
        }
    }

    /// Feed movements from a classifier
    #[must_use]
    pub fn with_queue(mut self, queue: MovementQueue) -> Self {
        self.queue = Some(queue);
        self
    }

    /// Keyboard input
    pub fn handle_key(&mut self, direction: Direction) -> bool {
        self.apply(direction)
    }

    /// Advance one frame: consume at most one queued movement and update the
    /// flicker timers. Never blocks.
    pub fn tick(&mut self, dt_ms: f64) -> Option<QueuedMove> {
        self.elapsed_ms += dt_ms;

        let pending = self.queue.as_ref().and_then(MovementQueue::try_pop);
        let queued = pending.map(|direction| QueuedMove { direction, moved: self.apply(direction) });

        for stimulus in &mut self.stimuli {
            stimulus.update(dt_ms);
        }
        queued
    }

    fn apply(&mut self, direction: Direction) -> bool {
        let moved = self.player.try_move(&self.maze, direction);
        if moved {
            self.moves += 1;
        }
        moved
    }

    /// Screen layout
    #[must_use]
    pub fn layout(&self) -> &GameLayout {
        &self.layout
    }

    /// The maze
    #[must_use]
    pub fn maze(&self) -> &Maze {
        &self.maze
    }

    /// The player
    #[must_use]
    pub fn player(&self) -> &Player {
        &self.player
    }

    /// Stimuli in target order
    #[must_use]
    pub fn stimuli(&self) -> &[FlickeringStimulus] {
        &self.stimuli
    }

    /// Whether a classifier is attached
    #[must_use]
    pub fn has_classifier(&self) -> bool {
        self.queue.is_some()
    }

    /// Time since the session started (s)
    #[must_use]
    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed_ms / 1000.0
    }

    /// Successful moves so far
    #[must_use]
    pub fn moves(&self) -> u64 {
        self.moves
    }
}
