//! Maze game model
//!
//! Everything here is independent of the renderer: the session is advanced
//! by calling [`GameSession::tick`] once per frame with the frame time, and
//! keyboard input goes through [`GameSession::handle_key`].

pub mod layout;
pub mod player;
pub mod session;
pub mod stimulus;

pub use layout::GameLayout;
pub use player::Player;
pub use session::{GameSession, QueuedMove};
pub use stimulus::FlickeringStimulus;
