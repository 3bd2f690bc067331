//! Online classification loop
//!
//! The producer side runs on its own thread ([`worker`]); decisions cross to
//! the render loop through a non-blocking [`queue`], and scores for display
//! are published through [`status`].
//!
//! ```text
//! EegSource ──► ClassifierWorker ──► MovementQueue ──► GameSession::tick
//!                      │
//!                      └──► ClassifierStatus ──► info panels
//! ```

pub mod queue;
pub mod status;
pub mod worker;

pub use queue::MovementQueue;
pub use status::{ClassifierStatus, SharedStatus, HISTORY_LEN};
pub use worker::{ClassifierWorker, WorkerConfig};
