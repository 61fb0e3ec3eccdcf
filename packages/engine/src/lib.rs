//! Rules engine for a hidden-role party game: role assignment, action
//! validation, vote tallying, win evaluation and the day/voting/night cycle.
//!
//! Every operation is a synchronous step on one [`GameState`]. Callers that
//! share a game between connections must serialize mutating calls themselves.

pub mod error;
pub mod models;
pub mod state;

mod actions;
mod assignment;
mod phase;
mod tally;
mod victory;

pub use error::{ConfigError, RawActionError, Rejection};
pub use models::*;
pub use state::GameState;

/// Smallest table the engine will deal roles for.
pub const MIN_PLAYERS: usize = 3;
