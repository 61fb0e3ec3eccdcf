pub mod action;
pub mod event;
pub mod game;
pub mod player;
pub mod role;
pub mod settings;

pub use action::*;
pub use event::*;
pub use game::*;
pub use player::*;
pub use role::*;
pub use settings::*;
