//! Room server for the hidden-role party game: rooms and players over HTTP,
//! one actor task per running game, live events over websockets.

pub mod app;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod utils;
