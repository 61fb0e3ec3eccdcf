pub mod logging;
pub mod websocket;
