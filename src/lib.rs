//! Arcade driving simulation: raycast-wheel car on rapier3d, keyboard
//! controller, entity loop, served to browser clients over WebSocket.

pub mod config;
pub mod controller;
pub mod entity;
pub mod error;
pub mod game;
pub mod input;
pub mod logging;
pub mod net;
pub mod physics;
pub mod player;
pub mod state;
pub mod terrain;
pub mod tire;
pub mod tuning;
pub mod vehicle;
pub mod wheel;
