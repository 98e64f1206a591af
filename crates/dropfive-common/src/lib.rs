//! Shared game logic and wire protocol for the dropfive server and client.

pub mod board;
pub mod command;
pub mod config;
pub mod protocol;
pub mod session;
