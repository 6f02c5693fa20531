//! AtmoLight — ambient lighting targets driven by captured video frames.

pub mod color;
pub mod command;
pub mod config;
pub mod error;
pub mod handler;
pub mod process;
pub mod reconnect;
pub mod settings;
pub mod supervisor;
pub mod target;
pub mod transport;

pub use error::AtmoError;
