//! # hydro-core
//!
//! Core types, traits, configuration, and error handling for the Hydro reminder bot.

pub mod config;
pub mod error;
pub mod message;
pub mod models;
pub mod schedule;
pub mod traits;

pub use config::shellexpand;
