//! # hydro-channels
//!
//! Messaging platform integrations for Hydro.

pub mod telegram;
pub mod utils;

pub use telegram::TelegramChannel;
