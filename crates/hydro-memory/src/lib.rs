//! # hydro-memory
//!
//! Persistent store for Hydro (SQLite-backed): users, the intake ledger,
//! reminders, and the motivation log.

pub mod store;

pub use store::{PendingFilter, Store};
