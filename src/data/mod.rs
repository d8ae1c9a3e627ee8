//! Data layer module
//!
//! Handles all data persistence:
//! - SQLite user store

mod database;
mod models;

pub use database::UserStore;
pub use models::*;
