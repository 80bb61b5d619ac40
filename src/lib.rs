//! sitesync library
//!
//! An engine for replicating selected parts of one web-application
//! environment (file trees, database tables) onto another, with pre-push
//! backups and best-effort undo recording.

pub mod cli;
pub mod core;
pub mod error;
pub mod models;
pub mod preflight;
pub mod utils;

pub use error::{Error, Result};
