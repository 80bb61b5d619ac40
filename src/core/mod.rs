//! Core engine modules.

pub mod backup;
pub mod dbsync;
pub mod filesync;
pub mod log;
pub mod maintenance;
pub mod push;
pub mod runner;
pub mod undo;
