//! CLI command implementations.

pub mod last_undo;
pub mod push;
pub mod sweep;
