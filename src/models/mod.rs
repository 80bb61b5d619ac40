//! Data model types.

pub mod config;
pub mod push;
pub mod site;
pub mod tables;
