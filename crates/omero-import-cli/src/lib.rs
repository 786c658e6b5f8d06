//! CLI library components for the importer wrapper.

pub mod cli;
pub mod commands;
pub mod logging;
pub mod summary;
