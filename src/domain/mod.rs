// Domain module - protocol types, configuration schema and errors
pub mod command;
pub mod config;
pub mod error;
