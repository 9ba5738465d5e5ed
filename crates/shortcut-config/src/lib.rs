//! Configuration management for the Shortcut cookbook.
//!
//! This crate loads `config.json` merged with `SHORTCUT_*` environment
//! variables, and reads the mapping CSVs (users, states, priorities) the
//! Pivotal importer needs.

pub mod config;
pub mod mapping;

pub use config::{ConfigError, CookbookConfig, load_config};
