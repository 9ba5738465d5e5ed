//! Core types for the Shortcut cookbook.
//!
//! This crate holds the Shortcut resource and payload types, the parser for
//! Pivotal Tracker CSV exports, and the field mapping between the two.

pub mod entity;
pub mod mapping;
pub mod marker;
pub mod payload;
pub mod pivotal;
