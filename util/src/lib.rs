//! Shared utilities for the attendance backend.
//!
//! Currently this is the global [`config`] module; anything that every other
//! crate needs but that carries no domain logic belongs here.

pub mod config;
