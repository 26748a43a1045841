//! Domain layer for embodied carbon estimation
//!
//! Holds the two read-only reference tables, the estimation engine and the
//! project record lifecycle. Nothing in here performs I/O.

pub mod model;
pub mod repository;
pub mod service;
