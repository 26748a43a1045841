//! Application service layer - config, reference data, project use cases, export

pub mod app;
pub mod config;
pub mod export;
pub mod reference;
pub mod repository;
