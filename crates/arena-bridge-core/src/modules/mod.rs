//! Configuration loading and page-source model discovery.

pub mod config;
pub mod model_catalog;
