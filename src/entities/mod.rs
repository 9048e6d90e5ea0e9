//! Entities module - collaborators built on top of the dispatcher

pub mod loader_info;

pub use loader_info::{LoaderConfig, LoaderInfo};
