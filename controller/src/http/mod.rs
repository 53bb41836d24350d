//! HTTP collaborators

pub mod client;
pub mod logbook;
pub mod registry;
pub mod releases;
