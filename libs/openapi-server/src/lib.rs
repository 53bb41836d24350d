//! Wire models for the deployment controller's own HTTP API

pub mod models;

pub use models::*;
