//! Wire models for the services the deployment controller calls

pub mod models;

pub use models::*;
