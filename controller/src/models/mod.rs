//! Domain models

pub mod instance;
pub mod plan;
pub mod request;
pub mod task;
