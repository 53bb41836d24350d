//! Deployment controller library
//!
//! Orchestrates IOC and display deployments across facilities: request
//! classification, release fetching, per-facility provisioning, registry
//! updates, reports and reverts.

pub mod app;
pub mod deploy;
pub mod errors;
pub mod filesys;
pub mod http;
pub mod logs;
pub mod models;
pub mod registry;
pub mod server;
pub mod storage;
pub mod tasks;
pub mod utils;
pub mod workers;
