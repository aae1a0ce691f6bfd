//! Shared building blocks for the RSS manager services.
//!
//! Entity models, the error taxonomy, service configuration and the
//! HTTP middleware live here so that adaptors and transport code can
//! depend on them without pulling in the resource-management core.

pub mod config;
pub mod errors;
pub mod middleware;
pub mod models;
pub mod response;
pub mod utils;
