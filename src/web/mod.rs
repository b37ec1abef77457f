//! HTTP surface: the search page and health check.

pub mod error;
pub mod middleware;
pub mod model;
pub mod query;
pub mod routes;
pub mod search;
pub mod status;

pub use routes::*;
