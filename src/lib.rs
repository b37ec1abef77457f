pub mod app;
pub mod cache;
pub mod cli;
pub mod config;
pub mod json;
pub mod logging;
pub mod renderer;
pub mod search_api;
pub mod state;
pub mod topic_api;
pub mod topics;
pub mod upstream;
pub mod utils;
pub mod web;
