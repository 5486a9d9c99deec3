// intra-progress - Library root for testing

pub mod auth;
pub mod classifier;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod http_client;
pub mod models;
pub mod readme;
pub mod render;
pub mod sync;
