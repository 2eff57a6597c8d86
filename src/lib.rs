pub mod app;
pub mod auth;
pub mod cli;
pub mod config;
pub mod database;
pub mod error;
pub mod filter;
pub mod geo;
pub mod geocoder;
pub mod handlers;
pub mod mail;
pub mod middleware;
pub mod policy;
pub mod state;
pub mod types;
pub mod uploads;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;
