pub mod api;
pub mod auth;
pub mod cli;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod services;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;
