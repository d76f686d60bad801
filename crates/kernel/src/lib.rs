//! Scriba blog kernel library
//!
//! Content store, services, and HTTP routes of the blog. The `scriba`
//! binary wires them to PostgreSQL and Redis; integration tests run them
//! against the in-memory store.

pub mod config;
pub mod db;
pub mod error;
pub mod file;
pub mod flash;
pub mod form;
pub mod models;
pub mod permissions;
pub mod routes;
pub mod services;
pub mod session;
pub mod state;
pub mod store;
pub mod theme;

pub use config::Config;
pub use state::AppState;
