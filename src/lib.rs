//! # Realty API Library
//!
//! Core of the real-estate management service: accounts and session tokens,
//! the property catalog, and the rules tying rental contracts and visits to
//! property availability.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod lifecycle;
pub mod models;
pub mod password;
pub mod repositories;
pub mod seeds;
pub mod server;
pub mod telemetry;
pub mod token;
pub mod validation;
pub use migration;
