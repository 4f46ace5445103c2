//! Database seeding
//!
//! Populates reference data the application expects to exist on first start.

pub mod catalog;

pub use catalog::seed_catalog;
