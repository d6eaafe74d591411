mod queries;
mod repository;
mod unit_of_work;

pub use repository::*;
pub use unit_of_work::*;

/// SQL migration for initial schema
pub const MIGRATION_001_INITIAL: &str = include_str!("migrations/001_initial.sql");
