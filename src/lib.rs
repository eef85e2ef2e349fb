//! Hospital records store
//!
//! Bootstraps a SQLite database with table-per-subclass inheritance, bulk
//! loads it from CSV data, derives subclass rows, and exposes typed CRUD
//! stores for every entity.

pub mod cli;
pub mod core;
pub mod entities;
