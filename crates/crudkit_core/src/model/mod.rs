//! Entity mapping contracts.
//!
//! # Responsibility
//! - Bind caller-defined Rust types to relational tables.
//! - Define the parameter set shapes accepted by queries.
//!
//! # Invariants
//! - An entity is identified by a single key column.
//! - Column values are produced in the same order as `Entity::COLUMNS`.

pub mod entity;
