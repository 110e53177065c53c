//! Generic repository over a persistence session.
//!
//! # Responsibility
//! - Offer one CRUD and query facade for any `Entity` type.
//! - Collapse every session failure into `PersistenceError`, logging the
//!   context and cause where the failure happens.
//!
//! # Invariants
//! - Each operation is a single synchronous attempt; nothing is retried.
//! - Callers never receive a raw `rusqlite` or `SessionError` value directly.

pub mod error;
pub mod generic_repo;
