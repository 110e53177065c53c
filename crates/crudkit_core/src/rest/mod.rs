//! REST response formatting.
//!
//! # Responsibility
//! - Build the uniform success/error envelope returned to HTTP clients.
//!
//! # Invariants
//! - Success envelopes carry status `200` and never an error code.
//! - Error envelopes carry status `500` and never a payload.

pub mod response;
