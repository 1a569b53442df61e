//! Shared foundational types used across the kiln build orchestrator.
//!
//! This crate provides the compilation unit reference, content hashing,
//! content digests, and common result types.

#![warn(missing_docs)]

pub mod digest;
pub mod hash;
pub mod result;
pub mod unit;

pub use digest::Digest;
pub use hash::ContentHash;
pub use result::{InternalError, KilnResult};
pub use unit::UnitRef;
