//! Use-case services over the generic repository.
//!
//! # Responsibility
//! - Encode per-domain conventions (active filters, derived fields) that the
//!   generic repository leaves to its callers.

pub mod character_service;
pub mod seed;
