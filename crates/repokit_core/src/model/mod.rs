//! Domain records persisted through the generic repository.
//!
//! # Invariants
//! - Each record declares its columns statically through `record::Record`.

pub mod character;
