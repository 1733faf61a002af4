//! Named-parameter queries.
//!
//! Repository methods that accept caller SQL take it with `:name`
//! placeholders and an [`Args`] map; values are always bound, never inlined.

mod args;
mod named;

pub use args::{page_offset, Arg, Args};
pub use named::{bind_named, BindingError, BoundQuery};
