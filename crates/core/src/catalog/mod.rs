//! Catalog domain: items, queries, the favorite set and the state the engine owns.
//!
//! Nothing in here performs I/O. The engine drives every transition and is the
//! only writer of a [`CatalogState`]; everyone else sees [`CatalogSnapshot`]s.

mod state;
mod types;

pub use state::{CatalogSnapshot, CatalogState, ToggleOutcome};
pub use types::*;
