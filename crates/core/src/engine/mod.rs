//! The catalog sync engine.
//!
//! One owner task holds the [`CatalogState`](crate::catalog::CatalogState) and
//! serializes every mutation: user commands, fetch results, settings changes
//! and the favorite guard timer all arrive through a single `select!` loop.
//! Fetches run in their own tasks and report back tagged with the epoch they
//! were issued under; results for an older epoch are dropped.
//!
//! Callers talk to the loop through a cloneable [`EngineHandle`] and read
//! state as [`CatalogSnapshot`](crate::catalog::CatalogSnapshot)s.

mod guard;
mod handle;
mod runner;
mod types;
mod writer;

pub use handle::EngineHandle;
pub use types::EngineError;
