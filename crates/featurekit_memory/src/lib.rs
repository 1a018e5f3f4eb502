//! # featurekit memory
//!
//! In-memory backend for featurekit.
//!
//! Records live in per-type tables behind a shared lock. Readers take a
//! snapshot of the rows visible to their transaction; writers persist
//! straight into the table under Auto-Commit, or into a per-transaction diff
//! that is applied when the transaction commits.
//!
//! Suitable for:
//! - Unit and integration tests of code written against the core traits
//! - Ephemeral stores that don't need persistence

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod diff;
mod error;
mod query;
mod store;
mod table;
mod writer;

pub use diff::DiffState;
pub use error::{MemoryError, MemoryResult};
pub use query::Query;
pub use store::{BoxedCursor, BoxedWriter, MemoryStore, MemoryWriter};
pub use writer::MemoryAttributeWriter;
