//! # featurekit testkit
//!
//! Test utilities for featurekit.
//!
//! This crate provides:
//! - A small road dataset and store fixtures
//! - Property-based test generators using proptest
//! - Tracing setup for tests
//!
//! ## Usage
//!
//! ```rust
//! use featurekit_core::Transaction;
//! use featurekit_memory::Query;
//! use featurekit_testkit::prelude::*;
//!
//! with_road_store(|store| {
//!     let cursor = store.query(ROAD, &Query::all(), &Transaction::auto_commit()).unwrap();
//!     assert_eq!(cursor.into_records().count(), road_rows().len());
//! });
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod logging;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::logging::*;
    pub use featurekit_core::cursor::RecordCursor;
}

pub use fixtures::*;
pub use generators::*;
pub use logging::*;
