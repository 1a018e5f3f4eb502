//! # featurekit core
//!
//! Row streaming and transactional mutation of vector features, independent
//! of how a backend stores them.
//!
//! ## Layers
//!
//! - [`cursor`]: attribute cursors and writers supplied by backends, the typed
//!   record layer on top of them, and decorators for filtering, limiting
//!   and joining
//! - [`transaction`]: Auto-Commit and explicit transactions with a state bag
//!   and authorizations
//! - [`lock`]: cooperative record locks and their tokens
//! - [`event`]: change notifications and the per-transaction batch summary
//!
//! ## Example
//!
//! ```rust
//! use featurekit_core::cursor::{RecordCursor, RowCursor, TypedRecordCursor};
//! use featurekit_core::{ColumnDescriptor, RecordType, Value, ValueKind};
//!
//! let columns = vec![ColumnDescriptor::new("name", ValueKind::Text)];
//! let rows = RowCursor::with_ids(
//!     columns.clone(),
//!     vec![("road.1".to_string(), vec![Value::from("Main St")])],
//! );
//! let mut cursor = TypedRecordCursor::with_type(rows, RecordType::shared("road", columns));
//!
//! let record = cursor.next().unwrap();
//! assert_eq!(record.id().value(), "road.1");
//! assert_eq!(record.get_by_name("name"), Some(&Value::from("Main St")));
//! cursor.close().unwrap();
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
pub mod cursor;
mod envelope;
mod error;
pub mod event;
mod filter;
pub mod lock;
mod record;
mod schema;
pub mod transaction;
mod types;
mod value;

pub use config::Config;
pub use envelope::Envelope;
pub use error::{CoreError, CoreResult};
pub use event::{BatchChangeEvent, ChangeEvent, ChangeType, ListenerRegistry, Notification};
pub use filter::{Filter, FnPredicate, Predicate};
pub use lock::{FeatureLock, LockManager};
pub use record::{Record, RecordId, WeakRecordId};
pub use schema::{ColumnDescriptor, RecordType};
pub use transaction::{Transaction, TransactionState};
pub use types::TransactionId;
pub use value::{Value, ValueKind};
