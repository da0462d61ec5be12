//! Core types for QueueDash
//!
//! This crate holds everything about the dashboard that does not touch the network:
//! the queue model, the projection engine that derives sorted and filtered views,
//! the favorites store and the error taxonomy shared by the other crates.

pub mod error;
pub mod favorites;
pub mod model;
pub mod projection;
pub mod storage;

pub use error::{ErrorCategory, FetchError, OperationError, PersistenceError};
pub use favorites::{FavoritesStore, FAVORITES_KEY};
pub use model::{OperationKind, QueueRecord, QueueStatistics, QueueType, Snapshot, SnapshotSummary};
pub use projection::{project, SortField, SortOrder, TypeFilter, ViewCriteria};
pub use storage::{KeyValueStore, MemoryStore, SqliteStore};
