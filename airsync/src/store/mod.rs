//! Local record storage.
//!
//! Each entity type owns one table of [`CachedRecord`](crate::record::CachedRecord)s
//! keyed by its fetch key. Tables are independent: operations on one entity
//! never contend with another.
//!
//! # Providers
//!
//! - [`MemoryStore`]: process-local table, used directly in tests and as the
//!   in-memory layer of the file store
//! - [`JsonFileStore`]: table persisted as a JSON file with atomic replace

mod changes;
mod file;
mod memory;
mod traits;

pub use changes::ChangeFeed;
pub use file::JsonFileStore;
pub use memory::{MemoryStore, DEFAULT_PROXIMITY_DEG};
pub use traits::{BoxFuture, RecordStore};
