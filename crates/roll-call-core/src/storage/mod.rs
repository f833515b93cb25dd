pub mod memory;
pub mod models;
pub mod records;
pub mod sqlite;

pub use memory::MemoryStore;
pub use records::RecordStore;
pub use sqlite::Database;

use crate::error::Error;

/// Durable string key-value substrate the record store is layered on.
///
/// Every call is atomic from the caller's perspective: a failed `store_batch`
/// leaves none of its entries written.
pub trait KeyValueStore {
    fn load(&self, key: &str) -> Result<Option<String>, Error>;
    fn store(&self, key: &str, value: &str) -> Result<(), Error>;
    fn store_batch(&self, entries: &[(&str, String)]) -> Result<(), Error>;
    fn clear(&self) -> Result<(), Error>;
}
