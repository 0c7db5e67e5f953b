/*!
 * Persistence for generated content.
 *
 * The pipeline writes through the `ContentStore` trait, implemented by:
 * - `Repository`: SQLite storage with derived prompt tables
 * - `MemoryStore`: process-local storage for dry runs and tests
 */

use async_trait::async_trait;

use crate::content::{ContentId, ContentRecord, ContentUpdate, NewContent};
use crate::errors::PersistenceError;

pub mod connection;
pub mod memory;
pub mod models;
pub mod repository;
pub mod schema;

// Re-export main types
pub use connection::DatabaseConnection;
pub use memory::MemoryStore;
pub use repository::Repository;

/// Storage of content records
///
/// Implementations must reject status updates that move a record backwards.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Insert a new record with its derived prompts and return its id
    async fn create(&self, content: &NewContent) -> Result<ContentId, PersistenceError>;

    /// Merge the set fields of `update` into the record
    async fn update(&self, id: ContentId, update: &ContentUpdate) -> Result<(), PersistenceError>;

    async fn get(&self, id: ContentId) -> Result<Option<ContentRecord>, PersistenceError>;
}
