// Service exports
pub mod cache;
pub mod catalog;
pub mod embedding;
pub mod postgres;

pub use cache::{CacheManager, CacheKey, CacheError, CachedEmbedder};
pub use catalog::{CatalogError, CatalogProvider, SnapshotStore, StaticCatalog};
pub use embedding::{EmbeddingError, HttpEmbedder};
pub use postgres::{PostgresClient, PostgresError};
