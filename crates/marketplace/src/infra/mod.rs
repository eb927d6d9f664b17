//! Infrastructure layer - database, cache and transaction management.

pub mod cache;
mod db;
pub mod migrations;
pub mod unit_of_work;

pub use cache::{
    CacheEntry, CacheStats, DataCache, Invalidation, MemoryTagCache, RedisTagCache, TagCache,
};
pub use db::Database;
pub use migrations::Migrator;
pub use unit_of_work::{Persistence, TransactionContext, TxFuture, UnitOfWork};
