//! Partition store for cached responses.
//!
//! The engine talks to storage through two traits:
//!
//! - [`CacheStore`]: open, match, put, delete and list named partitions
//! - [`StorageEstimator`]: optional usage/quota figures for budget eviction
//!
//! # Implementations
//!
//! - [`CacheDb`]: SQLite via tokio-rusqlite, with WAL mode and migrations
//! - [`MemoryStore`]: in-process map, nothing survives a restart

pub mod connection;
pub mod entries;
pub mod hash;
pub mod memory;
pub mod migrations;

use async_trait::async_trait;

pub use crate::Error;
use crate::message::{Request, Response};
use crate::partition::Partition;

pub use connection::CacheDb;
pub use memory::MemoryStore;

/// Usage and quota in bytes, as reported by a [`StorageEstimator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageEstimate {
    pub usage: u64,
    pub quota: u64,
}

/// Durable store of request-to-response pairs grouped into named partitions.
///
/// Entries are keyed by the request URL. Implementations never panic on
/// storage trouble; every failure comes back as an [`Error`].
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Open a partition, creating it if needed. Idempotent.
    async fn open(&self, partition: Partition) -> Result<(), Error>;

    /// Look up a cached response for `request` in `partition`.
    async fn lookup(&self, partition: Partition, request: &Request) -> Result<Option<Response>, Error>;

    /// Store `response` under `request`, replacing any previous entry.
    async fn put(&self, partition: Partition, request: &Request, response: Response) -> Result<(), Error>;

    /// Delete a partition and every entry in it.
    ///
    /// Returns `false` when no partition with that name existed.
    async fn delete(&self, name: &str) -> Result<bool, Error>;

    /// Names of all existing partitions.
    async fn keys(&self) -> Result<Vec<String>, Error>;
}

/// Source of storage usage figures.
#[async_trait]
pub trait StorageEstimator: Send + Sync {
    /// Usage of a single partition, or of the whole store when `partition`
    /// is `None`.
    async fn estimate(&self, partition: Option<Partition>) -> Result<StorageEstimate, Error>;
}
