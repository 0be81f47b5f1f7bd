//! Core types and shared functionality for respcache.
//!
//! This crate provides:
//! - Content classification and request routing
//! - Cache partition store with SQLite and in-memory backends
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod category;
pub mod config;
pub mod error;
pub mod message;
pub mod partition;
pub mod route;

pub use cache::{CacheDb, CacheStore, MemoryStore, StorageEstimate, StorageEstimator};
pub use category::{Category, classify};
pub use config::{AppConfig, BudgetScope, MB, StoreBackend};
pub use error::Error;
pub use message::{Request, Response};
pub use partition::Partition;
pub use route::{Routed, Router};
