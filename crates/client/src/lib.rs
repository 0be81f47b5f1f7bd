//! Client code for respcache.
//!
//! This crate provides the network fetch pipeline and the cache engine that
//! decides, per request, whether to serve from a partition or the network.

pub mod engine;
pub mod fetch;

pub use engine::{
    Engine, FetchOutcome, InProcessRegistrar, Lifecycle, Orchestrator, Phase, Registrar, Served, Source, Timers,
    UnregisterGuard,
};

pub use fetch::{FetchClient, FetchConfig, Network};
