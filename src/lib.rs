//! chansnap - Mattermost channel occupancy snapshots in TimescaleDB
//!
//! This library provides the core functionality for collecting a
//! point-in-time snapshot of channel membership and presence from a
//! Mattermost server and persisting it into a TimescaleDB hypertable.
//!
//! # Modules
//!
//! - [`cli`] - Command-line interface definitions
//! - [`client`] - Mattermost REST client and the [`client::ChatClient`] seam
//! - [`collector`] - Per-team, per-channel membership enumeration
//! - [`config`] - Layered configuration (file, env, flags)
//! - [`error`] - Custom error types for the tiered failure policy
//! - [`paginate`] - Rate-limited page fetch loop
//! - [`resolver`] - Bulk identity/status resolution
//! - [`schema`] - Idempotent TimescaleDB provisioning
//! - [`writer`] - Batched, checkpointed persistence

pub mod cli;
pub mod client;
pub mod collector;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod paginate;
pub mod resolver;
pub mod schema;
pub mod writer;

pub use cli::*;
pub use client::{ChatClient, MattermostClient};
pub use collector::{CollectOptions, collect_snapshot};
pub use config::Config;
pub use error::{Result, SnapError};
pub use model::*;
pub use resolver::resolve_directory;
pub use schema::{SchemaConfig, provision};
pub use writer::write_snapshot;
