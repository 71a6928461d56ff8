//! A callback-style facade over an embedded, versioned object store.
//!
//! Open a database through [`Store`], create tables in the upgrade callback,
//! then read and write records through the returned [`Connection`]. Every
//! callback receives an [`Envelope`]. Batch operations report per-item
//! outcomes through a single [`BatchReport`].
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use serde_json::json;
//! use storefront::engine::sqlite::SqliteEngine;
//! use storefront::{Config, Store, TableSchema};
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let store = Store::new(Arc::new(SqliteEngine::in_memory()), Config::default());
//! let connection = store
//!     .open(
//!         "shop",
//!         Some(1),
//!         |_| {},
//!         |_, schema| schema.create_table("orders", TableSchema::key_path("id")),
//!         |envelope| eprintln!("{}", envelope.data),
//!     )
//!     .await?;
//!
//! if let Some(connection) = connection {
//!     connection
//!         .upsert("orders", json!({"id": 1, "total": 12}), |envelope| {
//!             println!("{} written", envelope.data.successfully);
//!         })
//!         .await?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod batch;
pub mod config;
pub mod consts;
pub mod engine;
pub mod envelope;
pub mod error;
pub mod input;
pub mod key;
pub mod store;

pub use batch::{BatchReport, Failure, FailureReason};
pub use config::{Config, Location, SqliteConfig};
pub use engine::{IndexSchema, SchemaEditor, TableSchema, VersionChange};
pub use envelope::{Envelope, Status};
pub use error::UsageError;
pub use input::{Keys, Pagination, Records, RemoveTarget};
pub use key::{Key, KeyRange, RangeDescriptor};
pub use store::{Connection, DatabaseInfo, Store};
