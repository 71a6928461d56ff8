//! The storage engine contract the facade drives.
//!
//! The shape follows the browser object-store model: a factory opens
//! versioned databases, a connection hands out transactions scoped to a set
//! of tables, and each transaction exposes object stores with asynchronous
//! requests. Schema changes happen only inside the upgrade hook passed to
//! [`Engine::open`].

pub mod sqlite;

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::key::{Key, KeyRange};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionMode {
    ReadOnly,
    ReadWrite,
}

/// Versions involved in a create/upgrade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VersionChange {
    /// 0 when the database did not exist.
    pub old_version: u32,
    pub new_version: u32,
}

/// How a table derives primary keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableSchema {
    /// Dotted field path holding the key inside each record. `None` means
    /// out-of-line keys.
    pub key_path: Option<String>,
    /// Generate integer keys when a record has none.
    pub auto_increment: bool,
}

impl TableSchema {
    /// In-line keys read from `path`.
    pub fn key_path(path: impl Into<String>) -> Self {
        Self {
            key_path: Some(path.into()),
            auto_increment: false,
        }
    }

    /// Out-of-line, generated keys.
    pub fn generated() -> Self {
        Self {
            key_path: None,
            auto_increment: true,
        }
    }

    pub fn with_auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }
}

/// A secondary index over one field of a table's records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSchema {
    pub name: String,
    /// Dotted field path of the indexed value.
    pub key_path: String,
    pub unique: bool,
}

impl IndexSchema {
    pub fn new(name: impl Into<String>, key_path: impl Into<String>, unique: bool) -> Self {
        Self {
            name: name.into(),
            key_path: key_path.into(),
            unique,
        }
    }
}

/// A record as yielded by a cursor.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub key: Key,
    pub value: Value,
}

/// Schema operations available while a database is being created or upgraded.
pub trait SchemaEditor {
    fn table_names(&self) -> Result<Vec<String>>;
    fn create_table(&mut self, name: &str, schema: TableSchema) -> Result<()>;
    fn delete_table(&mut self, name: &str) -> Result<()>;
    fn create_index(&mut self, table: &str, index: IndexSchema) -> Result<()>;
}

/// Runs inside the version-change transaction. Returning `Err` aborts the
/// upgrade and fails the open.
pub type UpgradeHook<'a> =
    Box<dyn FnOnce(VersionChange, &mut dyn SchemaEditor) -> Result<()> + Send + 'a>;

/// Opens and deletes databases.
#[async_trait]
pub trait Engine: Send + Sync {
    /// Open `name` at `version`, creating it if absent. The hook runs only
    /// when `version` is greater than the stored version.
    async fn open(
        &self,
        name: &str,
        version: u32,
        upgrade: UpgradeHook<'_>,
    ) -> Result<Box<dyn EngineConnection>>;

    async fn delete_database(&self, name: &str) -> Result<()>;
}

/// An open database.
pub trait EngineConnection: Send + Sync {
    fn name(&self) -> &str;
    fn version(&self) -> u32;
    fn transaction(
        &self,
        tables: &[&str],
        mode: TransactionMode,
    ) -> Result<Box<dyn Transaction + '_>>;
    fn close(&self);
}

pub trait Transaction: Send + Sync {
    fn mode(&self) -> TransactionMode;
    /// Fails for tables outside the transaction's scope.
    fn object_store(&self, table: &str) -> Result<Box<dyn ObjectStore + '_>>;
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Insert or replace by primary key. Returns the key written.
    async fn put(&self, record: Value) -> Result<Key>;
    async fn delete(&self, key: &Key) -> Result<()>;
    async fn delete_range(&self, range: &KeyRange) -> Result<()>;
    async fn get(&self, key: &Key) -> Result<Option<Value>>;
    async fn clear(&self) -> Result<()>;
    /// Forward cursor over the whole table in key order.
    async fn open_cursor(&self) -> Result<Box<dyn Cursor + '_>>;
    fn index(&self, name: &str) -> Result<Box<dyn Index + '_>>;
}

#[async_trait]
pub trait Index: Send + Sync {
    /// First record (lowest primary key) whose indexed value equals `value`.
    async fn get(&self, value: &Key) -> Result<Option<Value>>;
}

#[async_trait]
pub trait Cursor: Send {
    /// Advance and return the next record, or `None` once exhausted.
    async fn next(&mut self) -> Result<Option<Record>>;
}
