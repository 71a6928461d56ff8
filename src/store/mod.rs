//! The callback facade.
//!
//! [`Store`] opens and deletes databases on an [`Engine`]. A successful open
//! hands the caller a [`Connection`], which owns the engine handle and carries
//! every table operation.

mod connection;

pub use connection::Connection;

use std::sync::Arc;

use serde::Serialize;

use crate::config::Config;
use crate::engine::{Engine, SchemaEditor, UpgradeHook, VersionChange};
use crate::envelope::Envelope;
use crate::error::UsageError;

/// Payload of a successful open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatabaseInfo {
    pub name: String,
    pub version: u32,
}

/// Entry point: wraps an engine and the facade defaults.
pub struct Store {
    engine: Arc<dyn Engine>,
    config: Config,
}

impl Store {
    pub fn new(engine: Arc<dyn Engine>, config: Config) -> Self {
        Self { engine, config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Open (or create, or upgrade) database `name`.
    ///
    /// `version` defaults to [`Config::default_version`]. When it exceeds the
    /// stored version, `on_upgrade` runs first with a [`SchemaEditor`]; this is
    /// the only place tables and indexes can be created. Returning `Err` from
    /// it aborts the open. Then exactly one of `on_success` / `on_fail` runs.
    ///
    /// Returns the connection on success, `Ok(None)` when the engine failed,
    /// and `Err` (with no callback) when `name` is empty.
    pub async fn open<S, U, F>(
        &self,
        name: &str,
        version: Option<u32>,
        on_success: S,
        on_upgrade: U,
        on_fail: F,
    ) -> Result<Option<Connection>, UsageError>
    where
        S: FnOnce(Envelope<DatabaseInfo>),
        U: FnOnce(Envelope<VersionChange>, &mut dyn SchemaEditor) -> anyhow::Result<()> + Send,
        F: FnOnce(Envelope<anyhow::Error>),
    {
        require_name(name, "database name")?;
        let version = version.unwrap_or(self.config.default_version);

        let hook: UpgradeHook<'_> =
            Box::new(move |change: VersionChange, schema: &mut dyn SchemaEditor| {
                tracing::info!(
                    database = name,
                    from = change.old_version,
                    to = change.new_version,
                    "database needs to be created or upgraded"
                );
                on_upgrade(
                    Envelope::upgrade(change, "database needs to be created or upgraded"),
                    schema,
                )
            });

        match self.engine.open(name, version, hook).await {
            Ok(handle) => {
                let info = DatabaseInfo {
                    name: name.to_string(),
                    version: handle.version(),
                };
                tracing::info!(database = name, version = info.version, "database opened");
                on_success(Envelope::success(info, "database opened"));
                Ok(Some(Connection::new(handle, self.config)))
            }
            Err(err) => {
                tracing::warn!(database = name, error = %err, "failed to open database");
                on_fail(Envelope::failure(err, "failed to open database"));
                Ok(None)
            }
        }
    }

    /// Delete database `name`. Close every connection to it first.
    pub async fn delete_database<S, F>(
        &self,
        name: &str,
        on_success: S,
        on_fail: F,
    ) -> Result<(), UsageError>
    where
        S: FnOnce(Envelope<()>),
        F: FnOnce(Envelope<anyhow::Error>),
    {
        require_name(name, "database name")?;
        match self.engine.delete_database(name).await {
            Ok(()) => {
                tracing::info!(database = name, "database deleted");
                on_success(Envelope::success((), "database deleted"));
            }
            Err(err) => {
                tracing::warn!(database = name, error = %err, "failed to delete database");
                on_fail(Envelope::failure(err, "failed to delete database"));
            }
        }
        Ok(())
    }
}

/// Log a rejected call and hand the error back.
pub(crate) fn logged(err: UsageError) -> UsageError {
    tracing::error!(error = %err, "operation rejected");
    err
}

pub(crate) fn require_name(value: &str, what: &'static str) -> Result<(), UsageError> {
    if value.trim().is_empty() {
        return Err(logged(UsageError::MissingName(what)));
    }
    Ok(())
}
