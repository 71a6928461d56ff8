use serde_json::Value;

use crate::batch::{BatchAccumulator, BatchReport, Failure};
use crate::config::Config;
use crate::engine::{EngineConnection, TransactionMode};
use crate::envelope::Envelope;
use crate::error::UsageError;
use crate::input::{Keys, Pagination, Records, RemoveTarget};
use crate::key::Key;

use super::{logged, require_name};

const UPSERT_COMPLETE: &str = "add/update complete";
const REMOVE_COMPLETE: &str = "delete complete";
const INDEX_COMPLETE: &str = "index lookup complete";
const TRANSACTION_FAILED: &str = "transaction failed";

/// An open database, owned by the caller.
///
/// Every table operation first checks that the connection is still open and
/// that the table name is non-empty. A failed check is logged and returned as
/// [`UsageError`] without touching the engine or running any callback.
pub struct Connection {
    name: String,
    handle: Option<Box<dyn EngineConnection>>,
    config: Config,
}

impl Connection {
    pub(crate) fn new(handle: Box<dyn EngineConnection>, config: Config) -> Self {
        Self {
            name: handle.name().to_string(),
            handle: Some(handle),
            config,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Version the database was opened at, or `None` once closed.
    pub fn version(&self) -> Option<u32> {
        self.handle.as_ref().map(|handle| handle.version())
    }

    pub fn is_open(&self) -> bool {
        self.handle.is_some()
    }

    /// Page `page` at the configured default page size.
    pub fn page(&self, page: usize) -> Pagination {
        Pagination::Page {
            page,
            size: self.config.default_page_size,
        }
    }

    /// Release the engine handle. A second close is a usage error.
    pub fn close(&mut self) -> Result<(), UsageError> {
        let handle = self.handle.take().ok_or_else(|| logged(UsageError::NoConnection))?;
        handle.close();
        tracing::info!(database = %self.name, "database closed");
        Ok(())
    }

    /// Insert or replace each record by primary key.
    ///
    /// The report lists the key written for every stored record and a
    /// [`Failure`] carrying the record for every rejected one.
    pub async fn upsert<C>(
        &self,
        table: &str,
        records: impl Into<Records>,
        complete: C,
    ) -> Result<(), UsageError>
    where
        C: FnOnce(Envelope<BatchReport>),
    {
        let handle = self.require(table)?;
        let records = records.into().into_batch().map_err(logged)?;

        let outcomes = async {
            let tx = handle.transaction(&[table], TransactionMode::ReadWrite)?;
            let store = tx.object_store(table)?;
            let store = &store;
            let puts = records.iter().map(|record| async move {
                store
                    .put(record.clone())
                    .await
                    .map(|key| key.to_json())
                    .map_err(|err| item_failed(table, record.clone(), &err))
            });
            anyhow::Ok(futures::future::join_all(puts).await)
        }
        .await;

        settle(table, UPSERT_COMPLETE, records, outcomes, complete);
        Ok(())
    }

    /// Delete a key range, or each of a set of keys.
    ///
    /// A range counts as a single item whose success payload is the
    /// serialized range. Deleting a key that does not exist succeeds.
    pub async fn remove<C>(
        &self,
        table: &str,
        target: impl Into<RemoveTarget>,
        complete: C,
    ) -> Result<(), UsageError>
    where
        C: FnOnce(Envelope<BatchReport>),
    {
        let handle = self.require(table)?;

        match target.into() {
            RemoveTarget::Range(descriptor) => {
                let range = descriptor
                    .to_key_range()
                    .ok_or_else(|| logged(UsageError::EmptyRange))?;
                let item = serde_json::to_value(&range).unwrap_or_default();

                let outcome = async {
                    let tx = handle.transaction(&[table], TransactionMode::ReadWrite)?;
                    let store = tx.object_store(table)?;
                    store.delete_range(&range).await
                }
                .await;

                let outcomes = outcome.map(|()| vec![Ok(item.clone())]);
                settle(table, REMOVE_COMPLETE, vec![item], outcomes, complete);
            }
            RemoveTarget::Keys(keys) => {
                let keys = keys.into_batch("keys").map_err(logged)?;

                let outcomes = async {
                    let tx = handle.transaction(&[table], TransactionMode::ReadWrite)?;
                    let store = tx.object_store(table)?;
                    let store = &store;
                    let deletes = keys.iter().map(|key| async move {
                        store
                            .delete(key)
                            .await
                            .map(|()| key.to_json())
                            .map_err(|err| item_failed(table, key.to_json(), &err))
                    });
                    anyhow::Ok(futures::future::join_all(deletes).await)
                }
                .await;

                let items = keys.iter().map(Key::to_json).collect();
                settle(table, REMOVE_COMPLETE, items, outcomes, complete);
            }
        }
        Ok(())
    }

    /// Look up one record by primary key. Absence is a success with `None`.
    pub async fn get_by_key<S, E>(
        &self,
        table: &str,
        key: impl Into<Key>,
        success: S,
        error: E,
    ) -> Result<(), UsageError>
    where
        S: FnOnce(Envelope<Option<Value>>),
        E: FnOnce(Envelope<anyhow::Error>),
    {
        let handle = self.require(table)?;
        let key = key.into();

        let outcome = async {
            let tx = handle.transaction(&[table], TransactionMode::ReadOnly)?;
            let store = tx.object_store(table)?;
            store.get(&key).await
        }
        .await;

        match outcome {
            Ok(Some(record)) => success(Envelope::success(Some(record), "query succeeded")),
            Ok(None) => success(Envelope::success(None, "no matching record")),
            Err(err) => {
                tracing::warn!(table, key = ?key, error = %err, "query failed");
                error(Envelope::failure(err, "query failed"));
            }
        }
        Ok(())
    }

    /// Look up each value in secondary index `index`.
    ///
    /// Values with no matching record are reported as
    /// [`FailureReason::NotFound`](crate::batch::FailureReason::NotFound).
    pub async fn get_by_index<C>(
        &self,
        table: &str,
        index: &str,
        values: impl Into<Keys>,
        complete: C,
    ) -> Result<(), UsageError>
    where
        C: FnOnce(Envelope<BatchReport>),
    {
        let handle = self.require(table)?;
        require_name(index, "index name")?;
        let values = values.into().into_batch("index values").map_err(logged)?;
        if values.iter().any(|value| matches!(value, Key::Text(text) if text.is_empty())) {
            return Err(logged(UsageError::InvalidInput("index values")));
        }

        let outcomes = async {
            let tx = handle.transaction(&[table], TransactionMode::ReadOnly)?;
            let store = tx.object_store(table)?;
            let index = store.index(index)?;
            let index = &index;
            let lookups = values.iter().map(|value| async move {
                match index.get(value).await {
                    Ok(Some(record)) => Ok(record),
                    Ok(None) => Err(Failure::not_found(value.to_json())),
                    Err(err) => Err(item_failed(table, value.to_json(), &err)),
                }
            });
            anyhow::Ok(futures::future::join_all(lookups).await)
        }
        .await;

        let items = values.iter().map(Key::to_json).collect();
        settle(table, INDEX_COMPLETE, items, outcomes, complete);
        Ok(())
    }

    /// Walk the table in key order and collect record values.
    ///
    /// With [`Pagination::Page`] only the records at positions
    /// `[page * size, (page + 1) * size)` are collected, and the walk stops
    /// once that window is full. A page past the end is an empty success.
    pub async fn scan_all<S, E>(
        &self,
        table: &str,
        pagination: Pagination,
        success: S,
        error: E,
    ) -> Result<(), UsageError>
    where
        S: FnOnce(Envelope<Vec<Value>>),
        E: FnOnce(Envelope<anyhow::Error>),
    {
        let handle = self.require(table)?;
        let window = pagination.window();

        let outcome = async {
            let tx = handle.transaction(&[table], TransactionMode::ReadOnly)?;
            let store = tx.object_store(table)?;
            let mut cursor = store.open_cursor().await?;

            let mut values = Vec::new();
            let mut position = 0usize;
            loop {
                if window.is_some_and(|(_, end)| position >= end) {
                    break;
                }
                let Some(record) = cursor.next().await? else {
                    break;
                };
                if window.is_none_or(|(start, _)| position >= start) {
                    values.push(record.value);
                }
                position += 1;
            }
            anyhow::Ok(values)
        }
        .await;

        match outcome {
            Ok(values) => {
                tracing::debug!(table, returned = values.len(), "scan complete");
                success(Envelope::success(values, "scan complete"));
            }
            Err(err) => {
                tracing::warn!(table, error = %err, "scan failed");
                error(Envelope::failure(err, TRANSACTION_FAILED));
            }
        }
        Ok(())
    }

    /// Delete every record in the table.
    pub async fn clear_all<S, E>(&self, table: &str, success: S, error: E) -> Result<(), UsageError>
    where
        S: FnOnce(Envelope<()>),
        E: FnOnce(Envelope<anyhow::Error>),
    {
        let handle = self.require(table)?;

        let outcome = async {
            let tx = handle.transaction(&[table], TransactionMode::ReadWrite)?;
            let store = tx.object_store(table)?;
            store.clear().await
        }
        .await;

        match outcome {
            Ok(()) => {
                tracing::debug!(table, "table cleared");
                success(Envelope::success((), "table cleared"));
            }
            Err(err) => {
                tracing::warn!(table, error = %err, "clear failed");
                error(Envelope::failure(err, TRANSACTION_FAILED));
            }
        }
        Ok(())
    }

    fn require(&self, table: &str) -> Result<&dyn EngineConnection, UsageError> {
        let handle = self
            .handle
            .as_deref()
            .ok_or_else(|| logged(UsageError::NoConnection))?;
        require_name(table, "table name")?;
        Ok(handle)
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.close();
            tracing::debug!(database = %self.name, "connection dropped");
        }
    }
}

fn item_failed(table: &str, item: Value, err: &anyhow::Error) -> Failure {
    tracing::warn!(table, error = %err, "batch item failed");
    Failure::transaction(Some(item), err)
}

/// Fold per-item outcomes into one report and hand it to `complete`.
///
/// When the transaction itself could not be set up, every item is recorded
/// as failed with that error.
fn settle<C>(
    table: &str,
    prompt: &'static str,
    items: Vec<Value>,
    outcomes: anyhow::Result<Vec<Result<Value, Failure>>>,
    complete: C,
) where
    C: FnOnce(Envelope<BatchReport>),
{
    let mut acc = BatchAccumulator::new(items.len(), prompt);
    match outcomes {
        Ok(outcomes) => outcomes.into_iter().for_each(|outcome| acc.record(outcome)),
        Err(err) => {
            tracing::warn!(table, error = %err, "transaction failed");
            for item in items {
                acc.record(Err(Failure::transaction(Some(item), &err)));
            }
        }
    }

    match acc.finish() {
        Some(report) => {
            tracing::debug!(
                table,
                successfully = report.successfully,
                failed = report.failed,
                count = report.count,
                "{prompt}"
            );
            complete(Envelope::success(report, prompt));
        }
        None => tracing::error!(table, prompt, "batch settled with missing outcomes"),
    }
}
