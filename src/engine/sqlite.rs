//! SQLite-backed engine.
//!
//! Each database is one SQLite database. Tables map to SQLite tables with an
//! untyped `key` column (so integers sort before text) and a JSON `value`
//! column. Table and index definitions live in two catalog tables, and the
//! schema version is `PRAGMA user_version`.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter};
use serde_json::{Map, Value};

use super::{
    Cursor, Engine, EngineConnection, Index, IndexSchema, ObjectStore, Record, SchemaEditor,
    TableSchema, Transaction, TransactionMode, UpgradeHook, VersionChange,
};
use crate::config::{Location, SqliteConfig};
use crate::consts::DATABASE_FILE_EXTENSION;
use crate::key::{Key, KeyRange};

const CATALOG: &str = "
    CREATE TABLE IF NOT EXISTS _storefront_tables (
        name           TEXT PRIMARY KEY,
        key_path       TEXT,
        auto_increment INTEGER NOT NULL
    );
    CREATE TABLE IF NOT EXISTS _storefront_indexes (
        tbl       TEXT NOT NULL,
        name      TEXT NOT NULL,
        key_path  TEXT NOT NULL,
        is_unique INTEGER NOT NULL,
        PRIMARY KEY (tbl, name)
    );";

/// Highest version `PRAGMA user_version` can hold.
const MAX_VERSION: u32 = i32::MAX as u32;

type Shared = Arc<Mutex<Connection>>;

/// [`Engine`] over SQLite.
pub struct SqliteEngine {
    config: SqliteConfig,
    /// Named in-memory databases. Unused for [`Location::Directory`].
    memory: Mutex<HashMap<String, Shared>>,
}

impl SqliteEngine {
    pub fn new(config: SqliteConfig) -> Self {
        Self {
            config,
            memory: Mutex::new(HashMap::new()),
        }
    }

    /// Ephemeral engine. Use this for tests.
    pub fn in_memory() -> Self {
        Self::new(SqliteConfig::in_memory())
    }

    pub fn config(&self) -> &SqliteConfig {
        &self.config
    }

    fn connect(&self, name: &str) -> Result<Shared> {
        match &self.config.location {
            Location::Memory => {
                let mut databases = self
                    .memory
                    .lock()
                    .map_err(|_| anyhow!("database registry lock poisoned"))?;
                if let Some(shared) = databases.get(name) {
                    return Ok(Arc::clone(shared));
                }
                let conn = Connection::open_in_memory()
                    .context("failed to create in-memory database")?;
                let shared = Arc::new(Mutex::new(conn));
                databases.insert(name.to_string(), Arc::clone(&shared));
                Ok(shared)
            }
            Location::Directory(dir) => {
                fs::create_dir_all(dir)
                    .with_context(|| format!("failed to create {}", dir.display()))?;
                let path = database_path(dir, name);
                let conn = Connection::open(&path)
                    .with_context(|| format!("failed to open {}", path.display()))?;
                Ok(Arc::new(Mutex::new(conn)))
            }
        }
    }
}

impl Default for SqliteEngine {
    fn default() -> Self {
        Self::new(SqliteConfig::default())
    }
}

#[async_trait]
impl Engine for SqliteEngine {
    async fn open(
        &self,
        name: &str,
        version: u32,
        upgrade: UpgradeHook<'_>,
    ) -> Result<Box<dyn EngineConnection>> {
        if version == 0 {
            bail!("version must be a positive integer");
        }
        // `PRAGMA user_version` is a signed 32-bit field.
        if version > MAX_VERSION {
            bail!("version {version} exceeds the maximum of {MAX_VERSION}");
        }
        let shared = self.connect(name)?;
        let current = {
            let mut conn = lock(&shared)?;
            conn.execute_batch(CATALOG)
                .context("failed to initialize catalog")?;
            let stored: u32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
            if version > stored {
                tracing::debug!(database = name, from = stored, to = version, "upgrading");
                let tx = conn.transaction()?;
                let mut editor = SqliteSchema { conn: &*tx };
                let change = VersionChange {
                    old_version: stored,
                    new_version: version,
                };
                // The connection lock is held for the whole hook. The editor is the
                // hook's only access to the database, so nothing re-enters the lock.
                upgrade(change, &mut editor).context("upgrade aborted")?;
                tx.execute_batch(&format!("PRAGMA user_version = {version}"))?;
                tx.commit().context("failed to commit upgrade")?;
                version
            } else {
                stored
            }
        };
        Ok(Box::new(SqliteConnection {
            name: name.to_string(),
            version: current,
            conn: shared,
            closed: AtomicBool::new(false),
        }))
    }

    async fn delete_database(&self, name: &str) -> Result<()> {
        match &self.config.location {
            Location::Memory => {
                self.memory
                    .lock()
                    .map_err(|_| anyhow!("database registry lock poisoned"))?
                    .remove(name);
            }
            Location::Directory(dir) => {
                let path = database_path(dir, name);
                let journal = path.with_extension(format!("{DATABASE_FILE_EXTENSION}-journal"));
                for file in [path, journal] {
                    if file.exists() {
                        fs::remove_file(&file)
                            .with_context(|| format!("failed to remove {}", file.display()))?;
                    }
                }
            }
        }
        Ok(())
    }
}

struct SqliteConnection {
    name: String,
    version: u32,
    conn: Shared,
    closed: AtomicBool,
}

impl EngineConnection for SqliteConnection {
    fn name(&self) -> &str {
        &self.name
    }

    fn version(&self) -> u32 {
        self.version
    }

    fn transaction(
        &self,
        tables: &[&str],
        mode: TransactionMode,
    ) -> Result<Box<dyn Transaction + '_>> {
        if self.closed.load(Ordering::Acquire) {
            bail!("database '{}' is closed", self.name);
        }
        if tables.is_empty() {
            bail!("a transaction needs at least one table");
        }
        let conn = lock(&self.conn)?;
        let mut scope = HashMap::with_capacity(tables.len());
        for &table in tables {
            let meta = load_table(&conn, table)?
                .ok_or_else(|| anyhow!("table '{table}' not found"))?;
            scope.insert(table.to_string(), meta);
        }
        Ok(Box::new(SqliteTransaction {
            conn: &self.conn,
            mode,
            scope,
        }))
    }

    fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }
}

#[derive(Debug)]
struct TableMeta {
    name: String,
    key_path: Option<String>,
    auto_increment: bool,
    indexes: Vec<IndexSchema>,
}

impl TableMeta {
    fn ident(&self) -> String {
        table_ident(&self.name)
    }
}

struct SqliteTransaction<'a> {
    conn: &'a Shared,
    mode: TransactionMode,
    scope: HashMap<String, TableMeta>,
}

impl Transaction for SqliteTransaction<'_> {
    fn mode(&self) -> TransactionMode {
        self.mode
    }

    fn object_store(&self, table: &str) -> Result<Box<dyn ObjectStore + '_>> {
        let meta = self
            .scope
            .get(table)
            .ok_or_else(|| anyhow!("table '{table}' is not part of this transaction"))?;
        Ok(Box::new(SqliteStore {
            conn: self.conn,
            mode: self.mode,
            meta,
        }))
    }
}

struct SqliteStore<'a> {
    conn: &'a Shared,
    mode: TransactionMode,
    meta: &'a TableMeta,
}

impl SqliteStore<'_> {
    fn require_write(&self) -> Result<()> {
        if self.mode == TransactionMode::ReadOnly {
            bail!("table '{}' is read-only in this transaction", self.meta.name);
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for SqliteStore<'_> {
    async fn put(&self, mut record: Value) -> Result<Key> {
        self.require_write()?;
        let conn = lock(self.conn)?;
        let ident = self.meta.ident();
        let key = match &self.meta.key_path {
            Some(path) => match lookup(&record, path) {
                Some(value) => Key::from_json(value)
                    .ok_or_else(|| anyhow!("value at key path '{path}' is not a valid key"))?,
                None if self.meta.auto_increment => {
                    let key = next_key(&conn, &ident)?;
                    inject(&mut record, path, &key)?;
                    key
                }
                None => bail!("record has no value at key path '{path}'"),
            },
            None if self.meta.auto_increment => next_key(&conn, &ident)?,
            None => bail!(
                "table '{}' has out-of-line keys and no key generator",
                self.meta.name
            ),
        };
        let json = serde_json::to_string(&record)?;
        conn.execute(
            &format!(
                "INSERT INTO {ident} (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value"
            ),
            params![key, json],
        )
        .with_context(|| format!("failed to write to '{}'", self.meta.name))?;
        Ok(key)
    }

    async fn delete(&self, key: &Key) -> Result<()> {
        self.require_write()?;
        let conn = lock(self.conn)?;
        conn.execute(
            &format!("DELETE FROM {} WHERE key = ?1", self.meta.ident()),
            [key],
        )?;
        Ok(())
    }

    async fn delete_range(&self, range: &KeyRange) -> Result<()> {
        self.require_write()?;
        let conn = lock(self.conn)?;
        let (clause, bounds) = range_clause(range);
        conn.execute(
            &format!("DELETE FROM {} WHERE {clause}", self.meta.ident()),
            params_from_iter(bounds),
        )?;
        Ok(())
    }

    async fn get(&self, key: &Key) -> Result<Option<Value>> {
        let conn = lock(self.conn)?;
        let json: Option<String> = conn
            .query_row(
                &format!("SELECT value FROM {} WHERE key = ?1", self.meta.ident()),
                [key],
                |row| row.get(0),
            )
            .optional()?;
        parse_record(json)
    }

    async fn clear(&self) -> Result<()> {
        self.require_write()?;
        let conn = lock(self.conn)?;
        conn.execute(&format!("DELETE FROM {}", self.meta.ident()), [])?;
        Ok(())
    }

    async fn open_cursor(&self) -> Result<Box<dyn Cursor + '_>> {
        Ok(Box::new(SqliteCursor {
            conn: self.conn,
            ident: self.meta.ident(),
            last: None,
        }))
    }

    fn index(&self, name: &str) -> Result<Box<dyn Index + '_>> {
        let schema = self
            .meta
            .indexes
            .iter()
            .find(|index| index.name == name)
            .ok_or_else(|| anyhow!("index '{name}' not found on table '{}'", self.meta.name))?;
        Ok(Box::new(SqliteIndex {
            conn: self.conn,
            ident: self.meta.ident(),
            key_path: &schema.key_path,
        }))
    }
}

struct SqliteIndex<'a> {
    conn: &'a Shared,
    ident: String,
    key_path: &'a str,
}

#[async_trait]
impl Index for SqliteIndex<'_> {
    async fn get(&self, value: &Key) -> Result<Option<Value>> {
        let conn = lock(self.conn)?;
        let json: Option<String> = conn
            .query_row(
                &format!(
                    "SELECT value FROM {} WHERE {} = ?1 ORDER BY key LIMIT 1",
                    self.ident,
                    key_field(self.key_path)
                ),
                [value],
                |row| row.get(0),
            )
            .optional()?;
        parse_record(json)
    }
}

/// Keyset cursor: each step fetches the first row after the last key seen,
/// so no statement stays open between steps.
struct SqliteCursor<'a> {
    conn: &'a Shared,
    ident: String,
    last: Option<Key>,
}

#[async_trait]
impl Cursor for SqliteCursor<'_> {
    async fn next(&mut self) -> Result<Option<Record>> {
        let conn = lock(self.conn)?;
        let row = match &self.last {
            Some(last) => conn
                .query_row(
                    &format!(
                        "SELECT key, value FROM {} WHERE key > ?1 ORDER BY key LIMIT 1",
                        self.ident
                    ),
                    [last],
                    read_row,
                )
                .optional()?,
            None => conn
                .query_row(
                    &format!("SELECT key, value FROM {} ORDER BY key LIMIT 1", self.ident),
                    [],
                    read_row,
                )
                .optional()?,
        };
        let Some((key, json)) = row else {
            return Ok(None);
        };
        let value = serde_json::from_str(&json).context("stored record is not valid JSON")?;
        self.last = Some(key.clone());
        Ok(Some(Record { key, value }))
    }
}

struct SqliteSchema<'c> {
    conn: &'c Connection,
}

impl SchemaEditor for SqliteSchema<'_> {
    fn table_names(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM _storefront_tables ORDER BY name")?;
        let names = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(names)
    }

    fn create_table(&mut self, name: &str, schema: TableSchema) -> Result<()> {
        if name.is_empty() {
            bail!("table name must not be empty");
        }
        if let Some(path) = &schema.key_path {
            validate_key_path(path)?;
        }
        if load_table(self.conn, name)?.is_some() {
            bail!("table '{name}' already exists");
        }
        self.conn.execute(
            "INSERT INTO _storefront_tables (name, key_path, auto_increment) VALUES (?1, ?2, ?3)",
            params![name, schema.key_path, schema.auto_increment],
        )?;
        self.conn.execute_batch(&format!(
            "CREATE TABLE {} (key PRIMARY KEY NOT NULL, value TEXT NOT NULL)",
            table_ident(name)
        ))?;
        tracing::debug!(table = name, "created table");
        Ok(())
    }

    fn delete_table(&mut self, name: &str) -> Result<()> {
        if load_table(self.conn, name)?.is_none() {
            bail!("table '{name}' not found");
        }
        self.conn
            .execute("DELETE FROM _storefront_indexes WHERE tbl = ?1", [name])?;
        self.conn
            .execute("DELETE FROM _storefront_tables WHERE name = ?1", [name])?;
        self.conn
            .execute_batch(&format!("DROP TABLE {}", table_ident(name)))?;
        Ok(())
    }

    fn create_index(&mut self, table: &str, index: IndexSchema) -> Result<()> {
        let meta = load_table(self.conn, table)?
            .ok_or_else(|| anyhow!("table '{table}' not found"))?;
        if index.name.is_empty() {
            bail!("index name must not be empty");
        }
        validate_key_path(&index.key_path)?;
        if meta.indexes.iter().any(|existing| existing.name == index.name) {
            bail!("index '{}' already exists on table '{table}'", index.name);
        }
        self.conn.execute(
            "INSERT INTO _storefront_indexes (tbl, name, key_path, is_unique)
             VALUES (?1, ?2, ?3, ?4)",
            params![table, index.name, index.key_path, index.unique],
        )?;
        let unique = if index.unique { "UNIQUE " } else { "" };
        self.conn
            .execute_batch(&format!(
                "CREATE {unique}INDEX {} ON {} ({})",
                index_ident(table, &index.name),
                table_ident(table),
                key_field(&index.key_path)
            ))
            .with_context(|| format!("failed to build index '{}'", index.name))?;
        tracing::debug!(table, index = %index.name, "created index");
        Ok(())
    }
}

impl ToSql for Key {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Key::Int(n) => ToSqlOutput::from(*n),
            Key::Text(s) => ToSqlOutput::from(s.as_str()),
        })
    }
}

impl FromSql for Key {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value {
            ValueRef::Integer(n) => Ok(Key::Int(n)),
            ValueRef::Text(_) => value.as_str().map(|s| Key::Text(s.to_string())),
            _ => Err(FromSqlError::InvalidType),
        }
    }
}

fn lock(conn: &Shared) -> Result<MutexGuard<'_, Connection>> {
    conn.lock()
        .map_err(|_| anyhow!("database connection lock poisoned"))
}

fn load_table(conn: &Connection, name: &str) -> Result<Option<TableMeta>> {
    let row = conn
        .query_row(
            "SELECT key_path, auto_increment FROM _storefront_tables WHERE name = ?1",
            [name],
            |row| Ok((row.get::<_, Option<String>>(0)?, row.get::<_, bool>(1)?)),
        )
        .optional()?;
    let Some((key_path, auto_increment)) = row else {
        return Ok(None);
    };
    let mut stmt = conn.prepare(
        "SELECT name, key_path, is_unique FROM _storefront_indexes WHERE tbl = ?1 ORDER BY name",
    )?;
    let indexes = stmt
        .query_map([name], |row| {
            Ok(IndexSchema {
                name: row.get(0)?,
                key_path: row.get(1)?,
                unique: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Some(TableMeta {
        name: name.to_string(),
        key_path,
        auto_increment,
        indexes,
    }))
}

fn read_row(row: &Row<'_>) -> rusqlite::Result<(Key, String)> {
    Ok((row.get(0)?, row.get(1)?))
}

fn parse_record(json: Option<String>) -> Result<Option<Value>> {
    json.map(|json| serde_json::from_str(&json))
        .transpose()
        .context("stored record is not valid JSON")
}

fn next_key(conn: &Connection, ident: &str) -> Result<Key> {
    let max: Option<i64> = conn.query_row(
        &format!("SELECT MAX(key) FROM {ident} WHERE typeof(key) = 'integer'"),
        [],
        |row| row.get(0),
    )?;
    let next = max
        .unwrap_or(0)
        .checked_add(1)
        .ok_or_else(|| anyhow!("key generator exhausted"))?;
    Ok(Key::Int(next.max(1)))
}

fn range_clause(range: &KeyRange) -> (String, Vec<&Key>) {
    fn lower_op(open: bool) -> &'static str {
        if open { ">" } else { ">=" }
    }
    fn upper_op(open: bool) -> &'static str {
        if open { "<" } else { "<=" }
    }

    match range {
        KeyRange::Bound {
            lower,
            upper,
            lower_open,
            upper_open,
        } => (
            format!(
                "key {} ?1 AND key {} ?2",
                lower_op(*lower_open),
                upper_op(*upper_open)
            ),
            vec![lower, upper],
        ),
        KeyRange::LowerBound { lower, open } => {
            (format!("key {} ?1", lower_op(*open)), vec![lower])
        }
        KeyRange::UpperBound { upper, open } => {
            (format!("key {} ?1", upper_op(*open)), vec![upper])
        }
    }
}

/// Follow a dotted key path through nested objects.
fn lookup<'v>(record: &'v Value, path: &str) -> Option<&'v Value> {
    path.split('.')
        .try_fold(record, |value, segment| value.get(segment))
}

/// Write a generated key at `path`, creating intermediate objects.
fn inject(record: &mut Value, path: &str, key: &Key) -> Result<()> {
    let segments: Vec<&str> = path.split('.').collect();
    let Some((last, parents)) = segments.split_last() else {
        bail!("empty key path");
    };
    let mut target = record;
    for segment in parents {
        target = target
            .as_object_mut()
            .ok_or_else(|| anyhow!("cannot write key path '{path}' into a non-object"))?
            .entry(*segment)
            .or_insert_with(|| Value::Object(Map::new()));
    }
    target
        .as_object_mut()
        .ok_or_else(|| anyhow!("cannot write key path '{path}' into a non-object"))?
        .insert((*last).to_string(), key.to_json());
    Ok(())
}

fn validate_key_path(path: &str) -> Result<()> {
    let valid = !path.is_empty()
        && path.split('.').all(|segment| {
            !segment.is_empty()
                && segment
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_')
        });
    if !valid {
        bail!("invalid key path '{path}'");
    }
    Ok(())
}

/// SQL expression for the key stored at a validated key path.
///
/// NULL unless the field is an integer or a string, so booleans, floats and
/// nested values never match a key and never collide in a unique index.
fn key_field(path: &str) -> String {
    format!(
        "(CASE WHEN json_type(value, '$.{path}') IN ('integer', 'text') \
         THEN json_extract(value, '$.{path}') END)"
    )
}

fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

fn table_ident(name: &str) -> String {
    quote_ident(&format!("t:{name}"))
}

fn index_ident(table: &str, index: &str) -> String {
    quote_ident(&format!("i:{}:{table}:{index}", table.len()))
}

/// File for a database. Names are escaped so any string maps to one file.
fn database_path(dir: &Path, name: &str) -> PathBuf {
    let mut stem = String::with_capacity(name.len());
    for byte in name.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'_' || byte == b'-' {
            stem.push(char::from(byte));
        } else {
            stem.push_str(&format!("%{byte:02X}"));
        }
    }
    dir.join(format!("{stem}.{DATABASE_FILE_EXTENSION}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn lookup_follows_nested_paths() {
        let record = json!({"id": 1, "profile": {"email": "a@b.c"}});
        assert_eq!(lookup(&record, "id"), Some(&json!(1)));
        assert_eq!(lookup(&record, "profile.email"), Some(&json!("a@b.c")));
        assert_eq!(lookup(&record, "profile.missing"), None);
        assert_eq!(lookup(&json!(5), "id"), None);
    }

    #[test]
    fn inject_creates_intermediate_objects() {
        let mut record = json!({"name": "x"});
        inject(&mut record, "meta.id", &Key::Int(7)).unwrap();
        assert_eq!(record, json!({"name": "x", "meta": {"id": 7}}));
    }

    #[test]
    fn inject_rejects_non_objects() {
        let mut record = json!({"meta": 3});
        assert!(inject(&mut record, "meta.id", &Key::Int(1)).is_err());
        let mut scalar = json!("plain");
        assert!(inject(&mut scalar, "id", &Key::Int(1)).is_err());
    }

    #[test]
    fn key_paths_are_validated() {
        assert!(validate_key_path("id").is_ok());
        assert!(validate_key_path("profile.email_2").is_ok());
        assert!(validate_key_path("").is_err());
        assert!(validate_key_path("a..b").is_err());
        assert!(validate_key_path("a'); DROP TABLE x; --").is_err());
    }

    #[test]
    fn range_clauses() {
        let range = KeyRange::Bound {
            lower: Key::Int(1),
            upper: Key::Int(5),
            lower_open: true,
            upper_open: false,
        };
        let (clause, bounds) = range_clause(&range);
        assert_eq!(clause, "key > ?1 AND key <= ?2");
        assert_eq!(bounds, vec![&Key::Int(1), &Key::Int(5)]);

        let (clause, _) = range_clause(&KeyRange::UpperBound {
            upper: Key::Int(3),
            open: true,
        });
        assert_eq!(clause, "key < ?1");
    }

    #[test]
    fn key_field_filters_json_types() {
        assert_eq!(
            key_field("home.city"),
            "(CASE WHEN json_type(value, '$.home.city') IN ('integer', 'text') \
             THEN json_extract(value, '$.home.city') END)"
        );
    }

    #[test]
    fn identifiers_are_quoted() {
        assert_eq!(table_ident("users"), "\"t:users\"");
        assert_eq!(table_ident("we\"ird"), "\"t:we\"\"ird\"");
        assert_ne!(index_ident("a:b", "c"), index_ident("a", "b:c"));
    }

    #[test]
    fn database_paths_are_escaped() {
        let dir = Path::new("/data");
        assert_eq!(
            database_path(dir, "app-db_1"),
            PathBuf::from("/data/app-db_1.sqlite3")
        );
        assert_eq!(
            database_path(dir, "../x"),
            PathBuf::from("/data/%2E%2E%2Fx.sqlite3")
        );
    }

    #[tokio::test]
    async fn reopen_in_memory_keeps_data() {
        let engine = SqliteEngine::in_memory();
        let conn = engine
            .open(
                "db",
                1,
                Box::new(|_: VersionChange, schema: &mut dyn SchemaEditor| {
                    schema.create_table("t", TableSchema::key_path("id"))
                }),
            )
            .await
            .unwrap();
        {
            let tx = conn.transaction(&["t"], TransactionMode::ReadWrite).unwrap();
            let store = tx.object_store("t").unwrap();
            store.put(json!({"id": 1})).await.unwrap();
        }
        conn.close();
        drop(conn);

        let conn = engine
            .open(
                "db",
                1,
                Box::new(|_: VersionChange, _: &mut dyn SchemaEditor| -> Result<()> {
                    bail!("no upgrade expected")
                }),
            )
            .await
            .unwrap();
        let tx = conn.transaction(&["t"], TransactionMode::ReadOnly).unwrap();
        let store = tx.object_store("t").unwrap();
        assert_eq!(store.get(&Key::Int(1)).await.unwrap(), Some(json!({"id": 1})));
    }
}
