//! SQLite row store.
//!
//! Two tables, one per owner kind:
//!
//! ```text
//! ORG_CUSTOM_CONTENT (ORG_ID, CONTENT, CONTENT_TYPE, CREATED_AT, UPDATED_AT)
//! APP_CUSTOM_CONTENT (APP_ID, ORG_ID, CONTENT, CONTENT_TYPE, CREATED_AT, UPDATED_AT)
//! ```
//!
//! Timestamps are stored as Unix milliseconds.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use livery_core::{ContentOwner, ContentType, LiveryResult, StorageError};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};
use tracing::warn;

use super::{ContentPart, ContentRow, ContentRowStore, ContentTransaction};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

fn store_error(e: rusqlite::Error) -> StorageError {
    StorageError::ContentStore {
        reason: e.to_string(),
    }
}

/// SQLite-backed [`ContentRowStore`].
pub struct SqliteContentStore {
    conn: Mutex<Connection>,
}

impl SqliteContentStore {
    /// Open (or create) a database file.
    pub fn open(path: impl AsRef<Path>) -> LiveryResult<Self> {
        let conn = Connection::open(path).map_err(store_error)?;
        conn.busy_timeout(BUSY_TIMEOUT).map_err(store_error)?;
        Self::with_connection(conn)
    }

    /// Create an in-memory database (for testing).
    pub fn in_memory() -> LiveryResult<Self> {
        Self::with_connection(Connection::open_in_memory().map_err(store_error)?)
    }

    fn with_connection(conn: Connection) -> LiveryResult<Self> {
        init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> LiveryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StorageError::LockPoisoned.into())
    }
}

fn init_schema(conn: &Connection) -> LiveryResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS ORG_CUSTOM_CONTENT (
            ORG_ID TEXT NOT NULL,
            CONTENT BLOB NOT NULL,
            CONTENT_TYPE TEXT NOT NULL CHECK (CONTENT_TYPE IN ('html', 'css', 'js')),
            CREATED_AT INTEGER NOT NULL,
            UPDATED_AT INTEGER NOT NULL,
            PRIMARY KEY (ORG_ID, CONTENT_TYPE)
        );
        CREATE TABLE IF NOT EXISTS APP_CUSTOM_CONTENT (
            APP_ID TEXT NOT NULL,
            ORG_ID TEXT NOT NULL,
            CONTENT BLOB NOT NULL,
            CONTENT_TYPE TEXT NOT NULL CHECK (CONTENT_TYPE IN ('html', 'css', 'js')),
            CREATED_AT INTEGER NOT NULL,
            UPDATED_AT INTEGER NOT NULL,
            PRIMARY KEY (APP_ID, ORG_ID, CONTENT_TYPE)
        );
        CREATE INDEX IF NOT EXISTS IDX_APP_CUSTOM_CONTENT_ORG
            ON APP_CUSTOM_CONTENT(ORG_ID);",
    )
    .map_err(store_error)?;
    Ok(())
}

// ============================================================================
// OWNER MAPPING
// ============================================================================

fn table(owner: &ContentOwner) -> &'static str {
    match owner {
        ContentOwner::Organization { .. } => "ORG_CUSTOM_CONTENT",
        ContentOwner::Application { .. } => "APP_CUSTOM_CONTENT",
    }
}

fn owner_columns(owner: &ContentOwner) -> &'static [&'static str] {
    match owner {
        ContentOwner::Organization { .. } => &["ORG_ID"],
        ContentOwner::Application { .. } => &["APP_ID", "ORG_ID"],
    }
}

fn owner_values(owner: &ContentOwner) -> Vec<Value> {
    match owner {
        ContentOwner::Organization { organization_id } => {
            vec![Value::Text(organization_id.clone())]
        }
        ContentOwner::Application {
            application_id,
            organization_id,
        } => vec![
            Value::Text(application_id.clone()),
            Value::Text(organization_id.clone()),
        ],
    }
}

fn owner_filter(owner: &ContentOwner) -> String {
    owner_columns(owner)
        .iter()
        .map(|c| format!("{} = ?", c))
        .collect::<Vec<_>>()
        .join(" AND ")
}

fn timestamp(millis: i64) -> LiveryResult<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis).ok_or_else(|| {
        StorageError::CorruptData {
            location: "custom content timestamp".to_string(),
            reason: format!("{} is out of range", millis),
        }
        .into()
    })
}

// ============================================================================
// STATEMENTS
// ============================================================================

fn has_parts(conn: &Connection, owner: &ContentOwner) -> LiveryResult<bool> {
    let sql = format!(
        "SELECT EXISTS(SELECT 1 FROM {} WHERE {})",
        table(owner),
        owner_filter(owner)
    );
    conn.query_row(&sql, params_from_iter(owner_values(owner)), |row| row.get(0))
        .map_err(|e| store_error(e).into())
}

fn load_parts(conn: &Connection, owner: &ContentOwner) -> LiveryResult<Vec<ContentRow>> {
    let sql = format!(
        "SELECT CONTENT_TYPE, CONTENT, CREATED_AT, UPDATED_AT FROM {} WHERE {}",
        table(owner),
        owner_filter(owner)
    );
    let mut stmt = conn.prepare_cached(&sql).map_err(store_error)?;
    let raw = stmt
        .query_map(params_from_iter(owner_values(owner)), |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, Vec<u8>>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, i64>(3)?,
            ))
        })
        .map_err(store_error)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(store_error)?;

    raw.into_iter()
        .map(|(content_type, content, created_at, updated_at)| {
            let content_type = content_type.parse::<ContentType>().map_err(|reason| {
                StorageError::CorruptData {
                    location: format!("{} CONTENT_TYPE for {}", table(owner), owner),
                    reason,
                }
            })?;
            Ok(ContentRow {
                content_type,
                content,
                created_at: timestamp(created_at)?,
                updated_at: timestamp(updated_at)?,
            })
        })
        .collect()
}

/// Insert `parts` with a single multi-row statement.
fn insert_rows(conn: &Connection, owner: &ContentOwner, parts: &[ContentPart]) -> LiveryResult<()> {
    if parts.is_empty() {
        return Ok(());
    }

    let columns = owner_columns(owner);
    let placeholders = format!("({})", vec!["?"; columns.len() + 4].join(", "));
    let sql = format!(
        "INSERT INTO {} ({}, CONTENT, CONTENT_TYPE, CREATED_AT, UPDATED_AT) VALUES {}",
        table(owner),
        columns.join(", "),
        vec![placeholders; parts.len()].join(", ")
    );

    let now = Utc::now().timestamp_millis();
    let mut values = Vec::with_capacity(parts.len() * (columns.len() + 4));
    for part in parts {
        values.extend(owner_values(owner));
        values.push(Value::Blob(part.content.clone()));
        values.push(Value::Text(part.content_type.as_str().to_string()));
        values.push(Value::Integer(now));
        values.push(Value::Integer(now));
    }

    let mut stmt = conn.prepare_cached(&sql).map_err(store_error)?;
    stmt.execute(params_from_iter(values)).map_err(store_error)?;
    Ok(())
}

fn delete_rows(conn: &Connection, owner: &ContentOwner) -> LiveryResult<u64> {
    let sql = format!("DELETE FROM {} WHERE {}", table(owner), owner_filter(owner));
    let removed = conn
        .execute(&sql, params_from_iter(owner_values(owner)))
        .map_err(store_error)?;
    Ok(removed as u64)
}

fn delete_organization_rows(conn: &Connection, organization_id: &str) -> LiveryResult<u64> {
    let mut removed = 0u64;
    for table in ["ORG_CUSTOM_CONTENT", "APP_CUSTOM_CONTENT"] {
        removed += conn
            .execute(
                &format!("DELETE FROM {} WHERE ORG_ID = ?1", table),
                [organization_id],
            )
            .map_err(store_error)? as u64;
    }
    Ok(removed)
}

// ============================================================================
// TRAIT IMPLEMENTATIONS
// ============================================================================

impl ContentRowStore for SqliteContentStore {
    fn begin(&self) -> LiveryResult<Box<dyn ContentTransaction + '_>> {
        let conn = self.lock()?;
        conn.execute_batch("BEGIN IMMEDIATE")
            .map_err(|e| StorageError::TransactionFailed {
                reason: e.to_string(),
            })?;
        Ok(Box::new(SqliteTransaction {
            conn,
            finished: false,
        }))
    }

    fn load_parts(&self, owner: &ContentOwner) -> LiveryResult<Vec<ContentRow>> {
        load_parts(&*self.lock()?, owner)
    }

    fn has_parts(&self, owner: &ContentOwner) -> LiveryResult<bool> {
        has_parts(&*self.lock()?, owner)
    }
}

/// An open `BEGIN IMMEDIATE` transaction holding the connection lock.
struct SqliteTransaction<'a> {
    conn: MutexGuard<'a, Connection>,
    finished: bool,
}

impl SqliteTransaction<'_> {
    /// Run COMMIT or ROLLBACK. On failure the transaction stays open and is
    /// rolled back on drop.
    fn finish(mut self: Box<Self>, statement: &str) -> LiveryResult<()> {
        self.conn
            .execute_batch(statement)
            .map_err(|e| StorageError::TransactionFailed {
                reason: format!("{}: {}", statement, e),
            })?;
        self.finished = true;
        Ok(())
    }
}

impl ContentTransaction for SqliteTransaction<'_> {
    fn has_parts(&self, owner: &ContentOwner) -> LiveryResult<bool> {
        has_parts(&self.conn, owner)
    }

    fn insert_part(&mut self, owner: &ContentOwner, part: &ContentPart) -> LiveryResult<()> {
        insert_rows(&self.conn, owner, std::slice::from_ref(part))
    }

    fn insert_parts(&mut self, owner: &ContentOwner, parts: &[ContentPart]) -> LiveryResult<()> {
        insert_rows(&self.conn, owner, parts)
    }

    fn delete_parts(&mut self, owner: &ContentOwner) -> LiveryResult<u64> {
        delete_rows(&self.conn, owner)
    }

    fn delete_organization(&mut self, organization_id: &str) -> LiveryResult<u64> {
        delete_organization_rows(&self.conn, organization_id)
    }

    fn commit(self: Box<Self>) -> LiveryResult<()> {
        self.finish("COMMIT")
    }

    fn rollback(self: Box<Self>) -> LiveryResult<()> {
        self.finish("ROLLBACK")
    }
}

impl Drop for SqliteTransaction<'_> {
    fn drop(&mut self) {
        if !self.finished {
            if let Err(e) = self.conn.execute_batch("ROLLBACK") {
                warn!(error = %e, "Failed to roll back abandoned content transaction");
            }
        }
    }
}
