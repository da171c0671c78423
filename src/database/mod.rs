//! Database adapter.
//!
//! Snapshots are logical, data-only text dumps of every table in the public
//! schema except the migration bookkeeping table. Restoring one always
//! truncates the discovered table set first, so repeated restores converge
//! on the same contents.
//!
//! ## Core Types
//!
//! - [`Database`]: operations the orchestrator needs from the store
//! - [`Snapshot`]: a dump file, raw or gzip-compressed by suffix
//! - [`Report`]: text rendering of an ad hoc query result
//! - [`Postgres`]: the production adapter (`tokio-postgres` through the
//!   container's published port, `docker exec` for bulk load and dump)
mod postgres;
mod report;
mod restore;
mod snapshot;

pub use postgres::*;
pub use report::*;
pub use restore::*;
pub use snapshot::*;

use crate::error::Result;
use crate::runtime::Handle;
use std::collections::BTreeSet;

/// Every operation targets the database running in the container behind
/// `handle`, so a resolved handle is a precondition of all of them.
#[async_trait::async_trait]
pub trait Database: Send + Sync {
    /// Restorable tables, ordered by name. Empty is not an error.
    async fn tables(&self, handle: &Handle) -> Result<Vec<String>>;
    /// Truncate each table with identity reset and cascade, one at a time.
    async fn truncate(&self, handle: &Handle, tables: &[String]) -> Result<()>;
    /// Stream a snapshot into the database.
    async fn restore(&self, handle: &Handle, snapshot: &Snapshot) -> Result<()>;
    /// Write a data-only dump of the database.
    async fn dump(&self, handle: &Handle, snapshot: &Snapshot) -> Result<()>;
    /// Run a read query for display.
    async fn report(&self, handle: &Handle, query: &str) -> Result<Report>;
    /// Row count per table.
    async fn counts(&self, handle: &Handle, tables: &[String]) -> Result<Vec<(String, i64)>>;
}

#[async_trait::async_trait]
impl<D> Database for std::sync::Arc<D>
where
    D: Database + ?Sized,
{
    async fn tables(&self, handle: &Handle) -> Result<Vec<String>> {
        self.as_ref().tables(handle).await
    }
    async fn truncate(&self, handle: &Handle, tables: &[String]) -> Result<()> {
        self.as_ref().truncate(handle, tables).await
    }
    async fn restore(&self, handle: &Handle, snapshot: &Snapshot) -> Result<()> {
        self.as_ref().restore(handle, snapshot).await
    }
    async fn dump(&self, handle: &Handle, snapshot: &Snapshot) -> Result<()> {
        self.as_ref().dump(handle, snapshot).await
    }
    async fn report(&self, handle: &Handle, query: &str) -> Result<Report> {
        self.as_ref().report(handle, query).await
    }
    async fn counts(&self, handle: &Handle, tables: &[String]) -> Result<Vec<(String, i64)>> {
        self.as_ref().counts(handle, tables).await
    }
}

/// Normalise catalog output into the restorable table set: names are
/// whitespace-stripped, blanks dropped, the migration table excluded.
pub fn restorable<I>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    names
        .into_iter()
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .filter(|name| name != crate::MIGRATIONS)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Quote an identifier for interpolation into SQL.
pub fn quote(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}
