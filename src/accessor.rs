//! Connection provider and accessor operations
//!
//! [`ConnectionProvider`] is the only upstream coupling point: one operation
//! yielding a live connection. [`Accessor`] is a default-method mixin layered
//! on top of it; every type that can provide a connection gets the full set
//! of query, find, update, enrich, and insert operations for free.
//!
//! Every operation opens a connection (plus statement and cursor as needed)
//! and guarantees release before returning. Close failures are logged and
//! ignored so they never mask the primary error.

use crate::cursor::RowCursor;
use crate::error::{Error, Result};
use crate::functions::{Enricher, Extractor};
use crate::sql::Sql;
use rusqlite::Connection;
use std::collections::HashMap;
use std::hash::Hash;
use tracing::{debug, warn};

/// External capability yielding a live database connection.
///
/// Implemented for any `Fn() -> Result<Connection>` closure, so the simplest
/// provider is a function opening a database file:
///
/// ```rust,ignore
/// let provider = move || Ok(Connection::open(&path)?);
/// let words: Vec<String> = provider.query_all(&sql, word)?;
/// ```
pub trait ConnectionProvider {
    /// Return a live connection, or fail with a data-access error.
    fn connection(&self) -> Result<Connection>;
}

impl<F> ConnectionProvider for F
where
    F: Fn() -> Result<Connection>,
{
    fn connection(&self) -> Result<Connection> {
        self()
    }
}

/// Default-method database operations over a [`ConnectionProvider`].
///
/// Blanket-implemented for every provider; do not implement manually.
pub trait Accessor: ConnectionProvider {
    /// Run a query and stream extracted rows lazily through `consume`.
    ///
    /// The cursor is scoped to `consume`: rows are fetched one at a time as
    /// the consumer advances, and the cursor, statement, and connection are
    /// all released when `consume` returns, whether it drained the cursor,
    /// abandoned it early, or failed.
    fn query<T, X, R, F>(&self, sql: &Sql, extractor: X, consume: F) -> Result<R>
    where
        X: Extractor<T>,
        F: FnOnce(&mut RowCursor<'_, T, X>) -> Result<R>,
    {
        debug!(sql = sql.text(), "running query");
        let conn = self.connection()?;
        let result = {
            let mut stmt = conn.prepare(sql.text())?;
            let rows = stmt.query(sql.params())?;
            let mut cursor = RowCursor::new(rows, extractor);
            let result = consume(&mut cursor);
            cursor.close();
            result
        };
        close_quietly(conn);
        result
    }

    /// Run a query and collect every extracted row, in row order.
    fn query_all<T, X>(&self, sql: &Sql, extractor: X) -> Result<Vec<T>>
    where
        X: Extractor<T>,
    {
        self.query(sql, extractor, |rows| {
            let mut out = Vec::new();
            for item in rows {
                out.push(item?);
            }
            Ok(out)
        })
    }

    /// Run a query expected to match at most one row.
    ///
    /// Returns `None` on no rows and [`Error::MultipleRows`] if a second row
    /// exists. Resources are released before returning.
    fn find<T, X>(&self, sql: &Sql, extractor: X) -> Result<Option<T>>
    where
        X: Extractor<T>,
    {
        self.query(sql, extractor, |rows| {
            let first = match rows.next() {
                None => return Ok(None),
                Some(item) => item?,
            };
            match rows.next() {
                None => Ok(Some(first)),
                Some(Ok(_)) => Err(Error::MultipleRows),
                Some(Err(e)) => Err(e),
            }
        })
    }

    /// Run an insert, update, delete, or DDL statement and return the
    /// affected-row count.
    fn update(&self, sql: &Sql) -> Result<usize> {
        debug!(sql = sql.text(), "running update");
        let conn = self.connection()?;
        let count = conn.execute(sql.text(), sql.params()).map_err(Error::from);
        close_quietly(conn);
        count
    }

    /// Run an arbitrary statement, returning whether it produced a result
    /// set.
    fn execute(&self, sql: &Sql) -> Result<bool> {
        debug!(sql = sql.text(), "executing statement");
        let conn = self.connection()?;
        let result = run_execute(&conn, sql);
        close_quietly(conn);
        result
    }

    /// Run a query whose rows enrich entities already present in `map`.
    ///
    /// Each row yields a key via `key_extractor`; if the key is present in
    /// the map, the corresponding entity is mutated via `enricher`. Rows
    /// whose key is not in the map are skipped; this is a best-effort join.
    /// Keys are never added to or removed from the map.
    fn enrich<K, V, KX, EN>(
        &self,
        map: &mut HashMap<K, V>,
        key_extractor: KX,
        enricher: EN,
        sql: &Sql,
    ) -> Result<()>
    where
        K: Eq + Hash,
        KX: Extractor<K>,
        EN: Enricher<V>,
    {
        debug!(sql = sql.text(), "running enrichment query");
        let conn = self.connection()?;
        let result = run_enrich(&conn, map, &key_extractor, &enricher, sql);
        close_quietly(conn);
        result
    }

    /// Run an insert and return the generated row id.
    fn insert(&self, sql: &Sql) -> Result<i64> {
        debug!(sql = sql.text(), "running insert");
        let conn = self.connection()?;
        let result = conn
            .execute(sql.text(), sql.params())
            .map(|_| conn.last_insert_rowid())
            .map_err(Error::from);
        close_quietly(conn);
        result
    }

    /// Run an insert carrying a `RETURNING` clause and stream the generated
    /// values lazily through `consume`, as in [`Accessor::query`].
    fn insert_returning<T, X, R, F>(&self, sql: &Sql, extractor: X, consume: F) -> Result<R>
    where
        X: Extractor<T>,
        F: FnOnce(&mut RowCursor<'_, T, X>) -> Result<R>,
    {
        self.query(sql, extractor, consume)
    }
}

impl<P: ConnectionProvider + ?Sized> Accessor for P {}

fn run_execute(conn: &Connection, sql: &Sql) -> Result<bool> {
    let mut stmt = conn.prepare(sql.text())?;
    if stmt.column_count() > 0 {
        let mut rows = stmt.query(sql.params())?;
        // Step once so the statement actually runs.
        rows.next()?;
        Ok(true)
    } else {
        stmt.execute(sql.params())?;
        Ok(false)
    }
}

fn run_enrich<K, V, KX, EN>(
    conn: &Connection,
    map: &mut HashMap<K, V>,
    key_extractor: &KX,
    enricher: &EN,
    sql: &Sql,
) -> Result<()>
where
    K: Eq + Hash,
    KX: Extractor<K>,
    EN: Enricher<V>,
{
    let mut stmt = conn.prepare(sql.text())?;
    let mut rows = stmt.query(sql.params())?;
    while let Some(row) = rows.next()? {
        let key = key_extractor.extract(row)?;
        if let Some(entity) = map.get_mut(&key) {
            enricher.enrich(entity, row)?;
        }
    }
    Ok(())
}

/// Close a connection, logging rather than propagating any failure so it
/// cannot mask a primary error.
pub(crate) fn close_quietly(conn: Connection) {
    if let Err((_conn, e)) = conn.close() {
        warn!(error = %e, "failed to close connection");
    }
}
