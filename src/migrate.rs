//! Migration bookkeeping
//!
//! A [`Migration`] is a named schema-change action tracked by completion
//! status. A [`Manager`] is an explicitly constructed, caller-owned registry
//! of migrations (there is no process-wide singleton), visiting them in
//! case-insensitive identifier order and recording each success in a
//! tracking table.
//!
//! Each migration runs inside a transaction together with its tracking-row
//! write, so a failed step leaves no schema side effects behind. The first
//! failure aborts the remaining run. Migrations flagged "run always" are
//! executed on every pass; their tracking row is upserted so re-recording
//! never collides with the primary key.
//!
//! The manager has no internal locking: concurrent registration or
//! concurrent [`Manager::do_migrations`] calls are not supported.

use crate::accessor::close_quietly;
use crate::error::{Error, Result};
use crate::sql::Sql;
use crate::ConnectionProvider;
use rusqlite::{params, Connection};
use tracing::{debug, info};

const CREATE_TRACKING: &str =
    "CREATE TABLE IF NOT EXISTS migrations (identifier TEXT PRIMARY KEY, description TEXT NOT NULL)";
const TRACK: &str = "INSERT INTO migrations (identifier, description) VALUES (?1, ?2)
     ON CONFLICT(identifier) DO UPDATE SET description = excluded.description";
const FIND: &str = "SELECT identifier FROM migrations WHERE identifier = ?1";

/// A named, idempotent schema-change action.
pub trait Migration {
    /// Short identifier, unique among registered migrations. Ordering of a
    /// migration run is the case-insensitive lexical order of identifiers.
    fn identifier(&self) -> &str;

    /// Human-readable description, stored alongside the identifier in the
    /// tracking table.
    fn description(&self) -> &str;

    /// Whether to execute on every pass regardless of tracked completion.
    fn run_always(&self) -> bool {
        false
    }

    /// Perform the schema change. Runs inside a transaction; any error rolls
    /// the whole step back.
    fn perform(&self, conn: &Connection) -> Result<()>;
}

/// A migration defined by a batch of SQL statements.
pub struct SqlMigration {
    identifier: String,
    description: String,
    sql: String,
    run_always: bool,
}

impl SqlMigration {
    /// Create a migration executing `sql` as a batch.
    pub fn new(
        identifier: impl Into<String>,
        description: impl Into<String>,
        sql: impl Into<String>,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            description: description.into(),
            sql: sql.into(),
            run_always: false,
        }
    }

    /// Mark this migration to run on every pass.
    pub fn always(mut self) -> Self {
        self.run_always = true;
        self
    }
}

impl Migration for SqlMigration {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn run_always(&self) -> bool {
        self.run_always
    }

    fn perform(&self, conn: &Connection) -> Result<()> {
        conn.execute_batch(&self.sql)?;
        Ok(())
    }
}

/// Caller-owned registry and runner for an ordered set of migrations.
///
/// ```rust,ignore
/// let mut manager = Manager::new(provider);
/// manager.add(SqlMigration::new("001", "words table", CREATE_WORDS));
/// let applied = manager.do_migrations()?;
/// ```
pub struct Manager<P> {
    provider: P,
    migrations: Vec<Box<dyn Migration>>,
}

impl<P: ConnectionProvider> Manager<P> {
    /// Create a manager drawing connections from `provider`.
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            migrations: Vec::new(),
        }
    }

    /// Register a migration, keeping the set ordered by case-insensitive
    /// identifier. Registering an identifier that is already present is
    /// ignored.
    pub fn add(&mut self, migration: impl Migration + 'static) {
        let key = migration.identifier().to_lowercase();
        match self
            .migrations
            .binary_search_by_key(&key, |m| m.identifier().to_lowercase())
        {
            Ok(_) => {
                debug!(
                    identifier = migration.identifier(),
                    "migration already registered, ignoring"
                );
            }
            Err(pos) => self.migrations.insert(pos, Box::new(migration)),
        }
    }

    /// The registered migrations, in run order.
    pub fn migrations(&self) -> &[Box<dyn Migration>] {
        &self.migrations
    }

    /// Remove all registered migrations.
    pub fn clear(&mut self) {
        self.migrations.clear();
    }

    /// Whether the tracking table exists.
    pub fn migrations_enabled(&self) -> Result<bool> {
        let conn = self.provider.connection()?;
        let enabled = table_exists(&conn, "migrations");
        close_quietly(conn);
        enabled
    }

    /// Create the tracking table. Idempotent.
    pub fn enable_migrations(&self) -> Result<()> {
        let conn = self.provider.connection()?;
        let result = conn
            .execute(CREATE_TRACKING, [])
            .map(|_| ())
            .map_err(Error::from);
        close_quietly(conn);
        result
    }

    /// Whether the migration with `identifier` has completed.
    pub fn migrated(&self, identifier: &str) -> Result<bool> {
        let conn = self.provider.connection()?;
        let tracked = is_tracked(&conn, identifier);
        close_quietly(conn);
        tracked
    }

    /// Run all pending migrations in identifier order, returning how many
    /// were performed.
    ///
    /// A migration runs if it has no tracking row or is flagged "run
    /// always". Each step and its tracking write commit atomically; the
    /// first failure aborts the remaining run with [`Error::Migration`].
    pub fn do_migrations(&self) -> Result<usize> {
        let conn = self.provider.connection()?;
        let result = self.run_pending(&conn);
        close_quietly(conn);
        result
    }

    fn run_pending(&self, conn: &Connection) -> Result<usize> {
        conn.execute(CREATE_TRACKING, [])?;
        let mut applied = 0;
        for migration in &self.migrations {
            let id = migration.identifier();
            if is_tracked(conn, id)? && !migration.run_always() {
                debug!(identifier = id, "migration already applied, skipping");
                continue;
            }

            info!(
                identifier = id,
                description = migration.description(),
                "applying migration"
            );
            let step = || -> Result<()> {
                let tx = conn.unchecked_transaction()?;
                migration.perform(&tx)?;
                tx.execute(TRACK, params![id, migration.description()])?;
                tx.commit()?;
                Ok(())
            };
            step().map_err(|e| Error::Migration {
                identifier: id.to_string(),
                source: Box::new(e),
            })?;
            applied += 1;
        }
        Ok(applied)
    }
}

fn table_exists(conn: &Connection, name: &str) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
        [name],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

fn is_tracked(conn: &Connection, identifier: &str) -> Result<bool> {
    match conn.query_row(FIND, [identifier], |row| row.get::<_, String>(0)) {
        Ok(_) => Ok(true),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// SQL for querying the tracking table contents, for callers that want to
/// inspect completed migrations through the accessor operations.
pub fn tracked_migrations_sql() -> Sql {
    Sql::new("SELECT identifier, description FROM migrations ORDER BY identifier")
}
