#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

//! rowkit - a functional convenience layer over SQLite
//!
//! rowkit wraps the `rusqlite` client with a small set of composable pieces
//! for running queries, mapping result rows to typed values, enriching
//! in-memory entities from query results, and tracking schema migrations.
//! It adds no pooling, no async, and no wire protocol of its own: every
//! operation is a synchronous call into the underlying client, with the
//! resource bookkeeping handled for you.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! ```text
//! src/
//! ├── sql        # Sql: immutable SQL text + positional bound parameters
//! ├── functions  # Extractor / Enricher / EnricherChain
//! ├── cursor     # RowCursor: lazy, closeable row iteration
//! ├── accessor   # ConnectionProvider + the Accessor mixin operations
//! ├── migrate    # Migration / SqlMigration / Manager
//! └── error      # Error taxonomy wrapping the client's failures
//! ```
//!
//! The only upstream coupling is [`ConnectionProvider`]: one operation
//! yielding a live connection. Everything a provider can do, from
//! [`Accessor::query`] and [`Accessor::find`] to [`Accessor::enrich`],
//! comes from the blanket-implemented [`Accessor`] mixin.
//!
//! # Quick start
//!
//! ```
//! use rowkit::{Accessor, Sql};
//! use rowkit::rusqlite::{Connection, Row};
//!
//! fn word(row: &Row<'_>) -> rowkit::Result<String> {
//!     Ok(row.get(0)?)
//! }
//!
//! fn main() -> rowkit::Result<()> {
//!     let path = std::env::temp_dir().join(format!("rowkit-doc-{}.sqlite", std::process::id()));
//!     let provider = {
//!         let path = path.clone();
//!         move || -> rowkit::Result<Connection> { Ok(Connection::open(&path)?) }
//!     };
//!
//!     provider.update(&Sql::new("CREATE TABLE IF NOT EXISTS words (word TEXT)"))?;
//!     provider.update(&Sql::new("DELETE FROM words"))?;
//!     provider.update(
//!         &Sql::new("INSERT INTO words (word) VALUES (?1), (?1), (?2)")
//!             .bind("a".to_string())
//!             .bind("b".to_string()),
//!     )?;
//!
//!     let words = provider.query_all(&Sql::new("SELECT word FROM words"), word)?;
//!     assert_eq!(words, vec!["a", "a", "b"]);
//!
//!     let one = provider.find(
//!         &Sql::new("SELECT word FROM words WHERE word = ?1").bind("b".to_string()),
//!         word,
//!     )?;
//!     assert_eq!(one, Some("b".to_string()));
//!
//!     std::fs::remove_file(&path).ok();
//!     Ok(())
//! }
//! ```
//!
//! # Streaming
//!
//! [`Accessor::query`] hands its consumer a lazy [`RowCursor`] scoped to the
//! open statement and connection; all three are released when the consumer
//! returns, whether it drained the cursor or abandoned it early:
//!
//! ```rust,ignore
//! let first_two: Vec<String> = provider.query(&sql, word, |rows| {
//!     rows.take(2).collect()
//! })?;
//! ```
//!
//! # Migrations
//!
//! A [`Manager`] is caller-owned and explicitly constructed. Migrations run
//! in case-insensitive identifier order, each committing atomically with its
//! tracking record; the first failure aborts the run:
//!
//! ```rust,ignore
//! let mut manager = Manager::new(provider);
//! manager.add(SqlMigration::new("001", "words table", "CREATE TABLE words (word TEXT)"));
//! let applied = manager.do_migrations()?;
//! ```

pub mod accessor;
pub mod cursor;
pub mod error;
pub mod functions;
pub mod migrate;
pub mod sql;

pub use accessor::{Accessor, ConnectionProvider};
pub use cursor::RowCursor;
pub use error::{Error, Result};
pub use functions::{Enricher, EnricherChain, Extractor};
pub use migrate::{Manager, Migration, SqlMigration};
pub use sql::Sql;

// Re-export the underlying client so callers use a single, matching version
// of its types (Connection, Row, Value).
pub use rusqlite;
