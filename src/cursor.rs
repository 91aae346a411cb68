//! Lazy row cursors
//!
//! [`RowCursor`] adapts a `rusqlite` result cursor into an iterator of
//! extracted values. Rows are fetched one at a time, and the underlying
//! cursor is released exactly once no matter how iteration ends: natural
//! exhaustion, early abandonment, or an error. Additional release hooks can
//! be registered and run, in registration order, exactly once at close.
//!
//! A cursor is tied to the statement it was opened from and is not meant for
//! concurrent advancement; iteration requires `&mut self`.

use crate::error::Result;
use crate::functions::Extractor;
use rusqlite::Rows;
use std::marker::PhantomData;

/// A lazy, closeable iterator over extracted rows.
///
/// Usually obtained through [`Accessor::query`](crate::Accessor::query),
/// which scopes the cursor to the owning statement and connection. It can
/// also be built directly from a `rusqlite::Rows` for callers managing their
/// own statements.
pub struct RowCursor<'stmt, T, X> {
    rows: Option<Rows<'stmt>>,
    extractor: X,
    closed: bool,
    hooks: Vec<Box<dyn FnOnce()>>,
    _target: PhantomData<fn() -> T>,
}

impl<'stmt, T, X> RowCursor<'stmt, T, X> {
    /// Wrap an open result cursor with an extractor.
    pub fn new(rows: Rows<'stmt>, extractor: X) -> Self {
        Self {
            rows: Some(rows),
            extractor,
            closed: false,
            hooks: Vec::new(),
            _target: PhantomData,
        }
    }

    /// Register a hook to run at close. Hooks run in registration order,
    /// exactly once.
    pub fn on_close(&mut self, hook: impl FnOnce() + 'static) {
        self.hooks.push(Box::new(hook));
    }

    /// Whether this cursor has been closed.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Release the underlying cursor and run registered close hooks.
    ///
    /// Called automatically on exhaustion, on a fetch error, and on drop.
    /// Closing an already-closed cursor is a no-op.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        // Dropping the Rows resets the owning statement.
        self.rows = None;
        for hook in self.hooks.drain(..) {
            hook();
        }
    }
}

impl<'stmt, T, X> Iterator for RowCursor<'stmt, T, X>
where
    X: Extractor<T>,
{
    type Item = Result<T>;

    fn next(&mut self) -> Option<Result<T>> {
        let rows = self.rows.as_mut()?;
        match rows.next() {
            Ok(Some(row)) => Some(self.extractor.extract(row)),
            Ok(None) => {
                self.close();
                None
            }
            Err(e) => {
                self.close();
                Some(Err(e.into()))
            }
        }
    }
}

impl<'stmt, T, X> Drop for RowCursor<'stmt, T, X> {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::error::Result;
    use rusqlite::{Connection, Row};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn words_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE words (word TEXT);
             INSERT INTO words (word) VALUES ('a'), ('a'), ('b');",
        )
        .unwrap();
        conn
    }

    fn word(row: &Row<'_>) -> Result<String> {
        Ok(row.get(0)?)
    }

    #[test]
    fn test_yields_rows_in_order() {
        let conn = words_db();
        let mut stmt = conn.prepare("SELECT word FROM words").unwrap();
        let rows = stmt.query([]).unwrap();

        let mut cursor = RowCursor::new(rows, word);
        let words: Vec<String> = (&mut cursor).collect::<Result<_>>().unwrap();
        assert_eq!(words, vec!["a", "a", "b"]);
        assert!(cursor.is_closed(), "exhaustion must close the cursor");
        assert!(cursor.next().is_none(), "a closed cursor yields nothing");
    }

    #[test]
    fn test_close_hooks_run_in_order_exactly_once() {
        let conn = words_db();
        let mut stmt = conn.prepare("SELECT word FROM words").unwrap();
        let rows = stmt.query([]).unwrap();

        let log = Rc::new(RefCell::new(Vec::new()));
        let mut cursor = RowCursor::new(rows, word);
        let first = Rc::clone(&log);
        cursor.on_close(move || first.borrow_mut().push("first"));
        let second = Rc::clone(&log);
        cursor.on_close(move || second.borrow_mut().push("second"));

        // Abandon after one row.
        let _ = cursor.next();
        assert!(!cursor.is_closed());

        cursor.close();
        cursor.close();
        drop(cursor);

        assert_eq!(*log.borrow(), vec!["first", "second"]);
    }

    #[test]
    fn test_drop_closes() {
        let conn = words_db();
        let mut stmt = conn.prepare("SELECT word FROM words").unwrap();
        let rows = stmt.query([]).unwrap();

        let closed = Rc::new(RefCell::new(0));
        let mut cursor: RowCursor<'_, String, _> = RowCursor::new(rows, word);
        let count = Rc::clone(&closed);
        cursor.on_close(move || *count.borrow_mut() += 1);
        drop(cursor);

        assert_eq!(*closed.borrow(), 1);
    }

    #[test]
    fn test_extraction_error_leaves_cursor_usable() {
        let conn = words_db();
        let mut stmt = conn.prepare("SELECT word FROM words").unwrap();
        let rows = stmt.query([]).unwrap();

        // Text column read as integer fails per row, not fatally.
        let as_int = |row: &Row<'_>| -> Result<i64> { Ok(row.get(0)?) };
        let mut cursor = RowCursor::new(rows, as_int);

        assert!(cursor.next().unwrap().is_err());
        assert!(!cursor.is_closed());
        assert!(cursor.next().unwrap().is_err());
    }
}
