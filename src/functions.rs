//! Row extraction and enrichment functions
//!
//! An [`Extractor`] converts one result row into a typed value; an
//! [`Enricher`] mutates an existing entity in place from one result row.
//! Both are stateless and meant to be constructed once and reused. Plain
//! closures and `fn` items implement both traits.

use crate::error::Result;
use rusqlite::Row;

/// Converts one database row into a typed value.
///
/// Implemented for any `Fn(&Row) -> Result<T>`, so an extractor is usually
/// just a function:
///
/// ```rust,ignore
/// fn word(row: &Row<'_>) -> Result<String> {
///     Ok(row.get(0)?)
/// }
/// ```
pub trait Extractor<T> {
    /// Extract a value from the current row.
    fn extract(&self, row: &Row<'_>) -> Result<T>;
}

impl<T, F> Extractor<T> for F
where
    F: Fn(&Row<'_>) -> Result<T>,
{
    fn extract(&self, row: &Row<'_>) -> Result<T> {
        self(row)
    }
}

/// Mutates an existing entity using fields from one database row.
pub trait Enricher<E> {
    /// Apply one row's worth of data to the entity.
    fn enrich(&self, entity: &mut E, row: &Row<'_>) -> Result<()>;
}

impl<E, F> Enricher<E> for F
where
    F: Fn(&mut E, &Row<'_>) -> Result<()>,
{
    fn enrich(&self, entity: &mut E, row: &Row<'_>) -> Result<()> {
        self(entity, row)
    }
}

/// An explicit ordered list of enrichment steps.
///
/// Steps are applied in registration order; the first failure aborts the
/// remaining steps and surfaces the error unchanged.
pub struct EnricherChain<E> {
    steps: Vec<Box<dyn Enricher<E>>>,
}

impl<E> EnricherChain<E> {
    /// Create an empty chain.
    pub fn new() -> Self {
        Self { steps: Vec::new() }
    }

    /// Append a step to the chain.
    pub fn then(mut self, enricher: impl Enricher<E> + 'static) -> Self {
        self.steps.push(Box::new(enricher));
        self
    }

    /// Number of registered steps.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether the chain has no steps.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl<E> Default for EnricherChain<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Enricher<E> for EnricherChain<E> {
    fn enrich(&self, entity: &mut E, row: &Row<'_>) -> Result<()> {
        for step in &self.steps {
            step.enrich(entity, row)?;
        }
        Ok(())
    }
}
