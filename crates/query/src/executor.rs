//! The collaborator that actually runs SQL.

use sqlcache_core::Error;
use sqlcache_core::cache::{BoundParameters, Window};

use crate::result::ResultSet;
use crate::statement::Statement;

/// Executes a bound statement against the underlying data store.
///
/// Implementations report driver failures as `Error::Execution`.
pub trait QueryExecutor: Send + Sync {
    fn execute(&self, statement: &Statement, params: &BoundParameters, window: Window) -> Result<ResultSet, Error>;
}

impl<F> QueryExecutor for F
where
    F: Fn(&Statement, &BoundParameters, Window) -> Result<ResultSet, Error> + Send + Sync,
{
    fn execute(&self, statement: &Statement, params: &BoundParameters, window: Window) -> Result<ResultSet, Error> {
        self(statement, params, window)
    }
}
