//! The pull-based rowsource interface every algebra operator lowers to
//! (§4.5): `init`/`finish`/`ensure_variables`/`read_row`/`read_all_rows`/
//! `reset`/`get_inner_rowsource`/`set_origin`. Grounded on the teacher's
//! plain `Iterator`-based evaluator pipeline, generalized to the explicit
//! resettable-pull contract the backtracking join (§4.6) requires — a Join's
//! right child must be rewound per left row, which a bare `std::Iterator`
//! cannot express without re-creating it from scratch.
use crate::error::EvaluationError;
use rq_algebra::VariablesTable;
use rq_model::Term;

use crate::row::Row;

/// A pull-based operator in the execution plan.
///
/// Implementors are single-threaded and synchronous (§5): a `read_row` call
/// always completes before the next one starts, and no rowsource retains
/// borrows across calls that would prevent `&mut self` reentry.
pub trait Rowsource {
    /// This rowsource's output schema, final only after `ensure_variables`.
    fn variables(&self) -> &VariablesTable;

    fn size(&self) -> usize {
        self.variables().count()
    }

    /// Called once before the first `read_row`/`reset`.
    fn init(&mut self) -> Result<(), EvaluationError> {
        Ok(())
    }

    /// Finalizes the schema; a no-op for most operators, meaningful for ones
    /// that synthesize columns (e.g. `Extend`, `Group`).
    fn ensure_variables(&mut self) -> Result<(), EvaluationError> {
        Ok(())
    }

    /// Returns the next row, or `None` once exhausted. A returned `Err` is
    /// sticky (§4.5 "Error policy"): subsequent calls must keep returning the
    /// same error rather than silently resuming.
    fn read_row(&mut self) -> Result<Option<Row>, EvaluationError>;

    /// Bulk materialization; the default just drains `read_row`. Blocking
    /// operators (OrderBy, Distinct, Group) override this since they must
    /// materialize anyway.
    fn read_all_rows(&mut self) -> Result<Vec<Row>, EvaluationError> {
        let mut rows = Vec::new();
        while let Some(row) = self.read_row()? {
            rows.push(row);
        }
        Ok(rows)
    }

    /// Whether `reset` is supported without re-planning. `Join` buffers its
    /// right child automatically when this is `false` (§4.5).
    fn is_resettable(&self) -> bool {
        false
    }

    /// Rewinds to the first row. Only called when `is_resettable()` is true.
    fn reset(&mut self) -> Result<(), EvaluationError> {
        Err(EvaluationError::runtime("this rowsource does not support reset"))
    }

    /// Fixes a `GRAPH` origin for a constant-origin `Graph` node, or sets the
    /// per-iteration origin the `Graph` rowsource drives with a variable
    /// origin (§4.5).
    fn set_origin(&mut self, _origin: Option<Term>) {}

    /// Exposes a child rowsource for plan inspection (§2 "explain"), not for
    /// ownership transfer — composition still owns its children.
    fn get_inner_rowsource(&self, _index: usize) -> Option<&dyn Rowsource> {
        None
    }

    /// Releases any resources held (file handles, buffers); called in
    /// reverse order on cancellation or normal completion (§5).
    fn finish(&mut self) {}

    /// The algebra operator this rowsource implements, used by `explain`.
    fn operator_name(&self) -> &'static str;
}
