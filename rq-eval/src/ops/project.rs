//! `Project` (§4.5, `SELECT`'s variable list): restricts a row to the named
//! variables, unbinding everything else. Variable offsets are global, so
//! this never renumbers — it only clears what falls outside the projection.
//! The planner reads [`ProjectRowsource::projection`] directly off the
//! root node to build the result header (§4.7), since `Rowsource::variables`
//! is shared across the whole plan and isn't, by itself, a statement of
//! which columns are the query's actual output.
use crate::error::EvaluationError;
use crate::row::Row;
use crate::rowsource::Rowsource;
use rq_algebra::{VariableOffset, VariablesTable};

pub struct ProjectRowsource {
    inner: Box<dyn Rowsource>,
    pub projection: Vec<VariableOffset>,
    variables: VariablesTable,
}

impl ProjectRowsource {
    pub fn new(inner: Box<dyn Rowsource>, projection: Vec<VariableOffset>, variables: VariablesTable) -> Self {
        Self { inner, projection, variables }
    }
}

impl Rowsource for ProjectRowsource {
    fn variables(&self) -> &VariablesTable {
        &self.variables
    }

    fn init(&mut self) -> Result<(), EvaluationError> {
        self.inner.init()
    }

    fn read_row(&mut self) -> Result<Option<Row>, EvaluationError> {
        let Some(row) = self.inner.read_row()? else {
            return Ok(None);
        };
        let width = row.len();
        let mut out = Row::new(width, row.offset);
        for &offset in &self.projection {
            if let Some(value) = row.get(offset) {
                out.set(offset, Some(value.clone()));
            }
        }
        Ok(Some(out))
    }

    fn is_resettable(&self) -> bool {
        self.inner.is_resettable()
    }

    fn reset(&mut self) -> Result<(), EvaluationError> {
        self.inner.reset()
    }

    fn get_inner_rowsource(&self, index: usize) -> Option<&dyn Rowsource> {
        if index == 0 {
            Some(self.inner.as_ref())
        } else {
            None
        }
    }

    fn finish(&mut self) {
        self.inner.finish();
    }

    fn operator_name(&self) -> &'static str {
        "Project"
    }
}
