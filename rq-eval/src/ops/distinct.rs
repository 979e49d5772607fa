//! `Distinct` (§4.5): suppresses rows whose binding set was already seen,
//! keyed on the full value tuple (`Row::canonical_key`, where unbound
//! positions compare equal to each other).
use rustc_hash::FxHashSet;

use crate::error::EvaluationError;
use crate::row::Row;
use crate::rowsource::Rowsource;
use rq_algebra::VariablesTable;
use rq_model::Term;

pub struct DistinctRowsource {
    inner: Box<dyn Rowsource>,
    seen: FxHashSet<Vec<Option<Term>>>,
}

impl DistinctRowsource {
    pub fn new(inner: Box<dyn Rowsource>) -> Self {
        Self { inner, seen: FxHashSet::default() }
    }
}

impl Rowsource for DistinctRowsource {
    fn variables(&self) -> &VariablesTable {
        self.inner.variables()
    }

    fn init(&mut self) -> Result<(), EvaluationError> {
        self.inner.init()
    }

    fn read_row(&mut self) -> Result<Option<Row>, EvaluationError> {
        loop {
            let Some(row) = self.inner.read_row()? else {
                return Ok(None);
            };
            if self.seen.insert(row.canonical_key().to_vec()) {
                return Ok(Some(row));
            }
        }
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
        "Distinct"
    }
}
