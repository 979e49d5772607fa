//! `Reduced` (§4.5): SPARQL permits (but does not require) eliminating
//! duplicates; this only suppresses a row that is identical to the one
//! immediately before it, which is cheap and sufficient to satisfy the
//! "may eliminate adjacent duplicates" license without `Distinct`'s full
//! materialized set.
use crate::error::EvaluationError;
use crate::row::Row;
use crate::rowsource::Rowsource;
use rq_algebra::VariablesTable;

pub struct ReducedRowsource {
    inner: Box<dyn Rowsource>,
    previous: Option<Vec<Option<rq_model::Term>>>,
}

impl ReducedRowsource {
    pub fn new(inner: Box<dyn Rowsource>) -> Self {
        Self { inner, previous: None }
    }
}

impl Rowsource for ReducedRowsource {
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
            let key = row.canonical_key().to_vec();
            if self.previous.as_ref() == Some(&key) {
                continue;
            }
            self.previous = Some(key);
            return Ok(Some(row));
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
        "Reduced"
    }
}
