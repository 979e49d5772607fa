//! `ToList` (§2 of SPEC_FULL's supplemented-features section): a deliberate
//! materializing boundary, inserted where a downstream operator needs
//! random access or multiple independent passes over a shared buffer (e.g.
//! ahead of several `Group` aggregates reading the same rows, or wherever
//! the planner wants resettability without relying on an operator's own
//! support for it). Functionally identical to
//! [`crate::ops::buffered::BufferedRowsource`]; kept as a distinct node so
//! `--explain` can show it was requested explicitly rather than inserted by
//! the planner as a non-resettable-child workaround.
use crate::error::EvaluationError;
use crate::row::Row;
use crate::rowsource::Rowsource;
use rq_algebra::VariablesTable;

pub struct ToListRowsource {
    inner: Box<dyn Rowsource>,
    rows: Vec<Row>,
    loaded: bool,
    position: usize,
}

impl ToListRowsource {
    pub fn new(inner: Box<dyn Rowsource>) -> Self {
        Self {
            inner,
            rows: Vec::new(),
            loaded: false,
            position: 0,
        }
    }

    fn ensure_loaded(&mut self) -> Result<(), EvaluationError> {
        if !self.loaded {
            self.rows = self.inner.read_all_rows()?;
            self.loaded = true;
        }
        Ok(())
    }
}

impl Rowsource for ToListRowsource {
    fn variables(&self) -> &VariablesTable {
        self.inner.variables()
    }

    fn init(&mut self) -> Result<(), EvaluationError> {
        self.inner.init()
    }

    fn read_row(&mut self) -> Result<Option<Row>, EvaluationError> {
        self.ensure_loaded()?;
        let row = self.rows.get(self.position).cloned();
        if row.is_some() {
            self.position += 1;
        }
        Ok(row)
    }

    fn is_resettable(&self) -> bool {
        true
    }

    fn reset(&mut self) -> Result<(), EvaluationError> {
        self.ensure_loaded()?;
        self.position = 0;
        Ok(())
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
        "ToList"
    }
}
