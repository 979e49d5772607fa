//! Materializes a non-resettable child once, so operators that must rewind
//! a subtree per outer row (`Join`'s and `LeftJoin`'s right side, §4.5) can
//! treat every inner rowsource as resettable without knowing which ones
//! actually are. The planner inserts this wrapper only around children that
//! report `is_resettable() == false`; a child that already supports `reset`
//! (e.g. `TriplesRowsource`) is left bare to avoid the extra materialization.
use crate::error::EvaluationError;
use crate::row::Row;
use crate::rowsource::Rowsource;
use rq_algebra::VariablesTable;

pub struct BufferedRowsource {
    inner: Box<dyn Rowsource>,
    rows: Vec<Row>,
    loaded: bool,
    position: usize,
}

impl BufferedRowsource {
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

impl Rowsource for BufferedRowsource {
    fn variables(&self) -> &VariablesTable {
        self.inner.variables()
    }

    fn init(&mut self) -> Result<(), EvaluationError> {
        self.inner.init()
    }

    fn ensure_variables(&mut self) -> Result<(), EvaluationError> {
        self.inner.ensure_variables()
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
        "Buffered"
    }
}
