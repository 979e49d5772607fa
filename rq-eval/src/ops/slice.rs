//! `Slice` (§4.5, `OFFSET`/`LIMIT`): skips `offset` rows, then yields at
//! most `limit` more (or the rest, if `limit` is `None`).
use crate::error::EvaluationError;
use crate::row::Row;
use crate::rowsource::Rowsource;
use rq_algebra::VariablesTable;

pub struct SliceRowsource {
    inner: Box<dyn Rowsource>,
    offset: usize,
    limit: Option<usize>,
    skipped: bool,
    emitted: usize,
}

impl SliceRowsource {
    pub fn new(inner: Box<dyn Rowsource>, offset: usize, limit: Option<usize>) -> Self {
        Self {
            inner,
            offset,
            limit,
            skipped: false,
            emitted: 0,
        }
    }
}

impl Rowsource for SliceRowsource {
    fn variables(&self) -> &VariablesTable {
        self.inner.variables()
    }

    fn init(&mut self) -> Result<(), EvaluationError> {
        self.inner.init()
    }

    fn read_row(&mut self) -> Result<Option<Row>, EvaluationError> {
        if !self.skipped {
            for _ in 0..self.offset {
                if self.inner.read_row()?.is_none() {
                    break;
                }
            }
            self.skipped = true;
        }
        if self.limit.is_some_and(|limit| self.emitted >= limit) {
            return Ok(None);
        }
        let Some(row) = self.inner.read_row()? else {
            return Ok(None);
        };
        self.emitted += 1;
        Ok(Some(row))
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
        "Slice"
    }
}
