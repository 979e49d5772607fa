//! `Diff` (§4.5, `MINUS`): drops a left row when (a) it shares at least one
//! bound variable with the right pattern (§4.8's domain-overlap rule — the
//! [`CorrelationSet`] computed for this node is non-empty) and (b) the
//! right pattern produces at least one row compatible with it. The right
//! side is re-run from scratch for every left row, so it must be
//! resettable — the planner buffers it otherwise, same as `Join`. Variable
//! offsets are global to the whole query, so a variable the right pattern
//! shares with the left is already the same offset in both rows and needs
//! no explicit substitution to be compared by [`compatible`].
use crate::correlation::CorrelationSet;
use crate::error::EvaluationError;
use crate::ops::merge::compatible;
use crate::row::Row;
use crate::rowsource::Rowsource;
use rq_algebra::VariablesTable;

pub struct DiffRowsource {
    left: Box<dyn Rowsource>,
    right: Box<dyn Rowsource>,
    correlated: CorrelationSet,
    variables: VariablesTable,
}

impl DiffRowsource {
    pub fn new(left: Box<dyn Rowsource>, right: Box<dyn Rowsource>, correlated: CorrelationSet, variables: VariablesTable) -> Self {
        assert!(right.is_resettable(), "Diff's right child must be resettable (the planner must buffer it otherwise)");
        Self {
            left,
            right,
            correlated,
            variables,
        }
    }

    fn right_has_compatible_row(&mut self, left_row: &Row) -> Result<bool, EvaluationError> {
        if self.correlated.is_empty() {
            return Ok(false);
        }
        self.right.reset()?;
        loop {
            let Some(right_row) = self.right.read_row()? else {
                return Ok(false);
            };
            if compatible(left_row, &right_row) {
                return Ok(true);
            }
        }
    }
}

impl Rowsource for DiffRowsource {
    fn variables(&self) -> &VariablesTable {
        &self.variables
    }

    fn init(&mut self) -> Result<(), EvaluationError> {
        self.left.init()?;
        self.right.init()
    }

    fn read_row(&mut self) -> Result<Option<Row>, EvaluationError> {
        loop {
            let Some(left_row) = self.left.read_row()? else {
                return Ok(None);
            };
            if !self.right_has_compatible_row(&left_row)? {
                return Ok(Some(left_row));
            }
        }
    }

    fn get_inner_rowsource(&self, index: usize) -> Option<&dyn Rowsource> {
        match index {
            0 => Some(self.left.as_ref()),
            1 => Some(self.right.as_ref()),
            _ => None,
        }
    }

    fn finish(&mut self) {
        self.left.finish();
        self.right.finish();
    }

    fn operator_name(&self) -> &'static str {
        "Diff"
    }
}
