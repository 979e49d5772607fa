//! `Join` (§4.5): the inner join of two rowsources on their shared bound
//! variables. The right side must already be resettable — the planner
//! wraps a non-resettable one in [`crate::ops::buffered::BufferedRowsource`]
//! before constructing this — so this operator itself stays a plain nested
//! loop with no materialization logic of its own.
use crate::error::EvaluationError;
use crate::ops::merge::{compatible, merge};
use crate::row::Row;
use crate::rowsource::Rowsource;
use rq_algebra::VariablesTable;

pub struct JoinRowsource {
    left: Box<dyn Rowsource>,
    right: Box<dyn Rowsource>,
    variables: VariablesTable,
    current_left: Option<Row>,
    next_offset: u64,
}

impl JoinRowsource {
    pub fn new(left: Box<dyn Rowsource>, right: Box<dyn Rowsource>, variables: VariablesTable) -> Self {
        assert!(right.is_resettable(), "Join's right child must be resettable (the planner must buffer it otherwise)");
        Self {
            left,
            right,
            variables,
            current_left: None,
            next_offset: 0,
        }
    }
}

impl Rowsource for JoinRowsource {
    fn variables(&self) -> &VariablesTable {
        &self.variables
    }

    fn init(&mut self) -> Result<(), EvaluationError> {
        self.left.init()?;
        self.right.init()
    }

    fn read_row(&mut self) -> Result<Option<Row>, EvaluationError> {
        loop {
            if self.current_left.is_none() {
                let Some(left_row) = self.left.read_row()? else {
                    return Ok(None);
                };
                self.current_left = Some(left_row);
                self.right.reset()?;
            }

            let Some(right_row) = self.right.read_row()? else {
                self.current_left = None;
                continue;
            };
            let left_row = self.current_left.as_ref().expect("checked above");
            if compatible(left_row, &right_row) {
                let merged = merge(left_row, &right_row, self.next_offset);
                self.next_offset += 1;
                return Ok(Some(merged));
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
        self.right.finish();
        self.left.finish();
    }

    fn operator_name(&self) -> &'static str {
        "Join"
    }
}
