//! `Union` (§4.5): concatenates two rowsources, widening each side's rows to
//! the union's combined schema so a variable bound by only one branch reads
//! as unbound from the other (`extend_to_width`, §4.5 "schemas unified").
use crate::error::EvaluationError;
use crate::row::{extend_to_width, Row};
use crate::rowsource::Rowsource;
use rq_algebra::VariablesTable;

pub struct UnionRowsource {
    left: Box<dyn Rowsource>,
    right: Box<dyn Rowsource>,
    variables: VariablesTable,
    left_done: bool,
    next_offset: u64,
}

impl UnionRowsource {
    pub fn new(left: Box<dyn Rowsource>, right: Box<dyn Rowsource>, variables: VariablesTable) -> Self {
        Self {
            left,
            right,
            variables,
            left_done: false,
            next_offset: 0,
        }
    }
}

impl Rowsource for UnionRowsource {
    fn variables(&self) -> &VariablesTable {
        &self.variables
    }

    fn init(&mut self) -> Result<(), EvaluationError> {
        self.left.init()?;
        self.right.init()
    }

    fn read_row(&mut self) -> Result<Option<Row>, EvaluationError> {
        let width = self.variables.count();
        if !self.left_done {
            if let Some(row) = self.left.read_row()? {
                let mut row = extend_to_width(row, width);
                row.offset = self.next_offset;
                self.next_offset += 1;
                return Ok(Some(row));
            }
            self.left_done = true;
        }
        let Some(row) = self.right.read_row()? else {
            return Ok(None);
        };
        let mut row = extend_to_width(row, width);
        row.offset = self.next_offset;
        self.next_offset += 1;
        Ok(Some(row))
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
        "Union"
    }
}
