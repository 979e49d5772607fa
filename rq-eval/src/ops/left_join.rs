//! `LeftJoin` (§4.5, `OPTIONAL`): every left row appears at least once. If
//! the right side (plus the attached filter, evaluated post-merge) matches
//! nothing, the left row is emitted widened with the right side's variables
//! left unbound instead of being dropped.
use crate::error::EvaluationError;
use crate::expr_eval::EvalValue;
use crate::ops::env::EvalEnv;
use crate::ops::merge::{compatible, merge};
use crate::row::{extend_to_width, Row};
use crate::rowsource::Rowsource;
use rq_algebra::{Expression, VariablesTable};

pub struct LeftJoinRowsource {
    left: Box<dyn Rowsource>,
    right: Box<dyn Rowsource>,
    filter: Option<Expression>,
    variables: VariablesTable,
    env: EvalEnv,
    current_left: Option<Row>,
    matched_any: bool,
    next_offset: u64,
}

impl LeftJoinRowsource {
    pub fn new(left: Box<dyn Rowsource>, right: Box<dyn Rowsource>, filter: Option<Expression>, variables: VariablesTable, env: EvalEnv) -> Self {
        assert!(right.is_resettable(), "LeftJoin's right child must be resettable (the planner must buffer it otherwise)");
        Self {
            left,
            right,
            filter,
            variables,
            env,
            current_left: None,
            matched_any: false,
            next_offset: 0,
        }
    }

    fn passes_filter(&mut self, row: &Row) -> Result<bool, EvaluationError> {
        let Some(filter) = &self.filter else {
            return Ok(true);
        };
        let value = self.env.evaluate(filter, row);
        Ok(matches!(value, EvalValue::Value(_)) && value.effective_boolean_value_or_false())
    }

    fn next_output(&mut self) -> u64 {
        let offset = self.next_offset;
        self.next_offset += 1;
        offset
    }
}

impl Rowsource for LeftJoinRowsource {
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
                self.matched_any = false;
                self.right.reset()?;
            }

            let Some(right_row) = self.right.read_row()? else {
                let left_row = self.current_left.take().expect("checked above");
                if self.matched_any {
                    continue;
                }
                let offset = self.next_output();
                let mut row = extend_to_width(left_row, self.variables.count());
                row.offset = offset;
                return Ok(Some(row));
            };

            let left_row = self.current_left.as_ref().expect("checked above");
            if !compatible(left_row, &right_row) {
                continue;
            }
            let offset = self.next_output();
            let left_row = self.current_left.as_ref().expect("checked above");
            let candidate = merge(left_row, &right_row, offset);
            if self.passes_filter(&candidate)? {
                self.matched_any = true;
                return Ok(Some(candidate));
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
        "LeftJoin"
    }
}
