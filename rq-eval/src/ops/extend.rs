//! `Extend` (§4.5, `BIND`): computes one expression per row and writes it
//! into a fresh variable. A type error or unbound result leaves the target
//! variable unbound rather than failing the row (§4.3: `BIND` errors are not
//! query-fatal).
use crate::error::EvaluationError;
use crate::ops::env::EvalEnv;
use crate::row::Row;
use crate::rowsource::Rowsource;
use rq_algebra::{Expression, VariableOffset, VariablesTable};

pub struct ExtendRowsource {
    inner: Box<dyn Rowsource>,
    variable: VariableOffset,
    expr: Expression,
    variables: VariablesTable,
    env: EvalEnv,
}

impl ExtendRowsource {
    pub fn new(inner: Box<dyn Rowsource>, variable: VariableOffset, expr: Expression, variables: VariablesTable, env: EvalEnv) -> Self {
        Self {
            inner,
            variable,
            expr,
            variables,
            env,
        }
    }
}

impl Rowsource for ExtendRowsource {
    fn variables(&self) -> &VariablesTable {
        &self.variables
    }

    fn init(&mut self) -> Result<(), EvaluationError> {
        self.inner.init()
    }

    fn read_row(&mut self) -> Result<Option<Row>, EvaluationError> {
        let Some(mut row) = self.inner.read_row()? else {
            return Ok(None);
        };
        let value = self.env.evaluate(&self.expr, &row).as_term().cloned();
        row.set(self.variable, value);
        Ok(Some(row))
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
        "Extend"
    }
}
