//! `Filter` (§4.5): drops rows whose effective boolean value is false. A
//! type error from the expression is treated as false per §4.3's
//! three-valued logic, never propagated as a hard evaluation failure — a
//! single row's `FILTER` mistake doesn't abort the whole query (§7).
use crate::error::EvaluationError;
use crate::ops::env::EvalEnv;
use crate::row::Row;
use crate::rowsource::Rowsource;
use rq_algebra::{Expression, VariablesTable};

pub struct FilterRowsource {
    inner: Box<dyn Rowsource>,
    expr: Expression,
    env: EvalEnv,
}

impl FilterRowsource {
    pub fn new(inner: Box<dyn Rowsource>, expr: Expression, env: EvalEnv) -> Self {
        Self { inner, expr, env }
    }
}

impl Rowsource for FilterRowsource {
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
            if self.env.evaluate(&self.expr, &row).effective_boolean_value_or_false() {
                return Ok(Some(row));
            }
        }
    }

    fn is_resettable(&self) -> bool {
        self.inner.is_resettable()
    }

    fn reset(&mut self) -> Result<(), EvaluationError> {
        self.inner.reset()
    }

    fn set_origin(&mut self, origin: Option<rq_model::Term>) {
        self.inner.set_origin(origin);
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
        "Filter"
    }
}
