//! `OrderBy` (§4.5): a blocking sort over the fully materialized input.
//! Unbound sorts before bound (SPARQL's ORDER BY convention); among bound
//! values that can't be value-compared (a type error from mixing
//! incomparable datatypes), falls back to the term's lexical `Display` form
//! so the sort stays total and deterministic rather than panicking or
//! leaving the order unspecified.
use std::cmp::Ordering;

use crate::error::EvaluationError;
use crate::row::Row;
use crate::rowsource::Rowsource;
use rq_algebra::{OrderExpression, VariablesTable};
use rq_model::compare::value_compare;
use rq_model::Term;

use super::env::EvalEnv;

pub struct OrderByRowsource {
    inner: Box<dyn Rowsource>,
    keys: Vec<OrderExpression>,
    env: EvalEnv,
    rows: Vec<Row>,
    sorted: bool,
    position: usize,
}

impl OrderByRowsource {
    pub fn new(inner: Box<dyn Rowsource>, keys: Vec<OrderExpression>, env: EvalEnv) -> Self {
        Self {
            inner,
            keys,
            env,
            rows: Vec::new(),
            sorted: false,
            position: 0,
        }
    }

    fn term_order(a: Option<&Term>, b: Option<&Term>) -> Ordering {
        match (a, b) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(a), Some(b)) => value_compare(a, b).unwrap_or_else(|_| a.to_string().cmp(&b.to_string())),
        }
    }

    fn ensure_sorted(&mut self) -> Result<(), EvaluationError> {
        if self.sorted {
            return Ok(());
        }
        self.rows = self.inner.read_all_rows()?;
        let keys: Vec<(rq_algebra::Expression, bool)> = self.keys.iter().map(|k| (k.expression.clone(), k.ascending)).collect();
        let env = self.env.clone();
        self.rows.sort_by(|a, b| {
            for (expr, ascending) in &keys {
                let va = env.evaluate(expr, a).as_term().cloned();
                let vb = env.evaluate(expr, b).as_term().cloned();
                let ordering = Self::term_order(va.as_ref(), vb.as_ref());
                let ordering = if *ascending { ordering } else { ordering.reverse() };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            a.offset.cmp(&b.offset)
        });
        for (index, row) in self.rows.iter_mut().enumerate() {
            row.offset = index as u64;
        }
        self.sorted = true;
        Ok(())
    }
}

impl Rowsource for OrderByRowsource {
    fn variables(&self) -> &VariablesTable {
        self.inner.variables()
    }

    fn init(&mut self) -> Result<(), EvaluationError> {
        self.inner.init()
    }

    fn read_row(&mut self) -> Result<Option<Row>, EvaluationError> {
        self.ensure_sorted()?;
        let row = self.rows.get(self.position).cloned();
        if row.is_some() {
            self.position += 1;
        }
        Ok(row)
    }

    fn read_all_rows(&mut self) -> Result<Vec<Row>, EvaluationError> {
        self.ensure_sorted()?;
        self.position = self.rows.len();
        Ok(self.rows.clone())
    }

    fn is_resettable(&self) -> bool {
        true
    }

    fn reset(&mut self) -> Result<(), EvaluationError> {
        self.ensure_sorted()?;
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
        "OrderBy"
    }
}
