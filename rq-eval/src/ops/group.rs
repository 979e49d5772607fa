//! `Group` (§4.5, `GROUP BY`/aggregates): a blocking hash-group over the
//! fully materialized input, each group folded through one accumulator per
//! aggregate expression (§4.3's note that aggregates are not ordinary
//! evaluator operators — they fold across rows rather than evaluating one
//! row at a time). Grounded on the numeric promotion/arithmetic helpers
//! `rq-eval`'s own scalar evaluator already implements for `+`/`/`, reused
//! here instead of re-deriving XSD numeric promotion a second time.
use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::EvaluationError;
use crate::expr_eval::{numeric_add, numeric_div, numeric_of, numeric_to_eval, EvalValue};
use crate::function_registry::{CustomAggregate, FunctionRegistry};
use crate::row::Row;
use crate::rowsource::Rowsource;
use rq_algebra::{AggregateExpression, VariableOffset, VariablesTable};
use rq_model::compare::value_compare;
use rq_model::numeric::NumericValue;
use rq_model::{Literal, Term};

use super::env::EvalEnv;

struct Accumulator {
    agg: AggregateExpression,
    distinct_seen: Option<FxHashSet<Option<Term>>>,
    count: i64,
    sum: Option<NumericValue>,
    min: Option<Term>,
    max: Option<Term>,
    sample: Option<Term>,
    concat: Vec<String>,
    custom: Option<Box<dyn CustomAggregate>>,
}

impl Accumulator {
    fn new(agg: AggregateExpression, functions: &FunctionRegistry) -> Self {
        let distinct_seen = agg.is_distinct().then(FxHashSet::default);
        let custom = match &agg {
            AggregateExpression::Custom { name, .. } => functions.aggregate(name),
            _ => None,
        };
        if matches!(&agg, AggregateExpression::Custom { .. }) && custom.is_none() {
            let name = match &agg {
                AggregateExpression::Custom { name, .. } => name.as_str(),
                _ => unreachable!(),
            };
            tracing::warn!(aggregate = %name, "unregistered custom aggregate, falling back to SAMPLE");
        }
        Self {
            agg,
            distinct_seen,
            count: 0,
            sum: None,
            min: None,
            max: None,
            sample: None,
            concat: Vec::new(),
            custom,
        }
    }

    fn accept(&mut self, value: Option<Term>) {
        if let Some(seen) = &mut self.distinct_seen {
            if !seen.insert(value.clone()) {
                return;
            }
        }
        match &self.agg {
            AggregateExpression::Count { .. } => {
                if value.is_some() || self.agg_counts_star() {
                    self.count += 1;
                }
            }
            AggregateExpression::Sum { .. } | AggregateExpression::Avg { .. } => {
                if let Some(n) = value.as_ref().and_then(numeric_of) {
                    self.sum = Some(self.sum.map_or(n, |acc| numeric_add(acc, n).unwrap_or(acc)));
                    self.count += 1;
                }
            }
            AggregateExpression::Min { .. } => {
                if let Some(v) = value {
                    self.min = Some(match self.min.take() {
                        Some(current) if value_compare(&current, &v).is_ok_and(|o| o.is_le()) => current,
                        Some(current) if value_compare(&current, &v).is_err() => current,
                        _ => v,
                    });
                }
            }
            AggregateExpression::Max { .. } => {
                if let Some(v) = value {
                    self.max = Some(match self.max.take() {
                        Some(current) if value_compare(&current, &v).is_ok_and(|o| o.is_ge()) => current,
                        Some(current) if value_compare(&current, &v).is_err() => current,
                        _ => v,
                    });
                }
            }
            AggregateExpression::Sample { .. } => {
                if self.sample.is_none() {
                    self.sample = value;
                }
            }
            AggregateExpression::Custom { .. } => match &mut self.custom {
                Some(custom) => custom.accept(value.as_ref()),
                None => {
                    if self.sample.is_none() {
                        self.sample = value;
                    }
                }
            },
            AggregateExpression::GroupConcat { .. } => {
                if let Some(v) = value {
                    self.concat.push(v.to_string());
                }
            }
        }
    }

    fn agg_counts_star(&self) -> bool {
        matches!(&self.agg, AggregateExpression::Count { expr: None, .. })
    }

    fn finish(self) -> EvalValue {
        match self.agg {
            AggregateExpression::Count { .. } => EvalValue::Value(Term::Literal(Literal::new_typed(self.count.to_string(), rq_model::NamedNode::new_unchecked(rq_model::vocab::xsd::INTEGER)))),
            AggregateExpression::Sum { .. } => match self.sum {
                Some(total) => numeric_to_eval(total),
                None => EvalValue::Value(Term::Literal(Literal::new_typed("0", rq_model::NamedNode::new_unchecked(rq_model::vocab::xsd::INTEGER)))),
            },
            AggregateExpression::Avg { .. } => match self.sum {
                Some(total) if self.count > 0 => numeric_to_eval(numeric_div(total, NumericValue::Integer(self.count)).unwrap_or(total)),
                _ => EvalValue::Value(Term::Literal(Literal::new_typed("0", rq_model::NamedNode::new_unchecked(rq_model::vocab::xsd::INTEGER)))),
            },
            AggregateExpression::Min { .. } => self.min.map_or(EvalValue::Unbound, EvalValue::Value),
            AggregateExpression::Max { .. } => self.max.map_or(EvalValue::Unbound, EvalValue::Value),
            AggregateExpression::Sample { .. } => self.sample.map_or(EvalValue::Unbound, EvalValue::Value),
            AggregateExpression::Custom { .. } => match self.custom {
                Some(custom) => custom.finish(),
                None => self.sample.map_or(EvalValue::Unbound, EvalValue::Value),
            },
            AggregateExpression::GroupConcat { separator, .. } => {
                let sep = separator.as_deref().unwrap_or(" ");
                EvalValue::Value(Term::Literal(Literal::from(self.concat.join(sep))))
            }
        }
    }
}

pub struct GroupRowsource {
    inner: Box<dyn Rowsource>,
    keys: Vec<VariableOffset>,
    aggregates: Vec<(VariableOffset, AggregateExpression)>,
    env: EvalEnv,
    variables: VariablesTable,
    rows: Vec<Row>,
    loaded: bool,
    position: usize,
}

impl GroupRowsource {
    pub fn new(inner: Box<dyn Rowsource>, keys: Vec<VariableOffset>, aggregates: Vec<(VariableOffset, AggregateExpression)>, env: EvalEnv, variables: VariablesTable) -> Self {
        Self {
            inner,
            keys,
            aggregates,
            env,
            variables,
            rows: Vec::new(),
            loaded: false,
            position: 0,
        }
    }

    fn ensure_grouped(&mut self) -> Result<(), EvaluationError> {
        if self.loaded {
            return Ok(());
        }
        let input = self.inner.read_all_rows()?;
        let mut order: Vec<Vec<Option<Term>>> = Vec::new();
        let mut groups: FxHashMap<Vec<Option<Term>>, (Vec<Option<Term>>, Vec<Accumulator>)> = FxHashMap::default();

        for row in &input {
            let key: Vec<Option<Term>> = self.keys.iter().map(|&k| row.get(k).cloned()).collect();
            let entry = groups.entry(key.clone()).or_insert_with(|| {
                order.push(key.clone());
                (key.clone(), self.aggregates.iter().map(|(_, agg)| Accumulator::new(agg.clone(), self.env.functions())).collect())
            });
            for (acc, (_, agg)) in entry.1.iter_mut().zip(&self.aggregates) {
                let value = agg.operand().and_then(|expr| self.env.evaluate(expr, row).as_term().cloned());
                acc.accept(value);
            }
        }

        if input.is_empty() && self.keys.is_empty() {
            order.push(Vec::new());
            groups.insert(Vec::new(), (Vec::new(), self.aggregates.iter().map(|(_, agg)| Accumulator::new(agg.clone(), self.env.functions())).collect()));
        }

        let mut offset = 0u64;
        for key in order {
            let (key_values, accumulators) = groups.remove(&key).expect("key was just inserted");
            let mut row = Row::new(self.variables.count(), offset);
            offset += 1;
            for (&k, value) in self.keys.iter().zip(key_values) {
                row.set(k, value);
            }
            for ((target, _), acc) in self.aggregates.iter().zip(accumulators) {
                row.set(*target, acc.finish().as_term().cloned());
            }
            self.rows.push(row);
        }
        self.loaded = true;
        Ok(())
    }
}

impl Rowsource for GroupRowsource {
    fn variables(&self) -> &VariablesTable {
        &self.variables
    }

    fn init(&mut self) -> Result<(), EvaluationError> {
        self.inner.init()
    }

    fn read_row(&mut self) -> Result<Option<Row>, EvaluationError> {
        self.ensure_grouped()?;
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
        self.ensure_grouped()?;
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
        "Group"
    }
}
