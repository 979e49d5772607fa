//! The driving container (§4.7): pulls the root rowsource one row at a time,
//! expands `CONSTRUCT` templates, and exposes the uniform iterate/get-binding/
//! get-boolean/rewind-when-stored surface every query form shares regardless
//! of whether it was populated by executing a query or by reading back an
//! already-serialized result set. Grounded on the teacher's
//! `oxigraph::sparql::QueryResults` Solutions/Boolean/Graph split, widened
//! with the explicit between-rows cancellation/timeout polling and the
//! sticky `failed` state §5/§7 require.
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rustc_hash::FxHashMap;

use rq_algebra::{TriplePattern, VariableOffset, VariablesTable};
use rq_model::{BlankNode, NamedNode, NamedOrBlankNode, Term, Triple, Variable};
use rq_results::QuerySolution;

use crate::error::EvaluationError;
use crate::row::Row;
use crate::rowsource::Rowsource;

/// A `Clone`-able flag an external caller can flip from outside the driving
/// loop to ask a running query to stop at the next row boundary (§5).
#[derive(Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Per-execution cancellation/timeout configuration the driver polls between
/// rows (§5). Mirrors the shape of a resource-limits struct without this
/// crate's pure-library design owning wall-clock defaults — callers (`rq`)
/// decide what timeout, if any, to set.
pub struct DriverOptions {
    pub timeout: Option<Duration>,
    pub cancellation: CancellationToken,
}

impl Default for DriverOptions {
    fn default() -> Self {
        Self {
            timeout: None,
            cancellation: CancellationToken::new(),
        }
    }
}

struct Driver {
    deadline: Option<Instant>,
    cancellation: CancellationToken,
}

impl Driver {
    fn new(options: &DriverOptions) -> Self {
        Self {
            deadline: options.timeout.map(|d| Instant::now() + d),
            cancellation: options.cancellation.clone(),
        }
    }

    /// Polled once per row, never inside a single row's evaluation (§5).
    fn check(&self) -> Result<(), EvaluationError> {
        if self.cancellation.is_cancelled() {
            return Err(EvaluationError::Cancelled);
        }
        if self.deadline.is_some_and(|d| Instant::now() >= d) {
            return Err(EvaluationError::TimedOut);
        }
        Ok(())
    }
}

enum SolutionsSource {
    Live { rowsource: Box<dyn Rowsource> },
    Stored { rows: Vec<QuerySolution>, position: usize },
}

/// A `SELECT` result set (§4.7).
pub struct SolutionsResults {
    variables: Arc<[Variable]>,
    offsets: Vec<VariableOffset>,
    source: SolutionsSource,
    driver: Driver,
    failed: bool,
}

impl SolutionsResults {
    /// Drives `rowsource` live; `offsets` is the query's `Project`-ed output
    /// order (`PlannedQuery::output_variables`), `variables` the same order's
    /// names.
    pub fn from_rowsource(mut rowsource: Box<dyn Rowsource>, offsets: Vec<VariableOffset>, variables: Arc<[Variable]>, options: DriverOptions) -> Result<Self, EvaluationError> {
        rowsource.init()?;
        Ok(Self {
            variables,
            offsets,
            source: SolutionsSource::Live { rowsource },
            driver: Driver::new(&options),
            failed: false,
        })
    }

    /// Wraps an already-materialized solution sequence (§4.7's "reading a
    /// serialized format" path) — rewindable, unlike a live execution.
    pub fn from_stored(variables: Arc<[Variable]>, rows: Vec<QuerySolution>) -> Self {
        Self {
            variables,
            offsets: Vec::new(),
            source: SolutionsSource::Stored { rows, position: 0 },
            driver: Driver::new(&DriverOptions::default()),
            failed: false,
        }
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    /// `true` once this result set has produced its terminal error or run
    /// its underlying source to exhaustion; further calls to `next` return
    /// `None` rather than repeating work or raising again (§7).
    pub fn is_failed(&self) -> bool {
        self.failed
    }

    /// Only `Stored` result sets can be rewound (§4.7); a live execution's
    /// rowsource tree has already been torn down once exhausted.
    pub fn rewind(&mut self) -> Result<(), EvaluationError> {
        match &mut self.source {
            SolutionsSource::Stored { position, .. } => {
                *position = 0;
                self.failed = false;
                Ok(())
            }
            SolutionsSource::Live { .. } => Err(EvaluationError::runtime("live query results cannot be rewound")),
        }
    }

    fn next_row(&mut self) -> Result<Option<Row>, EvaluationError> {
        self.driver.check()?;
        match &mut self.source {
            SolutionsSource::Live { rowsource } => rowsource.read_row(),
            SolutionsSource::Stored { .. } => unreachable!("stored sources bypass next_row"),
        }
    }

    fn row_to_solution(&self, row: Row) -> QuerySolution {
        let values = self.offsets.iter().map(|&o| row.get(o).cloned()).collect();
        QuerySolution::new(Arc::clone(&self.variables), values, row.offset)
    }
}

impl Iterator for SolutionsResults {
    type Item = Result<QuerySolution, EvaluationError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match &mut self.source {
            SolutionsSource::Stored { rows, position } => {
                if *position >= rows.len() {
                    return None;
                }
                let solution = rows[*position].clone();
                *position += 1;
                Some(Ok(solution))
            }
            SolutionsSource::Live { .. } => match self.next_row() {
                Ok(Some(row)) => Some(Ok(self.row_to_solution(row))),
                Ok(None) => {
                    self.failed = true;
                    None
                }
                Err(error) => {
                    self.failed = true;
                    tracing::error!(error = %error, "query evaluation failed, result set marked failed");
                    if let SolutionsSource::Live { rowsource } = &mut self.source {
                        rowsource.finish();
                    }
                    Some(Err(error))
                }
            },
        }
    }
}

/// An `ASK` result, computed eagerly — draining to the first matching row
/// or exhaustion is bounded work, unlike a `SELECT`'s potentially unbounded
/// stream (§4.7).
pub struct BooleanResults {
    outcome: Result<bool, EvaluationError>,
}

impl BooleanResults {
    pub fn evaluate(mut rowsource: Box<dyn Rowsource>, options: DriverOptions) -> Self {
        let driver = Driver::new(&options);
        let outcome = (|| {
            rowsource.init()?;
            loop {
                driver.check()?;
                match rowsource.read_row()? {
                    Some(_) => return Ok(true),
                    None => return Ok(false),
                }
            }
        })();
        rowsource.finish();
        if let Err(error) = &outcome {
            tracing::error!(error = %error, "ASK evaluation failed");
        }
        Self { outcome }
    }

    /// SPARQL protocol's tri-state accessor (§7): 1 true, 0 false, -1 failed.
    pub fn boolean(&self) -> i8 {
        match &self.outcome {
            Ok(true) => 1,
            Ok(false) => 0,
            Err(_) => -1,
        }
    }

    pub fn into_result(self) -> Result<bool, EvaluationError> {
        self.outcome
    }
}

/// A `CONSTRUCT`/`DESCRIBE` result (§4.7): one rowsource driving a fixed set
/// of triple templates, each template's variables resolved from the current
/// row and each template-local blank node minted fresh per row (SPARQL's
/// rule that the same template label denotes the same blank node within one
/// solution, a distinct one across solutions) but never reused across rows.
pub struct GraphResults {
    rowsource: Box<dyn Rowsource>,
    templates: Vec<TriplePattern>,
    variables: VariablesTable,
    driver: Driver,
    pending: Vec<Triple>,
    blank_node_seq: u64,
    failed: bool,
}

impl GraphResults {
    pub fn new(mut rowsource: Box<dyn Rowsource>, templates: Vec<TriplePattern>, variables: VariablesTable, options: DriverOptions) -> Result<Self, EvaluationError> {
        rowsource.init()?;
        Ok(Self {
            rowsource,
            templates,
            variables,
            driver: Driver::new(&options),
            pending: Vec::new(),
            blank_node_seq: 0,
            failed: false,
        })
    }

    fn fresh_blank_node(&mut self) -> BlankNode {
        self.blank_node_seq += 1;
        BlankNode::new_unchecked(format!("c{}", self.blank_node_seq))
    }

    /// Instantiates every template against `row`, dropping a template whose
    /// subject or predicate resolves to unbound or to a term that can't
    /// occupy that position (§8 property 9, CONSTRUCT soundness).
    fn expand(&mut self, row: &Row) -> Vec<Triple> {
        let mut scope: FxHashMap<String, BlankNode> = FxHashMap::default();
        let mut out = Vec::with_capacity(self.templates.len());
        for template in self.templates.clone() {
            let Some(subject) = self.resolve_subject(&template.subject, row, &mut scope) else {
                continue;
            };
            let Some(predicate) = self.resolve_predicate(&template.predicate, row) else {
                continue;
            };
            let Some(object) = self.resolve_object(&template.object, row, &mut scope) else {
                continue;
            };
            out.push(Triple::new(subject, predicate, object));
        }
        out
    }

    fn resolve_subject(&mut self, position: &rq_algebra::NamedOrVariable, row: &Row, scope: &mut FxHashMap<String, BlankNode>) -> Option<NamedOrBlankNode> {
        match position {
            rq_algebra::NamedOrVariable::Term(NamedOrBlankNode::BlankNode(label)) => Some(NamedOrBlankNode::BlankNode(self.relabel(label, scope))),
            rq_algebra::NamedOrVariable::Term(term) => Some(term.clone()),
            rq_algebra::NamedOrVariable::Variable(v) => match row.get(*v)? {
                Term::NamedNode(n) => Some(NamedOrBlankNode::NamedNode(n.clone())),
                Term::BlankNode(b) => Some(NamedOrBlankNode::BlankNode(b.clone())),
                Term::Literal(_) => None,
            },
        }
    }

    fn resolve_predicate(&self, position: &rq_algebra::NamedOrVariable, row: &Row) -> Option<NamedNode> {
        match position {
            rq_algebra::NamedOrVariable::Term(NamedOrBlankNode::NamedNode(n)) => Some(n.clone()),
            rq_algebra::NamedOrVariable::Term(NamedOrBlankNode::BlankNode(_)) => None,
            rq_algebra::NamedOrVariable::Variable(v) => match row.get(*v)? {
                Term::NamedNode(n) => Some(n.clone()),
                _ => None,
            },
        }
    }

    fn resolve_object(&mut self, position: &rq_algebra::TermOrVariable, row: &Row, scope: &mut FxHashMap<String, BlankNode>) -> Option<Term> {
        match position {
            rq_algebra::TermOrVariable::Term(Term::BlankNode(label)) => Some(Term::BlankNode(self.relabel(label, scope))),
            rq_algebra::TermOrVariable::Term(term) => Some(term.clone()),
            rq_algebra::TermOrVariable::Variable(v) => row.get(*v).cloned(),
        }
    }

    fn relabel(&mut self, label: &BlankNode, scope: &mut FxHashMap<String, BlankNode>) -> BlankNode {
        if let Some(existing) = scope.get(label.as_str()) {
            return existing.clone();
        }
        let fresh = self.fresh_blank_node();
        scope.insert(label.as_str().to_owned(), fresh.clone());
        fresh
    }

    pub fn variables(&self) -> &VariablesTable {
        &self.variables
    }
}

impl Iterator for GraphResults {
    type Item = Result<Triple, EvaluationError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(triple) = self.pending.pop() {
                return Some(Ok(triple));
            }
            if self.failed {
                return None;
            }
            if let Err(error) = self.driver.check() {
                self.failed = true;
                self.rowsource.finish();
                return Some(Err(error));
            }
            match self.rowsource.read_row() {
                Ok(Some(row)) => {
                    self.pending = self.expand(&row);
                    continue;
                }
                Ok(None) => {
                    self.failed = true;
                    self.rowsource.finish();
                    return None;
                }
                Err(error) => {
                    self.failed = true;
                    tracing::error!(error = %error, "CONSTRUCT evaluation failed, result set marked failed");
                    self.rowsource.finish();
                    return Some(Err(error));
                }
            }
        }
    }
}

/// The three SPARQL query forms a driven result set can take (§1, §4.7).
pub enum QueryResults {
    Solutions(SolutionsResults),
    Boolean(BooleanResults),
    Graph(GraphResults),
}

impl QueryResults {
    pub fn is_graph(&self) -> bool {
        matches!(self, Self::Graph(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rowsource::Rowsource;
    use rq_algebra::NamedOrVariable;
    use rq_model::{Literal, NamedNode, VariableKind};

    struct FixedRows {
        rows: Vec<Row>,
        position: usize,
        variables: VariablesTable,
    }

    impl Rowsource for FixedRows {
        fn variables(&self) -> &VariablesTable {
            &self.variables
        }

        fn read_row(&mut self) -> Result<Option<Row>, EvaluationError> {
            let row = self.rows.get(self.position).cloned();
            if row.is_some() {
                self.position += 1;
            }
            Ok(row)
        }

        fn operator_name(&self) -> &'static str {
            "FixedRows"
        }
    }

    fn subject_var() -> VariableOffset {
        VariableOffset(0)
    }

    #[test]
    fn solutions_iterator_stops_after_exhaustion() {
        let mut table = VariablesTable::new();
        table.add("s", VariableKind::Normal);
        let source = FixedRows {
            rows: vec![Row::from_values(vec![Some(Term::Literal(Literal::new_simple("a")))], 0)],
            position: 0,
            variables: table,
        };
        let variables: Arc<[Variable]> = Arc::from(vec![Variable::new_unchecked("s")]);
        let mut results = SolutionsResults::from_rowsource(Box::new(source), vec![subject_var()], variables, DriverOptions::default()).unwrap();
        assert!(results.next().unwrap().is_ok());
        assert!(results.next().is_none());
        assert!(results.next().is_none());
    }

    #[test]
    fn boolean_results_report_true_on_any_row() {
        let mut table = VariablesTable::new();
        table.add("s", VariableKind::Normal);
        let source = FixedRows {
            rows: vec![Row::from_values(vec![Some(Term::Literal(Literal::new_simple("a")))], 0)],
            position: 0,
            variables: table,
        };
        let result = BooleanResults::evaluate(Box::new(source), DriverOptions::default());
        assert_eq!(result.boolean(), 1);
    }

    #[test]
    fn construct_drops_triples_with_unbound_subject() {
        let mut table = VariablesTable::new();
        let s = table.add("s", VariableKind::Normal);
        let source = FixedRows {
            rows: vec![Row::new(1, 0)],
            position: 0,
            variables: table.clone(),
        };
        let template = vec![TriplePattern::new(
            NamedOrVariable::Variable(s),
            NamedOrVariable::Term(NamedOrBlankNode::NamedNode(NamedNode::new_unchecked("urn:p"))),
            rq_algebra::TermOrVariable::Term(Term::Literal(Literal::new_simple("o"))),
        )];
        let mut graph = GraphResults::new(Box::new(source), template, table, DriverOptions::default()).unwrap();
        assert!(graph.next().is_none());
    }
}
