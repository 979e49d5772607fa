//! The constraint-aware backtracking multi-pattern join (§4.6): the rowsource
//! a `Bgp { patterns }` lowers to. Grounded on the teacher's triple-pattern
//! iterator chaining in `spareval`, generalized here into the explicit
//! column-cursor loop spec.md's §4.6 describes in detail — an ordinary
//! recursive nested-loop join cannot express the backtracking discipline
//! (freeing exactly the columns past the one being retried) without either
//! unbounded recursion depth or re-deriving the same state machine through
//! the call stack, so the loop is written flat.
use std::rc::Rc;

use rustc_hash::FxHashMap;

use rq_algebra::{TriplePattern, VariableOffset, VariablesTable};
use rq_model::Term;

use crate::dataset::{MatchPattern, Parts, PatternTerm, TriplePosition, TripleSource, TriplesMatch};
use crate::error::EvaluationError;
use crate::row::Row;
use crate::rowsource::Rowsource;

/// What a single triple-pattern position resolves to once constraint
/// analysis (§4.6 step 1) has classified every position across the whole
/// column run.
#[derive(Debug, Clone)]
enum PositionRole {
    /// No origin constraint on this pattern (subject/predicate/object are
    /// never `Absent` — only an omitted `GRAPH` clause produces this).
    Absent,
    /// A literal term from the query text.
    Constant(Term),
    /// A variable already bound by an earlier column in this run; the
    /// iterator is created with this position pre-bound.
    Constraint(VariableOffset),
    /// A variable this column is responsible for binding (its first mention
    /// in the run, or a same-column repeat of one — the two are exposed
    /// identically to the triple source, which is expected to enforce
    /// same-pattern repeated-variable equality itself).
    Variable(VariableOffset),
}

#[derive(Debug, Clone, Default)]
struct ColumnPlan {
    roles: [PositionRole; 4],
    /// First-mention-in-this-column variable positions: what `bind_match`
    /// is actually asked to write.
    to_bind: Vec<(VariableOffset, TriplePosition)>,
    /// Same-column repeats of a `to_bind` variable: re-read at the repeat's
    /// own position and checked for equality against the value `to_bind`
    /// produced, since the pattern can't pre-filter on a value that isn't
    /// known until this candidate is read (§4.6 step 2, "if the binding
    /// violates a constraint... advance and retry").
    repeat_checks: Vec<(TriplePosition, VariableOffset)>,
    parts_to_bind: Parts,
}

impl Default for PositionRole {
    fn default() -> Self {
        Self::Absent
    }
}

const POSITIONS: [TriplePosition; 4] = [TriplePosition::Subject, TriplePosition::Predicate, TriplePosition::Object, TriplePosition::Origin];

fn part_for(position: TriplePosition) -> Parts {
    match position {
        TriplePosition::Subject => Parts::SUBJECT,
        TriplePosition::Predicate => Parts::PREDICATE,
        TriplePosition::Object => Parts::OBJECT,
        TriplePosition::Origin => Parts::ORIGIN,
    }
}

fn pattern_term_at(pattern: &TriplePattern, position: TriplePosition) -> Option<rq_algebra::TermOrVariable> {
    match position {
        TriplePosition::Subject => Some(pattern.subject.clone().into()),
        TriplePosition::Predicate => Some(pattern.predicate.clone().into()),
        TriplePosition::Object => Some(pattern.object.clone()),
        TriplePosition::Origin => pattern.origin.clone().map(Into::into),
    }
}

/// §4.6 step 1: for each column in order, classify its four positions using
/// only what has already been seen in an *earlier* column of this same run.
fn build_plans(patterns: &[TriplePattern]) -> Vec<ColumnPlan> {
    let mut first_seen_column: FxHashMap<VariableOffset, usize> = FxHashMap::default();
    let mut plans = Vec::with_capacity(patterns.len());

    for (col_idx, pattern) in patterns.iter().enumerate() {
        let mut plan = ColumnPlan::default();
        let mut bound_here: FxHashMap<VariableOffset, TriplePosition> = FxHashMap::default();

        for position in POSITIONS {
            let Some(term) = pattern_term_at(pattern, position) else {
                continue;
            };
            let role = match term {
                rq_algebra::TermOrVariable::Term(t) => PositionRole::Constant(t),
                rq_algebra::TermOrVariable::Variable(v) => {
                    let first_col = *first_seen_column.entry(v).or_insert(col_idx);
                    if first_col < col_idx {
                        PositionRole::Constraint(v)
                    } else if let Some(&first_position) = bound_here.get(&v) {
                        plan.repeat_checks.push((position, v));
                        let _ = first_position;
                        PositionRole::Variable(v)
                    } else {
                        bound_here.insert(v, position);
                        plan.to_bind.push((v, position));
                        plan.parts_to_bind = plan.parts_to_bind.union(part_for(position));
                        PositionRole::Variable(v)
                    }
                }
            };
            plan.roles[position as usize] = role;
        }

        plans.push(plan);
    }

    plans
}

/// The backtracking join itself. Holds one [`TriplesMatch`] per column, a
/// sparse binding matrix (`bound_by[col]` lists the offsets that column
/// currently owns on the live path), and a single shared working row.
pub struct TriplesRowsource<TS: TripleSource> {
    variables: VariablesTable,
    source: Rc<TS>,
    plans: Vec<ColumnPlan>,
    columns: Vec<Option<TS::Match>>,
    bound_by: Vec<Vec<VariableOffset>>,
    row: Row,
    current_column: usize,
    finished: bool,
    empty_bgp_emitted: bool,
    origin_override: Option<Term>,
    next_row_offset: u64,
}

impl<TS: TripleSource> TriplesRowsource<TS> {
    pub fn new(variables: VariablesTable, source: Rc<TS>, patterns: Vec<TriplePattern>) -> Self {
        let plans = build_plans(&patterns);
        let width = variables.count();
        let column_count = plans.len();
        Self {
            variables,
            source,
            plans,
            columns: (0..column_count).map(|_| None).collect(),
            bound_by: vec![Vec::new(); column_count],
            row: Row::new(width, 0),
            current_column: 0,
            finished: false,
            empty_bgp_emitted: false,
            origin_override: None,
            next_row_offset: 0,
        }
    }

    fn last_column(&self) -> usize {
        self.plans.len().saturating_sub(1)
    }

    fn role_to_term(&self, role: &PositionRole) -> PatternTerm {
        match role {
            PositionRole::Absent => unreachable!("Absent is only valid for origin, filtered out before this call"),
            PositionRole::Constant(term) => PatternTerm::Constant(term.clone()),
            PositionRole::Constraint(offset) => {
                let value = self.row.get(*offset).expect("a constraint variable must already be bound by an earlier column");
                PatternTerm::Constant(value.clone())
            }
            PositionRole::Variable(offset) => {
                let (variable, _) = self.variables.get_by_offset(*offset).expect("offset must be present in the variables table");
                PatternTerm::Variable(variable.clone())
            }
        }
    }

    fn build_match_pattern(&self, idx: usize) -> MatchPattern {
        let plan = &self.plans[idx];
        let subject = self.role_to_term(&plan.roles[0]);
        let predicate = self.role_to_term(&plan.roles[1]);
        let object = self.role_to_term(&plan.roles[2]);
        let origin = if let Some(term) = &self.origin_override {
            Some(PatternTerm::Constant(term.clone()))
        } else {
            match &plan.roles[3] {
                PositionRole::Absent => None,
                role => Some(self.role_to_term(role)),
            }
        };
        MatchPattern {
            subject,
            predicate,
            object,
            origin,
            parts_to_bind: plan.parts_to_bind,
        }
    }

    fn open_column(&mut self, idx: usize) -> Result<(), EvaluationError> {
        let pattern = self.build_match_pattern(idx);
        let mut m = self.source.new_triples_match(&pattern).map_err(EvaluationError::triple_source)?;
        m.next_match().map_err(EvaluationError::triple_source)?;
        self.columns[idx] = Some(m);
        Ok(())
    }

    fn advance_iterator(&mut self, idx: usize) -> Result<(), EvaluationError> {
        if let Some(m) = self.columns[idx].as_mut() {
            m.next_match().map_err(EvaluationError::triple_source)?;
        }
        Ok(())
    }

    /// Attempts to bind this column's candidate into `self.row`. Returns
    /// `false` (without mutating `self.row`) when a same-column repeated
    /// variable's two occurrences disagree, per §4.6 step 2.
    fn bind_current(&mut self, idx: usize) -> bool {
        let to_bind = self.plans[idx].to_bind.clone();
        let repeat_checks = self.plans[idx].repeat_checks.clone();
        let width = self.variables.count();
        let m = self.columns[idx].as_ref().expect("column must have an active iterator");

        let mut scratch = vec![None; width];
        m.bind_match(&mut scratch, &to_bind);

        for &(position, offset) in &repeat_checks {
            let mut check = vec![None; width];
            m.bind_match(&mut check, &[(offset, position)]);
            if check[offset.0] != scratch[offset.0] {
                return false;
            }
        }

        for &(offset, _) in &to_bind {
            if let Some(value) = scratch[offset.0].take() {
                self.row.set(offset, Some(value));
            }
        }
        true
    }

    fn reapply_bind(&mut self, idx: usize) {
        if self.columns[idx].is_none() {
            return;
        }
        let to_bind = self.plans[idx].to_bind.clone();
        let width = self.variables.count();
        let mut scratch = vec![None; width];
        self.columns[idx].as_ref().unwrap().bind_match(&mut scratch, &to_bind);
        for &(offset, _) in &to_bind {
            if let Some(value) = scratch[offset.0].take() {
                self.row.set(offset, Some(value));
            }
        }
    }

    fn record_bound(&mut self, idx: usize) {
        self.bound_by[idx] = self.plans[idx].to_bind.iter().map(|&(v, _)| v).collect();
    }

    fn clear_bound(&mut self, idx: usize) {
        for offset in self.bound_by[idx].drain(..) {
            self.row.unset(offset);
        }
    }

    fn output_row(&mut self) -> Row {
        let mut row = self.row.clone();
        row.offset = self.next_row_offset;
        self.next_row_offset += 1;
        row
    }
}

impl<TS: TripleSource> Rowsource for TriplesRowsource<TS> {
    fn variables(&self) -> &VariablesTable {
        &self.variables
    }

    fn read_row(&mut self) -> Result<Option<Row>, EvaluationError> {
        if self.finished {
            return Ok(None);
        }

        if self.plans.is_empty() {
            if self.empty_bgp_emitted {
                self.finished = true;
                return Ok(None);
            }
            self.empty_bgp_emitted = true;
            self.finished = true;
            return Ok(Some(self.output_row()));
        }

        let last = self.last_column();
        loop {
            if self.current_column > last {
                for idx in 0..=last {
                    self.reapply_bind(idx);
                }
                let row = self.output_row();
                self.advance_iterator(last)?;
                self.current_column = last;
                return Ok(Some(row));
            }

            let idx = self.current_column;
            if self.columns[idx].is_none() {
                self.open_column(idx)?;
            }

            let exhausted = match self.columns[idx].as_ref() {
                Some(m) => m.is_end(),
                None => true,
            };
            if exhausted {
                self.columns[idx] = None;
                self.clear_bound(idx);
                if idx == 0 {
                    self.finished = true;
                    return Ok(None);
                }
                self.current_column -= 1;
                self.advance_iterator(self.current_column)?;
                continue;
            }

            if self.bind_current(idx) {
                self.record_bound(idx);
                self.current_column += 1;
            } else {
                self.advance_iterator(idx)?;
            }
        }
    }

    fn is_resettable(&self) -> bool {
        true
    }

    fn reset(&mut self) -> Result<(), EvaluationError> {
        for idx in 0..self.columns.len() {
            self.columns[idx] = None;
            self.bound_by[idx].clear();
        }
        self.row = Row::new(self.variables.count(), 0);
        self.current_column = 0;
        self.finished = false;
        self.empty_bgp_emitted = false;
        Ok(())
    }

    fn set_origin(&mut self, origin: Option<Term>) {
        self.origin_override = origin;
    }

    fn finish(&mut self) {
        for column in &mut self.columns {
            *column = None;
        }
    }

    fn operator_name(&self) -> &'static str {
        "Bgp"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rq_algebra::{NamedOrVariable, TermOrVariable};
    use rq_model::vocab::xsd;
    use rq_model::{Literal, NamedNode, NamedOrBlankNode, VariableKind};
    use std::cell::RefCell;

    fn integer_literal(value: i64) -> Literal {
        Literal::new_typed(value.to_string(), NamedNode::new_unchecked(xsd::INTEGER))
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct Fact {
        subject: NamedOrBlankNode,
        predicate: NamedNode,
        object: Term,
    }

    struct MemoryStore {
        facts: Vec<Fact>,
    }

    struct MemoryMatch {
        candidates: Vec<Fact>,
        position: RefCell<isize>,
    }

    #[derive(Debug, thiserror::Error)]
    #[error("memory store error")]
    struct MemoryError;

    impl TripleSource for MemoryStore {
        type Error = MemoryError;
        type Match = MemoryMatch;

        fn triple_present(&self, triple: &crate::dataset::GroundTriple) -> Result<bool, Self::Error> {
            Ok(self.facts.iter().any(|f| f.subject == triple.subject && f.predicate == triple.predicate && f.object == triple.object))
        }

        fn new_triples_match(&self, pattern: &MatchPattern) -> Result<Self::Match, Self::Error> {
            let matches = self
                .facts
                .iter()
                .filter(|f| term_matches(&pattern.subject, &Term::from(f.subject.clone())))
                .filter(|f| term_matches(&pattern.predicate, &Term::NamedNode(f.predicate.clone())))
                .filter(|f| term_matches(&pattern.object, &f.object))
                .cloned()
                .collect();
            Ok(MemoryMatch {
                candidates: matches,
                position: RefCell::new(-1),
            })
        }

        fn named_graphs(&self) -> Result<Vec<NamedNode>, Self::Error> {
            Ok(Vec::new())
        }
    }

    fn term_matches(pattern: &PatternTerm, candidate: &Term) -> bool {
        match pattern {
            PatternTerm::Constant(t) => t == candidate,
            PatternTerm::Variable(_) => true,
        }
    }

    impl TriplesMatch for MemoryMatch {
        type Error = MemoryError;

        fn bind_match(&self, row: &mut [Option<Term>], offsets: &[(VariableOffset, TriplePosition)]) -> Parts {
            let mut bound = Parts::NONE;
            let position = *self.position.borrow();
            let Some(fact) = (position >= 0).then(|| self.candidates.get(position as usize)).flatten() else {
                return bound;
            };
            for &(offset, part) in offsets {
                let value = match part {
                    TriplePosition::Subject => Term::from(fact.subject.clone()),
                    TriplePosition::Predicate => Term::NamedNode(fact.predicate.clone()),
                    TriplePosition::Object => fact.object.clone(),
                    TriplePosition::Origin => continue,
                };
                row[offset.0] = Some(value);
                bound = bound.union(part_for(part));
            }
            bound
        }

        fn next_match(&mut self) -> Result<bool, Self::Error> {
            let mut position = self.position.borrow_mut();
            *position += 1;
            Ok((*position as usize) < self.candidates.len())
        }

        fn is_end(&self) -> bool {
            let position = *self.position.borrow();
            position < 0 || position as usize >= self.candidates.len()
        }
    }

    fn triple(s: VariableOffset, p: NamedNode, o: TermOrVariable) -> TriplePattern {
        TriplePattern::new(NamedOrVariable::Variable(s), NamedOrVariable::Term(p.into()), o)
    }

    #[test]
    fn single_pattern_yields_one_row_per_matching_fact() {
        let mut table = VariablesTable::new();
        let s = table.add("s", VariableKind::Normal);
        let knows = NamedNode::new_unchecked("urn:knows");
        let alice = NamedOrBlankNode::NamedNode(NamedNode::new_unchecked("urn:alice"));
        let bob = NamedOrBlankNode::NamedNode(NamedNode::new_unchecked("urn:bob"));
        let store = Rc::new(MemoryStore {
            facts: vec![
                Fact {
                    subject: alice.clone(),
                    predicate: knows.clone(),
                    object: Term::from(bob.clone()),
                },
                Fact {
                    subject: bob.clone(),
                    predicate: knows.clone(),
                    object: Term::from(alice.clone()),
                },
            ],
        });
        let patterns = vec![triple(s, knows, TermOrVariable::Term(Term::from(bob.clone())))];
        let mut rowsource = TriplesRowsource::new(table, store, patterns);

        let rows = rowsource.read_all_rows().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get(s), Some(&Term::from(alice)));
    }

    #[test]
    fn shared_variable_across_two_patterns_joins() {
        let mut table = VariablesTable::new();
        let a = table.add("a", VariableKind::Normal);
        let b = table.add("b", VariableKind::Normal);
        let c = table.add("c", VariableKind::Normal);
        let knows = NamedNode::new_unchecked("urn:knows");
        let alice = NamedOrBlankNode::NamedNode(NamedNode::new_unchecked("urn:alice"));
        let bob = NamedOrBlankNode::NamedNode(NamedNode::new_unchecked("urn:bob"));
        let carol = NamedOrBlankNode::NamedNode(NamedNode::new_unchecked("urn:carol"));
        let store = Rc::new(MemoryStore {
            facts: vec![
                Fact {
                    subject: alice.clone(),
                    predicate: knows.clone(),
                    object: Term::from(bob.clone()),
                },
                Fact {
                    subject: bob.clone(),
                    predicate: knows.clone(),
                    object: Term::from(carol.clone()),
                },
            ],
        });
        let patterns = vec![triple(a, knows.clone(), TermOrVariable::Variable(b)), triple(b, knows, TermOrVariable::Variable(c))];
        let mut rowsource = TriplesRowsource::new(table, store, patterns);

        let rows = rowsource.read_all_rows().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get(a), Some(&Term::from(alice)));
        assert_eq!(rows[0].get(b), Some(&Term::from(bob)));
        assert_eq!(rows[0].get(c), Some(&Term::from(carol)));
    }

    #[test]
    fn empty_bgp_yields_exactly_one_empty_row() {
        let table = VariablesTable::new();
        let store = Rc::new(MemoryStore { facts: Vec::new() });
        let mut rowsource = TriplesRowsource::new(table, store, Vec::new());
        let rows = rowsource.read_all_rows().unwrap();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].is_empty());
    }

    #[test]
    fn literal_object_pattern_matches_by_value() {
        let mut table = VariablesTable::new();
        let s = table.add("s", VariableKind::Normal);
        let age = NamedNode::new_unchecked("urn:age");
        let alice = NamedOrBlankNode::NamedNode(NamedNode::new_unchecked("urn:alice"));
        let store = Rc::new(MemoryStore {
            facts: vec![Fact {
                subject: alice.clone(),
                predicate: age.clone(),
                object: Term::Literal(integer_literal(30)),
            }],
        });
        let patterns = vec![triple(s, age, TermOrVariable::Term(Term::Literal(integer_literal(30))))];
        let mut rowsource = TriplesRowsource::new(table, store, patterns);
        let rows = rowsource.read_all_rows().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get(s), Some(&Term::from(alice)));
    }
}
