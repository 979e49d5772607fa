//! Lowers a closed algebra tree (§4.4) into a `Box<dyn Rowsource>` (§4.5).
//! Grounded on the teacher's `spareval::SimpleEvaluator::graph_pattern_evaluator`
//! dispatch (one match arm per `GraphPattern` variant, recursing into
//! children first), generalized to this crate's explicit pull-based
//! rowsource tree and its `TripleSource`/`TriplesMatch` capability set.
use std::cell::RefCell;
use std::rc::{Rc, Weak};

use rq_algebra::{DatasetClause, GraphPattern, NamedOrVariable, ScopeKind, ScopeTree, VariableOffset, VariablesTable};
use rq_model::DateTime;

use crate::correlation::correlate;
use crate::dataset::TripleSource;
use crate::error::EvaluationError;
use crate::expr_eval::ExistsRunner;
use crate::function_registry::FunctionRegistry;
use crate::ops::merge::compatible;
use crate::ops::{
    BufferedRowsource, DiffRowsource, DistinctRowsource, EvalEnv, ExtendRowsource, FilterRowsource, GraphRowsource, GroupRowsource, JoinRowsource, LeftJoinRowsource, OrderByRowsource,
    ProjectRowsource, ReducedRowsource, ServiceResolver, ServiceRowsource, SliceRowsource, ToListRowsource, UnionRowsource,
};
use crate::rand_source::RandSource;
use crate::row::Row;
use crate::rowsource::Rowsource;
use crate::triples_rowsource::TriplesRowsource;

/// A fully lowered plan, plus the ordered list of variables the query's
/// outermost `Project` actually exposes (§4.7) — kept separate from any
/// individual rowsource's `variables()` since offsets are global to the
/// whole plan and every node shares the same table.
pub struct PlannedQuery {
    pub rowsource: Box<dyn Rowsource>,
    pub output_variables: Vec<VariableOffset>,
}

/// Builds the whole evaluator: one shared [`RandSource`] (optionally seeded,
/// §6 `RAND_SEED`) and one `EXISTS`/`NOT EXISTS` runner that can recursively
/// lower and run an inner pattern against a single outer row.
#[allow(clippy::too_many_arguments)]
pub fn plan_query<TS>(
    pattern: &GraphPattern,
    source: Rc<TS>,
    variables: VariablesTable,
    rand_seed: Option<u64>,
    now: DateTime,
    functions: FunctionRegistry,
    no_net: bool,
    service_resolver: Option<Rc<dyn ServiceResolver>>,
) -> Result<PlannedQuery, EvaluationError>
where
    TS: TripleSource + 'static,
{
    let rand = Rc::new(RefCell::new(RandSource::new(rand_seed)));
    let functions = Rc::new(functions);
    let runner = PlannerExistsRunner::new_shared(source.clone(), variables.clone(), rand.clone(), now, functions.clone(), no_net, service_resolver.clone());
    let env = EvalEnv::new(rand, now, runner, functions, no_net, service_resolver);
    let rowsource = lower(pattern, &source, &variables, &env)?;
    let output_variables = match pattern {
        GraphPattern::Project { variables, .. } => variables.clone(),
        _ => (0..variables.count()).map(VariableOffset).collect(),
    };
    Ok(PlannedQuery { rowsource, output_variables })
}

fn ensure_resettable(rowsource: Box<dyn Rowsource>) -> Box<dyn Rowsource> {
    if rowsource.is_resettable() {
        rowsource
    } else {
        Box::new(BufferedRowsource::new(rowsource))
    }
}

fn lower<TS>(pattern: &GraphPattern, source: &Rc<TS>, variables: &VariablesTable, env: &EvalEnv) -> Result<Box<dyn Rowsource>, EvaluationError>
where
    TS: TripleSource + 'static,
{
    match pattern {
        GraphPattern::Bgp { patterns } => Ok(Box::new(TriplesRowsource::new(variables.clone(), source.clone(), patterns.clone()))),
        GraphPattern::Join { left, right } => {
            let left = lower(left, source, variables, env)?;
            let right = ensure_resettable(lower(right, source, variables, env)?);
            Ok(Box::new(JoinRowsource::new(left, right, variables.clone())))
        }
        GraphPattern::LeftJoin { left, right, filter } => {
            let left = lower(left, source, variables, env)?;
            let right = ensure_resettable(lower(right, source, variables, env)?);
            Ok(Box::new(LeftJoinRowsource::new(left, right, filter.clone(), variables.clone(), env.clone())))
        }
        GraphPattern::Filter { expr, inner } => {
            let inner = lower(inner, source, variables, env)?;
            Ok(Box::new(FilterRowsource::new(inner, expr.clone(), env.clone())))
        }
        GraphPattern::Union { left, right } => {
            let left = lower(left, source, variables, env)?;
            let right = lower(right, source, variables, env)?;
            Ok(Box::new(UnionRowsource::new(left, right, variables.clone())))
        }
        GraphPattern::Diff { left, right } => {
            let left_lowered = lower(left, source, variables, env)?;
            let right_lowered = ensure_resettable(lower(right, source, variables, env)?);
            let correlated = correlated_set_for_diff(left, right);
            Ok(Box::new(DiffRowsource::new(left_lowered, right_lowered, correlated, variables.clone())))
        }
        GraphPattern::Project { inner, variables: projection } => {
            let inner = lower(inner, source, variables, env)?;
            Ok(Box::new(ProjectRowsource::new(inner, projection.clone(), variables.clone())))
        }
        GraphPattern::Extend { inner, variable, expression } => {
            let inner = lower(inner, source, variables, env)?;
            Ok(Box::new(ExtendRowsource::new(inner, *variable, expression.clone(), variables.clone(), env.clone())))
        }
        GraphPattern::OrderBy { inner, keys } => {
            let inner = lower(inner, source, variables, env)?;
            Ok(Box::new(OrderByRowsource::new(inner, keys.clone(), env.clone())))
        }
        GraphPattern::Distinct { inner } => {
            let inner = lower(inner, source, variables, env)?;
            Ok(Box::new(DistinctRowsource::new(inner)))
        }
        GraphPattern::Reduced { inner } => {
            let inner = lower(inner, source, variables, env)?;
            Ok(Box::new(ReducedRowsource::new(inner)))
        }
        GraphPattern::Slice { inner, offset, limit } => {
            let inner = lower(inner, source, variables, env)?;
            Ok(Box::new(SliceRowsource::new(inner, *offset, *limit)))
        }
        GraphPattern::Group { inner, keys, aggregates } => {
            let inner = lower(inner, source, variables, env)?;
            Ok(Box::new(GroupRowsource::new(inner, keys.clone(), aggregates.clone(), env.clone(), variables.clone())))
        }
        GraphPattern::Graph { origin, inner } => {
            let lowered_inner = lower(inner, source, variables, env)?;
            Ok(Box::new(GraphRowsource::new(lowered_inner, source.clone(), origin.clone())))
        }
        GraphPattern::ToList { inner } => {
            let inner = lower(inner, source, variables, env)?;
            Ok(Box::new(ToListRowsource::new(inner)))
        }
        GraphPattern::Service { name, silent, inner } => {
            let lowered_inner = lower(inner, source, variables, env)?;
            Ok(Box::new(ServiceRowsource::new(
                lowered_inner,
                (**inner).clone(),
                name.clone(),
                *silent,
                variables.clone(),
                env.no_net(),
                env.service_resolver(),
            )))
        }
        GraphPattern::Dataset { clause, inner } => lower_dataset(clause, inner, source, variables, env),
    }
}

/// `Dataset` (§4.4) fixes the active default/named graphs for its subtree.
/// With no dataset-restriction hook on [`TripleSource`] yet, a clause that
/// restricts the default graph to a single named graph is realized as a
/// constant `Graph` wrapper; any richer restriction is left to the store's
/// own default dataset (§9: dataset scoping is a `TripleSource`-level
/// concern, not one this planner can enforce on an arbitrary store).
fn lower_dataset<TS>(clause: &DatasetClause, inner: &GraphPattern, source: &Rc<TS>, variables: &VariablesTable, env: &EvalEnv) -> Result<Box<dyn Rowsource>, EvaluationError>
where
    TS: TripleSource + 'static,
{
    let lowered = lower(inner, source, variables, env)?;
    match clause.default.as_slice() {
        [only] => Ok(Box::new(GraphRowsource::new(lowered, source.clone(), NamedOrVariable::Term(only.clone().into())))),
        _ => Ok(lowered),
    }
}

fn correlated_set_for_diff(left: &GraphPattern, right: &GraphPattern) -> crate::correlation::CorrelationSet {
    let mut left_vars = Vec::new();
    left.referenced_variables(&mut left_vars);
    let mut tree = ScopeTree::new_root();
    let root = tree.root();
    let left_scope = tree.new_child(root, ScopeKind::Group).expect("root always accepts a new child");
    for v in left_vars {
        tree.add_variable(left_scope, v);
    }
    let right_scope = tree.new_child(root, ScopeKind::Minus).expect("root always accepts a new child");
    correlate(right, tree.get(left_scope), tree.get(right_scope))
}

/// Recursively lowers and runs `inner` against a fresh copy of the shared
/// environment so `EXISTS`/`NOT EXISTS` (§4.3, §4.8) can be evaluated from
/// inside expression evaluation without `rq-eval`'s evaluator and planner
/// modules depending on each other directly (`ExistsRunner` is the seam).
struct PlannerExistsRunner<TS: TripleSource + 'static> {
    source: Rc<TS>,
    variables: VariablesTable,
    rand: Rc<RefCell<RandSource>>,
    now: DateTime,
    functions: Rc<FunctionRegistry>,
    no_net: bool,
    service_resolver: Option<Rc<dyn ServiceResolver>>,
    self_ref: Weak<RefCell<PlannerExistsRunner<TS>>>,
}

impl<TS: TripleSource + 'static> PlannerExistsRunner<TS> {
    fn new_shared(
        source: Rc<TS>,
        variables: VariablesTable,
        rand: Rc<RefCell<RandSource>>,
        now: DateTime,
        functions: Rc<FunctionRegistry>,
        no_net: bool,
        service_resolver: Option<Rc<dyn ServiceResolver>>,
    ) -> Rc<RefCell<Self>> {
        Rc::new_cyclic(|weak| {
            RefCell::new(Self {
                source,
                variables,
                rand,
                now,
                functions,
                no_net,
                service_resolver,
                self_ref: weak.clone(),
            })
        })
    }
}

impl<TS: TripleSource + 'static> ExistsRunner for PlannerExistsRunner<TS> {
    fn has_match(&mut self, inner: &GraphPattern, outer_row: &Row) -> Result<bool, EvaluationError> {
        let handle = self.self_ref.upgrade().expect("the runner outlives its own EXISTS evaluation");
        let env = EvalEnv::new(self.rand.clone(), self.now, handle, self.functions.clone(), self.no_net, self.service_resolver.clone());
        let mut rowsource = lower(inner, &self.source, &self.variables, &env)?;
        rowsource.init()?;
        let found = loop {
            match rowsource.read_row()? {
                Some(row) if compatible(outer_row, &row) => break true,
                Some(_) => continue,
                None => break false,
            }
        };
        rowsource.finish();
        Ok(found)
    }
}
