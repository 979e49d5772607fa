//! Facade crate (§0): re-exports the public surface of `rq-model`,
//! `rq-algebra`, `rq-results`, and `rq-eval` under one name, the role the
//! teacher's `lib/oxigraph` plays on top of `spargebra`/`sparopt`/
//! `sparesults`/`spareval`. Also carries the pieces that only make sense at
//! this outermost layer: reading configuration from the process environment
//! (§6) and an in-memory [`TripleSource`](rq_eval::TripleSource)
//! implementation used by this crate's own integration tests and doc
//! examples — test scaffolding, not a deliverable (§0's scope cut).

pub mod config;
pub mod memory;

pub use config::Config;
pub use memory::MemoryTripleSource;

pub use rq_algebra::{
    AggregateExpression, BuiltinFunction, DatasetClause, Expression, GraphPattern, NamedOrVariable, OrderExpression, Scope, ScopeError, ScopeId, ScopeKind, ScopeTree, TermOrVariable, TriplePattern,
    VariableOffset, VariablesTable,
};
pub use rq_algebra::CustomFunction as CustomFunctionName;
pub use rq_eval::{
    explain, BooleanResults, CancellationToken, CorrelationSet, CustomAggregate, CustomFunction as CustomFunctionHandler, DriverOptions, EvaluationError, EvaluationOptions, FunctionRegistry,
    GraphResults, QueryEvaluator, QueryResults, Rowsource, ServiceResolver, SolutionsResults, TripleSource, TriplesMatch, DEFAULT_MAX_DIFFERENCES,
};
pub use rq_model::{BlankNode, DateTime, Literal, NamedNode, NamedOrBlankNode, Term, Triple, Variable};
pub use rq_results::{compare_booleans, compare_graphs, compare_solutions, BlankNodeMatching, ComparisonOptions, ComparisonReport, QuerySolution, ResultsFormat};
