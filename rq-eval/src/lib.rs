//! Query execution: the pull-based rowsource tree a lowered algebra plan
//! runs as, and the expression evaluator it drives FILTER/BIND/aggregate
//! arguments through. Grounded on the teacher's `spareval` crate's split
//! between dataset access, expression evaluation and iterator composition,
//! reworked around the constraint-aware backtracking join (§4.6) and the
//! explicit `Rowsource` pull contract (§4.5) this system's semantics need.

pub mod correlation;
pub mod dataset;
pub mod error;
pub mod explain;
pub mod expr_eval;
pub mod function_registry;
pub mod ops;
pub mod options;
pub mod planner;
pub mod query_results;
pub mod rand_source;
pub mod row;
pub mod rowsource;
pub mod triples_rowsource;

pub use correlation::{correlate, substitute, unsubstitute, CorrelationSet};
pub use dataset::{GroundTriple, MatchPattern, Parts, PatternTerm, TriplePosition, TripleSource, TriplesMatch};
pub use error::EvaluationError;
pub use explain::explain;
pub use expr_eval::{evaluate, EvalContext, EvalValue, ExistsRunner};
pub use function_registry::{CustomAggregate, CustomFunction, FunctionRegistry};
pub use ops::ServiceResolver;
pub use options::{EvaluationOptions, QueryEvaluator, DEFAULT_MAX_DIFFERENCES};
pub use planner::{plan_query, PlannedQuery};
pub use query_results::{BooleanResults, CancellationToken, DriverOptions, GraphResults, QueryResults, SolutionsResults};
pub use rand_source::RandSource;
pub use row::{extend_to_width, Row};
pub use rowsource::Rowsource;
pub use triples_rowsource::TriplesRowsource;
