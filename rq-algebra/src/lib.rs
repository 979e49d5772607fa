//! Variables table, lexical scope tree, triple patterns, and the closed
//! algebra operator tree (§4.2/§4.4). The expression evaluator that walks
//! `expression::Expression` lives in `rq-eval`, not here.
#![forbid(unsafe_code)]

pub mod aggregate;
pub mod algebra;
pub mod expression;
pub mod pattern;
pub mod variables;

pub use aggregate::AggregateExpression;
pub use algebra::{DatasetClause, GraphPattern};
pub use expression::{BuiltinFunction, CustomFunction, Expression, OrderExpression};
pub use pattern::{NamedOrVariable, TermOrVariable, TriplePattern};
pub use variables::{Scope, ScopeError, ScopeId, ScopeKind, ScopeTree, VariableOffset, VariablesTable};
