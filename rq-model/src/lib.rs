//! The RDF term and XSD value model shared by the algebra, results, and
//! evaluation crates: `Term`/`NamedNode`/`BlankNode`/`Literal`/`Variable`,
//! the numeric and temporal fast paths, and the comparison/cast rules §4.1
//! defines over them.
#![forbid(unsafe_code)]

pub mod blank_node;
pub mod cast;
pub mod compare;
pub mod literal;
pub mod named_node;
pub mod numeric;
pub mod temporal;
pub mod term;
pub mod variable;
pub mod vocab;

pub use blank_node::{BlankNode, BlankNodeIdParseError};
pub use cast::CastError;
pub use compare::CompareError;
pub use literal::Literal;
pub use named_node::NamedNode;
pub use numeric::{Decimal, Integer, NumericValue};
pub use temporal::{Date, DateTime, Time, TzOffset};
pub use term::{NamedOrBlankNode, Term, TermKindError, Triple};
pub use variable::{Variable, VariableKind, VariableNameParseError};
