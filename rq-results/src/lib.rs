//! Result sets, serialization formats, and results comparison for the query
//! engine: `QuerySolution`, the XML/JSON/CSV/TSV/RDF-graph read/write paths
//! of §4.7, and the §4.9 comparison used to decide whether two answers agree.
#![forbid(unsafe_code)]

pub mod compare;
pub mod csv;
pub mod error;
pub mod format;
pub mod json;
pub mod rdf;
pub mod solution;
pub mod xml;

pub use compare::{compare_booleans, compare_graphs, compare_solutions, BlankNodeMatching, ComparisonOptions, ComparisonReport};
pub use error::{ComparisonError, ResultsParseError, ResultsWriteError};
pub use format::ResultsFormat;
pub use solution::{QuerySolution, SolutionIndex};
