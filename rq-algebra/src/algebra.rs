//! The closed algebra operator tree (§4.4). Node shape follows the
//! teacher's `spargebra::algebra::GraphPattern` (a boxed-recursive enum, one
//! struct-like variant per operator) generalized to the exact variant set
//! `spec.md` names, including `Diff`/`ToList`/`Service`/`Dataset`, which the
//! teacher represents differently or not at all.
use crate::aggregate::AggregateExpression;
use crate::expression::{Expression, OrderExpression};
use crate::pattern::{NamedOrVariable, TriplePattern};
use crate::variables::VariableOffset;
use rq_model::NamedNode;

/// A set of named graph IRIs fixing the active dataset for a `Dataset` node
/// (§4.4). An empty `named` set means "all named graphs the source has".
#[derive(Debug, Clone, Eq, PartialEq, Hash, Default)]
pub struct DatasetClause {
    pub default: Vec<NamedNode>,
    pub named: Vec<NamedNode>,
}

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum GraphPattern {
    Bgp {
        patterns: Vec<TriplePattern>,
    },
    Join {
        left: Box<Self>,
        right: Box<Self>,
    },
    LeftJoin {
        left: Box<Self>,
        right: Box<Self>,
        filter: Option<Expression>,
    },
    Filter {
        expr: Expression,
        inner: Box<Self>,
    },
    Union {
        left: Box<Self>,
        right: Box<Self>,
    },
    /// MINUS (§4.4 names it `Diff`; SPARQL surface syntax spells it MINUS).
    Diff {
        left: Box<Self>,
        right: Box<Self>,
    },
    Project {
        inner: Box<Self>,
        variables: Vec<VariableOffset>,
    },
    Extend {
        inner: Box<Self>,
        variable: VariableOffset,
        expression: Expression,
    },
    OrderBy {
        inner: Box<Self>,
        keys: Vec<OrderExpression>,
    },
    Distinct {
        inner: Box<Self>,
    },
    Reduced {
        inner: Box<Self>,
    },
    Slice {
        inner: Box<Self>,
        offset: usize,
        limit: Option<usize>,
    },
    Group {
        inner: Box<Self>,
        keys: Vec<VariableOffset>,
        aggregates: Vec<(VariableOffset, AggregateExpression)>,
    },
    Graph {
        origin: NamedOrVariable,
        inner: Box<Self>,
    },
    /// A materializing boundary used before operators that need random
    /// access over a shared buffer (§2 of SPEC_FULL's supplemented-features
    /// section).
    ToList {
        inner: Box<Self>,
    },
    Service {
        name: NamedOrVariable,
        silent: bool,
        inner: Box<Self>,
    },
    Dataset {
        clause: DatasetClause,
        inner: Box<Self>,
    },
}

impl GraphPattern {
    /// Variable offsets this subtree references anywhere — in its own
    /// patterns/expressions, not recursing into an `Exists`/`NotExists`
    /// inner pattern nested inside an attached filter (that's a separate
    /// scope, walked independently by correlation analysis, §4.8).
    pub fn referenced_variables(&self, out: &mut Vec<VariableOffset>) {
        match self {
            Self::Bgp { patterns } => {
                for pattern in patterns {
                    out.extend(pattern.variables());
                }
            }
            Self::Join { left, right } | Self::Union { left, right } | Self::Diff { left, right } => {
                left.referenced_variables(out);
                right.referenced_variables(out);
            }
            Self::LeftJoin { left, right, filter } => {
                left.referenced_variables(out);
                right.referenced_variables(out);
                if let Some(filter) = filter {
                    filter.referenced_variables(out);
                }
            }
            Self::Filter { expr, inner } => {
                expr.referenced_variables(out);
                inner.referenced_variables(out);
            }
            Self::Project { inner, variables } => {
                out.extend(variables.iter().copied());
                inner.referenced_variables(out);
            }
            Self::Extend { inner, variable, expression } => {
                out.push(*variable);
                expression.referenced_variables(out);
                inner.referenced_variables(out);
            }
            Self::OrderBy { inner, keys } => {
                for key in keys {
                    key.expression.referenced_variables(out);
                }
                inner.referenced_variables(out);
            }
            Self::Distinct { inner } | Self::Reduced { inner } | Self::Slice { inner, .. } | Self::ToList { inner } => {
                inner.referenced_variables(out);
            }
            Self::Group { inner, keys, aggregates } => {
                out.extend(keys.iter().copied());
                for (var, agg) in aggregates {
                    out.push(*var);
                    if let Some(operand) = agg.operand() {
                        operand.referenced_variables(out);
                    }
                }
                inner.referenced_variables(out);
            }
            Self::Graph { origin, inner } => {
                if let NamedOrVariable::Variable(v) = origin {
                    out.push(*v);
                }
                inner.referenced_variables(out);
            }
            Self::Service { name, inner, .. } => {
                if let NamedOrVariable::Variable(v) = name {
                    out.push(*v);
                }
                inner.referenced_variables(out);
            }
            Self::Dataset { inner, .. } => inner.referenced_variables(out),
        }
    }

    /// Direct children, in evaluation order — used by the planner (`rq-eval`)
    /// and by `--explain` rendering.
    pub fn children(&self) -> Vec<&Self> {
        match self {
            Self::Bgp { .. } => vec![],
            Self::Join { left, right }
            | Self::Union { left, right }
            | Self::Diff { left, right } => vec![left, right],
            Self::LeftJoin { left, right, .. } => vec![left, right],
            Self::Filter { inner, .. }
            | Self::Project { inner, .. }
            | Self::Extend { inner, .. }
            | Self::OrderBy { inner, .. }
            | Self::Distinct { inner }
            | Self::Reduced { inner }
            | Self::Slice { inner, .. }
            | Self::Group { inner, .. }
            | Self::Graph { inner, .. }
            | Self::ToList { inner }
            | Self::Service { inner, .. }
            | Self::Dataset { inner, .. } => vec![inner],
        }
    }

    /// The operator's name, used by `--explain` rendering (§2 of
    /// SPEC_FULL's supplemented-features section).
    pub fn operator_name(&self) -> &'static str {
        match self {
            Self::Bgp { .. } => "Bgp",
            Self::Join { .. } => "Join",
            Self::LeftJoin { .. } => "LeftJoin",
            Self::Filter { .. } => "Filter",
            Self::Union { .. } => "Union",
            Self::Diff { .. } => "Diff",
            Self::Project { .. } => "Project",
            Self::Extend { .. } => "Extend",
            Self::OrderBy { .. } => "OrderBy",
            Self::Distinct { .. } => "Distinct",
            Self::Reduced { .. } => "Reduced",
            Self::Slice { .. } => "Slice",
            Self::Group { .. } => "Group",
            Self::Graph { .. } => "Graph",
            Self::ToList { .. } => "ToList",
            Self::Service { .. } => "Service",
            Self::Dataset { .. } => "Dataset",
        }
    }
}
