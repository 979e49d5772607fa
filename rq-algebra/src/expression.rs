//! The expression AST (§4.3 names the operator set; evaluation itself lives
//! in `rq-eval`). Mirrors the teacher's `spargebra::algebra::Expression`
//! shape — a closed, boxed-recursive enum — generalized to the operator list
//! `spec.md` enumerates, including the hash/UUID/dateTime builtins the
//! teacher splits into a separate `Function` enum.
use crate::variables::VariableOffset;
use rq_model::{Literal, NamedNode};
use std::fmt;

/// A named built-in function call that isn't given its own `Expression`
/// variant — string/numeric/dateTime/hash/UUID functions (§4.3).
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum BuiltinFunction {
    Str,
    Lang,
    Datatype,
    Iri,
    BNode,
    StrDt,
    StrLang,
    StrLen,
    UCase,
    LCase,
    StrStarts,
    StrEnds,
    Contains,
    Substr,
    Concat,
    StrBefore,
    StrAfter,
    EncodeForUri,
    LangMatches,
    Regex,
    Replace,
    Abs,
    Ceil,
    Floor,
    Round,
    Rand,
    Now,
    Year,
    Month,
    Day,
    Hours,
    Minutes,
    Seconds,
    Timezone,
    Tz,
    Md5,
    Sha1,
    Sha224,
    Sha256,
    Sha384,
    Sha512,
    Uuid,
    StrUuid,
    IsIri,
    IsBlank,
    IsLiteral,
    IsNumeric,
}

impl fmt::Display for BuiltinFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// An IRI naming a function this engine has no built-in for (§2 of
/// SPEC_FULL's supplemented-features section): a seam, not a hard error,
/// resolved at evaluation time against a `FunctionRegistry`.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct CustomFunction(pub NamedNode);

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum Expression {
    NamedNode(NamedNode),
    Literal(Literal),
    Variable(VariableOffset),
    Or(Box<Self>, Box<Self>),
    And(Box<Self>, Box<Self>),
    Equal(Box<Self>, Box<Self>),
    SameTerm(Box<Self>, Box<Self>),
    Greater(Box<Self>, Box<Self>),
    GreaterOrEqual(Box<Self>, Box<Self>),
    Less(Box<Self>, Box<Self>),
    LessOrEqual(Box<Self>, Box<Self>),
    In(Box<Self>, Vec<Self>),
    NotIn(Box<Self>, Vec<Self>),
    Add(Box<Self>, Box<Self>),
    Subtract(Box<Self>, Box<Self>),
    Multiply(Box<Self>, Box<Self>),
    Divide(Box<Self>, Box<Self>),
    UnaryPlus(Box<Self>),
    UnaryMinus(Box<Self>),
    Not(Box<Self>),
    Bound(VariableOffset),
    If(Box<Self>, Box<Self>, Box<Self>),
    Coalesce(Vec<Self>),
    Exists(Box<crate::algebra::GraphPattern>),
    NotExists(Box<crate::algebra::GraphPattern>),
    FunctionCall(BuiltinFunction, Vec<Self>),
    CustomCall(CustomFunction, Vec<Self>),
}

impl Expression {
    /// Variable offsets this expression reads, for correlation analysis
    /// (§4.8) and for deciding an `Extend`/`Filter`'s input requirements.
    pub fn referenced_variables(&self, out: &mut Vec<VariableOffset>) {
        match self {
            Self::NamedNode(_) | Self::Literal(_) => {}
            Self::Variable(v) | Self::Bound(v) => out.push(*v),
            Self::Or(a, b)
            | Self::And(a, b)
            | Self::Equal(a, b)
            | Self::SameTerm(a, b)
            | Self::Greater(a, b)
            | Self::GreaterOrEqual(a, b)
            | Self::Less(a, b)
            | Self::LessOrEqual(a, b)
            | Self::Add(a, b)
            | Self::Subtract(a, b)
            | Self::Multiply(a, b)
            | Self::Divide(a, b) => {
                a.referenced_variables(out);
                b.referenced_variables(out);
            }
            Self::UnaryPlus(a) | Self::UnaryMinus(a) | Self::Not(a) => a.referenced_variables(out),
            Self::In(a, rest) | Self::NotIn(a, rest) => {
                a.referenced_variables(out);
                for e in rest {
                    e.referenced_variables(out);
                }
            }
            Self::If(c, t, e) => {
                c.referenced_variables(out);
                t.referenced_variables(out);
                e.referenced_variables(out);
            }
            Self::Coalesce(args) => {
                for e in args {
                    e.referenced_variables(out);
                }
            }
            Self::FunctionCall(_, args) | Self::CustomCall(_, args) => {
                for e in args {
                    e.referenced_variables(out);
                }
            }
            Self::Exists(p) | Self::NotExists(p) => p.referenced_variables(out),
        }
    }
}

/// A key and ascending/descending direction, as used by `OrderBy` (§4.5).
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct OrderExpression {
    pub expression: Expression,
    pub ascending: bool,
}
