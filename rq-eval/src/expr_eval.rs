//! The three-valued expression evaluator (§4.3): every expression reduces to
//! a term, `unbound`, or `error`, propagated per the truth tables below
//! rather than by host-language exceptions (§9 "Error value vs unbound vs
//! exception"). Grounded on the teacher's `spareval::expression` dispatch-by-
//! `Expression`-variant shape, adapted to return this three-way value
//! explicitly instead of `Option<Result<Term, EvaluationError>>`.
use crate::error::EvaluationError;
use crate::function_registry::FunctionRegistry;
use crate::rand_source::RandSource;
use crate::row::Row;
use md5::{Digest, Md5};
use rq_algebra::{BuiltinFunction, Expression};
use rq_model::compare::{effective_boolean_value, term_identical, value_compare, value_eq};
use rq_model::numeric::{Decimal, NumericValue};
use rq_model::vocab::xsd;
use rq_model::{BlankNode, DateTime, Literal, NamedNode, Term};
use sha1::Sha1;
use sha2::{Sha224, Sha256, Sha384, Sha512};
use std::cmp::Ordering;
use std::str::FromStr;

/// An expression's outcome: a term, deliberately unbound, or a type/runtime
/// error — never a Rust exception (§9).
#[derive(Debug, Clone)]
pub enum EvalValue {
    Value(Term),
    Unbound,
    Error,
}

impl EvalValue {
    pub fn bool(value: bool) -> Self {
        Self::Value(Term::Literal(Literal::from(value)))
    }

    pub fn as_term(&self) -> Option<&Term> {
        match self {
            Self::Value(term) => Some(term),
            _ => None,
        }
    }

    /// Folds the three-valued result into the boolean `FILTER`/`IF` actually
    /// branches on: unbound and type errors both behave as false (§4.3).
    pub fn effective_boolean_value_or_false(&self) -> bool {
        match self {
            Self::Value(term) => effective_boolean_value(term).unwrap_or(false),
            Self::Unbound | Self::Error => false,
        }
    }
}

/// Lets the evaluator run `EXISTS`/`NOT EXISTS`'s inner pattern against the
/// current row without `rq-eval`'s planner and its own evaluator entry point
/// depending on each other directly.
pub trait ExistsRunner {
    fn has_match(&mut self, inner: &rq_algebra::GraphPattern, outer_row: &Row) -> Result<bool, EvaluationError>;
}

pub struct EvalContext<'a> {
    pub row: &'a Row,
    pub rand: &'a mut RandSource,
    pub now: DateTime,
    pub exists: &'a mut dyn ExistsRunner,
    pub fresh_blank_node: &'a mut dyn FnMut() -> BlankNode,
    pub functions: &'a FunctionRegistry,
}

pub fn evaluate(expr: &Expression, ctx: &mut EvalContext<'_>) -> EvalValue {
    match expr {
        Expression::NamedNode(n) => EvalValue::Value(Term::NamedNode(n.clone())),
        Expression::Literal(l) => EvalValue::Value(Term::Literal(l.clone())),
        Expression::Variable(offset) => match ctx.row.get(*offset) {
            Some(term) => EvalValue::Value(term.clone()),
            None => EvalValue::Unbound,
        },
        // BOUND never itself reports unbound — that is exactly the question
        // it answers (§4.3).
        Expression::Bound(offset) => EvalValue::bool(ctx.row.get(*offset).is_some()),
        Expression::Or(a, b) => eval_or(a, b, ctx),
        Expression::And(a, b) => eval_and(a, b, ctx),
        Expression::Not(a) => match evaluate(a, ctx) {
            EvalValue::Value(term) => effective_boolean_value(&term).map_or(EvalValue::Error, |v| EvalValue::bool(!v)),
            EvalValue::Unbound => EvalValue::Unbound,
            EvalValue::Error => EvalValue::Error,
        },
        Expression::Equal(a, b) => relational(a, b, ctx, value_eq),
        Expression::SameTerm(a, b) => match (evaluate(a, ctx), evaluate(b, ctx)) {
            (EvalValue::Value(a), EvalValue::Value(b)) => EvalValue::bool(term_identical(&a, &b)),
            (EvalValue::Error, _) | (_, EvalValue::Error) => EvalValue::Error,
            _ => EvalValue::bool(false),
        },
        Expression::Greater(a, b) => ordering_relational(a, b, ctx, |o| o == Ordering::Greater),
        Expression::GreaterOrEqual(a, b) => ordering_relational(a, b, ctx, |o| o != Ordering::Less),
        Expression::Less(a, b) => ordering_relational(a, b, ctx, |o| o == Ordering::Less),
        Expression::LessOrEqual(a, b) => ordering_relational(a, b, ctx, |o| o != Ordering::Greater),
        Expression::In(needle, haystack) => eval_in(needle, haystack, ctx, true),
        Expression::NotIn(needle, haystack) => eval_in(needle, haystack, ctx, false),
        Expression::Add(a, b) => numeric_binary(a, b, ctx, numeric_add),
        Expression::Subtract(a, b) => numeric_binary(a, b, ctx, numeric_sub),
        Expression::Multiply(a, b) => numeric_binary(a, b, ctx, numeric_mul),
        Expression::Divide(a, b) => numeric_binary(a, b, ctx, numeric_div),
        Expression::UnaryPlus(a) => match evaluate(a, ctx) {
            EvalValue::Value(term) => numeric_of(&term).map_or(EvalValue::Error, numeric_to_eval),
            other => other,
        },
        Expression::UnaryMinus(a) => match evaluate(a, ctx) {
            EvalValue::Value(term) => numeric_of(&term).map_or(EvalValue::Error, |n| numeric_to_eval(numeric_neg(n))),
            other => other,
        },
        Expression::If(c, t, e) => match evaluate(c, ctx) {
            EvalValue::Error => EvalValue::Error,
            cond if cond.effective_boolean_value_or_false() => evaluate(t, ctx),
            _ => evaluate(e, ctx),
        },
        // COALESCE skips unbound and erroring arguments and never itself
        // errors (§4.3): only an all-unbound/all-error argument list yields
        // unbound.
        Expression::Coalesce(args) => {
            for arg in args {
                if let EvalValue::Value(term) = evaluate(arg, ctx) {
                    return EvalValue::Value(term);
                }
            }
            EvalValue::Unbound
        }
        Expression::Exists(inner) => exists_value(inner, ctx, true),
        Expression::NotExists(inner) => exists_value(inner, ctx, false),
        Expression::FunctionCall(f, args) => eval_builtin(*f, args, ctx),
        Expression::CustomCall(name, args) => eval_custom_call(name, args, ctx),
    }
}

fn eval_or(a: &Expression, b: &Expression, ctx: &mut EvalContext<'_>) -> EvalValue {
    let left = evaluate(a, ctx);
    if let EvalValue::Value(term) = &left {
        if effective_boolean_value(term) == Ok(true) {
            return EvalValue::bool(true);
        }
    }
    let right = evaluate(b, ctx);
    if let EvalValue::Value(term) = &right {
        if effective_boolean_value(term) == Ok(true) {
            return EvalValue::bool(true);
        }
    }
    match (&left, &right) {
        (EvalValue::Error, _) | (_, EvalValue::Error) => EvalValue::Error,
        (EvalValue::Unbound, _) | (_, EvalValue::Unbound) => EvalValue::Unbound,
        _ => EvalValue::bool(false),
    }
}

fn eval_and(a: &Expression, b: &Expression, ctx: &mut EvalContext<'_>) -> EvalValue {
    let left = evaluate(a, ctx);
    if let EvalValue::Value(term) = &left {
        if effective_boolean_value(term) == Ok(false) {
            return EvalValue::bool(false);
        }
    }
    let right = evaluate(b, ctx);
    if let EvalValue::Value(term) = &right {
        if effective_boolean_value(term) == Ok(false) {
            return EvalValue::bool(false);
        }
    }
    match (&left, &right) {
        (EvalValue::Error, _) | (_, EvalValue::Error) => EvalValue::Error,
        (EvalValue::Unbound, _) | (_, EvalValue::Unbound) => EvalValue::Unbound,
        _ => EvalValue::bool(true),
    }
}

/// Relational comparisons on an unbound operand return `false`, not unbound
/// (§4.3: this matches the observed SPARQL filter discipline).
fn relational(a: &Expression, b: &Expression, ctx: &mut EvalContext<'_>, op: impl Fn(&Term, &Term) -> Result<bool, rq_model::CompareError>) -> EvalValue {
    match (evaluate(a, ctx), evaluate(b, ctx)) {
        (EvalValue::Value(a), EvalValue::Value(b)) => op(&a, &b).map_or(EvalValue::Error, EvalValue::bool),
        (EvalValue::Error, _) | (_, EvalValue::Error) => EvalValue::Error,
        _ => EvalValue::bool(false),
    }
}

fn ordering_relational(a: &Expression, b: &Expression, ctx: &mut EvalContext<'_>, accept: impl Fn(Ordering) -> bool) -> EvalValue {
    relational(a, b, ctx, move |a, b| value_compare(a, b).map(&accept))
}

/// `IN`/`NOT IN` on an unbound needle is false (§4.3); an erroring needle
/// propagates `Error` instead, same as any other operand-error case — a
/// member test that errors on every remaining candidate without a match
/// also errors.
fn eval_in(needle: &Expression, haystack: &[Expression], ctx: &mut EvalContext<'_>, want_member: bool) -> EvalValue {
    let needle = match evaluate(needle, ctx) {
        EvalValue::Value(needle) => needle,
        EvalValue::Error => return EvalValue::Error,
        EvalValue::Unbound => return EvalValue::bool(false),
    };
    let mut saw_error = false;
    for candidate in haystack {
        match evaluate(candidate, ctx) {
            EvalValue::Value(term) => match value_eq(&needle, &term) {
                Ok(true) => return EvalValue::bool(want_member),
                Ok(false) => {}
                Err(_) => saw_error = true,
            },
            EvalValue::Error => saw_error = true,
            EvalValue::Unbound => {}
        }
    }
    if saw_error {
        EvalValue::Error
    } else {
        EvalValue::bool(!want_member)
    }
}

/// Arithmetic on unbound returns unbound (§4.3).
fn numeric_binary(a: &Expression, b: &Expression, ctx: &mut EvalContext<'_>, op: impl Fn(NumericValue, NumericValue) -> Option<NumericValue>) -> EvalValue {
    match (evaluate(a, ctx), evaluate(b, ctx)) {
        (EvalValue::Value(a), EvalValue::Value(b)) => match (numeric_of(&a), numeric_of(&b)) {
            (Some(a), Some(b)) => op(a, b).map_or(EvalValue::Error, numeric_to_eval),
            _ => EvalValue::Error,
        },
        (EvalValue::Error, _) | (_, EvalValue::Error) => EvalValue::Error,
        _ => EvalValue::Unbound,
    }
}

pub(crate) fn numeric_of(term: &Term) -> Option<NumericValue> {
    let Term::Literal(literal) = term else { return None };
    match literal.datatype().as_str() {
        xsd::INTEGER => literal.value().parse().ok().map(NumericValue::Integer),
        xsd::DECIMAL => Decimal::from_str(literal.value()).ok().map(NumericValue::Decimal),
        xsd::FLOAT => literal.value().parse().ok().map(NumericValue::Float),
        xsd::DOUBLE => literal.value().parse().ok().map(NumericValue::Double),
        _ => None,
    }
}

pub(crate) fn numeric_to_eval(value: NumericValue) -> EvalValue {
    let (lexical, datatype) = match value {
        NumericValue::Integer(v) => (v.to_string(), xsd::INTEGER),
        NumericValue::Decimal(v) => (v.to_string(), xsd::DECIMAL),
        NumericValue::Float(v) => (format_double(f64::from(v)), xsd::FLOAT),
        NumericValue::Double(v) => (format_double(v), xsd::DOUBLE),
    };
    EvalValue::Value(Term::Literal(Literal::new_typed(lexical, NamedNode::new_unchecked(datatype))))
}

fn format_double(v: f64) -> String {
    if v.is_nan() {
        "NaN".to_owned()
    } else if v.is_infinite() {
        if v > 0.0 { "INF".to_owned() } else { "-INF".to_owned() }
    } else {
        v.to_string()
    }
}

pub(crate) fn numeric_add(a: NumericValue, b: NumericValue) -> Option<NumericValue> {
    let (a, b) = NumericValue::promote(a, b);
    match (a, b) {
        (NumericValue::Integer(a), NumericValue::Integer(b)) => a.checked_add(b).map(NumericValue::Integer),
        (NumericValue::Decimal(a), NumericValue::Decimal(b)) => a.checked_add(b).map(NumericValue::Decimal),
        (NumericValue::Float(a), NumericValue::Float(b)) => Some(NumericValue::Float(a + b)),
        (NumericValue::Double(a), NumericValue::Double(b)) => Some(NumericValue::Double(a + b)),
        _ => None,
    }
}

fn numeric_sub(a: NumericValue, b: NumericValue) -> Option<NumericValue> {
    numeric_add(a, numeric_neg(b))
}

fn numeric_neg(value: NumericValue) -> NumericValue {
    match value {
        NumericValue::Integer(v) => NumericValue::Integer(-v),
        NumericValue::Decimal(v) => NumericValue::Decimal(v.checked_neg().unwrap_or(Decimal::ZERO)),
        NumericValue::Float(v) => NumericValue::Float(-v),
        NumericValue::Double(v) => NumericValue::Double(-v),
    }
}

fn numeric_mul(a: NumericValue, b: NumericValue) -> Option<NumericValue> {
    let (a, b) = NumericValue::promote(a, b);
    match (a, b) {
        (NumericValue::Integer(a), NumericValue::Integer(b)) => a.checked_mul(b).map(NumericValue::Integer),
        (NumericValue::Decimal(a), NumericValue::Decimal(b)) => a.checked_mul(b).map(NumericValue::Decimal),
        (NumericValue::Float(a), NumericValue::Float(b)) => Some(NumericValue::Float(a * b)),
        (NumericValue::Double(a), NumericValue::Double(b)) => Some(NumericValue::Double(a * b)),
        _ => None,
    }
}

pub(crate) fn numeric_div(a: NumericValue, b: NumericValue) -> Option<NumericValue> {
    let (a, b) = NumericValue::promote(a, b);
    match (a, b) {
        (NumericValue::Integer(a), NumericValue::Integer(b)) => {
            if b == 0 {
                None
            } else {
                Decimal::from_i64(a).checked_div(Decimal::from_i64(b)).map(NumericValue::Decimal)
            }
        }
        (NumericValue::Decimal(a), NumericValue::Decimal(b)) => a.checked_div(b).map(NumericValue::Decimal),
        (NumericValue::Float(a), NumericValue::Float(b)) => Some(NumericValue::Float(a / b)),
        (NumericValue::Double(a), NumericValue::Double(b)) => Some(NumericValue::Double(a / b)),
        _ => None,
    }
}

fn exists_value(inner: &rq_algebra::GraphPattern, ctx: &mut EvalContext<'_>, want_match: bool) -> EvalValue {
    match ctx.exists.has_match(inner, ctx.row) {
        Ok(found) => EvalValue::bool(found == want_match),
        Err(e) => {
            tracing::warn!(error = %e, "EXISTS evaluation failed, treating as no match");
            EvalValue::bool(!want_match)
        }
    }
}

/// An embedder-registered function (§4.3's `CustomCall`): unbound/erroring
/// arguments short-circuit without ever reaching the registered closure, and
/// an IRI with no registered function is a type error rather than a crash —
/// the same error-value discipline the built-in functions follow.
fn eval_custom_call(name: &rq_algebra::CustomFunction, args: &[Expression], ctx: &mut EvalContext<'_>) -> EvalValue {
    let Some(function) = ctx.functions.function(&name.0).cloned() else {
        tracing::warn!(function = %name.0, "unregistered custom function call");
        return EvalValue::Error;
    };
    let values: Vec<EvalValue> = args.iter().map(|a| evaluate(a, ctx)).collect();
    if values.iter().any(|v| matches!(v, EvalValue::Error)) {
        return EvalValue::Error;
    }
    if values.iter().any(|v| matches!(v, EvalValue::Unbound)) {
        return EvalValue::Unbound;
    }
    let terms: Vec<Term> = values.into_iter().filter_map(|v| v.as_term().cloned()).collect();
    function(&terms).map_or(EvalValue::Error, EvalValue::Value)
}

fn eval_builtin(f: BuiltinFunction, args: &[Expression], ctx: &mut EvalContext<'_>) -> EvalValue {
    let values: Vec<EvalValue> = args.iter().map(|a| evaluate(a, ctx)).collect();
    match f {
        BuiltinFunction::IsIri => bool_test(&values, Term::is_named_node),
        BuiltinFunction::IsBlank => bool_test(&values, Term::is_blank_node),
        BuiltinFunction::IsLiteral => bool_test(&values, Term::is_literal),
        BuiltinFunction::IsNumeric => bool_test(&values, |t| numeric_of(t).is_some()),
        BuiltinFunction::Str => one_arg_term(&values, |t| match t {
            Term::NamedNode(n) => Some(Term::Literal(Literal::new_simple(n.as_str()))),
            Term::Literal(l) => Some(Term::Literal(Literal::new_simple(l.value()))),
            Term::BlankNode(_) => None,
        }),
        BuiltinFunction::Lang => one_literal(&values, |l| Literal::new_simple(l.language().unwrap_or(""))),
        BuiltinFunction::Datatype => one_arg_term(&values, |t| match t {
            Term::Literal(l) => Some(Term::NamedNode(l.datatype())),
            _ => None,
        }),
        BuiltinFunction::Iri => one_arg_term(&values, |t| NamedNode::new(term_lexical(t)?.to_owned()).ok().map(Term::NamedNode)),
        BuiltinFunction::BNode if args.is_empty() => EvalValue::Value(Term::BlankNode((ctx.fresh_blank_node)())),
        BuiltinFunction::BNode => one_arg_term(&values, |t| Some(Term::BlankNode(BlankNode::new_unchecked(term_lexical(t)?.to_owned())))),
        BuiltinFunction::StrDt => two_args(&values, |a, b| match (a, b) {
            (Term::Literal(a), Term::NamedNode(dt)) => Some(Term::Literal(Literal::new_typed(a.value(), dt.clone()))),
            _ => None,
        }),
        BuiltinFunction::StrLang => two_args(&values, |a, b| match (a, b) {
            (Term::Literal(a), Term::Literal(lang)) => Literal::new_lang_tagged(a.value(), lang.value()).ok().map(Term::Literal),
            _ => None,
        }),
        BuiltinFunction::StrLen => one_literal(&values, |l| Literal::new_typed(l.value().chars().count().to_string(), NamedNode::new_unchecked(xsd::INTEGER))),
        BuiltinFunction::UCase => one_literal(&values, |l| echo_literal(l, l.value().to_uppercase())),
        BuiltinFunction::LCase => one_literal(&values, |l| echo_literal(l, l.value().to_lowercase())),
        BuiltinFunction::StrStarts => string_predicate(&values, |a, b| a.starts_with(b)),
        BuiltinFunction::StrEnds => string_predicate(&values, |a, b| a.ends_with(b)),
        BuiltinFunction::Contains => string_predicate(&values, |a, b| a.contains(b)),
        BuiltinFunction::Substr => substr(&values),
        BuiltinFunction::Concat => concat(&values),
        BuiltinFunction::StrBefore => string_split(&values, true),
        BuiltinFunction::StrAfter => string_split(&values, false),
        BuiltinFunction::EncodeForUri => one_literal(&values, |l| Literal::new_typed(encode_for_uri(l.value()), NamedNode::new_unchecked(xsd::STRING))),
        BuiltinFunction::LangMatches => string_predicate(&values, lang_matches),
        BuiltinFunction::Regex => regex_test(&values),
        BuiltinFunction::Replace => replace(&values),
        BuiltinFunction::Abs => numeric_unary(&values, |n| match n {
            NumericValue::Integer(v) => NumericValue::Integer(v.abs()),
            NumericValue::Decimal(v) => NumericValue::Decimal(v.abs()),
            NumericValue::Float(v) => NumericValue::Float(v.abs()),
            NumericValue::Double(v) => NumericValue::Double(v.abs()),
        }),
        BuiltinFunction::Ceil => numeric_unary(&values, |n| round_like(n, Decimal::ceil, f32::ceil, f64::ceil)),
        BuiltinFunction::Floor => numeric_unary(&values, |n| round_like(n, Decimal::floor, f32::floor, f64::floor)),
        BuiltinFunction::Round => numeric_unary(&values, |n| round_like(n, Decimal::round, f32::round, f64::round)),
        BuiltinFunction::Rand => EvalValue::Value(Term::Literal(Literal::new_typed(ctx.rand.next_f64().to_string(), NamedNode::new_unchecked(xsd::DOUBLE)))),
        BuiltinFunction::Now => EvalValue::Value(Term::Literal(Literal::new_typed(ctx.now.to_string(), NamedNode::new_unchecked(xsd::DATE_TIME)))),
        BuiltinFunction::Year => datetime_field(&values, |dt| dt.year()),
        BuiltinFunction::Month => datetime_field(&values, |dt| i64::from(dt.month())),
        BuiltinFunction::Day => datetime_field(&values, |dt| i64::from(dt.day())),
        BuiltinFunction::Hours => datetime_field(&values, |dt| i64::from(dt.hour())),
        BuiltinFunction::Minutes => datetime_field(&values, |dt| i64::from(dt.minute())),
        BuiltinFunction::Seconds => datetime_seconds(&values),
        BuiltinFunction::Timezone => datetime_timezone(&values, true),
        BuiltinFunction::Tz => datetime_timezone(&values, false),
        BuiltinFunction::Md5 => digest(&values, |bytes| hex::encode(Md5::digest(bytes))),
        BuiltinFunction::Sha1 => digest(&values, |bytes| hex::encode(Sha1::digest(bytes))),
        BuiltinFunction::Sha224 => digest(&values, |bytes| hex::encode(Sha224::digest(bytes))),
        BuiltinFunction::Sha256 => digest(&values, |bytes| hex::encode(Sha256::digest(bytes))),
        BuiltinFunction::Sha384 => digest(&values, |bytes| hex::encode(Sha384::digest(bytes))),
        BuiltinFunction::Sha512 => digest(&values, |bytes| hex::encode(Sha512::digest(bytes))),
        BuiltinFunction::Uuid => {
            let bytes = ctx.rand.next_uuid_v4_bytes();
            EvalValue::Value(Term::NamedNode(NamedNode::new_unchecked(format!("urn:uuid:{}", format_uuid(bytes)))))
        }
        BuiltinFunction::StrUuid => {
            let bytes = ctx.rand.next_uuid_v4_bytes();
            EvalValue::Value(Term::Literal(Literal::new_simple(format_uuid(bytes))))
        }
    }
}

fn bool_test(values: &[EvalValue], test: impl Fn(&Term) -> bool) -> EvalValue {
    match values.first() {
        Some(EvalValue::Value(term)) => EvalValue::bool(test(term)),
        Some(EvalValue::Error) => EvalValue::Error,
        _ => EvalValue::bool(false),
    }
}

fn term_lexical(term: &Term) -> Option<&str> {
    match term {
        Term::NamedNode(n) => Some(n.as_str()),
        Term::Literal(l) => Some(l.value()),
        Term::BlankNode(_) => None,
    }
}

fn one_literal(values: &[EvalValue], f: impl FnOnce(&Literal) -> Literal) -> EvalValue {
    match values.first() {
        Some(EvalValue::Value(Term::Literal(l))) => EvalValue::Value(Term::Literal(f(l))),
        Some(EvalValue::Error) => EvalValue::Error,
        Some(EvalValue::Value(_)) => EvalValue::Error,
        _ => EvalValue::Unbound,
    }
}

fn one_arg_term(values: &[EvalValue], f: impl FnOnce(&Term) -> Option<Term>) -> EvalValue {
    match values.first() {
        Some(EvalValue::Value(term)) => f(term).map_or(EvalValue::Error, EvalValue::Value),
        Some(EvalValue::Error) => EvalValue::Error,
        _ => EvalValue::Unbound,
    }
}

fn two_args(values: &[EvalValue], f: impl FnOnce(&Term, &Term) -> Option<Term>) -> EvalValue {
    match (values.first(), values.get(1)) {
        (Some(EvalValue::Value(a)), Some(EvalValue::Value(b))) => f(a, b).map_or(EvalValue::Error, EvalValue::Value),
        (Some(EvalValue::Error), _) | (_, Some(EvalValue::Error)) => EvalValue::Error,
        _ => EvalValue::Unbound,
    }
}

fn echo_literal(source: &Literal, value: String) -> Literal {
    if let Some(lang) = source.language() {
        Literal::new_lang_tagged_unchecked(value, lang)
    } else if source.is_plain() {
        Literal::new_simple(value)
    } else {
        Literal::new_typed(value, source.datatype())
    }
}

fn string_predicate(values: &[EvalValue], test: impl Fn(&str, &str) -> bool) -> EvalValue {
    match (values.first(), values.get(1)) {
        (Some(EvalValue::Value(a)), Some(EvalValue::Value(b))) => match (term_lexical(a), term_lexical(b)) {
            (Some(a), Some(b)) => EvalValue::bool(test(a, b)),
            _ => EvalValue::bool(false),
        },
        (Some(EvalValue::Error), _) | (_, Some(EvalValue::Error)) => EvalValue::Error,
        _ => EvalValue::bool(false),
    }
}

fn lang_matches(tag: &str, range: &str) -> bool {
    if range == "*" {
        return !tag.is_empty();
    }
    tag.eq_ignore_ascii_case(range) || tag.to_ascii_lowercase().starts_with(&format!("{}-", range.to_ascii_lowercase()))
}

fn substr(values: &[EvalValue]) -> EvalValue {
    let source = match values.first() {
        Some(EvalValue::Value(Term::Literal(l))) => l,
        Some(EvalValue::Error) => return EvalValue::Error,
        Some(EvalValue::Value(_)) => return EvalValue::Error,
        _ => return EvalValue::Unbound,
    };
    let Some(EvalValue::Value(start)) = values.get(1) else {
        return EvalValue::Unbound;
    };
    let Some(start) = numeric_of(start).map(NumericValue::to_f64) else {
        return EvalValue::Error;
    };
    let chars: Vec<char> = source.value().chars().collect();
    let start_index = (start.round() as i64 - 1).max(0) as usize;
    let end_index = match values.get(2) {
        Some(EvalValue::Value(len)) => numeric_of(len).map_or(chars.len(), |n| (start_index + n.to_f64().round().max(0.0) as usize).min(chars.len())),
        _ => chars.len(),
    };
    let slice: String = chars.get(start_index..end_index.max(start_index)).unwrap_or(&[]).iter().collect();
    EvalValue::Value(Term::Literal(echo_literal(source, slice)))
}

fn concat(values: &[EvalValue]) -> EvalValue {
    let mut out = String::new();
    for value in values {
        match value {
            EvalValue::Value(term) => out.push_str(term_lexical(term).unwrap_or_default()),
            EvalValue::Error => return EvalValue::Error,
            EvalValue::Unbound => {}
        }
    }
    EvalValue::Value(Term::Literal(Literal::new_simple(out)))
}

/// `STRBEFORE`/`STRAFTER` (`want_before` selects which side of the first
/// match is returned); an empty needle matches at the start (§4.3).
fn string_split(values: &[EvalValue], want_before: bool) -> EvalValue {
    let (Some(EvalValue::Value(Term::Literal(a))), Some(EvalValue::Value(b))) = (values.first(), values.get(1)) else {
        return match values.first() {
            Some(EvalValue::Error) => EvalValue::Error,
            _ => EvalValue::Unbound,
        };
    };
    let Some(needle) = term_lexical(b) else {
        return EvalValue::bool(false);
    };
    if needle.is_empty() {
        let result = if want_before { String::new() } else { a.value().to_owned() };
        return EvalValue::Value(Term::Literal(echo_literal(a, result)));
    }
    match a.value().find(needle) {
        Some(index) => {
            let result = if want_before { &a.value()[..index] } else { &a.value()[index + needle.len()..] };
            EvalValue::Value(Term::Literal(echo_literal(a, result.to_owned())))
        }
        None => EvalValue::Value(Term::Literal(Literal::new_simple(""))),
    }
}

fn encode_for_uri(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.as_bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => out.push(*byte as char),
            other => out.push_str(&format!("%{other:02X}")),
        }
    }
    out
}

fn regex_test(values: &[EvalValue]) -> EvalValue {
    if matches!(values.first(), Some(EvalValue::Error)) || matches!(values.get(1), Some(EvalValue::Error)) || matches!(values.get(2), Some(EvalValue::Error)) {
        return EvalValue::Error;
    }
    let (Some(EvalValue::Value(subject)), Some(EvalValue::Value(pattern))) = (values.first(), values.get(1)) else {
        return EvalValue::bool(false);
    };
    let flags = match values.get(2) {
        Some(EvalValue::Value(f)) => term_lexical(f).unwrap_or("").to_owned(),
        _ => String::new(),
    };
    let (Some(subject), Some(pattern)) = (term_lexical(subject), term_lexical(pattern)) else {
        return EvalValue::bool(false);
    };
    match compile_regex(pattern, &flags) {
        Ok(re) => EvalValue::bool(re.is_match(subject)),
        Err(_) => EvalValue::Error,
    }
}

fn compile_regex(pattern: &str, flags: &str) -> Result<regex::Regex, regex::Error> {
    let mut builder = regex::RegexBuilder::new(pattern);
    builder.case_insensitive(flags.contains('i'));
    builder.dot_matches_new_line(flags.contains('s'));
    builder.multi_line(flags.contains('m'));
    builder.build()
}

fn replace(values: &[EvalValue]) -> EvalValue {
    let (Some(EvalValue::Value(Term::Literal(subject))), Some(EvalValue::Value(pattern))) = (values.first(), values.get(1)) else {
        return EvalValue::Unbound;
    };
    let Some(EvalValue::Value(replacement)) = values.get(2) else {
        return EvalValue::Unbound;
    };
    let flags = match values.get(3) {
        Some(EvalValue::Value(f)) => term_lexical(f).unwrap_or("").to_owned(),
        _ => String::new(),
    };
    let (Some(pattern), Some(replacement)) = (term_lexical(pattern), term_lexical(replacement)) else {
        return EvalValue::Error;
    };
    match compile_regex(pattern, &flags) {
        Ok(re) => EvalValue::Value(Term::Literal(echo_literal(subject, re.replace_all(subject.value(), replacement).into_owned()))),
        Err(_) => EvalValue::Error,
    }
}

fn numeric_unary(values: &[EvalValue], f: impl FnOnce(NumericValue) -> NumericValue) -> EvalValue {
    match values.first() {
        Some(EvalValue::Value(term)) => numeric_of(term).map_or(EvalValue::Error, |n| numeric_to_eval(f(n))),
        Some(EvalValue::Error) => EvalValue::Error,
        _ => EvalValue::Unbound,
    }
}

fn round_like(n: NumericValue, decimal: impl Fn(Decimal) -> Decimal, float: impl Fn(f32) -> f32, double: impl Fn(f64) -> f64) -> NumericValue {
    match n {
        NumericValue::Integer(v) => NumericValue::Integer(v),
        NumericValue::Decimal(v) => NumericValue::Decimal(decimal(v)),
        NumericValue::Float(v) => NumericValue::Float(float(v)),
        NumericValue::Double(v) => NumericValue::Double(double(v)),
    }
}

fn datetime_of(term: &Term) -> Option<DateTime> {
    let Term::Literal(l) = term else { return None };
    if l.datatype().as_str() != xsd::DATE_TIME {
        return None;
    }
    DateTime::from_str(l.value()).ok()
}

fn datetime_field(values: &[EvalValue], f: impl FnOnce(&DateTime) -> i64) -> EvalValue {
    match values.first() {
        Some(EvalValue::Value(term)) => datetime_of(term).map_or(EvalValue::Error, |dt| EvalValue::Value(Term::Literal(Literal::new_typed(f(&dt).to_string(), NamedNode::new_unchecked(xsd::INTEGER))))),
        Some(EvalValue::Error) => EvalValue::Error,
        _ => EvalValue::Unbound,
    }
}

fn datetime_seconds(values: &[EvalValue]) -> EvalValue {
    match values.first() {
        Some(EvalValue::Value(term)) => datetime_of(term).map_or(EvalValue::Error, |dt| {
            let seconds = Decimal::from_str(&format!("{:.3}", dt.second())).unwrap_or(Decimal::ZERO);
            EvalValue::Value(Term::Literal(Literal::new_typed(seconds.to_string(), NamedNode::new_unchecked(xsd::DECIMAL))))
        }),
        Some(EvalValue::Error) => EvalValue::Error,
        _ => EvalValue::Unbound,
    }
}

/// `TIMEZONE()` errors when the operand carries no timezone; `TZ()` reports
/// an empty string instead (§4.3, following the two functions' differing
/// XPath definitions).
fn datetime_timezone(values: &[EvalValue], as_duration: bool) -> EvalValue {
    match values.first() {
        Some(EvalValue::Value(term)) => match datetime_of(term) {
            Some(dt) => match (dt.timezone_minutes(), as_duration) {
                (Some(minutes), true) => EvalValue::Value(Term::Literal(Literal::new_typed(
                    format_day_time_duration(minutes),
                    NamedNode::new_unchecked("http://www.w3.org/2001/XMLSchema#dayTimeDuration"),
                ))),
                (None, true) => EvalValue::Error,
                (Some(minutes), false) => EvalValue::Value(Term::Literal(Literal::new_simple(format_tz_offset(minutes)))),
                (None, false) => EvalValue::Value(Term::Literal(Literal::new_simple(""))),
            },
            None => EvalValue::Error,
        },
        Some(EvalValue::Error) => EvalValue::Error,
        _ => EvalValue::Unbound,
    }
}

fn format_day_time_duration(total_minutes: i32) -> String {
    let sign = if total_minutes < 0 { "-" } else { "" };
    let minutes = total_minutes.unsigned_abs();
    format!("{sign}PT{}H{}M", minutes / 60, minutes % 60)
}

fn format_tz_offset(total_minutes: i32) -> String {
    if total_minutes == 0 {
        return "Z".to_owned();
    }
    let sign = if total_minutes < 0 { '-' } else { '+' };
    let minutes = total_minutes.unsigned_abs();
    format!("{sign}{:02}:{:02}", minutes / 60, minutes % 60)
}

fn digest(values: &[EvalValue], hash: impl FnOnce(&[u8]) -> String) -> EvalValue {
    match values.first() {
        Some(EvalValue::Value(Term::Literal(l))) if l.language().is_none() => {
            EvalValue::Value(Term::Literal(Literal::new_typed(hash(l.value().as_bytes()), NamedNode::new_unchecked(xsd::STRING))))
        }
        Some(EvalValue::Error) => EvalValue::Error,
        Some(EvalValue::Value(_)) => EvalValue::Error,
        _ => EvalValue::Unbound,
    }
}

fn format_uuid(bytes: [u8; 16]) -> String {
    let hex = hex::encode(bytes);
    format!("{}-{}-{}-{}-{}", &hex[0..8], &hex[8..12], &hex[12..16], &hex[16..20], &hex[20..32])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rand_source::RandSource;

    struct NoExists;
    impl ExistsRunner for NoExists {
        fn has_match(&mut self, _inner: &rq_algebra::GraphPattern, _outer_row: &Row) -> Result<bool, EvaluationError> {
            Ok(false)
        }
    }

    fn ctx<'a>(row: &'a Row, rand: &'a mut RandSource, exists: &'a mut dyn ExistsRunner, mint: &'a mut dyn FnMut() -> BlankNode, functions: &'a FunctionRegistry) -> EvalContext<'a> {
        EvalContext {
            row,
            rand,
            now: DateTime::from_str("2024-01-01T00:00:00Z").unwrap(),
            exists,
            fresh_blank_node: mint,
            functions,
        }
    }

    #[test]
    fn and_short_circuits_on_false_even_with_a_type_error_on_the_right() {
        let row = Row::new(0, 0);
        let mut rand = RandSource::new(Some(1));
        let mut exists = NoExists;
        let mut mint = || BlankNode::new_unchecked("b");
        let registry = FunctionRegistry::new();
        let mut c = ctx(&row, &mut rand, &mut exists, &mut mint, &registry);
        let expr = Expression::And(
            Box::new(Expression::Literal(Literal::from(false))),
            Box::new(Expression::Add(
                Box::new(Expression::Literal(Literal::new_simple("abc"))),
                Box::new(Expression::Literal(Literal::new_simple("def"))),
            )),
        );
        assert!(matches!(evaluate(&expr, &mut c), EvalValue::Value(Term::Literal(l)) if l.value() == "false"));
    }

    #[test]
    fn bound_never_reports_unbound() {
        let row = Row::new(1, 0);
        let mut rand = RandSource::new(Some(1));
        let mut exists = NoExists;
        let mut mint = || BlankNode::new_unchecked("b");
        let registry = FunctionRegistry::new();
        let mut c = ctx(&row, &mut rand, &mut exists, &mut mint, &registry);
        let expr = Expression::Bound(rq_algebra::VariableOffset(0));
        assert!(matches!(evaluate(&expr, &mut c), EvalValue::Value(Term::Literal(l)) if l.value() == "false"));
    }

    #[test]
    fn relational_comparison_on_unbound_is_false_not_unbound() {
        let row = Row::new(1, 0);
        let mut rand = RandSource::new(Some(1));
        let mut exists = NoExists;
        let mut mint = || BlankNode::new_unchecked("b");
        let registry = FunctionRegistry::new();
        let mut c = ctx(&row, &mut rand, &mut exists, &mut mint, &registry);
        let expr = Expression::Greater(
            Box::new(Expression::Variable(rq_algebra::VariableOffset(0))),
            Box::new(Expression::Literal(Literal::new_simple("1"))),
        );
        assert!(matches!(evaluate(&expr, &mut c), EvalValue::Value(Term::Literal(l)) if l.value() == "false"));
    }

    #[test]
    fn coalesce_skips_unbound_and_returns_first_bound_value() {
        let row = Row::new(1, 0);
        let mut rand = RandSource::new(Some(1));
        let mut exists = NoExists;
        let mut mint = || BlankNode::new_unchecked("b");
        let registry = FunctionRegistry::new();
        let mut c = ctx(&row, &mut rand, &mut exists, &mut mint, &registry);
        let expr = Expression::Coalesce(vec![
            Expression::Variable(rq_algebra::VariableOffset(0)),
            Expression::Literal(Literal::new_simple("fallback")),
        ]);
        assert!(matches!(evaluate(&expr, &mut c), EvalValue::Value(Term::Literal(l)) if l.value() == "fallback"));
    }
}
