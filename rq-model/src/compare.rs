//! The three term-comparison modes (§4.1): strict term equality, XQuery value
//! equality (promotes numerics/dates/plain strings before comparing), and the
//! `RDFterm-equal` built-in (same as value equality, but a type error folds
//! to `false` instead of propagating). Also carries effective-boolean-value
//! dispatch and the `ORDER BY` value-ordering used by §4.3/§4.4.
use crate::literal::Literal;
use crate::numeric::{numeric_partial_cmp, numeric_value_eq, Decimal, NumericValue};
use crate::temporal::{Date, DateTime, Time};
use crate::term::Term;
use crate::vocab::xsd;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum CompareError {
    /// The operands' types can't be compared under value semantics (e.g. a
    /// numeric and a plain string, or two unrelated non-fast-path datatypes).
    NotComparable,
    /// The operand isn't a type effective-boolean-value is defined over.
    NotBooleanCoercible,
}

impl fmt::Display for CompareError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotComparable => write!(f, "operands cannot be compared by value"),
            Self::NotBooleanCoercible => write!(f, "term has no effective boolean value"),
        }
    }
}

impl std::error::Error for CompareError {}

/// Strict term equality (`sameTerm`): identical kind, identical lexical form,
/// identical datatype/language. `Term`'s derived `Eq` already implements
/// this exactly, so this is a named entry point rather than new logic.
#[inline]
pub fn term_identical(a: &Term, b: &Term) -> bool {
    a == b
}

/// The classification a literal's datatype falls into for value comparison.
enum ValueCategory<'a> {
    Numeric(NumericValue),
    Boolean(bool),
    DateTime(DateTime),
    Date(Date),
    Time(Time),
    PlainString(&'a str),
    LangString(&'a str, &'a str),
    Opaque,
}

fn classify(literal: &Literal) -> ValueCategory<'_> {
    if let Some(lang) = literal.language() {
        return ValueCategory::LangString(literal.value(), lang);
    }
    let datatype = literal.datatype();
    match datatype.as_str() {
        xsd::STRING => ValueCategory::PlainString(literal.value()),
        xsd::BOOLEAN => match literal.value() {
            "true" | "1" => ValueCategory::Boolean(true),
            "false" | "0" => ValueCategory::Boolean(false),
            _ => ValueCategory::Opaque,
        },
        xsd::INTEGER => literal
            .value()
            .parse::<i64>()
            .map(|v| ValueCategory::Numeric(NumericValue::Integer(v)))
            .unwrap_or(ValueCategory::Opaque),
        xsd::DECIMAL => Decimal::from_str(literal.value())
            .map(|v| ValueCategory::Numeric(NumericValue::Decimal(v)))
            .unwrap_or(ValueCategory::Opaque),
        xsd::FLOAT => literal
            .value()
            .parse::<f32>()
            .map(|v| ValueCategory::Numeric(NumericValue::Float(v)))
            .unwrap_or(ValueCategory::Opaque),
        xsd::DOUBLE => literal
            .value()
            .parse::<f64>()
            .map(|v| ValueCategory::Numeric(NumericValue::Double(v)))
            .unwrap_or(ValueCategory::Opaque),
        xsd::DATE_TIME => DateTime::from_str(literal.value())
            .map(ValueCategory::DateTime)
            .unwrap_or(ValueCategory::Opaque),
        xsd::DATE => Date::from_str(literal.value())
            .map(ValueCategory::Date)
            .unwrap_or(ValueCategory::Opaque),
        xsd::TIME => Time::from_str(literal.value())
            .map(ValueCategory::Time)
            .unwrap_or(ValueCategory::Opaque),
        _ => ValueCategory::Opaque,
    }
}

/// XQuery-style value comparison: the partial order ORDER BY and the `<`
/// family of relational operators sort by (§4.1). Errors when the operand
/// pair has no defined value order, e.g. a numeric against a lang string.
pub fn value_compare(a: &Term, b: &Term) -> Result<Ordering, CompareError> {
    match (a, b) {
        (Term::Literal(a), Term::Literal(b)) => match (classify(a), classify(b)) {
            (ValueCategory::Numeric(a), ValueCategory::Numeric(b)) => {
                numeric_partial_cmp(a, b).ok_or(CompareError::NotComparable)
            }
            (ValueCategory::Boolean(a), ValueCategory::Boolean(b)) => Ok(a.cmp(&b)),
            (ValueCategory::DateTime(a), ValueCategory::DateTime(b)) => {
                Ok(a.instant_millis().cmp(&b.instant_millis()))
            }
            (ValueCategory::Date(a), ValueCategory::Date(b)) => Ok((a.year, a.month, a.day).cmp(&(b.year, b.month, b.day))),
            (ValueCategory::Time(a), ValueCategory::Time(b)) => {
                Ok((a.hour, a.minute, a.millisecond_of_minute).cmp(&(b.hour, b.minute, b.millisecond_of_minute)))
            }
            (ValueCategory::PlainString(a), ValueCategory::PlainString(b)) => Ok(a.cmp(b)),
            (ValueCategory::LangString(av, al), ValueCategory::LangString(bv, bl)) if al == bl => Ok(av.cmp(bv)),
            _ => Err(CompareError::NotComparable),
        },
        // Non-literal terms have no value order; callers needing a total
        // order for e.g. stable output fall back to `term_identical`/IRI text.
        _ => Err(CompareError::NotComparable),
    }
}

/// XQuery value equality ("="): like [`value_compare`] but literals that
/// aren't both in a comparable category fall back to structural `sameTerm`
/// equality for non-literal terms, and propagate [`CompareError`] rather
/// than guessing when both sides are literals but incomparable.
pub fn value_eq(a: &Term, b: &Term) -> Result<bool, CompareError> {
    match (a, b) {
        (Term::Literal(a), Term::Literal(b)) => match (classify(a), classify(b)) {
            (ValueCategory::Numeric(a), ValueCategory::Numeric(b)) => Ok(numeric_value_eq(a, b)),
            _ => value_compare(&Term::Literal(a.clone()), &Term::Literal(b.clone())).map(|o| o == Ordering::Equal),
        },
        _ => Ok(term_identical(a, b)),
    }
}

/// The `RDFterm-equal` built-in: [`value_eq`], except a type error (operands
/// not in a comparable category) is reported as `false` rather than raised,
/// per §4.1's note that this variant never errors.
pub fn rdf_term_equal(a: &Term, b: &Term) -> bool {
    if term_identical(a, b) {
        return true;
    }
    value_eq(a, b).unwrap_or(false)
}

/// Effective boolean value (§4.3): only plain/xsd:string, xsd:boolean, and
/// the four numeric fast-path types coerce; anything else is a type error.
pub fn effective_boolean_value(term: &Term) -> Result<bool, CompareError> {
    let Term::Literal(literal) = term else {
        return Err(CompareError::NotBooleanCoercible);
    };
    match classify(literal) {
        ValueCategory::Boolean(v) => Ok(v),
        ValueCategory::Numeric(v) => Ok(v.effective_boolean_value()),
        ValueCategory::PlainString(v) => Ok(!v.is_empty()),
        _ => Err(CompareError::NotBooleanCoercible),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::named_node::NamedNode;

    fn lit(value: &str, datatype: &str) -> Term {
        Term::Literal(Literal::new_typed(value, NamedNode::new_unchecked(datatype)))
    }

    #[test]
    fn integer_and_double_compare_by_value() {
        assert_eq!(value_compare(&lit("2", xsd::INTEGER), &lit("2.0", xsd::DOUBLE)), Ok(Ordering::Equal));
    }

    #[test]
    fn rdf_term_equal_never_errors() {
        assert!(!rdf_term_equal(&lit("1", xsd::INTEGER), &Term::Literal(Literal::new_lang_tagged_unchecked("x", "en"))));
    }

    #[test]
    fn ebv_rejects_lang_string() {
        let term = Term::Literal(Literal::new_lang_tagged_unchecked("hi", "en"));
        assert_eq!(effective_boolean_value(&term), Err(CompareError::NotBooleanCoercible));
    }

    #[test]
    fn ebv_empty_string_is_false() {
        assert_eq!(effective_boolean_value(&Term::Literal(Literal::new_simple(""))), Ok(false));
    }
}
