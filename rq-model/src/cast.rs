//! `CAST`-style XSD conversions (§4.3's `xsd:integer(...)`/`xsd:double(...)`/
//! etc. constructor functions). Each function follows XPath F&O's casting
//! table for the pair it names; anything outside that table is a
//! [`CastError`], which the evaluator turns into an evaluation error rather
//! than a silent default.
use crate::literal::Literal;
use crate::numeric::{Decimal, NumericValue};
use crate::term::Term;
use crate::vocab::xsd;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct CastError;

impl fmt::Display for CastError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "value cannot be cast to the requested datatype")
    }
}

impl std::error::Error for CastError {}

/// The source a cast function can be applied to: a numeric already decoded
/// by the caller, or the raw lexical form of a string/boolean literal.
pub enum CastSource<'a> {
    Numeric(NumericValue),
    Boolean(bool),
    Lexical(&'a str),
}

pub fn cast_source(term: &Term) -> Result<CastSource<'_>, CastError> {
    let Term::Literal(literal) = term else {
        return Err(CastError);
    };
    if literal.language().is_some() {
        return Err(CastError);
    }
    match literal.datatype().as_str() {
        xsd::INTEGER => Ok(CastSource::Numeric(NumericValue::Integer(
            literal.value().parse().map_err(|_| CastError)?,
        ))),
        xsd::DECIMAL => Ok(CastSource::Numeric(NumericValue::Decimal(
            Decimal::from_str(literal.value()).map_err(|_| CastError)?,
        ))),
        xsd::FLOAT => Ok(CastSource::Numeric(NumericValue::Float(
            literal.value().parse().map_err(|_| CastError)?,
        ))),
        xsd::DOUBLE => Ok(CastSource::Numeric(NumericValue::Double(
            literal.value().parse().map_err(|_| CastError)?,
        ))),
        xsd::BOOLEAN => Ok(CastSource::Boolean(matches!(literal.value(), "true" | "1"))),
        _ => Ok(CastSource::Lexical(literal.value())),
    }
}

pub fn cast_to_integer(term: &Term) -> Result<Literal, CastError> {
    let value = match cast_source(term)? {
        CastSource::Numeric(n) => n.to_f64().trunc() as i64,
        CastSource::Boolean(b) => i64::from(b),
        CastSource::Lexical(s) => s.trim().parse::<f64>().map_err(|_| CastError)?.trunc() as i64,
    };
    Ok(Literal::new_typed(value.to_string(), crate::named_node::NamedNode::new_unchecked(xsd::INTEGER)))
}

pub fn cast_to_decimal(term: &Term) -> Result<Literal, CastError> {
    let decimal = match cast_source(term)? {
        CastSource::Numeric(NumericValue::Decimal(d)) => d,
        CastSource::Numeric(n) => Decimal::from_str(&format!("{:.18}", n.to_f64())).map_err(|_| CastError)?,
        CastSource::Boolean(b) => Decimal::from_i64(i64::from(b)),
        CastSource::Lexical(s) => Decimal::from_str(s.trim()).map_err(|_| CastError)?,
    };
    Ok(Literal::new_typed(decimal.to_string(), crate::named_node::NamedNode::new_unchecked(xsd::DECIMAL)))
}

pub fn cast_to_double(term: &Term) -> Result<Literal, CastError> {
    let value = match cast_source(term)? {
        CastSource::Numeric(n) => n.to_f64(),
        CastSource::Boolean(b) => f64::from(b),
        CastSource::Lexical(s) => s.trim().parse().map_err(|_| CastError)?,
    };
    Ok(Literal::new_typed(format_double(value), crate::named_node::NamedNode::new_unchecked(xsd::DOUBLE)))
}

pub fn cast_to_float(term: &Term) -> Result<Literal, CastError> {
    let value = match cast_source(term)? {
        CastSource::Numeric(n) => n.to_f64() as f32,
        CastSource::Boolean(b) => if b { 1.0 } else { 0.0 },
        CastSource::Lexical(s) => s.trim().parse().map_err(|_| CastError)?,
    };
    Ok(Literal::new_typed(format_double(f64::from(value)), crate::named_node::NamedNode::new_unchecked(xsd::FLOAT)))
}

pub fn cast_to_boolean(term: &Term) -> Result<Literal, CastError> {
    let value = match cast_source(term)? {
        CastSource::Numeric(n) => n.effective_boolean_value(),
        CastSource::Boolean(b) => b,
        CastSource::Lexical(s) => match s.trim() {
            "true" | "1" => true,
            "false" | "0" => false,
            _ => return Err(CastError),
        },
    };
    Ok(Literal::from(value))
}

pub fn cast_to_string(term: &Term) -> Result<Literal, CastError> {
    let Term::Literal(literal) = term else {
        return Err(CastError);
    };
    Ok(Literal::new_simple(literal.value()))
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::named_node::NamedNode;

    fn lit(value: &str, datatype: &str) -> Term {
        Term::Literal(Literal::new_typed(value, NamedNode::new_unchecked(datatype)))
    }

    #[test]
    fn integer_truncates_decimal() {
        let cast = cast_to_integer(&lit("3.9", xsd::DECIMAL)).unwrap();
        assert_eq!(cast.value(), "3");
    }

    #[test]
    fn string_to_boolean_accepts_literal_forms() {
        assert!(cast_to_boolean(&Term::Literal(Literal::new_simple("true"))).unwrap().value() == "true");
        assert!(cast_to_boolean(&Term::Literal(Literal::new_simple("bogus"))).is_err());
    }

    #[test]
    fn double_formats_special_values() {
        let cast = cast_to_double(&lit("1", xsd::INTEGER)).unwrap();
        assert_eq!(cast.value(), "1");
    }
}
