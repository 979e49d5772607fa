//! XSD numeric fast-path types: `xsd:integer`, `xsd:decimal`, `xsd:float`,
//! `xsd:double`. Grounded on the teacher's `oxsdatatypes` fixed-point decimal
//! representation, trimmed to the operations the evaluator (§4.3) needs.
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// `xsd:integer`, backed by `i64`. The teacher uses `i128`-backed arbitrary
/// precision; we narrow to `i64` since nothing in §4.3/§8 requires more than
/// machine-integer range and it keeps arithmetic overflow checks simple.
pub type Integer = i64;

const DECIMAL_SCALE_DIGITS: u32 = 18;
const DECIMAL_SCALE: i128 = 1_000_000_000_000_000_000;

/// `xsd:decimal` stored as a fixed-point `i128` scaled by 10^18, exactly the
/// encoding `oxsdatatypes::Decimal` uses, so arithmetic never loses the
/// exactness XPath's `op:numeric-*` functions require for decimals.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Decimal {
    scaled: i128,
}

impl Decimal {
    pub const ZERO: Self = Self { scaled: 0 };

    pub fn from_i64(v: i64) -> Self {
        Self {
            scaled: i128::from(v) * DECIMAL_SCALE,
        }
    }

    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.scaled.checked_add(other.scaled).map(|scaled| Self { scaled })
    }

    pub fn checked_sub(self, other: Self) -> Option<Self> {
        self.scaled.checked_sub(other.scaled).map(|scaled| Self { scaled })
    }

    pub fn checked_mul(self, other: Self) -> Option<Self> {
        let product = self.scaled.checked_mul(other.scaled)?;
        Some(Self {
            scaled: product / DECIMAL_SCALE,
        })
    }

    pub fn checked_div(self, other: Self) -> Option<Self> {
        if other.scaled == 0 {
            return None;
        }
        let numerator = self.scaled.checked_mul(DECIMAL_SCALE)?;
        Some(Self {
            scaled: numerator / other.scaled,
        })
    }

    pub fn checked_neg(self) -> Option<Self> {
        self.scaled.checked_neg().map(|scaled| Self { scaled })
    }

    pub fn is_zero(self) -> bool {
        self.scaled == 0
    }

    pub fn to_f64(self) -> f64 {
        self.scaled as f64 / DECIMAL_SCALE as f64
    }

    pub fn floor(self) -> Self {
        let rem = self.scaled.rem_euclid(DECIMAL_SCALE);
        Self {
            scaled: self.scaled - rem,
        }
    }

    pub fn ceil(self) -> Self {
        let floored = self.floor();
        if floored == self {
            floored
        } else {
            Self {
                scaled: floored.scaled + DECIMAL_SCALE,
            }
        }
    }

    pub fn round(self) -> Self {
        let half = DECIMAL_SCALE / 2;
        let shifted = if self.scaled >= 0 {
            self.scaled + half
        } else {
            self.scaled - half + 1
        };
        Self {
            scaled: (shifted / DECIMAL_SCALE) * DECIMAL_SCALE,
        }
    }

    pub fn abs(self) -> Self {
        Self {
            scaled: self.scaled.abs(),
        }
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let negative = self.scaled < 0;
        let magnitude = self.scaled.unsigned_abs();
        let integer_part = magnitude / DECIMAL_SCALE as u128;
        let frac_part = magnitude % DECIMAL_SCALE as u128;
        if negative {
            write!(f, "-")?;
        }
        if frac_part == 0 {
            write!(f, "{integer_part}")
        } else {
            let mut frac = format!("{frac_part:018}");
            while frac.ends_with('0') {
                frac.pop();
            }
            write!(f, "{integer_part}.{frac}")
        }
    }
}

impl FromStr for Decimal {
    type Err = DecimalParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (sign, rest) = match s.strip_prefix('-') {
            Some(rest) => (-1i128, rest),
            None => (1i128, s.strip_prefix('+').unwrap_or(s)),
        };
        if rest.is_empty() || !rest.chars().all(|c| c.is_ascii_digit() || c == '.') {
            return Err(DecimalParseError);
        }
        let mut parts = rest.splitn(2, '.');
        let int_part = parts.next().unwrap_or("0");
        let frac_part = parts.next().unwrap_or("");
        if frac_part.len() > DECIMAL_SCALE_DIGITS as usize || parts.next().is_some() {
            return Err(DecimalParseError);
        }
        let int_value: i128 = if int_part.is_empty() {
            0
        } else {
            int_part.parse().map_err(|_| DecimalParseError)?
        };
        let mut frac_padded = frac_part.to_owned();
        while frac_padded.len() < DECIMAL_SCALE_DIGITS as usize {
            frac_padded.push('0');
        }
        let frac_value: i128 = if frac_padded.is_empty() {
            0
        } else {
            frac_padded.parse().map_err(|_| DecimalParseError)?
        };
        Ok(Self {
            scaled: sign * (int_value * DECIMAL_SCALE + frac_value),
        })
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct DecimalParseError;

impl fmt::Display for DecimalParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid xsd:decimal lexical form")
    }
}

impl std::error::Error for DecimalParseError {}

/// A numeric value promoted to one of the four fast-path widths, following
/// §4.1's "integer/decimal/float/double promotion in that order".
#[derive(Debug, Clone, Copy)]
pub enum NumericValue {
    Integer(Integer),
    Decimal(Decimal),
    Float(f32),
    Double(f64),
}

impl NumericValue {
    pub fn to_f64(self) -> f64 {
        match self {
            Self::Integer(v) => v as f64,
            Self::Decimal(v) => v.to_f64(),
            Self::Float(v) => v as f64,
            Self::Double(v) => v,
        }
    }

    pub fn rank(self) -> u8 {
        match self {
            Self::Integer(_) => 0,
            Self::Decimal(_) => 1,
            Self::Float(_) => 2,
            Self::Double(_) => 3,
        }
    }

    /// Promotes two operands to their common, higher-ranked representation.
    pub fn promote(a: Self, b: Self) -> (Self, Self) {
        if a.rank() == b.rank() {
            return (a, b);
        }
        let target = a.rank().max(b.rank());
        (Self::cast_to_rank(a, target), Self::cast_to_rank(b, target))
    }

    fn cast_to_rank(self, rank: u8) -> Self {
        if self.rank() == rank {
            return self;
        }
        match rank {
            1 => Self::Decimal(match self {
                Self::Integer(v) => Decimal::from_i64(v),
                other => other.as_decimal_best_effort(),
            }),
            2 => Self::Float(self.to_f64() as f32),
            3 => Self::Double(self.to_f64()),
            _ => self,
        }
    }

    fn as_decimal_best_effort(self) -> Decimal {
        match self {
            Self::Decimal(d) => d,
            other => Decimal::from_str(&other.to_f64().to_string()).unwrap_or(Decimal::ZERO),
        }
    }

    /// EBV for numerics (§4.3): true iff nonzero and not NaN.
    pub fn effective_boolean_value(self) -> bool {
        match self {
            Self::Integer(v) => v != 0,
            Self::Decimal(v) => !v.is_zero(),
            Self::Float(v) => v != 0.0 && !v.is_nan(),
            Self::Double(v) => v != 0.0 && !v.is_nan(),
        }
    }
}

/// Scaled-epsilon comparison for doubles, matching §4.1: uses `frexp` of the
/// larger magnitude to compute `delta = ldexp(EPSILON, exponent)`, so the
/// comparison stays scale-relative instead of absolute.
pub fn double_approx_eq(a: f64, b: f64) -> bool {
    if a == b {
        return true;
    }
    if a.is_nan() || b.is_nan() {
        return false;
    }
    let larger = a.abs().max(b.abs());
    if larger == 0.0 {
        return true;
    }
    let (_, exponent) = frexp(larger);
    let delta = ldexp(f64::EPSILON * 8.0, exponent);
    (a - b).abs() <= delta
}

fn frexp(x: f64) -> (f64, i32) {
    if x == 0.0 || x.is_nan() || x.is_infinite() {
        return (x, 0);
    }
    let bits = x.to_bits();
    let exponent_bits = ((bits >> 52) & 0x7ff) as i32;
    if exponent_bits == 0 {
        // Subnormal: normalize by scaling up first.
        let (m, e) = frexp(x * 2f64.powi(54));
        return (m, e - 54);
    }
    let exponent = exponent_bits - 1022;
    let mantissa = f64::from_bits((bits & !(0x7ffu64 << 52)) | (1022u64 << 52));
    (mantissa, exponent)
}

fn ldexp(x: f64, exp: i32) -> f64 {
    x * 2f64.powi(exp)
}

pub fn numeric_partial_cmp(a: NumericValue, b: NumericValue) -> Option<Ordering> {
    let (a, b) = NumericValue::promote(a, b);
    match (a, b) {
        (NumericValue::Integer(a), NumericValue::Integer(b)) => Some(a.cmp(&b)),
        (NumericValue::Decimal(a), NumericValue::Decimal(b)) => Some(a.cmp(&b)),
        (NumericValue::Float(a), NumericValue::Float(b)) => a.partial_cmp(&b),
        (NumericValue::Double(a), NumericValue::Double(b)) => a.partial_cmp(&b),
        _ => None,
    }
}

pub fn numeric_value_eq(a: NumericValue, b: NumericValue) -> bool {
    let (a, b) = NumericValue::promote(a, b);
    match (a, b) {
        (NumericValue::Integer(a), NumericValue::Integer(b)) => a == b,
        (NumericValue::Decimal(a), NumericValue::Decimal(b)) => a == b,
        (NumericValue::Float(a), NumericValue::Float(b)) => {
            (a as f64 - b as f64).abs() < f32::EPSILON as f64 || double_approx_eq(a as f64, b as f64)
        }
        (NumericValue::Double(a), NumericValue::Double(b)) => double_approx_eq(a, b),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decimal_round_trips_lexical_form() {
        let d: Decimal = "3.140000".parse().unwrap();
        assert_eq!(d.to_string(), "3.14");
    }

    #[test]
    fn decimal_arithmetic_is_exact() {
        let a: Decimal = "0.1".parse().unwrap();
        let b: Decimal = "0.2".parse().unwrap();
        assert_eq!(a.checked_add(b).unwrap().to_string(), "0.3");
    }

    #[test]
    fn double_epsilon_boundary() {
        assert!(double_approx_eq(1.0, 1.0 + f64::EPSILON));
        assert!(!double_approx_eq(1.0, 1.1));
    }

    #[test]
    fn promotion_picks_higher_rank() {
        let (a, b) = NumericValue::promote(NumericValue::Integer(2), NumericValue::Double(2.0));
        assert!(numeric_value_eq(a, b));
    }
}
