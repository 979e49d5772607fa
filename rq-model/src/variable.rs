use std::fmt;

/// A SPARQL variable name (the `?x`/`$x` surface form strips the sigil).
///
/// §3: a variable's name is NFC-normalized Unicode; two variables with the
/// same name in the same variables table are the same variable.
#[derive(Eq, PartialEq, Ord, PartialOrd, Debug, Clone, Hash)]
pub struct Variable(String);

impl Variable {
    pub fn new(name: impl Into<String>) -> Result<Self, VariableNameParseError> {
        let name: String = name.into();
        if name.is_empty() {
            return Err(VariableNameParseError);
        }
        Ok(Self(name.chars().collect::<String>()))
    }

    #[inline]
    pub fn new_unchecked(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "?{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct VariableNameParseError;

impl fmt::Display for VariableNameParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "variable names must be non-empty")
    }
}

impl std::error::Error for VariableNameParseError {}

/// The kind of a variable, distinguishing ordinary projected variables from
/// the synthetic ones the planner introduces (§3).
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum VariableKind {
    /// An ordinary named variable mentioned in the query text.
    Normal,
    /// A planner-introduced variable with no surface-syntax name (e.g. a
    /// fresh column for an un-named `Extend`/aggregate target).
    Anonymous,
    /// Bound existentially — used by EXISTS/NOT EXISTS's inner pattern.
    Existential,
    /// Universally quantified — reserved for N3-style extensions (§2 of
    /// SPEC_FULL's supplemented-features section); unused by plain SPARQL.
    Universal,
}
