//! A single row of variable bindings (§3), indexed by variable offset.
use rq_algebra::VariableOffset;
use rq_model::Term;

/// A fixed-size array of term-or-unbound values, plus the original-order
/// field OrderBy's stable tie-break reads (§4.5 "Row identity").
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    values: Vec<Option<Term>>,
    pub offset: u64,
}

impl Row {
    pub fn new(width: usize, offset: u64) -> Self {
        Self { values: vec![None; width], offset }
    }

    pub fn from_values(values: Vec<Option<Term>>, offset: u64) -> Self {
        Self { values, offset }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, offset: VariableOffset) -> Option<&Term> {
        self.values.get(offset.0)?.as_ref()
    }

    pub fn set(&mut self, offset: VariableOffset, value: Option<Term>) {
        if offset.0 >= self.values.len() {
            self.values.resize(offset.0 + 1, None);
        }
        self.values[offset.0] = value;
    }

    pub fn unset(&mut self, offset: VariableOffset) {
        if let Some(slot) = self.values.get_mut(offset.0) {
            *slot = None;
        }
    }

    pub fn values(&self) -> &[Option<Term>] {
        &self.values
    }

    pub fn into_values(self) -> Vec<Option<Term>> {
        self.values
    }

    /// The canonicalized tuple `Distinct`/`Group` hash on: `None` values
    /// compare equal to each other and `Eq`/`Hash` fall straight out of the
    /// derived `Term` equality for bound ones.
    pub fn canonical_key(&self) -> &[Option<Term>] {
        &self.values
    }
}

/// Widens `row` with unbound columns on either side so two rowsources with
/// different schemas can be unioned (§4.5 `Union`'s "schemas unified").
pub fn extend_to_width(mut row: Row, width: usize) -> Row {
    if row.values.len() < width {
        row.values.resize(width, None);
    }
    row
}
