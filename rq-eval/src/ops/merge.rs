//! Row compatibility and merging, shared by `Join` and `LeftJoin` (§4.5):
//! two rows are join-compatible when every variable bound in both agrees,
//! and merging keeps whichever side (or both, since they then necessarily
//! agree) has a value.
use rq_algebra::VariableOffset;

use crate::row::Row;

pub fn compatible(left: &Row, right: &Row) -> bool {
    let width = left.len().max(right.len());
    (0..width).all(|i| match (left.get(VariableOffset(i)), right.get(VariableOffset(i))) {
        (Some(a), Some(b)) => a == b,
        _ => true,
    })
}

/// Merges two join-compatible rows. Callers must check [`compatible`] first;
/// this does not re-check and will silently prefer `left`'s value on a
/// conflict it would have been told about.
pub fn merge(left: &Row, right: &Row, offset: u64) -> Row {
    let width = left.len().max(right.len());
    let mut out = Row::new(width, offset);
    for i in 0..width {
        let v = i;
        let value = left.get(VariableOffset(v)).or_else(|| right.get(VariableOffset(v)));
        if let Some(value) = value {
            out.set(VariableOffset(v), Some(value.clone()));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rq_model::{Literal, Term};

    #[test]
    fn disjoint_rows_are_compatible_and_merge() {
        let left = Row::from_values(vec![Some(Term::Literal(Literal::new_simple("a"))), None], 0);
        let right = Row::from_values(vec![None, Some(Term::Literal(Literal::new_simple("b")))], 0);
        assert!(compatible(&left, &right));
        let merged = merge(&left, &right, 5);
        assert_eq!(merged.get(VariableOffset(0)), Some(&Term::Literal(Literal::new_simple("a"))));
        assert_eq!(merged.get(VariableOffset(1)), Some(&Term::Literal(Literal::new_simple("b"))));
        assert_eq!(merged.offset, 5);
    }

    #[test]
    fn conflicting_rows_are_incompatible() {
        let left = Row::from_values(vec![Some(Term::Literal(Literal::new_simple("a")))], 0);
        let right = Row::from_values(vec![Some(Term::Literal(Literal::new_simple("b")))], 0);
        assert!(!compatible(&left, &right));
    }
}
