//! The variables table and the lexical scope tree (§4.2). Scopes are stored
//! in a flat arena rather than as `Rc`/`Weak` nodes — the tree never has
//! cycles (§9 "cyclic ownership avoidance"), so an index-based parent
//! pointer gives the same non-owning-parent/owning-children shape without
//! reference counting.
use rq_model::{Variable, VariableKind};
use std::collections::BTreeMap;
use thiserror::Error;

/// A variable's stable position in its table, assigned on first mention and
/// unchanged for the query's lifetime (§3).
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct VariableOffset(pub usize);

/// An ordered mapping from name to variable, with lookup by name and by
/// offset (§4.2). `add` is idempotent: re-adding an existing name returns
/// its existing offset rather than creating a duplicate.
#[derive(Debug, Clone, Default)]
pub struct VariablesTable {
    by_offset: Vec<(Variable, VariableKind)>,
    by_name: BTreeMap<String, VariableOffset>,
}

impl VariablesTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, name: impl Into<String>, kind: VariableKind) -> VariableOffset {
        let name = name.into();
        if let Some(&offset) = self.by_name.get(&name) {
            return offset;
        }
        let offset = VariableOffset(self.by_offset.len());
        self.by_offset.push((Variable::new_unchecked(name.clone()), kind));
        self.by_name.insert(name, offset);
        offset
    }

    pub fn get_by_name(&self, name: &str) -> Option<VariableOffset> {
        self.by_name.get(name).copied()
    }

    pub fn get_by_offset(&self, offset: VariableOffset) -> Option<(&Variable, VariableKind)> {
        self.by_offset.get(offset.0).map(|(v, k)| (v, *k))
    }

    pub fn count(&self) -> usize {
        self.by_offset.len()
    }

    /// A sort-key vector for lexical ordering by name, used by formatters
    /// that must emit variables in a deterministic header order.
    pub fn order(&self) -> Vec<VariableOffset> {
        let mut offsets: Vec<VariableOffset> = (0..self.by_offset.len()).map(VariableOffset).collect();
        offsets.sort_by(|&a, &b| self.by_offset[a.0].0.as_str().cmp(self.by_offset[b.0].0.as_str()));
        offsets
    }

    pub fn iter(&self) -> impl Iterator<Item = (VariableOffset, &Variable, VariableKind)> {
        self.by_offset
            .iter()
            .enumerate()
            .map(|(i, (v, k))| (VariableOffset(i), v, *k))
    }
}

/// What introduced a [`Scope`] — used only for diagnostics/`--explain`
/// rendering, never for visibility logic (that's purely structural).
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ScopeKind {
    Root,
    Exists,
    NotExists,
    Minus,
    Union,
    Subquery,
    Group,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct ScopeId(usize);

/// A lexical binding region (§4.2): a local set of variables defined here, a
/// visible set (`local ∪ parent.visible`, local wins on conflict), and the
/// triple patterns owned at this level.
#[derive(Debug, Clone)]
pub struct Scope {
    kind: ScopeKind,
    parent: Option<ScopeId>,
    local: Vec<VariableOffset>,
    visible: Vec<VariableOffset>,
    children: Vec<ScopeId>,
}

impl Scope {
    pub fn kind(&self) -> ScopeKind {
        self.kind
    }

    pub fn parent(&self) -> Option<ScopeId> {
        self.parent
    }

    pub fn provides(&self, offset: VariableOffset) -> bool {
        self.local.contains(&offset)
    }

    pub fn defines(&self, offset: VariableOffset) -> bool {
        self.visible.contains(&offset)
    }

    pub fn local(&self) -> &[VariableOffset] {
        &self.local
    }

    pub fn visible(&self) -> &[VariableOffset] {
        &self.visible
    }

    pub fn children(&self) -> &[ScopeId] {
        &self.children
    }
}

#[derive(Debug, Error, Eq, PartialEq)]
pub enum ScopeError {
    #[error("scope parenting would introduce a cycle")]
    CyclicParent,
}

/// Owns every [`Scope`] in a query, keyed by [`ScopeId`]. Parent links are
/// non-owning indices into this arena; a scope's children are owned by
/// virtue of being entries in the same arena reachable only from the root.
#[derive(Debug, Clone, Default)]
pub struct ScopeTree {
    scopes: Vec<Scope>,
}

impl ScopeTree {
    /// Creates the root scope. Must be called before any `new_child`.
    pub fn new_root() -> Self {
        Self {
            scopes: vec![Scope {
                kind: ScopeKind::Root,
                parent: None,
                local: Vec::new(),
                visible: Vec::new(),
                children: Vec::new(),
            }],
        }
    }

    pub fn root(&self) -> ScopeId {
        ScopeId(0)
    }

    pub fn get(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0]
    }

    /// Creates a child scope of `parent`. Cannot fail in practice since the
    /// arena never exposes a way to construct a cycle, but `ScopeError` is
    /// kept as the documented failure mode (§4.2: "cyclic parenting is a
    /// programmer error and must abort").
    pub fn new_child(&mut self, parent: ScopeId, kind: ScopeKind) -> Result<ScopeId, ScopeError> {
        if parent.0 >= self.scopes.len() {
            return Err(ScopeError::CyclicParent);
        }
        let id = ScopeId(self.scopes.len());
        self.scopes.push(Scope {
            kind,
            parent: Some(parent),
            local: Vec::new(),
            visible: self.scopes[parent.0].visible.clone(),
            children: Vec::new(),
        });
        self.scopes[parent.0].children.push(id);
        Ok(id)
    }

    pub fn add_variable(&mut self, scope: ScopeId, offset: VariableOffset) {
        let scope_ref = &mut self.scopes[scope.0];
        if !scope_ref.local.contains(&offset) {
            scope_ref.local.push(offset);
        }
        self.recompute_visible(scope);
    }

    /// `visible = local ∪ parent.visible`, local wins on conflict (there is
    /// no actual conflict to resolve here since both sets hold the same kind
    /// of offset — the rule matters for the order `local` is merged in, so a
    /// shadowed parent variable's local definition is the one scopes below
    /// this one will see first).
    fn recompute_visible(&mut self, scope: ScopeId) {
        let parent_visible = self.scopes[scope.0]
            .parent
            .map(|p| self.scopes[p.0].visible.clone())
            .unwrap_or_default();
        let scope_ref = &mut self.scopes[scope.0];
        let mut visible = scope_ref.local.clone();
        for offset in parent_visible {
            if !visible.contains(&offset) {
                visible.push(offset);
            }
        }
        scope_ref.visible = visible;
        let children = scope_ref.children.clone();
        for child in children {
            self.recompute_visible(child);
        }
    }

    pub fn get_root(&self, mut scope: ScopeId) -> ScopeId {
        while let Some(parent) = self.scopes[scope.0].parent {
            scope = parent;
        }
        scope
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_is_idempotent_on_name() {
        let mut table = VariablesTable::new();
        let a = table.add("s", VariableKind::Normal);
        let b = table.add("s", VariableKind::Normal);
        assert_eq!(a, b);
        assert_eq!(table.count(), 1);
    }

    #[test]
    fn visible_is_local_union_parent_visible() {
        let mut table = VariablesTable::new();
        let s = table.add("s", VariableKind::Normal);
        let g = table.add("g", VariableKind::Normal);

        let mut tree = ScopeTree::new_root();
        let root = tree.root();
        tree.add_variable(root, s);
        let child = tree.new_child(root, ScopeKind::Minus).unwrap();
        tree.add_variable(child, g);

        assert!(tree.get(child).visible().contains(&s));
        assert!(tree.get(child).visible().contains(&g));
        assert!(!tree.get(root).visible().contains(&g));
    }

    #[test]
    fn provides_is_strictly_local() {
        let mut table = VariablesTable::new();
        let s = table.add("s", VariableKind::Normal);
        let mut tree = ScopeTree::new_root();
        let root = tree.root();
        tree.add_variable(root, s);
        let child = tree.new_child(root, ScopeKind::Union).unwrap();
        assert!(tree.get(root).provides(s));
        assert!(!tree.get(child).provides(s));
        assert!(tree.get(child).defines(s));
    }
}
