use std::collections::HashMap;

use crate::term::{Term, VarId};

/// The part of an engine the codec needs: variable allocation and the current
/// bindings of variables.
pub trait TermStore {
    /// Allocate a new unbound variable.
    fn fresh_variable(&mut self) -> VarId;

    /// The term `var` is currently bound to, or `None` while it is unbound.
    fn binding(&self, var: VarId) -> Option<Term>;

    /// The engine's own name for `var`, e.g. `_G123`.
    ///
    /// These names depend on the engine's allocation order and are not
    /// reproducible across runs.
    fn variable_name(&self, var: VarId) -> String {
        var.to_string()
    }
}

/// Follow variable-to-variable bindings until an unbound variable or a
/// non-variable term is reached.
///
/// Returns `None` when the chain loops back on itself.
pub fn deref(store: &dyn TermStore, term: &Term) -> Option<Term> {
    let mut current = term.clone();
    let mut seen = Vec::new();
    while let Term::Variable(var) = current {
        if seen.contains(&var) {
            return None;
        }
        seen.push(var);
        match store.binding(var) {
            Some(next) => current = next,
            None => return Some(Term::Variable(var)),
        }
    }
    Some(current)
}

/// A term store that lives outside any engine.
///
/// Useful to build goal terms ahead of time and to exercise the codec
/// against explicit bindings.
#[derive(Debug, Default)]
pub struct LocalStore {
    next_id: u64,
    bindings: HashMap<VarId, Term>,
}

impl LocalStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `var` to `term`, replacing any previous binding.
    pub fn bind(&mut self, var: VarId, term: Term) {
        self.bindings.insert(var, term);
    }

    pub fn unbind(&mut self, var: VarId) {
        self.bindings.remove(&var);
    }

    /// Number of variables allocated so far.
    pub fn allocated(&self) -> u64 {
        self.next_id
    }
}

impl TermStore for LocalStore {
    fn fresh_variable(&mut self) -> VarId {
        let id = VarId(self.next_id);
        self.next_id += 1;
        id
    }

    fn binding(&self, var: VarId) -> Option<Term> {
        self.bindings.get(&var).cloned()
    }
}
