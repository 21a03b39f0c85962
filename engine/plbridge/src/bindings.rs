use crate::store::{deref, TermStore};
use crate::term::{Term, VarId};
use crate::value::ANONYMOUS_VARIABLE;

/// Ordered, append-only correspondence between host variable names and
/// engine variables for the lifetime of one query.
///
/// Position `i` of the name sequence belongs to position `i` of the identity
/// sequence. A name is recorded at most once.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VariableTable {
    names: Vec<String>,
    vars: Vec<VarId>,
}

impl VariableTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// The identity recorded for `name`.
    pub fn lookup(&self, name: &str) -> Option<VarId> {
        self.names
            .iter()
            .position(|known| known == name)
            .map(|idx| self.vars[idx])
    }

    /// Identity for `name`, allocating and recording a new variable on first
    /// use. The anonymous name always yields a fresh, unrecorded variable.
    pub fn resolve(&mut self, store: &mut dyn TermStore, name: &str) -> VarId {
        if name == ANONYMOUS_VARIABLE {
            return store.fresh_variable();
        }
        if let Some(var) = self.lookup(name) {
            return var;
        }
        let var = store.fresh_variable();
        self.names.push(name.to_string());
        self.vars.push(var);
        var
    }

    /// Name of the first recorded variable that is the same engine variable
    /// as `var` once both are dereferenced.
    pub fn name_of(&self, store: &dyn TermStore, var: VarId) -> Option<&str> {
        let target = match deref(store, &Term::Variable(var)) {
            Some(Term::Variable(rep)) => Some(rep),
            _ => None,
        };
        self.names
            .iter()
            .zip(&self.vars)
            .find(|&(_, &known)| {
                known == var
                    || target.is_some_and(|rep| {
                        deref(store, &Term::Variable(known)) == Some(Term::Variable(rep))
                    })
            })
            .map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, VarId)> {
        self.names
            .iter()
            .map(String::as_str)
            .zip(self.vars.iter().copied())
    }
}
