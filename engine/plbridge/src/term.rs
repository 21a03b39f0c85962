use std::fmt::{self, Display, Formatter};
use std::hash::{Hash, Hasher};
use std::mem;

use ordered_float::OrderedFloat;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Atom standing for a missing element.
pub const NA_ATOM: &str = "na";
/// Atom standing for logical true.
pub const TRUE_ATOM: &str = "true";
/// Atom standing for logical false.
pub const FALSE_ATOM: &str = "false";

/// Functor of the list cons cell.
pub const CONS_FUNCTOR: &str = "[|]";

/// Engine-side identity of a logic variable.
///
/// Identities are allocated by a [`TermStore`](crate::TermStore) and are only
/// meaningful to the store that produced them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VarId(pub u64);

/// Handle of a query opened inside an engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct QueryId(pub u64);

/// The engine's term universe.
///
/// `Clone`, `PartialEq`, `Hash` and `Drop` walk list spines in a loop, so a
/// list of any length can be copied, compared and dropped without growing
/// the stack.
#[derive(Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Term {
    Nil,
    Integer(i64),
    Float(OrderedFloat<f64>),
    Atom(String),
    String(String),
    Variable(VarId),
    Compound { functor: String, args: Vec<Term> },
    List(Box<Term>, Box<Term>),
}

impl Term {
    pub fn atom(name: impl Into<String>) -> Self {
        Term::Atom(name.into())
    }

    pub fn string(text: impl Into<String>) -> Self {
        Term::String(text.into())
    }

    pub fn float(value: f64) -> Self {
        Term::Float(OrderedFloat(value))
    }

    pub fn compound(functor: impl Into<String>, args: Vec<Term>) -> Self {
        Term::Compound {
            functor: functor.into(),
            args,
        }
    }

    pub fn cons(head: Term, tail: Term) -> Self {
        Term::List(Box::new(head), Box::new(tail))
    }

    /// Build a proper list terminated by `[]`.
    pub fn list(items: impl IntoIterator<Item = Term>) -> Self {
        let items: Vec<Term> = items.into_iter().collect();
        items
            .into_iter()
            .rev()
            .fold(Term::Nil, |tail, head| Term::cons(head, tail))
    }

    /// The atom used for missing elements.
    pub fn na() -> Self {
        Term::atom(NA_ATOM)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Term::Nil => "nil",
            Term::Integer(_) => "integer",
            Term::Float(_) => "float",
            Term::Atom(_) => "atom",
            Term::String(_) => "string",
            Term::Variable(_) => "variable",
            Term::Compound { .. } => "compound",
            Term::List(..) => "list",
        }
    }

    pub fn is_atom(&self, name: &str) -> bool {
        matches!(self, Term::Atom(a) if a == name)
    }

    /// Functor name and arguments when this is a compound of the given arity.
    pub fn as_compound(&self, arity: usize) -> Option<(&str, &[Term])> {
        match self {
            Term::Compound { functor, args } if args.len() == arity => Some((functor, args)),
            _ => None,
        }
    }

    /// Split a `name op value` pair such as `mean = 100` or `a - 1`.
    pub fn as_named_pair(&self, op: &str) -> Option<(&str, &Term)> {
        match self.as_compound(2) {
            Some((functor, [Term::Atom(name), value])) if functor == op => {
                Some((name.as_str(), value))
            }
            _ => None,
        }
    }
}

impl Clone for Term {
    fn clone(&self) -> Self {
        match self {
            Term::Nil => Term::Nil,
            Term::Integer(v) => Term::Integer(*v),
            Term::Float(v) => Term::Float(*v),
            Term::Atom(a) => Term::Atom(a.clone()),
            Term::String(s) => Term::String(s.clone()),
            Term::Variable(var) => Term::Variable(*var),
            Term::Compound { functor, args } => Term::Compound {
                functor: functor.clone(),
                args: args.clone(),
            },
            Term::List(..) => {
                let mut heads = Vec::new();
                let mut rest = self;
                while let Term::List(head, tail) = rest {
                    heads.push((**head).clone());
                    rest = &**tail;
                }
                let tail = rest.clone();
                heads
                    .into_iter()
                    .rev()
                    .fold(tail, |tail, head| Term::cons(head, tail))
            }
        }
    }
}

impl PartialEq for Term {
    fn eq(&self, other: &Self) -> bool {
        let (mut left, mut right) = (self, other);
        loop {
            match (left, right) {
                (Term::List(lh, lt), Term::List(rh, rt)) => {
                    if lh != rh {
                        return false;
                    }
                    left = &**lt;
                    right = &**rt;
                }
                (Term::Nil, Term::Nil) => return true,
                (Term::Integer(a), Term::Integer(b)) => return a == b,
                (Term::Float(a), Term::Float(b)) => return a == b,
                (Term::Atom(a), Term::Atom(b)) => return a == b,
                (Term::String(a), Term::String(b)) => return a == b,
                (Term::Variable(a), Term::Variable(b)) => return a == b,
                (
                    Term::Compound { functor, args },
                    Term::Compound {
                        functor: other_functor,
                        args: other_args,
                    },
                ) => return functor == other_functor && args == other_args,
                _ => return false,
            }
        }
    }
}

impl Eq for Term {}

impl Hash for Term {
    fn hash<H: Hasher>(&self, state: &mut H) {
        let mut term = self;
        loop {
            mem::discriminant(term).hash(state);
            match term {
                Term::List(head, tail) => {
                    head.hash(state);
                    term = &**tail;
                }
                Term::Nil => return,
                Term::Integer(v) => return v.hash(state),
                Term::Float(v) => return v.hash(state),
                Term::Atom(a) | Term::String(a) => return a.hash(state),
                Term::Variable(var) => return var.hash(state),
                Term::Compound { functor, args } => {
                    functor.hash(state);
                    return args.hash(state);
                }
            }
        }
    }
}

impl Drop for Term {
    fn drop(&mut self) {
        let Term::List(_, tail) = self else {
            return;
        };
        let mut rest = mem::replace(&mut **tail, Term::Nil);
        // Unlink each cell before it is dropped so the drop never recurses
        // along the tail.
        while let Term::List(_, tail) = &mut rest {
            let next = mem::replace(&mut **tail, Term::Nil);
            rest = next;
        }
    }
}

impl From<i64> for Term {
    fn from(value: i64) -> Self {
        Term::Integer(value)
    }
}

impl From<f64> for Term {
    fn from(value: f64) -> Self {
        Term::float(value)
    }
}

impl From<VarId> for Term {
    fn from(var: VarId) -> Self {
        Term::Variable(var)
    }
}

impl Display for VarId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "_G{}", self.0)
    }
}

impl Display for Term {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        write_term(self, &mut out);
        f.write_str(&out)
    }
}

/// Canonical, operator-free rendering. Only used for diagnostics; display
/// for end users goes through the engine.
fn write_term(term: &Term, out: &mut String) {
    match term {
        Term::Nil => out.push_str("[]"),
        Term::Integer(v) => out.push_str(&v.to_string()),
        Term::Float(v) => {
            let mut rendered = v.to_string();
            if v.is_finite() && !rendered.contains('.') && !rendered.contains('e') {
                rendered.push_str(".0");
            }
            out.push_str(&rendered);
        }
        Term::Atom(a) => write_atom(a, out),
        Term::String(s) => {
            out.push('"');
            for ch in s.chars() {
                match ch {
                    '"' => out.push_str("\\\""),
                    '\\' => out.push_str("\\\\"),
                    '\n' => out.push_str("\\n"),
                    other => out.push(other),
                }
            }
            out.push('"');
        }
        Term::Variable(var) => out.push_str(&var.to_string()),
        Term::Compound { functor, args } => {
            write_atom(functor, out);
            out.push('(');
            for (idx, arg) in args.iter().enumerate() {
                if idx > 0 {
                    out.push_str(", ");
                }
                write_term(arg, out);
            }
            out.push(')');
        }
        Term::List(head, tail) => {
            out.push('[');
            write_term(head, out);
            let mut rest = tail.as_ref();
            loop {
                match rest {
                    Term::List(h, t) => {
                        out.push_str(", ");
                        write_term(h, out);
                        rest = &**t;
                    }
                    Term::Nil => break,
                    other => {
                        out.push('|');
                        write_term(other, out);
                        break;
                    }
                }
            }
            out.push(']');
        }
    }
}

fn write_atom(name: &str, out: &mut String) {
    let mut chars = name.chars();
    let plain = match chars.next() {
        Some(first) => {
            first.is_ascii_lowercase() && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    };
    if plain || name == "[]" {
        out.push_str(name);
    } else {
        out.push('\'');
        out.push_str(&name.replace('\'', "\\'"));
        out.push('\'');
    }
}
