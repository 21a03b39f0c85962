use std::borrow::Cow;

use ordered_float::OrderedFloat;
use tracing::warn;

use super::{DATA_FUNCTOR, NAMED_ARG_FUNCTOR, NECK_FUNCTOR, PAIR_FUNCTOR};
use crate::bindings::VariableTable;
use crate::error::{BridgeError, BridgeResult};
use crate::options::{CodecOptions, TagKind};
use crate::store::TermStore;
use crate::term::{Term, VarId, CONS_FUNCTOR, FALSE_ATOM, NA_ATOM, TRUE_ATOM};
use crate::value::{Arg, Call, Closure, Formal, HostValue, Matrix};

/// Decode a term into a host value.
///
/// Variables are dereferenced through `store`. An unbound variable becomes a
/// [`HostValue::VariableRef`] carrying the name recorded in `table`, or the
/// engine's own name when the engine created the variable while solving.
/// Engine names are run-dependent and must be treated as opaque.
pub fn decode(
    term: &Term,
    options: &CodecOptions,
    table: &VariableTable,
    store: &dyn TermStore,
) -> BridgeResult<HostValue> {
    Decoder {
        options,
        table,
        store,
        expanding: Vec::new(),
    }
    .decode(term)
}

struct Decoder<'a> {
    options: &'a CodecOptions,
    table: &'a VariableTable,
    store: &'a dyn TermStore,
    /// Bound variables whose value is being decoded right now. Meeting one of
    /// them again means the term is cyclic.
    expanding: Vec<VarId>,
}

struct MatrixLayout<'t> {
    dims: Option<(usize, usize)>,
    row_names: Option<Vec<String>>,
    col_names: Option<Vec<String>>,
    rows: Cow<'t, [Term]>,
}

impl Decoder<'_> {
    fn decode(&mut self, term: &Term) -> BridgeResult<HostValue> {
        let (resolved, entered) = self.enter(term)?;
        let value = self.decode_resolved(&resolved);
        self.leave(entered);
        value
    }

    /// Dereference `term`, marking each bound variable on the way as being
    /// expanded. Returns the number of variables marked.
    ///
    /// The result borrows `term` unless a binding was followed.
    fn enter<'t>(&mut self, term: &'t Term) -> BridgeResult<(Cow<'t, Term>, usize)> {
        let mut current = Cow::Borrowed(term);
        let mut entered = 0;
        while let Term::Variable(var) = &*current {
            let Some(bound) = self.follow(*var)? else {
                break;
            };
            entered += 1;
            current = Cow::Owned(bound);
        }
        Ok((current, entered))
    }

    /// The binding of `var`, marked as being expanded, or `None` when `var`
    /// is unbound.
    fn follow(&mut self, var: VarId) -> BridgeResult<Option<Term>> {
        let Some(bound) = self.store.binding(var) else {
            return Ok(None);
        };
        if self.expanding.contains(&var) {
            return Err(BridgeError::CyclicTerm(self.store.variable_name(var)));
        }
        self.expanding.push(var);
        Ok(Some(bound))
    }

    fn leave(&mut self, entered: usize) {
        let keep = self.expanding.len() - entered;
        self.expanding.truncate(keep);
    }

    /// Dereference a leaf such as a vector element.
    fn resolve<'t>(&mut self, term: &'t Term) -> BridgeResult<Cow<'t, Term>> {
        let (resolved, entered) = self.enter(term)?;
        self.leave(entered);
        Ok(resolved)
    }

    fn decode_resolved(&mut self, term: &Term) -> BridgeResult<HostValue> {
        match term {
            Term::Nil => Ok(HostValue::Null),
            Term::Integer(v) => Ok(HostValue::int(*v)),
            Term::Float(v) => Ok(HostValue::RealVector(vec![Some(*v)])),
            Term::String(s) => Ok(HostValue::string(s.as_str())),
            Term::Atom(name) => Ok(atom(name)),
            Term::Variable(var) => Ok(self.unbound(*var)),
            Term::List(head, tail) => self.list(head, tail),
            Term::Compound { functor, args } if is_cons(functor, args) => {
                self.list(&args[0], &args[1])
            }
            Term::Compound { functor, args } => self.compound(functor, args),
        }
    }

    fn unbound(&self, var: VarId) -> HostValue {
        let name = match self.table.name_of(self.store, var) {
            Some(name) => name.to_string(),
            None => self.store.variable_name(var),
        };
        HostValue::VariableRef(name)
    }

    /// `[a - 1, 2]` decodes to a list with a named first entry. A tail that
    /// does not end in `[]` (e.g. `[1, 2 | X]`) keeps its cons structure as
    /// nested `[|]` calls.
    ///
    /// The spine is walked by reference. Only a tail bound through a variable
    /// is fetched from the store, and the walk continues inside that binding.
    fn list(&mut self, head: &Term, tail: &Term) -> BridgeResult<HostValue> {
        let mut entries = vec![self.entry(head, PAIR_FUNCTOR)?];
        let mut entered = 0;
        let mut segment = Cow::Borrowed(tail);
        let last = loop {
            let mut rest: &Term = &segment;
            while let Some((h, t)) = cons_parts(rest) {
                entries.push(self.entry(h, PAIR_FUNCTOR)?);
                rest = t;
            }
            let bound = match rest {
                Term::Variable(var) => self.follow(*var)?,
                _ => None,
            };
            match bound {
                Some(next) => {
                    entered += 1;
                    segment = Cow::Owned(next);
                }
                None => break self.decode_resolved(rest),
            }
        };
        self.leave(entered);

        match last? {
            HostValue::Null => Ok(HostValue::NamedList(entries)),
            tail => Ok(entries.into_iter().rev().fold(tail, |acc, entry| {
                HostValue::Call(Call::new(CONS_FUNCTOR, vec![entry, Arg::positional(acc)]))
            })),
        }
    }

    /// Decode a call argument or list entry, unwrapping `name op value`.
    fn entry(&mut self, term: &Term, op: &str) -> BridgeResult<Arg> {
        let (resolved, entered) = self.enter(term)?;
        let arg = match resolved.as_named_pair(op) {
            Some((name, value)) => self.decode(value).map(|v| Arg::named(name, v)),
            None => self.decode_resolved(&resolved).map(Arg::positional),
        };
        self.leave(entered);
        arg
    }

    fn compound(&mut self, functor: &str, args: &[Term]) -> BridgeResult<HostValue> {
        if let Some(kind) = self.options.classify(functor) {
            return self.tagged(kind, args);
        }
        if functor == NECK_FUNCTOR && args.len() == 2 {
            return self.closure(&args[0], &args[1]);
        }
        let args = args
            .iter()
            .map(|arg| self.entry(arg, NAMED_ARG_FUNCTOR))
            .collect::<BridgeResult<Vec<_>>>()?;
        Ok(HostValue::Call(Call::new(functor, args)))
    }

    fn tagged(&mut self, kind: TagKind, args: &[Term]) -> BridgeResult<HostValue> {
        Ok(match kind {
            TagKind::RealVec => HostValue::RealVector(self.elements(args, real)?),
            TagKind::RealMat => HostValue::RealMatrix(self.matrix(args, real)?),
            TagKind::IntVec => HostValue::IntVector(self.elements(args, int)?),
            TagKind::IntMat => HostValue::IntMatrix(self.matrix(args, int)?),
            TagKind::CharVec => HostValue::StringVector(self.elements(args, string)?),
            TagKind::CharMat => HostValue::StringMatrix(self.matrix(args, string)?),
            TagKind::BoolVec => HostValue::BoolVector(self.elements(args, boolean)?),
            TagKind::BoolMat => HostValue::BoolMatrix(self.matrix(args, boolean)?),
        })
    }

    fn elements<T>(
        &mut self,
        args: &[Term],
        convert: fn(&Term) -> Option<T>,
    ) -> BridgeResult<Vec<Option<T>>> {
        args.iter()
            .map(|arg| self.resolve(arg).map(|resolved| convert(&resolved)))
            .collect()
    }

    fn matrix<T>(
        &mut self,
        args: &[Term],
        convert: fn(&Term) -> Option<T>,
    ) -> BridgeResult<Matrix<Option<T>>> {
        let layout = self.matrix_layout(args)?;
        let nrow = layout.rows.len();
        let mut ncol = None;
        let mut data = Vec::new();
        for (idx, row) in layout.rows.iter().enumerate() {
            let row = self.resolve(row)?;
            let cells: &[Term] = match &*row {
                Term::Compound { args, .. } => args,
                Term::Nil => &[],
                scalar => std::slice::from_ref(scalar),
            };
            match ncol {
                None => ncol = Some(cells.len()),
                Some(expected) if expected != cells.len() => {
                    return Err(BridgeError::InconsistentMatrixRows(format!(
                        "row {} has {} columns, expected {}",
                        idx + 1,
                        cells.len(),
                        expected
                    )));
                }
                Some(_) => {}
            }
            data.extend(self.elements(cells, convert)?);
        }

        let ncol = match (ncol, layout.dims) {
            (Some(found), _) => found,
            (None, Some((_, declared))) => declared,
            (None, None) => 0,
        };
        if let Some((declared_rows, declared_cols)) = layout.dims {
            if declared_rows != nrow || declared_cols != ncol {
                return Err(BridgeError::InconsistentMatrixRows(format!(
                    "declared {declared_rows}x{declared_cols}, found {nrow}x{ncol}"
                )));
            }
        }
        Ok(Matrix::new(nrow, ncol, data)?.with_dimnames(layout.row_names, layout.col_names))
    }

    /// Either `mat(nrow, ncol, rownames, colnames, data(rows...))` or the
    /// short form `mat(rows...)`.
    fn matrix_layout<'t>(&mut self, args: &'t [Term]) -> BridgeResult<MatrixLayout<'t>> {
        if let [nrow, ncol, row_names, col_names, data] = args {
            let rows = match self.resolve(data)? {
                Cow::Borrowed(Term::Compound { functor, args }) if *functor == DATA_FUNCTOR => {
                    Some(Cow::Borrowed(args.as_slice()))
                }
                Cow::Owned(mut term) => match &mut term {
                    Term::Compound { functor, args } if *functor == DATA_FUNCTOR => {
                        Some(Cow::Owned(std::mem::take(args)))
                    }
                    _ => None,
                },
                Cow::Borrowed(_) => None,
            };
            if let Some(rows) = rows {
                return Ok(MatrixLayout {
                    dims: Some((self.dimension(nrow)?, self.dimension(ncol)?)),
                    row_names: self.dimnames(row_names)?,
                    col_names: self.dimnames(col_names)?,
                    rows,
                });
            }
        }
        Ok(MatrixLayout {
            dims: None,
            row_names: None,
            col_names: None,
            rows: Cow::Borrowed(args),
        })
    }

    fn dimension(&mut self, term: &Term) -> BridgeResult<usize> {
        match &*self.resolve(term)? {
            Term::Integer(n) if *n >= 0 => Ok(*n as usize),
            other => Err(BridgeError::UntranslatableTerm(format!(
                "{other} is not a matrix dimension"
            ))),
        }
    }

    /// Row or column names. A missing name has no place in a name vector
    /// and is read as the empty string.
    fn dimnames(&mut self, term: &Term) -> BridgeResult<Option<Vec<String>>> {
        match self.decode(term)? {
            HostValue::Null => Ok(None),
            HostValue::StringVector(names) => Ok(Some(
                names
                    .into_iter()
                    .enumerate()
                    .map(|(idx, name)| {
                        name.unwrap_or_else(|| {
                            warn!(position = idx + 1, "missing dimension name, using \"\"");
                            String::new()
                        })
                    })
                    .collect(),
            )),
            other => Err(BridgeError::UntranslatableTerm(format!(
                "matrix dimension names must be strings, got {}",
                other.kind()
            ))),
        }
    }

    /// `function(x, y = 2) :- body`.
    fn closure(&mut self, head: &Term, body: &Term) -> BridgeResult<HostValue> {
        let head = self.resolve(head)?;
        let params: &[Term] = match &*head {
            Term::Compound { args, .. } => args,
            Term::Atom(_) => &[],
            other => {
                return Err(BridgeError::UntranslatableTerm(format!(
                    "{other} is not a function head"
                )))
            }
        };
        let mut formals = Vec::with_capacity(params.len());
        for param in params {
            let param = self.resolve(param)?;
            if let Some((name, default)) = param.as_named_pair(NAMED_ARG_FUNCTOR) {
                formals.push(Formal::with_default(name, self.decode(default)?));
                continue;
            }
            match &*param {
                Term::Atom(name) => formals.push(Formal::new(name.as_str())),
                other => {
                    return Err(BridgeError::UntranslatableTerm(format!(
                        "{other} is not a formal parameter"
                    )))
                }
            }
        }
        let body = self.decode(body)?;
        Ok(HostValue::Closure(Closure::new(formals, body)))
    }
}

fn is_cons(functor: &str, args: &[Term]) -> bool {
    functor == CONS_FUNCTOR && args.len() == 2
}

fn cons_parts(term: &Term) -> Option<(&Term, &Term)> {
    match term {
        Term::List(head, tail) => Some((&**head, &**tail)),
        Term::Compound { functor, args } if is_cons(functor, args) => Some((&args[0], &args[1])),
        _ => None,
    }
}

fn atom(name: &str) -> HostValue {
    match name {
        NA_ATOM => HostValue::BoolVector(vec![None]),
        TRUE_ATOM => HostValue::bool(true),
        FALSE_ATOM => HostValue::bool(false),
        "" => HostValue::Placeholder,
        other => HostValue::symbol(other),
    }
}

fn real(term: &Term) -> Option<OrderedFloat<f64>> {
    match term {
        Term::Float(v) => Some(*v),
        Term::Integer(v) => Some(OrderedFloat(*v as f64)),
        t if t.is_atom(NA_ATOM) => None,
        other => {
            warn!(term = %other, "cannot convert to float, returning NA");
            None
        }
    }
}

fn int(term: &Term) -> Option<i64> {
    match term {
        Term::Integer(v) => Some(*v),
        t if t.is_atom(NA_ATOM) => None,
        other => {
            warn!(term = %other, "cannot convert to integer, returning NA");
            None
        }
    }
}

fn string(term: &Term) -> Option<String> {
    match term {
        Term::String(s) => Some(s.clone()),
        t if t.is_atom(NA_ATOM) => None,
        Term::Atom(a) => Some(a.clone()),
        Term::Integer(v) => Some(v.to_string()),
        Term::Float(v) => Some(v.to_string()),
        other => {
            warn!(term = %other, "cannot convert to string, returning NA");
            None
        }
    }
}

fn boolean(term: &Term) -> Option<bool> {
    match term {
        Term::Atom(a) if a == TRUE_ATOM => Some(true),
        Term::Atom(a) if a == FALSE_ATOM => Some(false),
        t if t.is_atom(NA_ATOM) => None,
        other => {
            warn!(term = %other, "invalid logical item, returning NA");
            None
        }
    }
}
