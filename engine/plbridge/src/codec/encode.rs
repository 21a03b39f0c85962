use ordered_float::OrderedFloat;

use super::{DATA_FUNCTOR, FUNCTION_FUNCTOR, NAMED_ARG_FUNCTOR, NECK_FUNCTOR, PAIR_FUNCTOR};
use crate::bindings::VariableTable;
use crate::error::{BridgeError, BridgeResult};
use crate::options::CodecOptions;
use crate::store::TermStore;
use crate::term::{Term, CONS_FUNCTOR, FALSE_ATOM, TRUE_ATOM};
use crate::value::{Arg, Call, Closure, HostValue, Matrix};

/// Encode a host value as a term.
///
/// Variable references are resolved through `table`: the first reference to a
/// name allocates an engine variable from `store`, later references reuse it.
pub fn encode(
    value: &HostValue,
    options: &CodecOptions,
    table: &mut VariableTable,
    store: &mut dyn TermStore,
) -> BridgeResult<Term> {
    Encoder {
        options,
        table,
        store,
    }
    .encode(value)
}

struct Encoder<'a> {
    options: &'a CodecOptions,
    table: &'a mut VariableTable,
    store: &'a mut dyn TermStore,
}

impl Encoder<'_> {
    fn encode(&mut self, value: &HostValue) -> BridgeResult<Term> {
        let scalar = self.options.scalar;
        let options = self.options;
        match value {
            HostValue::Null => Ok(Term::Nil),
            HostValue::RealVector(items) => Ok(vector(&options.realvec, items, scalar, real)),
            HostValue::IntVector(items) => Ok(vector(&options.intvec, items, scalar, int)),
            HostValue::StringVector(items) => {
                Ok(vector(&options.charvec, items, scalar, string))
            }
            HostValue::BoolVector(items) => Ok(vector(&options.boolvec, items, scalar, boolean)),
            HostValue::RealMatrix(m) => matrix(options, &options.realmat, &options.realvec, m, real),
            HostValue::IntMatrix(m) => matrix(options, &options.intmat, &options.intvec, m, int),
            HostValue::StringMatrix(m) => {
                matrix(options, &options.charmat, &options.charvec, m, string)
            }
            HostValue::BoolMatrix(m) => {
                matrix(options, &options.boolmat, &options.boolvec, m, boolean)
            }
            HostValue::Symbol(name) => Ok(Term::atom(name.as_str())),
            HostValue::Placeholder => Ok(Term::atom("")),
            HostValue::VariableRef(name) => Ok(self.variable(name)),
            HostValue::Call(call) => self.call(call),
            HostValue::NamedList(entries) => self.list(entries),
            HostValue::Closure(closure) => self.closure(closure),
            HostValue::Primitive(formals) => Ok(Term::compound(
                NECK_FUNCTOR,
                vec![function_head(formals.iter().map(String::as_str)), Term::Nil],
            )),
        }
    }

    fn variable(&mut self, name: &str) -> Term {
        if self.options.atomize {
            return Term::atom(name);
        }
        Term::Variable(self.table.resolve(&mut *self.store, name))
    }

    /// `f(x, k = v)`. A call without arguments stays a compound of arity 0,
    /// and a two-argument `[|]` call becomes a list cell again.
    fn call(&mut self, call: &Call) -> BridgeResult<Term> {
        if call.functor == CONS_FUNCTOR && call.args.len() == 2 {
            let head = self.entry(&call.args[0], PAIR_FUNCTOR)?;
            let tail = self.encode(&call.args[1].value)?;
            return Ok(Term::cons(head, tail));
        }
        let args = call
            .args
            .iter()
            .map(|arg| self.entry(arg, NAMED_ARG_FUNCTOR))
            .collect::<BridgeResult<Vec<_>>>()?;
        Ok(Term::compound(call.functor.as_str(), args))
    }

    fn list(&mut self, entries: &[Arg]) -> BridgeResult<Term> {
        let items = entries
            .iter()
            .map(|entry| self.entry(entry, PAIR_FUNCTOR))
            .collect::<BridgeResult<Vec<_>>>()?;
        Ok(Term::list(items))
    }

    /// Encode `arg`, wrapping it as `name op value` when it carries a name.
    fn entry(&mut self, arg: &Arg, op: &str) -> BridgeResult<Term> {
        let value = self.encode(&arg.value)?;
        Ok(match arg.name.as_deref() {
            Some(name) if !name.is_empty() => {
                Term::compound(op, vec![Term::atom(name), value])
            }
            _ => value,
        })
    }

    /// Only the formal names reach the head; defaults are not encoded.
    fn closure(&mut self, closure: &Closure) -> BridgeResult<Term> {
        let head = function_head(closure.formals.iter().map(|formal| formal.name.as_str()));
        let body = self.encode(&closure.body)?;
        Ok(Term::compound(NECK_FUNCTOR, vec![head, body]))
    }
}

fn function_head<'a>(names: impl Iterator<Item = &'a str>) -> Term {
    Term::compound(FUNCTION_FUNCTOR, names.map(Term::atom).collect())
}

fn vector<T>(tag: &str, items: &[Option<T>], scalar: bool, element: fn(&T) -> Term) -> Term {
    let encode_item = |item: &Option<T>| item.as_ref().map_or_else(Term::na, element);
    match items {
        [] => Term::Nil,
        [single] if scalar => encode_item(single),
        _ => Term::compound(tag, items.iter().map(encode_item).collect()),
    }
}

/// `mat(nrow, ncol, rownames, colnames, data(row1, row2, ...))`. Rows are
/// always full vector compounds, whatever the `scalar` option says.
fn matrix<T>(
    options: &CodecOptions,
    mat_tag: &str,
    vec_tag: &str,
    m: &Matrix<Option<T>>,
    element: fn(&T) -> Term,
) -> BridgeResult<Term> {
    if m.nrow().checked_mul(m.ncol()) != Some(m.data().len()) {
        return Err(BridgeError::NonRectangularMatrix(format!(
            "{} elements in a {}x{} matrix",
            m.data().len(),
            m.nrow(),
            m.ncol()
        )));
    }
    let rows = m
        .rows()
        .map(|row| vector(vec_tag, row, false, element))
        .collect();
    Ok(Term::compound(
        mat_tag,
        vec![
            Term::Integer(m.nrow() as i64),
            Term::Integer(m.ncol() as i64),
            dimnames(options, m.row_names.as_deref()),
            dimnames(options, m.col_names.as_deref()),
            Term::compound(DATA_FUNCTOR, rows),
        ],
    ))
}

fn dimnames(options: &CodecOptions, names: Option<&[String]>) -> Term {
    match names {
        None => Term::Nil,
        Some(names) => {
            let items: Vec<Option<String>> = names.iter().cloned().map(Some).collect();
            vector(&options.charvec, &items, false, string)
        }
    }
}

fn real(value: &OrderedFloat<f64>) -> Term {
    Term::Float(*value)
}

fn int(value: &i64) -> Term {
    Term::Integer(*value)
}

fn string(value: &String) -> Term {
    Term::string(value.as_str())
}

fn boolean(value: &bool) -> Term {
    Term::atom(if *value { TRUE_ATOM } else { FALSE_ATOM })
}
