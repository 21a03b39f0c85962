use ordered_float::OrderedFloat;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, BridgeResult};

/// Name of the anonymous variable. It never joins the binding table.
pub const ANONYMOUS_VARIABLE: &str = "_";

/// A possibly-named element, used for call arguments and list entries.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Arg {
    pub name: Option<String>,
    pub value: HostValue,
}

impl Arg {
    pub fn positional(value: HostValue) -> Self {
        Self { name: None, value }
    }

    pub fn named(name: impl Into<String>, value: HostValue) -> Self {
        Self {
            name: Some(name.into()),
            value,
        }
    }
}

/// A formal parameter of a closure, optionally with a default expression.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Formal {
    pub name: String,
    pub default: Option<HostValue>,
}

impl Formal {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default: None,
        }
    }

    pub fn with_default(name: impl Into<String>, default: HostValue) -> Self {
        Self {
            name: name.into(),
            default: Some(default),
        }
    }
}

/// A host function call such as `rnorm(10, mean = 100)`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Call {
    pub functor: String,
    pub args: Vec<Arg>,
}

impl Call {
    pub fn new(functor: impl Into<String>, args: Vec<Arg>) -> Self {
        Self {
            functor: functor.into(),
            args,
        }
    }

    /// Call with positional arguments only.
    pub fn positional(functor: impl Into<String>, args: Vec<HostValue>) -> Self {
        Self::new(functor, args.into_iter().map(Arg::positional).collect())
    }
}

/// A host closure: formal parameters plus a body expression.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Closure {
    pub formals: Vec<Formal>,
    pub body: Box<HostValue>,
}

impl Closure {
    pub fn new(formals: Vec<Formal>, body: HostValue) -> Self {
        Self {
            formals,
            body: Box::new(body),
        }
    }
}

/// Dense row-major matrix with optional dimension names.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Matrix<T> {
    nrow: usize,
    ncol: usize,
    data: Vec<T>,
    pub row_names: Option<Vec<String>>,
    pub col_names: Option<Vec<String>>,
}

impl<T> Matrix<T> {
    /// Build from row-major `data`, checking that it fills `nrow x ncol`.
    pub fn new(nrow: usize, ncol: usize, data: Vec<T>) -> BridgeResult<Self> {
        if nrow.checked_mul(ncol) != Some(data.len()) {
            return Err(BridgeError::NonRectangularMatrix(format!(
                "{} elements cannot fill a {}x{} matrix",
                data.len(),
                nrow,
                ncol
            )));
        }
        Ok(Self {
            nrow,
            ncol,
            data,
            row_names: None,
            col_names: None,
        })
    }

    /// Build from rows, which must all have the same length.
    pub fn from_rows(rows: Vec<Vec<T>>) -> BridgeResult<Self> {
        let nrow = rows.len();
        let ncol = rows.first().map_or(0, Vec::len);
        let mut data = Vec::with_capacity(nrow * ncol);
        for (idx, row) in rows.into_iter().enumerate() {
            if row.len() != ncol {
                return Err(BridgeError::NonRectangularMatrix(format!(
                    "row {} has {} columns, expected {}",
                    idx + 1,
                    row.len(),
                    ncol
                )));
            }
            data.extend(row);
        }
        Ok(Self {
            nrow,
            ncol,
            data,
            row_names: None,
            col_names: None,
        })
    }

    pub fn with_dimnames(
        mut self,
        row_names: Option<Vec<String>>,
        col_names: Option<Vec<String>>,
    ) -> Self {
        self.row_names = row_names;
        self.col_names = col_names;
        self
    }

    pub fn nrow(&self) -> usize {
        self.nrow
    }

    pub fn ncol(&self) -> usize {
        self.ncol
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    pub fn rows(&self) -> impl Iterator<Item = &[T]> {
        // a zero-column matrix still has `nrow` (empty) rows
        let ncol = self.ncol;
        (0..self.nrow).map(move |row| &self.data[row * ncol..(row + 1) * ncol])
    }
}

pub type RealVector = Vec<Option<OrderedFloat<f64>>>;
pub type IntVector = Vec<Option<i64>>;
pub type StringVector = Vec<Option<String>>;
pub type BoolVector = Vec<Option<bool>>;

/// The host's value universe.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum HostValue {
    Null,
    RealVector(RealVector),
    RealMatrix(Matrix<Option<OrderedFloat<f64>>>),
    IntVector(IntVector),
    IntMatrix(Matrix<Option<i64>>),
    StringVector(StringVector),
    StringMatrix(Matrix<Option<String>>),
    BoolVector(BoolVector),
    BoolMatrix(Matrix<Option<bool>>),
    Symbol(String),
    VariableRef(String),
    Call(Call),
    NamedList(Vec<Arg>),
    Closure(Closure),
    /// Host builtin known only by its formal names.
    Primitive(Vec<String>),
    /// The empty symbol, e.g. a formal parameter without default.
    Placeholder,
}

impl HostValue {
    pub fn kind(&self) -> &'static str {
        match self {
            HostValue::Null => "null",
            HostValue::RealVector(_) => "real vector",
            HostValue::RealMatrix(_) => "real matrix",
            HostValue::IntVector(_) => "integer vector",
            HostValue::IntMatrix(_) => "integer matrix",
            HostValue::StringVector(_) => "string vector",
            HostValue::StringMatrix(_) => "string matrix",
            HostValue::BoolVector(_) => "logical vector",
            HostValue::BoolMatrix(_) => "logical matrix",
            HostValue::Symbol(_) => "symbol",
            HostValue::VariableRef(_) => "variable",
            HostValue::Call(_) => "call",
            HostValue::NamedList(_) => "list",
            HostValue::Closure(_) => "closure",
            HostValue::Primitive(_) => "primitive",
            HostValue::Placeholder => "placeholder",
        }
    }

    pub fn real(value: f64) -> Self {
        HostValue::RealVector(vec![Some(OrderedFloat(value))])
    }

    pub fn reals(values: impl IntoIterator<Item = Option<f64>>) -> Self {
        HostValue::RealVector(values.into_iter().map(|v| v.map(OrderedFloat)).collect())
    }

    pub fn int(value: i64) -> Self {
        HostValue::IntVector(vec![Some(value)])
    }

    pub fn ints(values: impl IntoIterator<Item = Option<i64>>) -> Self {
        HostValue::IntVector(values.into_iter().collect())
    }

    pub fn string(value: impl Into<String>) -> Self {
        HostValue::StringVector(vec![Some(value.into())])
    }

    pub fn bool(value: bool) -> Self {
        HostValue::BoolVector(vec![Some(value)])
    }

    pub fn symbol(name: impl Into<String>) -> Self {
        HostValue::Symbol(name.into())
    }

    pub fn var(name: impl Into<String>) -> Self {
        HostValue::VariableRef(name.into())
    }

    pub fn call(functor: impl Into<String>, args: Vec<HostValue>) -> Self {
        HostValue::Call(Call::positional(functor, args))
    }

    pub fn list(items: impl IntoIterator<Item = HostValue>) -> Self {
        HostValue::NamedList(items.into_iter().map(Arg::positional).collect())
    }

    /// Logical missing value, the decoding of a bare `na` atom.
    pub fn na() -> Self {
        HostValue::BoolVector(vec![None])
    }

    pub fn as_variable(&self) -> Option<&str> {
        match self {
            HostValue::VariableRef(name) => Some(name),
            _ => None,
        }
    }
}
