/* Copyright (c) 2026 Olle Mårtensson. This Source Code Form is subject to the terms of the Eclipse Public License, v. 2.0. */
//! plbridge: a bridge between a host value model and a logic-programming
//! engine.
//!
//! The crate translates host values (typed vectors with missing slots,
//! matrices, calls, named lists, closures) to engine terms and back, and
//! drives an [`Engine`] through a single-query lifecycle: open a goal, pull
//! one solution at a time as named bindings, close. The engine can call back
//! into the host through the `host_eval/1` and `host_eval/2` predicates.
//!
//! # Examples
//! ```
//! use plbridge::{decode, encode, CodecOptions, HostValue, LocalStore, Term, VariableTable};
//!
//! let options = CodecOptions::default();
//! let mut store = LocalStore::new();
//! let mut table = VariableTable::new();
//!
//! let value = HostValue::ints([Some(1), None, Some(3)]);
//! let term = encode(&value, &options, &mut table, &mut store).expect("encode");
//! assert_eq!(
//!     term,
//!     Term::compound("%", vec![Term::Integer(1), Term::na(), Term::Integer(3)])
//! );
//!
//! let decoded = decode(&term, &options, &table, &store).expect("decode");
//! assert_eq!(decoded, value);
//! ```

mod error;

pub mod bindings;
pub mod callback;
pub mod codec;
pub mod engine;
pub mod options;
mod portray;
pub mod session;
pub mod store;
pub mod term;
pub mod value;

pub use bindings::VariableTable;
pub use callback::{
    evaluator_from_callback, CallbackEvaluator, EvalError, Evaluator, SharedEvaluator,
    EVAL_PREDICATE,
};
pub use codec::{decode, encode};
pub use engine::{Engine, EngineError, EngineResult, ForeignHandler, ForeignReply, NoForeign};
pub use error::{BridgeError, BridgeResult};
pub use options::{CodecOptions, OptionValue, TagKind};
pub use session::{Bindings, QueryState, Session};
pub use store::{deref, LocalStore, TermStore};
pub use term::{QueryId, Term, VarId};
pub use value::{Arg, Call, Closure, Formal, HostValue, Matrix};
