//! The narrow interface to the logic engine.
//!
//! The engine is an opaque solver. The bridge only asks it to run a
//! predicate once, to open a query and pull solutions from it one at a time,
//! and to close that query again. Everything else (unification,
//! backtracking, the clause database, file loading) stays on the engine's
//! side of this trait.

use std::fmt::{self, Display, Formatter};

use crate::store::TermStore;
use crate::term::{QueryId, Term};

/// Failure raised inside the engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineError {
    /// Engine-rendered description of the exception.
    pub message: String,
    /// The exception term, when the engine raised one.
    pub exception: Option<Term>,
}

impl EngineError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            exception: None,
        }
    }

    pub fn raised(exception: Term, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            exception: Some(exception),
        }
    }
}

impl Display for EngineError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for EngineError {}

pub type EngineResult<T> = Result<T, EngineError>;

/// Outcome of a foreign predicate call made by the engine into the host.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ForeignReply {
    Succeed,
    Fail,
    /// Succeed after unifying argument `position` (0-based) with `value`.
    Unify { position: usize, value: Term },
}

/// Host-side handler for foreign predicates.
///
/// An `Err` carries an exception term the engine must raise in place of the
/// call, so its own catch/recovery machinery decides what happens next.
pub trait ForeignHandler {
    fn call_foreign(
        &mut self,
        store: &mut dyn TermStore,
        predicate: &str,
        args: &[Term],
    ) -> Result<ForeignReply, Term>;
}

/// Handler that fails every foreign call.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoForeign;

impl ForeignHandler for NoForeign {
    fn call_foreign(
        &mut self,
        _store: &mut dyn TermStore,
        _predicate: &str,
        _args: &[Term],
    ) -> Result<ForeignReply, Term> {
        Ok(ForeignReply::Fail)
    }
}

/// A logic engine the session can drive.
///
/// Calls that may run goals take the foreign handler of the moment; the
/// engine routes calls to registered foreign predicates through it.
pub trait Engine: TermStore {
    /// Process-level start-up. `argv[0]` names the host executable.
    fn initialise(&mut self, argv: &[&str]) -> EngineResult<()>;

    /// Process-level teardown.
    fn cleanup(&mut self);

    /// Make `name/arity` callable from logic code; calls are routed to the
    /// foreign handler passed to `call` or `next_solution`.
    fn register_foreign(&mut self, name: &str, arity: usize) -> EngineResult<()>;

    /// Run `predicate(args...)` once and discard its choice points.
    fn call(
        &mut self,
        predicate: &str,
        args: &[Term],
        foreign: &mut dyn ForeignHandler,
    ) -> EngineResult<bool>;

    /// Open a query for `predicate(args...)`. No solution is computed yet.
    fn open_query(&mut self, predicate: &str, args: Vec<Term>) -> EngineResult<QueryId>;

    /// Advance `query` to its next solution. `Ok(false)` means exhausted.
    fn next_solution(
        &mut self,
        query: QueryId,
        foreign: &mut dyn ForeignHandler,
    ) -> EngineResult<bool>;

    /// Close `query`, undoing its bindings and running cleanup handlers.
    fn close_query(&mut self, query: QueryId);

    /// Reset the engine's pending-exception state.
    fn clear_exception(&mut self);
}
