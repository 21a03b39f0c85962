//! Host evaluation on behalf of the engine.
//!
//! The session registers two foreign predicates with the engine:
//!
//! * `host_eval(Expr)` evaluates `Expr` for its side effects.
//! * `host_eval(Expr, Result)` evaluates `Expr` and unifies `Result` with the
//!   encoded value.
//!
//! While a query is open, arguments are decoded and results encoded with that
//! query's options. Otherwise [`CodecOptions::default`] applies. A failing
//! evaluation raises `host_eval(Expr, Message)` inside the engine.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, warn};

use crate::bindings::VariableTable;
use crate::codec::{decode, encode};
use crate::engine::{ForeignHandler, ForeignReply};
use crate::options::CodecOptions;
use crate::store::TermStore;
use crate::term::Term;
use crate::value::HostValue;

/// Name of the foreign predicates the bridge answers.
pub const EVAL_PREDICATE: &str = "host_eval";

/// Message used when the evaluator panics.
const PANIC_MESSAGE: &str = "exception occurred";

/// Failure reported by an [`Evaluator`].
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct EvalError {
    pub message: String,
}

impl EvalError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// The host environment that evaluates expressions sent by the engine.
pub trait Evaluator {
    fn eval(&self, expr: &HostValue) -> Result<HostValue, EvalError>;
}

pub type SharedEvaluator = Arc<dyn Evaluator + Send + Sync>;

pub type EvaluatorCallback =
    dyn Fn(&HostValue) -> Result<HostValue, EvalError> + Send + Sync + 'static;

#[derive(Clone)]
pub struct CallbackEvaluator {
    callback: Arc<EvaluatorCallback>,
}

impl CallbackEvaluator {
    pub fn new(callback: Arc<EvaluatorCallback>) -> Self {
        Self { callback }
    }
}

impl Evaluator for CallbackEvaluator {
    fn eval(&self, expr: &HostValue) -> Result<HostValue, EvalError> {
        (self.callback)(expr)
    }
}

pub fn evaluator_from_callback<F>(callback: F) -> SharedEvaluator
where
    F: Fn(&HostValue) -> Result<HostValue, EvalError> + Send + Sync + 'static,
{
    Arc::new(CallbackEvaluator::new(Arc::new(callback)))
}

/// Foreign handler answering `host_eval/1` and `host_eval/2`.
pub(crate) struct CallbackBridge<'a> {
    options: &'a CodecOptions,
    env: Option<&'a SharedEvaluator>,
}

impl<'a> CallbackBridge<'a> {
    pub(crate) fn new(options: &'a CodecOptions, env: Option<&'a SharedEvaluator>) -> Self {
        Self { options, env }
    }

    fn evaluate(&self, store: &dyn TermStore, expr: &Term) -> Result<HostValue, String> {
        let env = self
            .env
            .ok_or_else(|| "no evaluation environment".to_string())?;
        let value =
            decode(expr, self.options, &VariableTable::new(), store).map_err(|e| e.to_string())?;
        match panic::catch_unwind(AssertUnwindSafe(|| env.eval(&value))) {
            Ok(result) => result.map_err(|e| e.message),
            Err(_) => Err(PANIC_MESSAGE.to_string()),
        }
    }

    fn reply(
        &self,
        store: &mut dyn TermStore,
        args: &[Term],
    ) -> Result<ForeignReply, String> {
        let result = self.evaluate(store, &args[0])?;
        if args.len() == 1 {
            return Ok(ForeignReply::Succeed);
        }
        let value = encode(&result, self.options, &mut VariableTable::new(), store)
            .map_err(|e| e.to_string())?;
        Ok(ForeignReply::Unify { position: 1, value })
    }
}

impl ForeignHandler for CallbackBridge<'_> {
    fn call_foreign(
        &mut self,
        store: &mut dyn TermStore,
        predicate: &str,
        args: &[Term],
    ) -> Result<ForeignReply, Term> {
        if predicate != EVAL_PREDICATE || !matches!(args.len(), 1 | 2) {
            warn!(predicate, arity = args.len(), "unknown foreign predicate");
            return Ok(ForeignReply::Fail);
        }
        debug!(expr = %args[0], "evaluating on behalf of the engine");
        self.reply(store, args).map_err(|message| {
            Term::compound(
                EVAL_PREDICATE,
                vec![args[0].clone(), Term::atom(message)],
            )
        })
    }
}
