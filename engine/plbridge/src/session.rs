//! The query session: at most one open query against one engine.

use tracing::{debug, trace, warn};

use crate::bindings::VariableTable;
use crate::callback::{CallbackBridge, SharedEvaluator, EVAL_PREDICATE};
use crate::codec::{decode, encode};
use crate::engine::{Engine, EngineError};
use crate::error::{BridgeError, BridgeResult};
use crate::options::CodecOptions;
use crate::term::{QueryId, Term};
use crate::value::HostValue;

const CALL_PREDICATE: &str = "call";
const CONSULT_PREDICATE: &str = "consult";

/// Where the session's query handle is in its lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QueryState {
    /// No query has been opened yet.
    Unopened,
    Open,
    /// The last query was exhausted or closed.
    Closed,
}

/// One solution: host variable names and their values, in the order the
/// variables first appeared in the goal.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Bindings {
    entries: Vec<(String, HostValue)>,
}

impl Bindings {
    pub fn get(&self, name: &str) -> Option<&HostValue> {
        self.entries
            .iter()
            .find(|(known, _)| known == name)
            .map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &HostValue)> {
        self.entries
            .iter()
            .map(|(name, value)| (name.as_str(), value))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }
}

impl IntoIterator for Bindings {
    type Item = (String, HostValue);
    type IntoIter = std::vec::IntoIter<(String, HostValue)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

struct OpenQuery {
    id: QueryId,
    goal: Term,
    table: VariableTable,
    options: CodecOptions,
    env: Option<SharedEvaluator>,
}

/// Drives an [`Engine`] through the query lifecycle.
///
/// A session owns the engine and holds the single query handle. Opening a
/// second query while one is open is an error; closing is idempotent.
pub struct Session<E: Engine> {
    pub(crate) engine: E,
    initialised: bool,
    query: Option<OpenQuery>,
    state: QueryState,
    pub(crate) evaluator: Option<SharedEvaluator>,
}

impl<E: Engine> Session<E> {
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            initialised: false,
            query: None,
            state: QueryState::Unopened,
            evaluator: None,
        }
    }

    /// Evaluator used by `host_eval` when the caller does not pass one.
    pub fn with_evaluator(mut self, evaluator: SharedEvaluator) -> Self {
        self.evaluator = Some(evaluator);
        self
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn into_engine(mut self) -> E {
        self.close();
        self.engine
    }

    pub fn state(&self) -> QueryState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.query.is_some()
    }

    pub fn is_initialised(&self) -> bool {
        self.initialised
    }

    /// The goal term of the open query, if any.
    pub fn goal(&self) -> Option<&Term> {
        self.query.as_ref().map(|query| &query.goal)
    }

    /// Start the engine and register the `host_eval` predicates. A second
    /// call only warns.
    pub fn init(&mut self, argv0: &str) -> BridgeResult<()> {
        if self.initialised {
            warn!(argv0, "engine already initialised");
            return Ok(());
        }
        self.engine
            .initialise(&[argv0])
            .map_err(|e| BridgeError::Initialisation(e.message))?;
        for arity in [1, 2] {
            self.engine
                .register_foreign(EVAL_PREDICATE, arity)
                .map_err(|e| BridgeError::Initialisation(e.message))?;
        }
        self.initialised = true;
        debug!(argv0, "engine initialised");
        Ok(())
    }

    /// Close any open query and shut the engine down.
    pub fn done(&mut self) {
        if !self.initialised {
            warn!("engine not initialised");
            return;
        }
        self.close();
        self.engine.cleanup();
        self.initialised = false;
        debug!("engine cleaned up");
    }

    /// Load each file in turn, stopping at the first one that fails.
    pub fn consult<S: AsRef<str>>(&mut self, files: &[S]) -> BridgeResult<()> {
        let options = CodecOptions::default();
        for file in files {
            let file = file.as_ref();
            let mut bridge = CallbackBridge::new(&options, self.evaluator.as_ref());
            let result = self
                .engine
                .call(CONSULT_PREDICATE, &[Term::atom(file)], &mut bridge);
            let message = match result {
                Ok(true) => {
                    debug!(file, "consulted");
                    continue;
                }
                Ok(false) => "consult failed".to_string(),
                Err(e) => {
                    self.engine.clear_exception();
                    e.message
                }
            };
            return Err(BridgeError::Consult {
                file: file.to_string(),
                message,
            });
        }
        Ok(())
    }

    /// Run `goal` once and discard its bindings.
    pub fn call(
        &mut self,
        goal: &HostValue,
        options: &CodecOptions,
        env: Option<SharedEvaluator>,
    ) -> BridgeResult<bool> {
        let options = options.clone().with_atomize(false);
        let term = encode(goal, &options, &mut VariableTable::new(), &mut self.engine)?;
        let env = env.or_else(|| self.evaluator.clone());
        let mut bridge = CallbackBridge::new(&options, env.as_ref());
        trace!(goal = %term, "call");
        self.engine
            .call(CALL_PREDICATE, &[term], &mut bridge)
            .map_err(|e| self.engine_failure(e))
    }

    /// Open a query for `goal`. Variables are always encoded as engine
    /// variables here, whatever `options.atomize` says.
    pub fn open(
        &mut self,
        goal: &HostValue,
        options: &CodecOptions,
        env: Option<SharedEvaluator>,
    ) -> BridgeResult<()> {
        if let Some(open) = &self.query {
            warn!(goal = %open.goal, "a query is already open");
            return Err(BridgeError::SimultaneousQuery);
        }
        let options = options.clone().with_atomize(false);
        let mut table = VariableTable::new();
        let goal = encode(goal, &options, &mut table, &mut self.engine)?;
        let id = match self.engine.open_query(CALL_PREDICATE, vec![goal.clone()]) {
            Ok(id) => id,
            Err(e) => {
                self.engine.clear_exception();
                return Err(BridgeError::QueryNotCreated(e.message));
            }
        };
        debug!(goal = %goal, variables = table.len(), "query opened");
        self.query = Some(OpenQuery {
            id,
            goal,
            table,
            options,
            env: env.or_else(|| self.evaluator.clone()),
        });
        self.state = QueryState::Open;
        Ok(())
    }

    /// Ask for the next solution.
    ///
    /// `Ok(None)` means there are no more solutions; the query is closed.
    /// An engine exception also closes the query and is returned as an error.
    pub fn step(&mut self) -> BridgeResult<Option<Bindings>> {
        let query = self.query.as_ref().ok_or(BridgeError::NoOpenQuery)?;
        let mut bridge = CallbackBridge::new(&query.options, query.env.as_ref());
        match self.engine.next_solution(query.id, &mut bridge) {
            Ok(true) => self.solution().map(Some),
            Ok(false) => {
                debug!("no more solutions");
                self.close();
                Ok(None)
            }
            Err(e) => {
                let err = self.engine_failure(e);
                self.close();
                Err(err)
            }
        }
    }

    /// Same as [`Session::step`].
    pub fn submit(&mut self) -> BridgeResult<Option<Bindings>> {
        self.step()
    }

    /// Release the open query. Does nothing when no query is open.
    pub fn close(&mut self) {
        if let Some(query) = self.query.take() {
            self.engine.close_query(query.id);
            self.state = QueryState::Closed;
            debug!(goal = %query.goal, "query closed");
        }
    }

    /// Same as [`Session::close`].
    pub fn clear(&mut self) {
        self.close();
    }

    /// The first solution of `goal`, if any.
    pub fn once(
        &mut self,
        goal: &HostValue,
        options: &CodecOptions,
        env: Option<SharedEvaluator>,
    ) -> BridgeResult<Option<Bindings>> {
        self.open(goal, options, env)?;
        let solution = self.step();
        self.close();
        solution
    }

    /// Every solution of `goal`, in the order the engine produces them.
    pub fn findall(
        &mut self,
        goal: &HostValue,
        options: &CodecOptions,
        env: Option<SharedEvaluator>,
    ) -> BridgeResult<Vec<Bindings>> {
        self.open(goal, options, env)?;
        let mut solutions = Vec::new();
        loop {
            match self.step() {
                Ok(Some(bindings)) => solutions.push(bindings),
                Ok(None) => break,
                Err(e) => {
                    self.close();
                    return Err(e);
                }
            }
        }
        self.close();
        Ok(solutions)
    }

    /// Decode the current bindings of the open query. A variable that is
    /// still unbound would only map to itself and is left out.
    fn solution(&self) -> BridgeResult<Bindings> {
        let query = self.query.as_ref().ok_or(BridgeError::NoOpenQuery)?;
        let mut entries = Vec::with_capacity(query.table.len());
        for (name, var) in query.table.iter() {
            let value = decode(
                &Term::Variable(var),
                &query.options,
                &query.table,
                &self.engine,
            )?;
            if value.as_variable() == Some(name) {
                continue;
            }
            entries.push((name.to_string(), value));
        }
        trace!(bindings = entries.len(), "solution");
        Ok(Bindings { entries })
    }

    pub(crate) fn engine_failure(&mut self, error: EngineError) -> BridgeError {
        self.engine.clear_exception();
        warn!(message = %error.message, "engine raised an exception");
        BridgeError::Engine(error)
    }
}
