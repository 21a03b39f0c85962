use tracing::warn;

use crate::bindings::VariableTable;
use crate::callback::CallbackBridge;
use crate::codec::{decode, encode};
use crate::engine::Engine;
use crate::error::{BridgeError, BridgeResult};
use crate::options::CodecOptions;
use crate::session::Session;
use crate::term::Term;
use crate::value::HostValue;

const TERM_STRING_PREDICATE: &str = "term_string";

/// `[quoted(false), spacing(next_argument)]`
fn write_options() -> Term {
    Term::list([
        Term::compound("quoted", vec![Term::atom("false")]),
        Term::compound("spacing", vec![Term::atom("next_argument")]),
    ])
}

impl<E: Engine> Session<E> {
    /// Render `goal` the way the engine writes it, with host variables shown
    /// by name.
    ///
    /// Portraying needs the engine to itself, so an open query is closed
    /// first.
    pub fn portray(&mut self, goal: &HostValue, options: &CodecOptions) -> BridgeResult<HostValue> {
        if let Some(open) = self.goal() {
            warn!(goal = %open, "closing open query before portray");
            self.close();
        }
        let options = options.clone().with_atomize(true);
        let mut table = VariableTable::new();
        let term = encode(goal, &options, &mut table, &mut self.engine)?;
        let failure = |message: String| BridgeError::Portray {
            goal: term.to_string(),
            message,
        };

        let text = self.engine.fresh_variable();
        let opened = self.engine.open_query(
            TERM_STRING_PREDICATE,
            vec![term.clone(), Term::Variable(text), write_options()],
        );
        let query = match opened {
            Ok(query) => query,
            Err(e) => {
                self.engine.clear_exception();
                return Err(failure(e.message));
            }
        };
        let mut bridge = CallbackBridge::new(&options, self.evaluator.as_ref());
        let rendered = match self.engine.next_solution(query, &mut bridge) {
            Ok(true) => decode(&Term::Variable(text), &options, &table, &self.engine),
            Ok(false) => Err(failure(format!("{TERM_STRING_PREDICATE}/3 failed"))),
            Err(e) => {
                self.engine.clear_exception();
                Err(failure(e.message))
            }
        };
        self.engine.close_query(query);
        rendered
    }
}
