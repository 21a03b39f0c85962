//! A small in-memory logic engine for driving the session in tests.
//!
//! It knows conjunction, `call/1`, `=/2`, `is/2`, `member/2`, `fail`,
//! `throw/1`, `term_string/3`, `consult/1` and any registered foreign
//! predicate. Solutions are enumerated eagerly on the first
//! `next_solution` and then handed out one by one.
#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};

use plbridge::{
    Engine, EngineError, EngineResult, ForeignHandler, ForeignReply, QueryId, Term, TermStore,
    VarId,
};

type Subst = HashMap<VarId, Term>;

#[derive(Default)]
pub struct TestEngine {
    next_var: u64,
    next_query: u64,
    installed: Subst,
    foreign: Vec<(String, usize)>,
    queries: HashMap<QueryId, TestQuery>,
    files: HashSet<String>,
    pub consulted: Vec<String>,
    pub argv: Vec<String>,
    pub cleaned_up: bool,
    pub exceptions_cleared: usize,
    pub queries_closed: usize,
    pub refuse_queries: bool,
    /// Make `term_string/3` raise instead of rendering.
    pub term_string_raises: bool,
}

struct TestQuery {
    goal: Term,
    solutions: Option<VecDeque<Subst>>,
}

impl TestEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `name` a file `consult/1` can load.
    pub fn with_file(mut self, name: &str) -> Self {
        self.files.insert(name.to_string());
        self
    }

    pub fn open_queries(&self) -> usize {
        self.queries.len()
    }

    pub fn foreign_predicates(&self) -> &[(String, usize)] {
        &self.foreign
    }

    fn solve(
        &mut self,
        goal: &Term,
        handler: &mut dyn ForeignHandler,
        limit: Option<usize>,
    ) -> EngineResult<Vec<Subst>> {
        let mut solver = Solver {
            next_var: &mut self.next_var,
            foreign: &self.foreign,
            files: &self.files,
            consulted: &mut self.consulted,
            term_string_raises: self.term_string_raises,
            handler,
            limit,
        };
        let mut out = Vec::new();
        solver.solve(std::slice::from_ref(goal), Subst::new(), &mut out)?;
        Ok(out)
    }
}

impl TermStore for TestEngine {
    fn fresh_variable(&mut self) -> VarId {
        let var = VarId(self.next_var);
        self.next_var += 1;
        var
    }

    fn binding(&self, var: VarId) -> Option<Term> {
        self.installed.get(&var).cloned()
    }
}

impl Engine for TestEngine {
    fn initialise(&mut self, argv: &[&str]) -> EngineResult<()> {
        match argv.first() {
            Some(program) if !program.is_empty() => {
                self.argv = argv.iter().map(|arg| arg.to_string()).collect();
                Ok(())
            }
            _ => Err(EngineError::new("missing program name")),
        }
    }

    fn cleanup(&mut self) {
        self.cleaned_up = true;
        self.queries.clear();
        self.installed.clear();
    }

    fn register_foreign(&mut self, name: &str, arity: usize) -> EngineResult<()> {
        self.foreign.push((name.to_string(), arity));
        Ok(())
    }

    fn call(
        &mut self,
        predicate: &str,
        args: &[Term],
        foreign: &mut dyn ForeignHandler,
    ) -> EngineResult<bool> {
        let goal = goal_term(predicate, args.to_vec());
        let solutions = self.solve(&goal, foreign, Some(1))?;
        Ok(!solutions.is_empty())
    }

    fn open_query(&mut self, predicate: &str, args: Vec<Term>) -> EngineResult<QueryId> {
        if self.refuse_queries {
            return Err(EngineError::new("not enough resources"));
        }
        let id = QueryId(self.next_query);
        self.next_query += 1;
        self.queries.insert(
            id,
            TestQuery {
                goal: goal_term(predicate, args),
                solutions: None,
            },
        );
        Ok(id)
    }

    fn next_solution(
        &mut self,
        query: QueryId,
        foreign: &mut dyn ForeignHandler,
    ) -> EngineResult<bool> {
        let goal = match self.queries.get(&query) {
            None => return Err(EngineError::new(format!("no such query {}", query.0))),
            Some(open) if open.solutions.is_none() => Some(open.goal.clone()),
            Some(_) => None,
        };
        if let Some(goal) = goal {
            let solutions = self.solve(&goal, foreign, None)?;
            if let Some(open) = self.queries.get_mut(&query) {
                open.solutions = Some(solutions.into());
            }
        }
        let next = self
            .queries
            .get_mut(&query)
            .and_then(|open| open.solutions.as_mut())
            .and_then(VecDeque::pop_front);
        match next {
            Some(subst) => {
                self.installed = subst;
                Ok(true)
            }
            None => {
                self.installed.clear();
                Ok(false)
            }
        }
    }

    fn close_query(&mut self, query: QueryId) {
        if self.queries.remove(&query).is_some() {
            self.queries_closed += 1;
        }
        self.installed.clear();
    }

    fn clear_exception(&mut self) {
        self.exceptions_cleared += 1;
    }
}

struct Solver<'a> {
    next_var: &'a mut u64,
    foreign: &'a [(String, usize)],
    files: &'a HashSet<String>,
    consulted: &'a mut Vec<String>,
    term_string_raises: bool,
    handler: &'a mut dyn ForeignHandler,
    limit: Option<usize>,
}

impl Solver<'_> {
    fn solve(&mut self, goals: &[Term], subst: Subst, out: &mut Vec<Subst>) -> EngineResult<()> {
        if self.limit.is_some_and(|limit| out.len() >= limit) {
            return Ok(());
        }
        let Some((goal, rest)) = goals.split_first() else {
            out.push(subst);
            return Ok(());
        };
        let goal = walk(&subst, goal).clone();
        match &goal {
            Term::Variable(_) => Err(instantiation_error()),
            Term::Atom(name) => self.predicate(name, &[], rest, subst, out),
            Term::Compound { functor, args } => self.predicate(functor, args, rest, subst, out),
            other => Err(type_error("callable", other)),
        }
    }

    fn predicate(
        &mut self,
        name: &str,
        args: &[Term],
        rest: &[Term],
        subst: Subst,
        out: &mut Vec<Subst>,
    ) -> EngineResult<()> {
        match (name, args) {
            ("true", []) => self.solve(rest, subst, out),
            ("fail", []) | ("false", []) => Ok(()),
            (",", [left, right]) => {
                let goals = [left.clone(), right.clone()]
                    .into_iter()
                    .chain(rest.iter().cloned())
                    .collect::<Vec<_>>();
                self.solve(&goals, subst, out)
            }
            ("call", [inner]) => {
                let goals = std::iter::once(inner.clone())
                    .chain(rest.iter().cloned())
                    .collect::<Vec<_>>();
                self.solve(&goals, subst, out)
            }
            ("=", [left, right]) => match unify(subst, left, right) {
                Some(subst) => self.solve(rest, subst, out),
                None => Ok(()),
            },
            ("is", [left, right]) => {
                let value = eval(&subst, right)?;
                match unify(subst, left, &value) {
                    Some(subst) => self.solve(rest, subst, out),
                    None => Ok(()),
                }
            }
            ("member", [item, list]) => {
                let mut current = walk(&subst, list);
                while let Term::List(head, tail) = current {
                    if let Some(next) = unify(subst.clone(), item, head) {
                        self.solve(rest, next, out)?;
                    }
                    current = walk(&subst, tail);
                }
                Ok(())
            }
            ("throw", [ball]) => {
                let ball = resolve(&subst, ball);
                Err(EngineError::raised(
                    ball.clone(),
                    format!("Unknown message: {ball}"),
                ))
            }
            ("term_string", [term, _, _]) if self.term_string_raises => {
                let ball = error_term(Term::compound(
                    "resource_error",
                    vec![Term::atom("memory")],
                ));
                Err(EngineError::raised(
                    ball,
                    format!("cannot write {}", resolve(&subst, term)),
                ))
            }
            ("term_string", [term, text, _options]) => {
                let rendered = Term::string(render(&resolve(&subst, term)));
                match unify(subst, text, &rendered) {
                    Some(subst) => self.solve(rest, subst, out),
                    None => Ok(()),
                }
            }
            ("consult", [file]) => match walk(&subst, file) {
                Term::Atom(file) if self.files.contains(file) => {
                    self.consulted.push(file.clone());
                    self.solve(rest, subst, out)
                }
                other => {
                    let ball = error_term(Term::compound(
                        "existence_error",
                        vec![Term::atom("source_sink"), other.clone()],
                    ));
                    Err(EngineError::raised(
                        ball,
                        format!("source_sink `{other}' does not exist"),
                    ))
                }
            },
            _ if self.is_foreign(name, args.len()) => {
                self.foreign_call(name, args, rest, subst, out)
            }
            _ => {
                let indicator = Term::compound(
                    "/",
                    vec![Term::atom(name), Term::Integer(args.len() as i64)],
                );
                let ball = error_term(Term::compound(
                    "existence_error",
                    vec![Term::atom("procedure"), indicator.clone()],
                ));
                Err(EngineError::raised(
                    ball,
                    format!("Unknown procedure: {indicator}"),
                ))
            }
        }
    }

    fn is_foreign(&self, name: &str, arity: usize) -> bool {
        self.foreign
            .iter()
            .any(|(known, known_arity)| known == name && *known_arity == arity)
    }

    fn foreign_call(
        &mut self,
        name: &str,
        args: &[Term],
        rest: &[Term],
        subst: Subst,
        out: &mut Vec<Subst>,
    ) -> EngineResult<()> {
        let mut scratch = Scratch {
            bindings: &subst,
            next_var: &mut *self.next_var,
        };
        let reply = self.handler.call_foreign(&mut scratch, name, args);
        match reply {
            Ok(ForeignReply::Succeed) => self.solve(rest, subst, out),
            Ok(ForeignReply::Fail) => Ok(()),
            Ok(ForeignReply::Unify { position, value }) => {
                let unified = args
                    .get(position)
                    .and_then(|arg| unify(subst.clone(), arg, &value));
                match unified {
                    Some(next) => self.solve(rest, next, out),
                    None => Ok(()),
                }
            }
            Err(ball) => Err(EngineError::raised(
                ball.clone(),
                format!("Unknown message: {ball}"),
            )),
        }
    }
}

/// The store foreign predicates see while the solver runs.
struct Scratch<'a> {
    bindings: &'a Subst,
    next_var: &'a mut u64,
}

impl TermStore for Scratch<'_> {
    fn fresh_variable(&mut self) -> VarId {
        let var = VarId(*self.next_var);
        *self.next_var += 1;
        var
    }

    fn binding(&self, var: VarId) -> Option<Term> {
        self.bindings.get(&var).cloned()
    }
}

fn goal_term(predicate: &str, args: Vec<Term>) -> Term {
    if args.is_empty() {
        Term::atom(predicate)
    } else {
        Term::compound(predicate, args)
    }
}

fn walk<'t>(subst: &'t Subst, mut term: &'t Term) -> &'t Term {
    while let Term::Variable(var) = term {
        match subst.get(var) {
            Some(next) => term = next,
            None => break,
        }
    }
    term
}

/// Substitute all bindings. Only safe on acyclic terms.
fn resolve(subst: &Subst, term: &Term) -> Term {
    match walk(subst, term) {
        Term::Compound { functor, args } => Term::Compound {
            functor: functor.clone(),
            args: args.iter().map(|arg| resolve(subst, arg)).collect(),
        },
        Term::List(..) => {
            let mut heads = Vec::new();
            let mut current = walk(subst, term);
            while let Term::List(head, tail) = current {
                heads.push(resolve(subst, head));
                current = walk(subst, tail);
            }
            let tail = resolve(subst, current);
            heads
                .into_iter()
                .rev()
                .fold(tail, |tail, head| Term::cons(head, tail))
        }
        other => other.clone(),
    }
}

/// Unification without occurs check.
fn unify(mut subst: Subst, left: &Term, right: &Term) -> Option<Subst> {
    let mut pending = vec![(left.clone(), right.clone())];
    while let Some((left, right)) = pending.pop() {
        let (left, right) = (walk(&subst, &left).clone(), walk(&subst, &right).clone());
        match (&left, &right) {
            (Term::Variable(x), Term::Variable(y)) if x == y => {}
            (Term::Variable(var), _) => {
                subst.insert(*var, right.clone());
            }
            (_, Term::Variable(var)) => {
                subst.insert(*var, left.clone());
            }
            (
                Term::Compound { functor, args },
                Term::Compound {
                    functor: other_functor,
                    args: other_args,
                },
            ) => {
                if functor != other_functor || args.len() != other_args.len() {
                    return None;
                }
                pending.extend(args.iter().cloned().zip(other_args.iter().cloned()));
            }
            (Term::List(head, tail), Term::List(other_head, other_tail)) => {
                pending.push(((**head).clone(), (**other_head).clone()));
                pending.push(((**tail).clone(), (**other_tail).clone()));
            }
            (left, right) => {
                if left != right {
                    return None;
                }
            }
        }
    }
    Some(subst)
}

fn eval(subst: &Subst, term: &Term) -> EngineResult<Term> {
    match walk(subst, term) {
        number @ (Term::Integer(_) | Term::Float(_)) => Ok(number.clone()),
        Term::Variable(_) => Err(instantiation_error()),
        Term::Compound { functor, args } if args.len() == 2 => {
            let left = eval(subst, &args[0])?;
            let right = eval(subst, &args[1])?;
            match (functor.as_str(), &left, &right) {
                ("+", Term::Integer(x), Term::Integer(y)) => Ok(Term::Integer(x + y)),
                ("-", Term::Integer(x), Term::Integer(y)) => Ok(Term::Integer(x - y)),
                ("*", Term::Integer(x), Term::Integer(y)) => Ok(Term::Integer(x * y)),
                (op @ ("+" | "-" | "*" | "/"), _, _) => {
                    let (x, y) = (as_f64(&left), as_f64(&right));
                    Ok(Term::float(match op {
                        "+" => x + y,
                        "-" => x - y,
                        "*" => x * y,
                        _ => x / y,
                    }))
                }
                _ => Err(type_error("evaluable", &Term::atom(functor.as_str()))),
            }
        }
        other => Err(type_error("evaluable", other)),
    }
}

fn as_f64(term: &Term) -> f64 {
    match term {
        Term::Integer(v) => *v as f64,
        Term::Float(v) => v.0,
        _ => f64::NAN,
    }
}

/// What `term_string/3` writes with `quoted(false)` and
/// `spacing(next_argument)`.
fn render(term: &Term) -> String {
    match term {
        Term::Atom(name) => name.clone(),
        Term::String(text) => text.clone(),
        Term::Compound { functor, args } => {
            let args = args.iter().map(render).collect::<Vec<_>>();
            format!("{functor}({})", args.join(", "))
        }
        Term::List(_, _) => {
            let mut items = Vec::new();
            let mut current = term;
            let tail = loop {
                match current {
                    Term::List(head, tail) => {
                        items.push(render(head));
                        current = tail;
                    }
                    Term::Nil => break String::new(),
                    other => break format!("|{}", render(other)),
                }
            };
            format!("[{}{tail}]", items.join(", "))
        }
        other => other.to_string(),
    }
}

fn error_term(formal: Term) -> Term {
    Term::compound("error", vec![formal, Term::Nil])
}

fn instantiation_error() -> EngineError {
    EngineError::raised(
        error_term(Term::atom("instantiation_error")),
        "Arguments are not sufficiently instantiated",
    )
}

fn type_error(expected: &str, culprit: &Term) -> EngineError {
    EngineError::raised(
        error_term(Term::compound(
            "type_error",
            vec![Term::atom(expected), culprit.clone()],
        )),
        format!("Type error: `{expected}' expected, found `{culprit}'"),
    )
}
