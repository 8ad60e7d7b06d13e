//! Depth-first SLD resolution over a continuation of pending goals.
//!
//! The solver backtracks internally (across clause alternatives, primitive
//! alternatives and disjunction branches) but stops at the first complete
//! proof. Control constructs are handled here rather than in a library so
//! they cannot be shadowed.
//!
//! Resolution runs in a loop over heap-allocated goal and choice-point
//! stacks, so the depth of a proof is bounded by `max_depth` and never by
//! the native stack of the calling thread.

use std::rc::Rc;
use std::sync::Arc;
use std::vec;

use crate::bindings::Bindings;
use crate::engine::SolveOptions;
use crate::error::EvalError;
use crate::library::{Clause, Context, Library, Primitive};
use crate::registry::ComponentRegistry;
use crate::term::{Signature, Term};

enum Goal {
    /// Prove `term`, reached through `depth` clause resolutions.
    Call { term: Term, depth: usize },
    /// The inner goal of a negation was proved: drop every choice point
    /// from index `choice` up and fail.
    NegationProved { choice: usize },
}

struct Frame {
    goal: Goal,
    next: Continuation,
}

// Unlinks the chain iteratively so long continuations do not recurse on drop.
impl Drop for Frame {
    fn drop(&mut self) {
        let mut next = self.next.take();
        while let Some(frame) = next {
            match Rc::try_unwrap(frame) {
                Ok(mut frame) => next = frame.next.take(),
                Err(_) => break,
            }
        }
    }
}

/// Goals still to prove after the current one.
type Continuation = Option<Rc<Frame>>;

fn push(goal: Goal, next: Continuation) -> Continuation {
    Some(Rc::new(Frame { goal, next }))
}

fn call(term: Term, depth: usize, next: Continuation) -> Continuation {
    push(Goal::Call { term, depth }, next)
}

/// Untried alternatives, resumed on backtracking.
enum Alternatives {
    /// A single fallback continuation: the right branch of a disjunction,
    /// or what follows a negation whose inner goal failed.
    Resume(Continuation),
    Answers {
        remaining: vec::IntoIter<Vec<(Term, Term)>>,
        next: Continuation,
    },
    Clauses {
        goal: Term,
        remaining: vec::IntoIter<Clause>,
        depth: usize,
        next: Continuation,
    },
}

struct ChoicePoint {
    /// Trail length when the choice point was created.
    mark: usize,
    alternatives: Alternatives,
}

enum Step {
    Continue(Continuation),
    Fail,
}

pub(crate) struct Solver<'a> {
    libraries: &'a [Arc<Library>],
    registry: &'a ComponentRegistry,
    options: &'a SolveOptions,
    bindings: Bindings,
    choices: Vec<ChoicePoint>,
    inferences: usize,
    next_scope: u32,
}

impl<'a> Solver<'a> {
    pub(crate) fn new(
        libraries: &'a [Arc<Library>],
        registry: &'a ComponentRegistry,
        options: &'a SolveOptions,
    ) -> Self {
        Self {
            libraries,
            registry,
            options,
            bindings: Bindings::new(),
            choices: Vec::new(),
            inferences: 0,
            next_scope: 0,
        }
    }

    /// Proves `goal`, returning the bindings of the first proof.
    pub(crate) fn run(mut self, goal: &Term) -> Result<Option<Bindings>, EvalError> {
        let mut goals = call(goal.clone(), 0, None);
        loop {
            let Some(frame) = goals else {
                return Ok(Some(self.bindings));
            };
            let step = match &frame.goal {
                Goal::Call { term, depth } => self.step(term, *depth, &frame.next)?,
                Goal::NegationProved { choice } => {
                    self.cut_to(*choice);
                    Step::Fail
                }
            };
            goals = match step {
                Step::Continue(next) => next,
                Step::Fail => match self.backtrack() {
                    Some(next) => next,
                    None => return Ok(None),
                },
            };
        }
    }

    fn step(&mut self, goal: &Term, depth: usize, next: &Continuation) -> Result<Step, EvalError> {
        if depth >= self.options.max_depth {
            return Err(EvalError::DepthLimitExceeded(self.options.max_depth));
        }
        self.inferences += 1;
        if self.inferences > self.options.max_inferences {
            return Err(EvalError::InferenceLimitExceeded(self.options.max_inferences));
        }

        let goal = self.bindings.walk(goal);
        let (name, args): (&str, &[Term]) = match &goal {
            Term::Atom(name) => (&**name, &[]),
            Term::Compound(compound) => (compound.functor(), compound.args()),
            Term::Var(_) => {
                return Err(EvalError::Instantiation {
                    predicate: "call/1".to_string(),
                    index: 0,
                });
            }
            other => return Err(EvalError::NotCallable(other.to_string())),
        };

        let step = match (name, args) {
            ("true", []) => Step::Continue(next.clone()),
            ("fail" | "false", []) => Step::Fail,
            (",", [left, right]) => Step::Continue(call(
                left.clone(),
                depth,
                call(right.clone(), depth, next.clone()),
            )),
            (";", [left, right]) => {
                self.choose(Alternatives::Resume(call(right.clone(), depth, next.clone())));
                Step::Continue(call(left.clone(), depth, next.clone()))
            }
            ("not" | "\\+", [inner]) => {
                let choice = self.choices.len();
                self.choose(Alternatives::Resume(next.clone()));
                let proved = push(Goal::NegationProved { choice }, None);
                Step::Continue(call(inner.clone(), depth, proved))
            }
            ("call", [inner]) => Step::Continue(call(inner.clone(), depth, next.clone())),
            _ => self.resolve(&goal, Signature::new(name, args.len()), args, depth, next)?,
        };
        Ok(step)
    }

    /// Queues the alternatives for a user goal and lets backtracking try the
    /// first of them.
    fn resolve(
        &mut self,
        goal: &Term,
        signature: Signature,
        args: &[Term],
        depth: usize,
        next: &Continuation,
    ) -> Result<Step, EvalError> {
        if let Some(primitive) = self.primitive(&signature) {
            let resolved: Vec<Term> = args.iter().map(|arg| self.bindings.resolve(arg)).collect();
            let answers = primitive.solve(&resolved, &Context::new(&signature, self.registry))?;
            self.choose(Alternatives::Answers {
                remaining: answers.into_alternatives().into_iter(),
                next: next.clone(),
            });
            return Ok(Step::Fail);
        }

        let clauses = self.clauses(&signature);
        if clauses.is_empty() {
            return Err(EvalError::UnknownProcedure(signature.to_string()));
        }
        self.choose(Alternatives::Clauses {
            goal: goal.clone(),
            remaining: clauses.into_iter(),
            depth: depth + 1,
            next: next.clone(),
        });
        Ok(Step::Fail)
    }

    fn choose(&mut self, alternatives: Alternatives) {
        self.choices.push(ChoicePoint {
            mark: self.bindings.mark(),
            alternatives,
        });
    }

    /// Drops the choice point at `choice` and everything above it, undoing
    /// the bindings made since it was created.
    fn cut_to(&mut self, choice: usize) {
        if let Some(point) = self.choices.get(choice) {
            self.bindings.undo_to(point.mark);
        }
        self.choices.truncate(choice);
    }

    /// Resumes the most recent untried alternative, or `None` when every
    /// alternative is exhausted.
    fn backtrack(&mut self) -> Option<Continuation> {
        while let Some(point) = self.choices.last_mut() {
            self.bindings.undo_to(point.mark);
            match &mut point.alternatives {
                Alternatives::Resume(goals) => {
                    let goals = goals.take();
                    self.choices.pop();
                    return Some(goals);
                }
                Alternatives::Answers { remaining, next } => match remaining.next() {
                    Some(pairs) => {
                        if pairs
                            .iter()
                            .all(|(term, value)| self.bindings.unify(term, value))
                        {
                            return Some(next.clone());
                        }
                    }
                    None => {
                        self.choices.pop();
                    }
                },
                Alternatives::Clauses {
                    goal,
                    remaining,
                    depth,
                    next,
                } => match remaining.next() {
                    Some(clause) => {
                        self.next_scope += 1;
                        let (head, body) = clause.renamed(self.next_scope);
                        if self.bindings.unify(&head, goal) {
                            return Some(call(body, *depth, next.clone()));
                        }
                    }
                    None => {
                        self.choices.pop();
                    }
                },
            }
        }
        None
    }

    fn primitive(&self, signature: &Signature) -> Option<Arc<dyn Primitive>> {
        self.libraries
            .iter()
            .find_map(|library| library.primitive(signature).cloned())
    }

    fn clauses(&self, signature: &Signature) -> Vec<Clause> {
        self.libraries
            .iter()
            .flat_map(|library| library.theory().clauses_for(signature).iter().cloned())
            .collect()
    }
}
