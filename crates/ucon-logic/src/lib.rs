//! # ucon-logic: Rule engine for `ucon`
//!
//! A small resolution engine sufficient to evaluate usage-control goals:
//! conjunctions, disjunctions and negations over an extensible predicate set.
//!
//! - [`Term`] is the goal language; [`Term::parse`] and [`Theory::parse`]
//!   read the textual clause syntax.
//! - [`RuleEngine`] evaluates a goal once and reports a [`Solution`]
//!   (`Yes(bindings)`, `No` or `Halt(error)`).
//! - [`Library`] bundles native [`Primitive`]s with a [`Theory`]; custom
//!   libraries can be registered next to the always-present default library.
//! - [`ComponentRegistry`] holds the attribute providers and monitors that
//!   predicates talk to.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use ucon_logic::{ComponentRegistry, Library, RuleEngine, Term};
//!
//! let engine = RuleEngine::new(Arc::new(ComponentRegistry::new()));
//! let family = Library::new("family")
//!     .with_theory_text("father(abraham, isaac).")
//!     .unwrap();
//! engine.register_library(family).unwrap();
//!
//! let solution = engine.solve(&Term::parse("father(abraham, Y)").unwrap());
//! assert_eq!(solution.substitution().unwrap().get("Y"), Some(&Term::atom("isaac")));
//! ```

mod bindings;
mod builtins;
mod engine;
mod error;
mod library;
mod parser;
mod predicates;
mod registry;
mod solver;
mod term;


pub use engine::{DEFAULT_LIBRARY_ALIAS, RuleEngine, Solution, SolveOptions, Substitution};
pub use error::{EvalError, LibraryError, ParseError};
pub use library::{Answers, Clause, Context, Library, Primitive, Theory};
pub use predicates::{parse_time_of_day, parse_weekday};
pub use registry::ComponentRegistry;
pub use term::{Compound, Signature, Term, Var};
