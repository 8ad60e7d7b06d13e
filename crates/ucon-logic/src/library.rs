//! Predicate libraries.
//!
//! A [`Library`] bundles native predicates ([`Primitive`]s) with a
//! [`Theory`] of clauses. The engine consults the default library first and
//! then every registered custom library in registration order.

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

use ucon_types::{AttributeProvider, MonitorClient};

use crate::error::{EvalError, ParseError};
use crate::registry::ComponentRegistry;
use crate::term::{Signature, Term};

// ============================================================================
// Primitives
// ============================================================================

/// A natively implemented predicate.
///
/// Arguments arrive with all bound variables substituted. A primitive answers
/// with zero or more alternatives, each a list of `(term, value)` pairs the
/// solver unifies before continuing; the solver backtracks into the next
/// alternative when the rest of the goal fails.
pub trait Primitive: Send + Sync {
    fn solve(&self, args: &[Term], ctx: &Context<'_>) -> Result<Answers, EvalError>;
}

impl<F> Primitive for F
where
    F: Fn(&[Term], &Context<'_>) -> Result<Answers, EvalError> + Send + Sync,
{
    fn solve(&self, args: &[Term], ctx: &Context<'_>) -> Result<Answers, EvalError> {
        self(args, ctx)
    }
}

/// The alternatives produced by a primitive call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Answers {
    alternatives: Vec<Vec<(Term, Term)>>,
}

impl Answers {
    /// No solution.
    pub fn no() -> Self {
        Self::default()
    }

    /// One solution that binds nothing.
    pub fn yes() -> Self {
        Self {
            alternatives: vec![Vec::new()],
        }
    }

    pub fn truth(value: bool) -> Self {
        if value { Self::yes() } else { Self::no() }
    }

    /// One solution that unifies `term` with `value`.
    pub fn unify(term: Term, value: Term) -> Self {
        Self {
            alternatives: vec![vec![(term, value)]],
        }
    }

    /// Adds another alternative.
    pub fn or_unify(mut self, pairs: Vec<(Term, Term)>) -> Self {
        self.alternatives.push(pairs);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.alternatives.is_empty()
    }

    pub(crate) fn into_alternatives(self) -> Vec<Vec<(Term, Term)>> {
        self.alternatives
    }
}

/// What a primitive sees of the world: its own signature (for diagnostics)
/// and the component registry.
pub struct Context<'a> {
    signature: &'a Signature,
    registry: &'a ComponentRegistry,
}

impl<'a> Context<'a> {
    pub(crate) fn new(signature: &'a Signature, registry: &'a ComponentRegistry) -> Self {
        Self {
            signature,
            registry,
        }
    }

    pub fn signature(&self) -> &Signature {
        self.signature
    }

    pub fn registry(&self) -> &ComponentRegistry {
        self.registry
    }

    pub fn provider(&self, id: &str) -> Result<Arc<dyn AttributeProvider>, EvalError> {
        self.registry
            .provider(id)
            .ok_or_else(|| EvalError::ProviderNotRegistered(id.to_string()))
    }

    pub fn monitor(&self, id: &str) -> Result<Arc<dyn MonitorClient>, EvalError> {
        self.registry
            .monitor(id)
            .ok_or_else(|| EvalError::MonitorNotRegistered(id.to_string()))
    }

    fn argument<'t>(&self, args: &'t [Term], index: usize) -> Result<&'t Term, EvalError> {
        match args.get(index) {
            Some(Term::Var(_)) | None => Err(EvalError::Instantiation {
                predicate: self.signature.to_string(),
                index,
            }),
            Some(term) => Ok(term),
        }
    }

    fn type_error(&self, index: usize, expected: &'static str, found: &Term) -> EvalError {
        EvalError::TypeError {
            predicate: self.signature.to_string(),
            index,
            expected,
            found: found.to_string(),
        }
    }

    /// The atom at `index`.
    pub fn atom<'t>(&self, args: &'t [Term], index: usize) -> Result<&'t str, EvalError> {
        let term = self.argument(args, index)?;
        term.as_atom()
            .ok_or_else(|| self.type_error(index, "an atom", term))
    }

    /// The integer at `index`.
    pub fn int(&self, args: &[Term], index: usize) -> Result<i64, EvalError> {
        let term = self.argument(args, index)?;
        term.as_int()
            .ok_or_else(|| self.type_error(index, "an integer", term))
    }

    /// The number at `index`, widened to a real.
    pub fn number(&self, args: &[Term], index: usize) -> Result<f64, EvalError> {
        match self.argument(args, index)? {
            Term::Int(value) => Ok(*value as f64),
            Term::Real(value) => Ok(*value),
            other => Err(self.type_error(index, "a number", other)),
        }
    }

    /// The list at `index`.
    pub fn list<'t>(&self, args: &'t [Term], index: usize) -> Result<&'t [Term], EvalError> {
        let term = self.argument(args, index)?;
        term.as_list()
            .ok_or_else(|| self.type_error(index, "a list", term))
    }

    /// The list of atoms at `index`.
    pub fn atom_list<'t>(
        &self,
        args: &'t [Term],
        index: usize,
    ) -> Result<Vec<&'t str>, EvalError> {
        let items = self.list(args, index)?;
        items
            .iter()
            .map(|item| {
                item.as_atom()
                    .ok_or_else(|| self.type_error(index, "a list of atoms", &args[index]))
            })
            .collect()
    }
}

// ============================================================================
// Theories
// ============================================================================

/// A clause `head :- body`. Facts have the body `true`.
#[derive(Debug, Clone, PartialEq)]
pub struct Clause {
    head: Term,
    body: Term,
}

impl Clause {
    pub fn fact(head: Term) -> Self {
        Self {
            head,
            body: Term::truth(true),
        }
    }

    pub fn rule(head: Term, body: Term) -> Self {
        Self { head, body }
    }

    pub fn head(&self) -> &Term {
        &self.head
    }

    pub fn body(&self) -> &Term {
        &self.body
    }

    /// Copies the clause with every variable moved into `scope`.
    pub(crate) fn renamed(&self, scope: u32) -> (Term, Term) {
        let rename = |var: &crate::term::Var| var.in_scope(scope);
        (self.head.map_vars(&rename), self.body.map_vars(&rename))
    }
}

/// An ordered collection of clauses indexed by head signature.
#[derive(Debug, Clone, Default)]
pub struct Theory {
    clauses: HashMap<Signature, Vec<Clause>>,
    len: usize,
}

impl Theory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_clauses(clauses: impl IntoIterator<Item = Clause>) -> Self {
        let mut theory = Self::new();
        for clause in clauses {
            theory.push(clause);
        }
        theory
    }

    /// Parses clause text such as `father(abraham, isaac).`
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        Ok(Self::from_clauses(crate::parser::parse_clauses(text)?))
    }

    /// Appends a clause. Clauses whose head is not callable are ignored.
    pub fn push(&mut self, clause: Clause) {
        if let Some(signature) = clause.head.signature() {
            self.clauses.entry(signature).or_default().push(clause);
            self.len += 1;
        }
    }

    pub fn clauses_for(&self, signature: &Signature) -> &[Clause] {
        self.clauses.get(signature).map_or(&[], Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

// ============================================================================
// Libraries
// ============================================================================

/// A named set of primitives and clauses.
pub struct Library {
    alias: String,
    primitives: HashMap<Signature, Arc<dyn Primitive>>,
    theory: Theory,
}

impl Library {
    pub fn new(alias: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            primitives: HashMap::new(),
            theory: Theory::new(),
        }
    }

    /// Adds a native predicate `name/arity`.
    pub fn with_primitive<F>(mut self, name: &str, arity: usize, primitive: F) -> Self
    where
        F: Fn(&[Term], &Context<'_>) -> Result<Answers, EvalError> + Send + Sync + 'static,
    {
        self.primitives
            .insert(Signature::new(name, arity), Arc::new(primitive));
        self
    }

    /// Appends the clauses of `theory`.
    pub fn with_theory(mut self, theory: Theory) -> Self {
        for clauses in theory.clauses.into_values() {
            for clause in clauses {
                self.theory.push(clause);
            }
        }
        self
    }

    /// Appends clauses parsed from `text`.
    pub fn with_theory_text(self, text: &str) -> Result<Self, ParseError> {
        Ok(self.with_theory(Theory::parse(text)?))
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub fn primitive(&self, signature: &Signature) -> Option<&Arc<dyn Primitive>> {
        self.primitives.get(signature)
    }

    pub fn theory(&self) -> &Theory {
        &self.theory
    }

    pub(crate) fn primitive_signatures(&self) -> impl Iterator<Item = &Signature> {
        self.primitives.keys()
    }

    pub(crate) fn defines(&self, signature: &Signature) -> bool {
        self.primitives.contains_key(signature)
            || !self.theory.clauses_for(signature).is_empty()
    }
}

impl Debug for Library {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut primitives: Vec<String> = self.primitives.keys().map(ToString::to_string).collect();
        primitives.sort();
        f.debug_struct("Library")
            .field("alias", &self.alias)
            .field("primitives", &primitives)
            .field("clauses", &self.theory.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn theory_keeps_clause_order_per_signature() {
        let theory = Theory::parse(
            "father(abraham, isaac).\n\
             mother(sarah, isaac).\n\
             father(isaac, jacob).",
        )
        .unwrap();

        let fathers = theory.clauses_for(&Signature::new("father", 2));
        assert_eq!(theory.len(), 3);
        assert_eq!(fathers.len(), 2);
        assert_eq!(fathers[0].head().to_string(), "father(abraham, isaac)");
        assert_eq!(fathers[1].head().to_string(), "father(isaac, jacob)");
        assert!(theory.clauses_for(&Signature::new("father", 3)).is_empty());
    }

    #[test]
    fn library_reports_what_it_defines() {
        let library = Library::new("family")
            .with_primitive("always", 0, |_, _| Ok(Answers::yes()))
            .with_theory_text("parent(a, b).")
            .unwrap();

        assert_eq!(library.alias(), "family");
        assert!(library.defines(&Signature::new("always", 0)));
        assert!(library.defines(&Signature::new("parent", 2)));
        assert!(!library.defines(&Signature::new("parent", 1)));
    }

    #[test]
    fn answers_truth_maps_to_yes_or_no() {
        assert_eq!(Answers::truth(true), Answers::yes());
        assert!(Answers::truth(false).is_empty());
    }
}
