//! Variable bindings with an undo trail.

use std::collections::HashMap;

use crate::term::{Term, Var};

/// The current substitution of an evaluation.
///
/// Every binding is recorded on a trail so that backtracking can restore an
/// earlier state with [`Bindings::undo_to`].
#[derive(Debug, Default)]
pub(crate) struct Bindings {
    map: HashMap<Var, Term>,
    trail: Vec<Var>,
}

impl Bindings {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Follows variable chains until an unbound variable or a non-variable.
    pub(crate) fn walk(&self, term: &Term) -> Term {
        let mut current = term.clone();
        while let Term::Var(var) = &current {
            match self.map.get(var) {
                Some(next) => current = next.clone(),
                None => break,
            }
        }
        current
    }

    /// Substitutes every bound variable, at any depth.
    pub(crate) fn resolve(&self, term: &Term) -> Term {
        match self.walk(term) {
            Term::List(items) => Term::list(items.iter().map(|item| self.resolve(item))),
            Term::Compound(compound) => Term::compound(
                compound.functor(),
                compound.args().iter().map(|arg| self.resolve(arg)),
            ),
            other => other,
        }
    }

    pub(crate) fn mark(&self) -> usize {
        self.trail.len()
    }

    pub(crate) fn undo_to(&mut self, mark: usize) {
        while self.trail.len() > mark {
            if let Some(var) = self.trail.pop() {
                self.map.remove(&var);
            }
        }
    }

    fn bind(&mut self, var: Var, value: Term) {
        self.trail.push(var.clone());
        self.map.insert(var, value);
    }

    /// Unifies two terms, extending the bindings.
    ///
    /// On failure some bindings may already have been made; callers restore
    /// a mark taken beforehand. No occurs check is performed.
    pub(crate) fn unify(&mut self, left: &Term, right: &Term) -> bool {
        let left = self.walk(left);
        let right = self.walk(right);
        match (&left, &right) {
            (Term::Var(a), Term::Var(b)) if a == b => true,
            (Term::Var(a), _) => {
                self.bind(a.clone(), right);
                true
            }
            (_, Term::Var(b)) => {
                self.bind(b.clone(), left);
                true
            }
            (Term::Atom(a), Term::Atom(b)) => a == b,
            (Term::Int(a), Term::Int(b)) => a == b,
            #[allow(clippy::float_cmp)]
            (Term::Real(a), Term::Real(b)) => a == b,
            (Term::List(a), Term::List(b)) => {
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| self.unify(x, y))
            }
            (Term::Compound(a), Term::Compound(b)) => {
                a.functor() == b.functor()
                    && a.arity() == b.arity()
                    && a.args()
                        .iter()
                        .zip(b.args().iter())
                        .all(|(x, y)| self.unify(x, y))
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unify_binds_variables_both_ways() {
        let mut bindings = Bindings::new();
        let left = Term::compound("f", [Term::var("X"), Term::atom("b")]);
        let right = Term::compound("f", [Term::atom("a"), Term::var("Y")]);

        assert!(bindings.unify(&left, &right));
        assert_eq!(
            bindings.resolve(&left),
            Term::compound("f", [Term::atom("a"), Term::atom("b")])
        );
        assert_eq!(bindings.resolve(&right), bindings.resolve(&left));
    }

    #[test]
    fn unify_follows_chains() {
        let mut bindings = Bindings::new();
        assert!(bindings.unify(&Term::var("X"), &Term::var("Y")));
        assert!(bindings.unify(&Term::var("Y"), &Term::int(3)));
        assert_eq!(bindings.walk(&Term::var("X")), Term::int(3));
    }

    #[test]
    fn numbers_of_different_kinds_do_not_unify() {
        let mut bindings = Bindings::new();
        assert!(!bindings.unify(&Term::int(1), &Term::real(1.0)));
    }

    #[test]
    fn undo_restores_earlier_state() {
        let mut bindings = Bindings::new();
        assert!(bindings.unify(&Term::var("X"), &Term::atom("a")));
        let mark = bindings.mark();

        assert!(!bindings.unify(
            &Term::list([Term::var("Y"), Term::atom("b")]),
            &Term::list([Term::atom("c"), Term::atom("d")]),
        ));
        bindings.undo_to(mark);

        assert_eq!(bindings.walk(&Term::var("Y")), Term::var("Y"));
        assert_eq!(bindings.walk(&Term::var("X")), Term::atom("a"));
    }
}
