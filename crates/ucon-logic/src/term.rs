//! Terms: the data the rule engine reasons over.
//!
//! Atoms carry strings (identities, attribute references, weekday names),
//! numbers come in two flavours, lists are first-class only as far as the
//! built-in predicates need them, and everything else is a compound
//! `functor(arg, ...)`. Conjunction, disjunction and negation are ordinary
//! compounds named `,`, `;` and `not`.

use std::collections::BTreeSet;
use std::fmt::{self, Display, Write};
use std::sync::Arc;

/// Comparison and unification operators written infix.
const COMPARISON_OPERATORS: [&str; 10] =
    ["=", "\\=", "==", "\\==", "<", ">", "=<", ">=", "=:=", "=\\="];

/// A logic term.
#[derive(Debug, Clone, PartialEq)]
pub enum Term {
    Atom(Arc<str>),
    Int(i64),
    Real(f64),
    Var(Var),
    List(Arc<[Term]>),
    Compound(Compound),
}

/// A logic variable.
///
/// Variables written in a goal or clause live in scope 0. The solver renames
/// clause variables into fresh scopes so that two uses of the same clause
/// never share bindings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Var {
    name: Arc<str>,
    scope: u32,
}

impl Var {
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            scope: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn scope(&self) -> u32 {
        self.scope
    }

    pub(crate) fn in_scope(&self, scope: u32) -> Self {
        Self {
            name: Arc::clone(&self.name),
            scope,
        }
    }
}

/// A compound term `functor(args...)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Compound {
    functor: Arc<str>,
    args: Arc<[Term]>,
}

impl Compound {
    pub fn functor(&self) -> &str {
        &self.functor
    }

    pub fn args(&self) -> &[Term] {
        &self.args
    }

    pub fn arity(&self) -> usize {
        self.args.len()
    }

    pub fn signature(&self) -> Signature {
        Signature {
            name: Arc::clone(&self.functor),
            arity: self.args.len(),
        }
    }
}

/// Predicate indicator `name/arity`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Signature {
    name: Arc<str>,
    arity: usize,
}

impl Signature {
    pub fn new(name: impl Into<Arc<str>>, arity: usize) -> Self {
        Self {
            name: name.into(),
            arity,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arity(&self) -> usize {
        self.arity
    }
}

impl Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.name, self.arity)
    }
}

// ============================================================================
// Construction
// ============================================================================

impl Term {
    pub fn atom(name: impl Into<Arc<str>>) -> Self {
        Term::Atom(name.into())
    }

    pub fn int(value: i64) -> Self {
        Term::Int(value)
    }

    pub fn real(value: f64) -> Self {
        Term::Real(value)
    }

    pub fn var(name: impl Into<Arc<str>>) -> Self {
        Term::Var(Var::new(name))
    }

    pub fn list(items: impl IntoIterator<Item = Term>) -> Self {
        Term::List(items.into_iter().collect())
    }

    pub fn empty_list() -> Self {
        Term::List(Arc::from([]))
    }

    /// Builds `functor(args...)`. With no arguments this is the atom `functor`.
    pub fn compound(functor: impl Into<Arc<str>>, args: impl IntoIterator<Item = Term>) -> Self {
        let args: Arc<[Term]> = args.into_iter().collect();
        let functor = functor.into();
        if args.is_empty() {
            Term::Atom(functor)
        } else {
            Term::Compound(Compound { functor, args })
        }
    }

    /// The truth atoms `true` and `false`.
    pub fn truth(value: bool) -> Self {
        Term::atom(if value { "true" } else { "false" })
    }

    pub fn and(left: Term, right: Term) -> Self {
        Term::compound(",", [left, right])
    }

    pub fn or(left: Term, right: Term) -> Self {
        Term::compound(";", [left, right])
    }

    pub fn not(goal: Term) -> Self {
        Term::compound("not", [goal])
    }

    /// `left - right`, the pair notation used for role-permission entries.
    pub fn pair(left: Term, right: Term) -> Self {
        Term::compound("-", [left, right])
    }

    /// Parses a single goal, e.g. `father(abraham, X)`.
    pub fn parse(text: &str) -> Result<Self, crate::ParseError> {
        crate::parser::parse_term(text)
    }
}

// ============================================================================
// Inspection
// ============================================================================

impl Term {
    pub fn as_atom(&self) -> Option<&str> {
        match self {
            Term::Atom(name) => Some(name),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Term::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Term]> {
        match self {
            Term::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_compound(&self) -> Option<&Compound> {
        match self {
            Term::Compound(compound) => Some(compound),
            _ => None,
        }
    }

    pub fn is_var(&self) -> bool {
        matches!(self, Term::Var(_))
    }

    /// Predicate indicator of a callable term.
    pub fn signature(&self) -> Option<Signature> {
        match self {
            Term::Atom(name) => Some(Signature::new(Arc::clone(name), 0)),
            Term::Compound(compound) => Some(compound.signature()),
            _ => None,
        }
    }

    /// Names of the variables occurring in the term, in sorted order.
    pub fn variables(&self) -> BTreeSet<Var> {
        let mut vars = BTreeSet::new();
        self.collect_variables(&mut vars);
        vars
    }

    fn collect_variables(&self, vars: &mut BTreeSet<Var>) {
        match self {
            Term::Var(var) => {
                vars.insert(var.clone());
            }
            Term::List(items) => items.iter().for_each(|item| item.collect_variables(vars)),
            Term::Compound(compound) => compound
                .args
                .iter()
                .for_each(|arg| arg.collect_variables(vars)),
            Term::Atom(_) | Term::Int(_) | Term::Real(_) => {}
        }
    }

    /// Rewrites every atom for which `rewrite` returns a replacement, recursing
    /// into lists and compound arguments. Functors are left untouched.
    ///
    /// Returns a new term; `self` is never modified.
    pub fn map_atoms(&self, rewrite: &impl Fn(&str) -> Option<String>) -> Term {
        match self {
            Term::Atom(name) => match rewrite(name) {
                Some(replacement) => Term::atom(replacement),
                None => self.clone(),
            },
            Term::List(items) => {
                Term::List(items.iter().map(|item| item.map_atoms(rewrite)).collect())
            }
            Term::Compound(compound) => Term::Compound(Compound {
                functor: Arc::clone(&compound.functor),
                args: compound.args.iter().map(|arg| arg.map_atoms(rewrite)).collect(),
            }),
            Term::Int(_) | Term::Real(_) | Term::Var(_) => self.clone(),
        }
    }

    /// Rewrites every variable through `rename`.
    pub(crate) fn map_vars(&self, rename: &impl Fn(&Var) -> Var) -> Term {
        match self {
            Term::Var(var) => Term::Var(rename(var)),
            Term::List(items) => {
                Term::List(items.iter().map(|item| item.map_vars(rename)).collect())
            }
            Term::Compound(compound) => Term::Compound(Compound {
                functor: Arc::clone(&compound.functor),
                args: compound.args.iter().map(|arg| arg.map_vars(rename)).collect(),
            }),
            Term::Atom(_) | Term::Int(_) | Term::Real(_) => self.clone(),
        }
    }
}

impl From<&str> for Term {
    fn from(name: &str) -> Self {
        Term::atom(name)
    }
}

impl From<i64> for Term {
    fn from(value: i64) -> Self {
        Term::Int(value)
    }
}

// ============================================================================
// Display
// ============================================================================

fn is_bare_atom(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_lowercase())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn write_atom(f: &mut fmt::Formatter<'_>, name: &str) -> fmt::Result {
    if is_bare_atom(name) {
        return f.write_str(name);
    }
    f.write_char('\'')?;
    for c in name.chars() {
        match c {
            '\'' => f.write_str("\\'")?,
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            other => f.write_char(other)?,
        }
    }
    f.write_char('\'')
}

fn is_infix(compound: &Compound) -> bool {
    compound.arity() == 2
        && (COMPARISON_OPERATORS.contains(&compound.functor()) || compound.functor() == "-")
}

/// Writes an operand of an infix operator, parenthesizing nested infix terms.
fn write_operand(f: &mut fmt::Formatter<'_>, term: &Term) -> fmt::Result {
    match term {
        Term::Compound(inner) if is_infix(inner) => write!(f, "({term})"),
        _ => write!(f, "{term}"),
    }
}

fn is_negative_number(term: &Term) -> bool {
    match term {
        Term::Int(value) => *value < 0,
        Term::Real(value) => value.is_sign_negative(),
        _ => false,
    }
}

/// Writes a real so that it reads back as a real: always with a fractional
/// part, and in exponent form once the magnitude is large.
fn write_real(f: &mut fmt::Formatter<'_>, value: f64) -> fmt::Result {
    let text = format!("{value:?}");
    match text.split_once('e') {
        Some((mantissa, exponent)) if !mantissa.contains('.') => {
            write!(f, "{mantissa}.0e{exponent}")
        }
        _ => f.write_str(&text),
    }
}

impl Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Atom(name) => write_atom(f, name),
            Term::Int(value) => write!(f, "{value}"),
            Term::Real(value) => write_real(f, *value),
            Term::Var(var) if var.scope == 0 => f.write_str(&var.name),
            Term::Var(var) => write!(f, "_{}_{}", var.name, var.scope),
            Term::List(items) => {
                f.write_char('[')?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_char(']')
            }
            Term::Compound(compound) => {
                let args = compound.args();
                match (compound.functor(), args) {
                    (",", [left, right]) => write!(f, "({left}, {right})"),
                    (";", [left, right]) => write!(f, "({left}; {right})"),
                    ("\\+", [goal]) => write!(f, "\\+({goal})"),
                    ("-", [left, right]) => {
                        write_operand(f, left)?;
                        f.write_char('-')?;
                        if is_negative_number(right) {
                            write!(f, "({right})")
                        } else {
                            write_operand(f, right)
                        }
                    }
                    (op, [left, right]) if COMPARISON_OPERATORS.contains(&op) => {
                        write_operand(f, left)?;
                        write!(f, " {op} ")?;
                        write_operand(f, right)
                    }
                    (functor, args) => {
                        write_atom(f, functor)?;
                        f.write_char('(')?;
                        for (i, arg) in args.iter().enumerate() {
                            if i > 0 {
                                f.write_str(", ")?;
                            }
                            write!(f, "{arg}")?;
                        }
                        f.write_char(')')
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compound_without_args_is_an_atom() {
        assert_eq!(Term::compound("true", []), Term::atom("true"));
    }

    #[test]
    fn display_parenthesizes_connectives() {
        let goal = Term::and(
            Term::or(Term::atom("a"), Term::atom("b")),
            Term::not(Term::compound("p", [Term::var("X")])),
        );
        assert_eq!(goal.to_string(), "((a; b), not(p(X)))");
    }

    #[test]
    fn display_quotes_non_bare_atoms() {
        assert_eq!(Term::atom("timePip").to_string(), "timePip");
        assert_eq!(Term::atom("userPip:role").to_string(), "'userPip:role'");
        assert_eq!(Term::atom("$SUBJECT").to_string(), "'$SUBJECT'");
        assert_eq!(Term::atom("it's").to_string(), "'it\\'s'");
        assert_eq!(Term::atom("Monday").to_string(), "'Monday'");
    }

    #[test]
    fn display_writes_operators_infix() {
        let goal = Term::compound("=<", [Term::var("X"), Term::int(-3)]);
        assert_eq!(goal.to_string(), "X =< -3");

        let pair = Term::pair(Term::atom("role1"), Term::list([Term::atom("read")]));
        assert_eq!(pair.to_string(), "role1-[read]");
    }

    #[test]
    fn display_keeps_reals_recognizable() {
        assert_eq!(Term::real(2.0).to_string(), "2.0");
        assert_eq!(Term::real(0.25).to_string(), "0.25");
    }

    #[test]
    fn map_atoms_leaves_functors_and_original_alone() {
        let goal = Term::compound(
            "resolve_string",
            [Term::atom("pip:$SUBJECT"), Term::var("X")],
        );
        let rewritten = goal
            .map_atoms(&|atom| atom.contains('$').then(|| atom.replace("$SUBJECT", "alice")));

        assert_eq!(rewritten.to_string(), "resolve_string('pip:alice', X)");
        assert_eq!(goal.to_string(), "resolve_string('pip:$SUBJECT', X)");
    }

    #[test]
    fn variables_are_collected_from_nested_terms() {
        let goal = Term::and(
            Term::compound("p", [Term::var("X"), Term::list([Term::var("Y")])]),
            Term::compound("q", [Term::var("X")]),
        );
        let names: Vec<_> = goal.variables().iter().map(|v| v.name().to_string()).collect();
        assert_eq!(names, vec!["X", "Y"]);
    }
}
