//! The rule engine: one-shot goal evaluation over registered libraries.

use std::collections::BTreeMap;
use std::fmt::Display;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info, trace, warn};

use crate::error::{EvalError, LibraryError};
use crate::library::Library;
use crate::predicates;
use crate::registry::ComponentRegistry;
use crate::solver::Solver;
use crate::term::Term;

/// Alias of the built-in library.
pub const DEFAULT_LIBRARY_ALIAS: &str = "ucon.default";

/// Resource limits for one evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SolveOptions {
    /// Maximum nesting of pending resolution steps.
    pub max_depth: usize,
    /// Maximum number of resolution steps.
    pub max_inferences: usize,
}

impl Default for SolveOptions {
    fn default() -> Self {
        Self {
            max_depth: 1024,
            max_inferences: 100_000,
        }
    }
}

/// Variable bindings of a successful evaluation, keyed by variable name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Substitution(BTreeMap<String, Term>);

impl Substitution {
    pub fn get(&self, name: &str) -> Option<&Term> {
        self.0.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Term)> {
        self.0.iter().map(|(name, term)| (name.as_str(), term))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Outcome of an evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum Solution {
    /// The goal holds; the substitution binds the goal's variables.
    Yes(Substitution),
    /// The goal does not hold.
    No,
    /// Evaluation was aborted by an error.
    Halt(EvalError),
}

impl Solution {
    pub fn is_yes(&self) -> bool {
        matches!(self, Solution::Yes(_))
    }

    pub fn is_no(&self) -> bool {
        matches!(self, Solution::No)
    }

    pub fn is_halt(&self) -> bool {
        matches!(self, Solution::Halt(_))
    }

    pub fn substitution(&self) -> Option<&Substitution> {
        match self {
            Solution::Yes(substitution) => Some(substitution),
            _ => None,
        }
    }

    pub fn halt_error(&self) -> Option<&EvalError> {
        match self {
            Solution::Halt(error) => Some(error),
            _ => None,
        }
    }
}

impl Display for Solution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Solution::Yes(substitution) if substitution.is_empty() => f.write_str("yes"),
            Solution::Yes(substitution) => {
                f.write_str("yes {")?;
                for (i, (name, term)) in substitution.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{name} = {term}")?;
                }
                f.write_str("}")
            }
            Solution::No => f.write_str("no"),
            Solution::Halt(error) => write!(f, "halt: {error}"),
        }
    }
}

/// Evaluates goals against the default library plus any registered custom
/// libraries.
///
/// Every call to [`RuleEngine::evaluate`] snapshots the library list, so
/// registration may run concurrently with evaluations; an evaluation already
/// in flight keeps the libraries it started with.
pub struct RuleEngine {
    registry: Arc<ComponentRegistry>,
    default_library: Arc<Library>,
    custom: RwLock<Vec<Arc<Library>>>,
    options: SolveOptions,
}

impl RuleEngine {
    pub fn new(registry: Arc<ComponentRegistry>) -> Self {
        Self {
            registry,
            default_library: Arc::new(predicates::default_library()),
            custom: RwLock::new(Vec::new()),
            options: SolveOptions::default(),
        }
    }

    /// Sets the options used by [`RuleEngine::solve`].
    pub fn with_options(mut self, options: SolveOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &SolveOptions {
        &self.options
    }

    pub fn registry(&self) -> &Arc<ComponentRegistry> {
        &self.registry
    }

    pub fn register_library(&self, library: Library) -> Result<(), LibraryError> {
        let alias = library.alias().to_string();
        let mut custom = self.custom.write();
        if alias == DEFAULT_LIBRARY_ALIAS || custom.iter().any(|l| l.alias() == alias) {
            return Err(LibraryError::DuplicateAlias(alias));
        }
        // Primitives resolve in registration order, ahead of any clauses.
        for signature in library.primitive_signatures() {
            if let Some(owner) = std::iter::once(&self.default_library)
                .chain(custom.iter())
                .find(|existing| existing.defines(signature))
            {
                warn!(
                    library = %alias,
                    predicate = %signature,
                    defined_by = owner.alias(),
                    "primitive already defined by an earlier library"
                );
            }
        }
        custom.push(Arc::new(library));
        info!(library = %alias, "registered predicate library");
        Ok(())
    }

    pub fn unregister_library(&self, alias: &str) -> Result<(), LibraryError> {
        if alias == DEFAULT_LIBRARY_ALIAS {
            return Err(LibraryError::DefaultLibrary);
        }
        let mut custom = self.custom.write();
        let position = custom
            .iter()
            .position(|l| l.alias() == alias)
            .ok_or_else(|| LibraryError::NotRegistered(alias.to_string()))?;
        custom.remove(position);
        info!(library = %alias, "unregistered predicate library");
        Ok(())
    }

    /// Aliases of all libraries, default first.
    pub fn library_aliases(&self) -> Vec<String> {
        std::iter::once(self.default_library.alias().to_string())
            .chain(self.custom.read().iter().map(|l| l.alias().to_string()))
            .collect()
    }

    /// Evaluates `goal` with the engine's own options.
    pub fn solve(&self, goal: &Term) -> Solution {
        self.evaluate(goal, &self.options)
    }

    /// Evaluates `goal`, returning the first solution found.
    pub fn evaluate(&self, goal: &Term, options: &SolveOptions) -> Solution {
        let libraries: Vec<Arc<Library>> = std::iter::once(Arc::clone(&self.default_library))
            .chain(self.custom.read().iter().cloned())
            .collect();

        trace!(%goal, "evaluating goal");
        let solution = match Solver::new(&libraries, &self.registry, options).run(goal) {
            Ok(Some(bindings)) => {
                let substitution = goal
                    .variables()
                    .into_iter()
                    .filter(|var| var.scope() == 0)
                    .map(|var| {
                        let value = bindings.resolve(&Term::Var(var.clone()));
                        (var.name().to_string(), value)
                    })
                    .collect();
                Solution::Yes(Substitution(substitution))
            }
            Ok(None) => Solution::No,
            Err(error) => Solution::Halt(error),
        };
        debug!(%goal, %solution, "evaluated goal");
        solution
    }
}

impl std::fmt::Debug for RuleEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleEngine")
            .field("libraries", &self.library_aliases())
            .field("options", &self.options)
            .finish()
    }
}
