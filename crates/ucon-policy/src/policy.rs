//! The low-level policy representation evaluated by the decision point.

use std::fmt::Display;
use std::time::Duration;

use ucon_logic::Term;
use ucon_types::{ObjectId, RightId, SubjectId};

/// Placeholder replaced by the requesting subject's identity.
pub const SUBJECT_PLACEHOLDER: &str = "$SUBJECT";
/// Placeholder replaced by the requested object's identity.
pub const OBJECT_PLACEHOLDER: &str = "$OBJECT";
/// Placeholder replaced by the requested right.
pub const RIGHT_PLACEHOLDER: &str = "$RIGHT";

/// A usage-control policy: five goals and an optional re-evaluation period.
///
/// A policy whose goals still mention the `$SUBJECT`/`$OBJECT`/`$RIGHT`
/// placeholders is *generic*; [`Policy::instantiate`] produces the
/// *instantiated* policy for one request.
#[derive(Debug, Clone, PartialEq)]
pub struct Policy {
    /// Must hold for access to be granted.
    pub pre_access: Term,
    /// Run once after access was granted (updates such as counters).
    pub post_permit: Term,
    /// Must keep holding while access is ongoing.
    pub ongoing_access: Term,
    /// How often `ongoing_access` is re-evaluated. `None` disables
    /// re-evaluation.
    pub ongoing_period: Option<Duration>,
    /// Run after an ongoing usage was revoked.
    pub post_access_revoked: Term,
    /// Run after an ongoing usage ended voluntarily.
    pub post_access_ended: Term,
}

impl Policy {
    /// A policy gated by `pre_access` whose other goals are all `true`.
    pub fn new(pre_access: Term) -> Self {
        Self {
            pre_access,
            post_permit: Term::truth(true),
            ongoing_access: Term::truth(true),
            ongoing_period: None,
            post_access_revoked: Term::truth(true),
            post_access_ended: Term::truth(true),
        }
    }

    pub fn with_post_permit(mut self, goal: Term) -> Self {
        self.post_permit = goal;
        self
    }

    pub fn with_ongoing(mut self, goal: Term, period: Option<Duration>) -> Self {
        self.ongoing_access = goal;
        self.ongoing_period = period;
        self
    }

    pub fn with_post_revoked(mut self, goal: Term) -> Self {
        self.post_access_revoked = goal;
        self
    }

    pub fn with_post_ended(mut self, goal: Term) -> Self {
        self.post_access_ended = goal;
        self
    }

    /// Substitutes the request identities for the placeholders in every goal.
    ///
    /// Pure: `self` is left untouched. Idempotent: instantiating the result
    /// again with the same identities yields an equal policy.
    pub fn instantiate(&self, subject: &SubjectId, object: &ObjectId, right: &RightId) -> Policy {
        let substitute = |goal: &Term| substitute(goal, subject, object, right);
        Policy {
            pre_access: substitute(&self.pre_access),
            post_permit: substitute(&self.post_permit),
            ongoing_access: substitute(&self.ongoing_access),
            ongoing_period: self.ongoing_period,
            post_access_revoked: substitute(&self.post_access_revoked),
            post_access_ended: substitute(&self.post_access_ended),
        }
    }

    /// Conjoins every goal of `self` with the matching goal of `other`.
    ///
    /// The merged policy re-evaluates at the shorter of the two periods.
    pub fn merge_by_conjunction(&self, other: &Policy) -> Policy {
        let ongoing_period = match (self.ongoing_period, other.ongoing_period) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        Policy {
            pre_access: Term::and(self.pre_access.clone(), other.pre_access.clone()),
            post_permit: Term::and(self.post_permit.clone(), other.post_permit.clone()),
            ongoing_access: Term::and(self.ongoing_access.clone(), other.ongoing_access.clone()),
            ongoing_period,
            post_access_revoked: Term::and(
                self.post_access_revoked.clone(),
                other.post_access_revoked.clone(),
            ),
            post_access_ended: Term::and(
                self.post_access_ended.clone(),
                other.post_access_ended.clone(),
            ),
        }
    }
}

impl Display for Policy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "pre_access: {}", self.pre_access)?;
        writeln!(f, "post_permit: {}", self.post_permit)?;
        match self.ongoing_period {
            Some(period) => {
                writeln!(f, "ongoing_access every {period:?}: {}", self.ongoing_access)?
            }
            None => writeln!(f, "ongoing_access: {}", self.ongoing_access)?,
        }
        writeln!(f, "post_access_revoked: {}", self.post_access_revoked)?;
        write!(f, "post_access_ended: {}", self.post_access_ended)
    }
}

/// Replaces the placeholders inside every atom of `goal`.
///
/// Each atom is scanned once; identity values are copied verbatim, so a
/// placeholder appearing inside a value is never expanded.
pub fn substitute(goal: &Term, subject: &SubjectId, object: &ObjectId, right: &RightId) -> Term {
    let placeholders = [
        (SUBJECT_PLACEHOLDER, subject.as_str()),
        (OBJECT_PLACEHOLDER, object.as_str()),
        (RIGHT_PLACEHOLDER, right.as_str()),
    ];
    goal.map_atoms(&|atom| {
        let mut rest = atom;
        let mut replaced = String::new();
        let mut changed = false;
        while let Some(start) = rest.find('$') {
            replaced.push_str(&rest[..start]);
            rest = &rest[start..];
            match placeholders
                .iter()
                .find(|(placeholder, _)| rest.starts_with(placeholder))
            {
                Some((placeholder, value)) => {
                    replaced.push_str(value);
                    rest = &rest[placeholder.len()..];
                    changed = true;
                }
                None => {
                    replaced.push('$');
                    rest = &rest[1..];
                }
            }
        }
        replaced.push_str(rest);
        changed.then_some(replaced)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids() -> (SubjectId, ObjectId, RightId) {
        ("alice".into(), "doc1".into(), "read".into())
    }

    fn generic() -> Policy {
        Policy::new(Term::parse("resolve_string('userPip:$SUBJECT.role', R), R == admin").unwrap())
            .with_ongoing(
                Term::parse(
                    "is_authorized_by_right('$SUBJECT', '$RIGHT', 'objPip:$OBJECT.rights')",
                )
                .unwrap(),
                Some(Duration::from_millis(500)),
            )
            .with_post_ended(Term::parse("increment('sem:$OBJECT.semaphore')").unwrap())
    }

    #[test]
    fn instantiate_replaces_every_placeholder() {
        let (subject, object, right) = ids();
        let policy = generic().instantiate(&subject, &object, &right);

        assert_eq!(
            policy.pre_access.to_string(),
            "(resolve_string('userPip:alice.role', R), R == admin)"
        );
        assert_eq!(
            policy.ongoing_access.to_string(),
            "is_authorized_by_right(alice, read, 'objPip:doc1.rights')"
        );
        assert_eq!(policy.post_access_ended.to_string(), "increment('sem:doc1.semaphore')");
        assert_eq!(policy.ongoing_period, Some(Duration::from_millis(500)));
    }

    #[test]
    fn instantiate_leaves_generic_policy_untouched() {
        let (subject, object, right) = ids();
        let policy = generic();
        let before = policy.clone();

        let _ = policy.instantiate(&subject, &object, &right);
        assert_eq!(policy, before);
    }

    #[test]
    fn placeholders_inside_identities_are_not_expanded() {
        let (subject, object, right) = ("eve$OBJECT".into(), "doc$RIGHT".into(), "read".into());
        let goal = Term::parse("check('$SUBJECT', 'pip:$OBJECT.owner', '$$RIGHT')").unwrap();

        let instantiated = substitute(&goal, &subject, &object, &right);

        assert_eq!(
            instantiated.to_string(),
            "check('eve$OBJECT', 'pip:doc$RIGHT.owner', '$read')"
        );
    }

    #[test]
    fn merge_conjoins_goals_and_takes_shorter_period() {
        let a = Policy::new(Term::atom("a"))
            .with_ongoing(Term::atom("x"), Some(Duration::from_secs(5)));
        let b = Policy::new(Term::atom("b"))
            .with_ongoing(Term::atom("y"), Some(Duration::from_secs(2)));
        let c = Policy::new(Term::atom("c"));

        let merged = a.merge_by_conjunction(&b);
        assert_eq!(merged.pre_access.to_string(), "(a, b)");
        assert_eq!(merged.ongoing_access.to_string(), "(x, y)");
        assert_eq!(merged.ongoing_period, Some(Duration::from_secs(2)));

        assert_eq!(c.merge_by_conjunction(&a).ongoing_period, Some(Duration::from_secs(5)));
        assert_eq!(c.merge_by_conjunction(&c).ongoing_period, None);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn arb_goal() -> impl Strategy<Value = Term> {
            let leaf = prop_oneof![
                "[a-z]{1,6}".prop_map(Term::atom),
                "[a-z]{1,4}:\\$(SUBJECT|OBJECT|RIGHT)(\\.[a-z]{1,4})?".prop_map(Term::atom),
                Just(Term::atom("$SUBJECT")),
                (0i64..100).prop_map(Term::int),
                "[A-Z]".prop_map(Term::var),
            ];
            let call = ("[a-z_]{1,8}", prop::collection::vec(leaf, 1..4))
                .prop_map(|(functor, args)| Term::compound(functor, args));
            call.prop_recursive(3, 12, 2, |inner| {
                prop_oneof![
                    (inner.clone(), inner.clone()).prop_map(|(a, b)| Term::and(a, b)),
                    (inner.clone(), inner.clone()).prop_map(|(a, b)| Term::or(a, b)),
                    inner.prop_map(Term::not),
                ]
            })
        }

        proptest! {
            #[test]
            fn substitution_is_idempotent_and_pure(
                goal in arb_goal(),
                subject in "[a-z0-9]{1,8}",
                object in "[a-z0-9]{1,8}",
                right in "[a-z]{1,6}",
            ) {
                let (subject, object, right) =
                    (SubjectId::new(subject), ObjectId::new(object), RightId::new(right));
                let original = goal.clone();

                let once = substitute(&goal, &subject, &object, &right);
                let twice = substitute(&once, &subject, &object, &right);

                prop_assert_eq!(&once, &twice);
                prop_assert_eq!(&goal, &original);
                prop_assert!(!once.to_string().contains('$'));
            }

            #[test]
            fn substitution_without_placeholders_is_identity(goal in arb_goal()) {
                let stripped =
                    goal.map_atoms(&|atom| atom.contains('$').then(|| atom.replace('$', "")));
                let result = substitute(&stripped, &"s".into(), &"o".into(), &"r".into());
                prop_assert_eq!(result, stripped);
            }
        }
    }
}
