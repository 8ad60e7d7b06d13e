//! The policy decision point: try-access, ongoing re-evaluation and
//! end-access over usage sessions.

use std::sync::{Arc, Weak};

use tracing::{debug, info, warn};
use ucon_config::{CombiningAlgorithm, UconConfig};
use ucon_kernel::{AccessGrant, Event, Schedule, State, StateKind};
use ucon_logic::{ComponentRegistry, Library, RuleEngine, Solution, SolveOptions, Term};
use ucon_policy::{Policy, PolicyManagementPoint};
use ucon_types::{Revocation, RevocationReason, SessionKey};

use crate::coordinator::{LockedSession, SessionCoordinator};
use crate::error::{AcquireError, PdpError, Result};
use crate::messages::{
    DecisionRequest, DecisionResponse, EndRequest, EndResponse, ReevaluationOutcome,
};
use crate::session_pip::SessionPip;
use crate::timer::{CancelToken, ReevaluationTimer};

/// Decides on usage requests and keeps re-validating granted usages.
///
/// Cheap to clone; clones share sessions, engine and policy source.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use ucon::{DecisionRequest, PolicyDecisionPoint};
/// use ucon_logic::Term;
/// use ucon_policy::{Policy, PolicyContext, PolicyStore};
/// use ucon_types::{EnforcementListener, Revocation, RightId};
///
/// struct Pep;
/// impl EnforcementListener for Pep {
///     fn on_revocation(&self, _: &Revocation) {}
///     fn do_dependency(&self, _: &str) -> bool { true }
/// }
///
/// let store = Arc::new(PolicyStore::new());
/// store.insert(
///     "open",
///     vec![PolicyContext::ObjectId { value: "doc".into() }],
///     [RightId::new("read")],
///     Policy::new(Term::truth(true)),
/// );
///
/// let pdp = PolicyDecisionPoint::builder().policy_source(store).build().unwrap();
/// let response = pdp
///     .request_decision(&DecisionRequest::new("alice", "doc", "read", Arc::new(Pep)))
///     .unwrap();
/// assert!(response.is_permitted());
/// ```
#[derive(Clone)]
pub struct PolicyDecisionPoint {
    inner: Arc<PdpInner>,
}

struct PdpInner {
    engine: RuleEngine,
    pmp: Arc<dyn PolicyManagementPoint>,
    sessions: SessionCoordinator,
    config: UconConfig,
}

impl PolicyDecisionPoint {
    pub fn builder() -> PdpBuilder {
        PdpBuilder::default()
    }

    pub fn engine(&self) -> &RuleEngine {
        &self.inner.engine
    }

    pub fn registry(&self) -> &Arc<ComponentRegistry> {
        self.inner.engine.registry()
    }

    pub fn sessions(&self) -> &SessionCoordinator {
        &self.inner.sessions
    }

    pub fn config(&self) -> &UconConfig {
        &self.inner.config
    }

    /// Decides whether the requested usage may start.
    ///
    /// On permit the session stays `Accessing` and, when the bound policy
    /// has an ongoing period, is re-evaluated periodically until revoked or
    /// ended.
    pub fn request_decision(&self, request: &DecisionRequest) -> Result<DecisionResponse> {
        self.inner.request_decision(request)
    }

    /// Re-evaluates the ongoing goal of the session for `key` now.
    pub fn trigger_periodic(&self, key: &SessionKey) -> Result<ReevaluationOutcome> {
        self.inner.reevaluate(key, None)
    }

    /// Ends the ongoing usage and runs the post-access-ended goal.
    pub fn end_usage(&self, request: &EndRequest) -> Result<EndResponse> {
        self.inner.end_usage(request)
    }
}

impl std::fmt::Debug for PolicyDecisionPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolicyDecisionPoint")
            .field("engine", &self.inner.engine)
            .field("sessions", &self.inner.sessions)
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

impl PdpInner {
    fn request_decision(self: &Arc<Self>, request: &DecisionRequest) -> Result<DecisionResponse> {
        let key = request.session_key();
        let mut session = match self.sessions.acquire_initial(&key) {
            Ok(session) => session,
            Err(AcquireError::InUse(key)) => {
                info!(%key, "usage already ongoing");
                return Ok(DecisionResponse::InUse { key });
            }
            Err(error) => return Err(error.into()),
        };

        let state = session.feed(Event::TryAccess);
        assert_eq!(state, StateKind::Requesting, "try_access on {key}");

        let candidates = self.pmp.pull_policy(&request.object, &request.right);
        if candidates.is_empty() {
            self.deny(session);
            warn!(
                %key,
                object = %request.object.id,
                right = %request.right,
                "no applicable policy"
            );
            return Err(PdpError::PolicyMissing {
                object: request.object.id.clone(),
                right: request.right.clone(),
            });
        }

        let candidates = match self.config.decision.combining {
            CombiningAlgorithm::FirstApplicable => candidates,
            CombiningAlgorithm::DenyOverrides => candidates
                .into_iter()
                .reduce(|merged, next| merged.merge_by_conjunction(&next))
                .into_iter()
                .collect(),
        };

        let mut halts = Vec::new();
        for (index, generic) in candidates.iter().enumerate() {
            let policy = generic.instantiate(&request.subject, &request.object.id, &request.right);
            match self.engine.solve(&policy.pre_access) {
                Solution::Yes(_) => return self.permit(session, request, policy),
                Solution::No => debug!(%key, candidate = index, "pre-access refused"),
                Solution::Halt(error) => {
                    warn!(%key, candidate = index, %error, "pre-access evaluation halted");
                    halts.push(error);
                }
            }
        }

        self.deny(session);
        info!(%key, halted = halts.len(), "access denied");
        Ok(DecisionResponse::Denied { key, halts })
    }

    fn deny(&self, mut session: LockedSession<'_>) {
        let state = session.feed(Event::DenyAccess);
        assert_eq!(state, StateKind::Denied, "deny_access on {}", session.key());
        self.sessions.release(session);
    }

    fn permit(
        self: &Arc<Self>,
        mut session: LockedSession<'_>,
        request: &DecisionRequest,
        policy: Policy,
    ) -> Result<DecisionResponse> {
        let key = session.key().clone();
        let policy = Arc::new(policy);

        let schedule = match policy.ongoing_period {
            Some(period) => match self.schedule(&key, period) {
                Ok(timer) => Some(Box::new(timer) as Box<dyn Schedule>),
                Err(source) => {
                    self.deny(session);
                    return Err(PdpError::Schedule { key, source });
                }
            },
            None => None,
        };

        let grant = AccessGrant::new(Arc::clone(&policy), Arc::clone(&request.listener), schedule);
        let state = session.feed(Event::PermitAccess(grant));
        assert_eq!(state, StateKind::Accessing, "permit_access on {key}");

        self.engine.registry().register_provider(
            key.as_str(),
            Arc::new(SessionPip::new(Arc::clone(&request.listener))),
        );

        if self.config.decision.evaluate_post_permit {
            self.run_update(&key, "post-permit", &policy.post_permit);
        }

        self.sessions.release(session);
        info!(%key, period = ?policy.ongoing_period, "access permitted");
        Ok(DecisionResponse::Permitted { key })
    }

    fn schedule(
        self: &Arc<Self>,
        key: &SessionKey,
        period: std::time::Duration,
    ) -> std::io::Result<ReevaluationTimer> {
        let scheduler = &self.config.scheduler;
        let period = scheduler.effective_period(period);
        let initial_delay = scheduler.initial_delay().unwrap_or(period);

        let pdp = Arc::downgrade(self);
        let tick_key = key.clone();
        ReevaluationTimer::spawn(key, initial_delay, period, move |token| {
            tick(&pdp, &tick_key, token)
        })
    }

    fn reevaluate(
        &self,
        key: &SessionKey,
        token: Option<&CancelToken>,
    ) -> Result<ReevaluationOutcome> {
        let mut session = self.sessions.acquire_continuous(key)?;
        if token.is_some_and(CancelToken::is_cancelled) {
            self.sessions.release(session);
            return Ok(ReevaluationOutcome::Skipped);
        }

        let State::Accessing(grant) = session.state() else {
            unreachable!("continuous acquire returns accessing sessions");
        };
        let policy = Arc::clone(grant.policy());
        let listener = Arc::clone(grant.listener());

        let reason = match self.engine.solve(&policy.ongoing_access) {
            Solution::Yes(_) => {
                self.sessions.release(session);
                debug!(%key, "ongoing conditions hold");
                return Ok(ReevaluationOutcome::Continued);
            }
            Solution::No => RevocationReason::OngoingDenied,
            Solution::Halt(error) => {
                warn!(%key, %error, "ongoing evaluation halted");
                RevocationReason::OngoingHalted {
                    error: error.to_string(),
                }
            }
        };

        let state = session.feed(Event::RevokeAccess);
        assert_eq!(state, StateKind::Revoked, "revoke_access on {key}");
        self.run_update(key, "post-revocation", &policy.post_access_revoked);
        self.engine.registry().unregister_provider(key.as_str());
        self.sessions.release(session);

        info!(%key, %reason, "access revoked");
        listener.on_revocation(&Revocation {
            key: key.clone(),
            reason: reason.clone(),
        });
        Ok(ReevaluationOutcome::Revoked(reason))
    }

    fn end_usage(&self, request: &EndRequest) -> Result<EndResponse> {
        let key = request.session_key();
        let mut session = self.sessions.acquire_continuous(&key)?;

        let State::Accessing(grant) = session.state() else {
            unreachable!("continuous acquire returns accessing sessions");
        };
        let policy = Arc::clone(grant.policy());

        let state = session.feed(Event::EndAccess);
        assert_eq!(state, StateKind::End, "end_access on {key}");
        let solution = self.run_update(&key, "post-access-ended", &policy.post_access_ended);
        self.engine.registry().unregister_provider(key.as_str());
        self.sessions.release(session);

        info!(%key, %solution, "usage ended");
        Ok(EndResponse { key, solution })
    }

    /// Evaluates an update goal whose outcome never changes the decision.
    fn run_update(&self, key: &SessionKey, phase: &str, goal: &Term) -> Solution {
        let solution = self.engine.solve(goal);
        match &solution {
            Solution::Halt(error) => warn!(%key, phase, %error, "update goal halted"),
            other => debug!(%key, phase, solution = %other, "update goal evaluated"),
        }
        solution
    }
}

/// One timer tick. Returns whether the timer should keep running.
fn tick(pdp: &Weak<PdpInner>, key: &SessionKey, token: &CancelToken) -> bool {
    let Some(pdp) = pdp.upgrade() else {
        return false;
    };
    match pdp.reevaluate(key, Some(token)) {
        Ok(ReevaluationOutcome::Continued) => true,
        Ok(_) => false,
        Err(error) => {
            debug!(%key, %error, "stopping re-evaluation");
            false
        }
    }
}

/// Builds a [`PolicyDecisionPoint`].
#[derive(Default)]
pub struct PdpBuilder {
    registry: Option<Arc<ComponentRegistry>>,
    pmp: Option<Arc<dyn PolicyManagementPoint>>,
    config: UconConfig,
    libraries: Vec<Library>,
}

impl PdpBuilder {
    /// Providers and monitors the predicates talk to. A fresh registry is
    /// used when unset.
    pub fn registry(mut self, registry: Arc<ComponentRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Where candidate policies are pulled from. Required.
    pub fn policy_source(mut self, pmp: Arc<dyn PolicyManagementPoint>) -> Self {
        self.pmp = Some(pmp);
        self
    }

    pub fn config(mut self, config: UconConfig) -> Self {
        self.config = config;
        self
    }

    /// Registers a custom predicate library with the engine.
    pub fn library(mut self, library: Library) -> Self {
        self.libraries.push(library);
        self
    }

    pub fn build(self) -> Result<PolicyDecisionPoint> {
        let pmp = self.pmp.ok_or(PdpError::MissingPolicySource)?;
        let registry = self.registry.unwrap_or_default();
        let options = SolveOptions {
            max_depth: self.config.engine.max_depth,
            max_inferences: self.config.engine.max_inferences,
        };

        let engine = RuleEngine::new(registry).with_options(options);
        for library in self.libraries {
            engine.register_library(library)?;
        }

        Ok(PolicyDecisionPoint {
            inner: Arc::new(PdpInner {
                engine,
                pmp,
                sessions: SessionCoordinator::new(),
                config: self.config,
            }),
        })
    }
}
