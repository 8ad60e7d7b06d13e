//! A JSON policy document driven through a full usage lifecycle.

mod common;

use std::sync::Arc;

use common::{MapPip, RecordingListener, request};
use parking_lot::Mutex;
use ucon::{
    ComponentRegistry, EndRequest, MonitorClient, PolicyDecisionPoint, PolicyStore,
    ReevaluationOutcome, RevocationReason, SessionKey, Value,
};

const POLICY: &str = include_str!("../../ucon-policy/tests/fixtures/policy1.json");

// 2024-01-03 (Wednesday) and 2024-01-06 (Saturday), both 10:00:00 UTC.
const WEDNESDAY_MORNING: i64 = 1_704_276_000;
const SATURDAY_MORNING: i64 = 1_704_535_200;

#[derive(Default)]
struct RecordingMonitor {
    messages: Mutex<Vec<String>>,
}

impl MonitorClient for RecordingMonitor {
    fn notify(&self, message: &str) -> bool {
        self.messages.lock().push(message.to_string());
        true
    }
}

struct Fixture {
    pdp: PolicyDecisionPoint,
    clock: Arc<MapPip>,
    semaphores: Arc<MapPip>,
    monitor: Arc<RecordingMonitor>,
}

fn fixture() -> Fixture {
    let registry = Arc::new(ComponentRegistry::new());
    let subjects = MapPip::default()
        .with("alice.role", "analyst")
        .with("alice.identity", "alice@example.org")
        .with("mallory.role", "intruder")
        .with("mallory.identity", "mallory@example.org");
    let objects = MapPip::default()
        .with(
            "object1.allowed_roles",
            vec!["analyst".to_string(), "auditor".to_string()],
        )
        .with("object1.identity", "object1@example.org");
    let clock = Arc::new(MapPip::default().with("now", WEDNESDAY_MORNING));
    let semaphores = Arc::new(MapPip::default());
    let monitor = Arc::new(RecordingMonitor::default());

    registry.register_provider("subject_pip", Arc::new(subjects));
    registry.register_provider("object_pip", Arc::new(objects));
    registry.register_provider("pip_time1", clock.clone());
    registry.register_provider("semaphore_pip", semaphores.clone());
    registry.register_monitor("monitor", monitor.clone());

    let store = Arc::new(PolicyStore::new());
    assert_eq!(store.load_json(POLICY).unwrap(), "policy1");

    let pdp = PolicyDecisionPoint::builder()
        .registry(registry)
        .policy_source(store)
        .build()
        .unwrap();
    Fixture {
        pdp,
        clock,
        semaphores,
        monitor,
    }
}

#[test]
fn permitted_usage_notifies_and_ends() {
    let fixture = fixture();
    let listener = Arc::new(RecordingListener::default());

    let response = fixture
        .pdp
        .request_decision(&request("alice", "object1", "read", &listener))
        .unwrap();
    assert!(response.is_permitted());
    assert_eq!(
        *fixture.monitor.messages.lock(),
        [concat!(
            "2024-01-03T10:00:00: Usage of object=object1@example.org ",
            "from subject=alice@example.org with right=read."
        )]
    );

    let key = SessionKey::from("alice/object1/read");
    assert_eq!(
        fixture.pdp.trigger_periodic(&key).unwrap(),
        ReevaluationOutcome::Continued
    );

    let ended = fixture
        .pdp
        .end_usage(&EndRequest::new("alice", "object1", "read"))
        .unwrap();
    assert!(ended.solution.is_yes());
    assert_eq!(
        fixture.semaphores.updates(),
        [
            ("object1.semaphore".to_string(), "decrement".to_string()),
            ("object1.semaphore".to_string(), "increment".to_string()),
        ]
    );
}

#[test]
fn subject_without_allowed_role_is_denied() {
    let fixture = fixture();
    let listener = Arc::new(RecordingListener::default());

    let response = fixture
        .pdp
        .request_decision(&request("mallory", "object1", "write", &listener))
        .unwrap();

    assert!(response.is_denied());
    assert!(fixture.monitor.messages.lock().is_empty());
    assert!(fixture.semaphores.updates().is_empty());
}

#[test]
fn usage_outside_working_days_is_revoked() {
    let fixture = fixture();
    let listener = Arc::new(RecordingListener::default());
    fixture
        .pdp
        .request_decision(&request("alice", "object1", "append", &listener))
        .unwrap();

    fixture.clock.set("now", Value::from(SATURDAY_MORNING));
    let outcome = fixture
        .pdp
        .trigger_periodic(&SessionKey::from("alice/object1/append"))
        .unwrap();

    assert_eq!(
        outcome,
        ReevaluationOutcome::Revoked(RevocationReason::OngoingDenied)
    );
    assert_eq!(listener.revocation_count(), 1);
    assert_eq!(
        fixture.semaphores.updates().last(),
        Some(&("object1.semaphore".to_string(), "increment".to_string()))
    );
    assert!(fixture.pdp.sessions().is_empty());
}
