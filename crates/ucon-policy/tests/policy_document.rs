use std::time::Duration;

use ucon_policy::{
    JsonPolicyLanguage, PolicyContext, PolicyLanguage, PolicyManagementPoint, PolicyStore,
};
use ucon_types::{ObjectId, ObjectRef, RightId, SubjectId};

const POLICY1: &str = include_str!("fixtures/policy1.json");

#[test]
fn policy1_document_is_read_in_full() {
    let signed = JsonPolicyLanguage.deserialize(POLICY1).unwrap();

    assert_eq!(signed.signature, "policySignature");
    assert_eq!(signed.policy.id, "policy1");
    assert_eq!(signed.policy.issuer, "issuerIdentity");
    assert_eq!(
        signed.policy.contexts,
        [PolicyContext::ObjectId { value: "object1".into() }]
    );
    assert_eq!(signed.policy.rights, ["read", "write", "append"]);
    assert_eq!(signed.policy.pre_access.predicates.len(), 3);
}

#[test]
fn policy1_compiles_to_expected_goals() {
    let policy = JsonPolicyLanguage.compile(POLICY1).unwrap();

    assert_eq!(
        policy.pre_access.to_string(),
        "(((resolve_string('subject_pip:$SUBJECT.role', _V1), \
         (resolve_string_list('object_pip:$OBJECT.allowed_roles', _V2), member(_V1, _V2))), \
         decrement('semaphore_pip:$OBJECT.semaphore')), \
         (resolve_string('subject_pip:$SUBJECT.identity', _V3), \
         (resolve_string('object_pip:$OBJECT.identity', _V4), \
         purpose_notification(pip_time1, _V3, _V4, '$RIGHT', monitor))))"
    );
    assert_eq!(policy.ongoing_period, Some(Duration::from_secs(60)));
    assert_eq!(
        policy.ongoing_access.to_string(),
        "day_time_restriction('07:00:00', '18:00:00', pip_time1, \
         ['Monday', 'Tuesday', 'Wednesday', 'Thursday', 'Friday'])"
    );
    assert_eq!(
        policy.post_access_ended.to_string(),
        "increment('semaphore_pip:$OBJECT.semaphore')"
    );
    assert_eq!(policy.post_access_revoked, policy.post_access_ended);
}

#[test]
fn stored_policy1_is_pulled_and_instantiated() {
    let store = PolicyStore::new();
    assert_eq!(store.load_json(POLICY1).unwrap(), "policy1");

    let pulled = store.pull_policy(&ObjectRef::from("object1"), &RightId::new("write"));
    assert_eq!(pulled.len(), 1);
    assert!(
        store
            .pull_policy(&ObjectRef::from("object1"), &RightId::new("delete"))
            .is_empty()
    );

    let instantiated = pulled[0].instantiate(
        &SubjectId::new("alice"),
        &ObjectId::new("object1"),
        &RightId::new("write"),
    );
    let text = instantiated.pre_access.to_string();
    assert!(text.contains("'subject_pip:alice.role'"));
    assert!(text.contains("'semaphore_pip:object1.semaphore'"));
    assert!(text.contains("purpose_notification(pip_time1, _V3, _V4, write, monitor)"));
    assert!(!text.contains('$'));
}
