//! Pre hooks around validation and persistence.

use std::future::{ready, Ready};
use std::sync::{Arc, Mutex};

use crud_service::{Entity, HookError, OperationOptions, Phase, ServiceError};
use serde_json::json;

use crate::support::{contact, contacts, entity};

/// A processor that appends `step` to `log` and passes the payload through.
fn record(
    log: &Arc<Mutex<Vec<String>>>,
    step: &'static str,
) -> impl Fn(Entity) -> Ready<Result<Entity, HookError>> {
    let log = Arc::clone(log);
    move |payload: Entity| {
        log.lock().unwrap().push(step.to_string());
        ready(Ok(payload))
    }
}

#[tokio::test]
async fn pre_returns_the_chain_length() {
    let mut service = contacts();
    let log = Arc::new(Mutex::new(Vec::new()));
    assert_eq!(service.pre(Phase::Create, record(&log, "one")), 1);
    assert_eq!(service.pre(Phase::Create, record(&log, "two")), 2);
    assert_eq!(service.pre(Phase::Update, record(&log, "three")), 1);
    assert_eq!(service.hooks().chain(Phase::Create).len(), 2);
}

#[tokio::test]
async fn create_runs_validate_hooks_before_persist_hooks() {
    let mut service = contacts();
    let log = Arc::new(Mutex::new(Vec::new()));
    service.pre(Phase::Create, record(&log, "create"));
    service.pre(Phase::CreateValidate, record(&log, "createValidate"));

    service.create(contact(), OperationOptions::new()).await.unwrap();
    assert_eq!(*log.lock().unwrap(), ["createValidate", "create"]);
}

#[tokio::test]
async fn later_hooks_receive_earlier_output() {
    let mut service = contacts();
    service.pre(Phase::Create, |mut payload: Entity| async move {
        payload.insert("mobile".into(), json!("h1"));
        Ok::<_, HookError>(payload)
    });
    service.pre(Phase::Create, |mut payload: Entity| async move {
        let seen = payload["mobile"].as_str().unwrap_or_default().to_string();
        payload.insert("mobile".into(), json!(format!("{}>h2", seen)));
        Ok::<_, HookError>(payload)
    });

    let saved = service.create(contact(), OperationOptions::new()).await.unwrap();
    assert_eq!(saved["mobile"], json!("h1>h2"));
}

#[tokio::test]
async fn validate_hooks_can_complete_the_entity() {
    let mut service = contacts();
    service.pre(Phase::CreateValidate, |mut payload: Entity| async move {
        payload.insert("email".into(), json!("generated@serby.net"));
        Ok::<_, HookError>(payload)
    });

    let saved = service
        .create(entity(json!({ "name": "Paul" })), OperationOptions::new())
        .await
        .unwrap();
    assert_eq!(saved["email"], json!("generated@serby.net"));
}

#[tokio::test]
async fn failing_hook_stops_the_operation() {
    let mut service = contacts();
    let log = Arc::new(Mutex::new(Vec::new()));
    service.pre(Phase::Create, |_payload: Entity| async move {
        Err::<Entity, _>(HookError::rejected("duplicate email"))
    });
    service.pre(Phase::Create, record(&log, "after"));

    let err = service.create(contact(), OperationOptions::new()).await.unwrap_err();

    assert!(matches!(err, ServiceError::Hook { phase: Phase::Create, .. }));
    assert_eq!(err.to_string(), "create hook failed: rejected: duplicate email");
    assert_eq!(err.status_code(), 422);
    assert!(log.lock().unwrap().is_empty());
    assert!(service.store().is_empty());
}

#[tokio::test]
async fn validation_failure_skips_persist_hooks() {
    let mut service = contacts();
    let log = Arc::new(Mutex::new(Vec::new()));
    service.pre(Phase::Create, record(&log, "create"));

    let err = service
        .create(entity(json!({ "name": "Paul" })), OperationOptions::new())
        .await
        .unwrap_err();
    assert!(err.is_validation());
    assert!(log.lock().unwrap().is_empty());
}

#[tokio::test]
async fn keys_injected_by_hooks_are_stripped_before_the_write() {
    let mut service = contacts();
    service.pre(Phase::Create, |mut payload: Entity| async move {
        payload.insert("audit".into(), json!("secret"));
        Ok::<_, HookError>(payload)
    });

    let saved = service.create(contact(), OperationOptions::new()).await.unwrap();
    assert!(!saved.contains_key("audit"));
    assert!(!service.store().raw(&saved["_id"]).unwrap().contains_key("audit"));
}

#[tokio::test]
async fn update_phases_are_separate_from_create() {
    let mut service = contacts();
    let log = Arc::new(Mutex::new(Vec::new()));
    service.pre(Phase::UpdateValidate, record(&log, "updateValidate"));
    service.pre(Phase::Update, record(&log, "update"));

    let saved = service.create(contact(), OperationOptions::new()).await.unwrap();
    assert!(log.lock().unwrap().is_empty());

    service.update(saved, OperationOptions::new()).await.unwrap();
    assert_eq!(*log.lock().unwrap(), ["updateValidate", "update"]);
}
