//! delete and deleteMany.

use std::sync::{Arc, Mutex};

use crud_service::{Entity, EventKind, HookError, OperationOptions, Phase, Query, ServiceEvent};
use serde_json::json;

use crate::support::{contact, contacts, entity};

#[tokio::test]
async fn delete_removes_the_entity() {
    let service = contacts();
    let saved = service.create(contact(), OperationOptions::new()).await.unwrap();

    service.delete(&saved["_id"], OperationOptions::new()).await.unwrap();
    assert!(service.read(&saved["_id"]).await.unwrap().is_none());
}

#[tokio::test]
async fn deleting_a_missing_entity_succeeds() {
    let service = contacts();
    service.delete(&json!("404"), OperationOptions::new()).await.unwrap();
}

#[tokio::test]
async fn delete_hooks_see_the_identifier() {
    let mut service = contacts();
    let seen = Arc::new(Mutex::new(Entity::new()));
    let captured = Arc::clone(&seen);
    service.pre(Phase::Delete, move |payload: Entity| {
        let captured = Arc::clone(&captured);
        async move {
            *captured.lock().unwrap() = payload.clone();
            Ok::<_, HookError>(payload)
        }
    });
    let saved = service.create(contact(), OperationOptions::new()).await.unwrap();

    service.delete(&saved["_id"], OperationOptions::new()).await.unwrap();
    assert_eq!(*seen.lock().unwrap(), entity(json!({ "_id": "1" })));
}

#[tokio::test]
async fn delete_hook_can_veto() {
    let mut service = contacts();
    service.pre(Phase::Delete, |_payload: Entity| async move {
        Err::<Entity, _>(HookError::rejected("contacts are permanent"))
    });
    let saved = service.create(contact(), OperationOptions::new()).await.unwrap();

    let err = service
        .delete(&saved["_id"], OperationOptions::new())
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), 422);
    assert!(service.read(&saved["_id"]).await.unwrap().is_some());
}

#[tokio::test]
async fn delete_emits_the_identifier_and_options() {
    let service = contacts();
    let events = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&events);
    service.on(EventKind::Delete, move |event| log.lock().unwrap().push(event.clone()));
    let saved = service.create(contact(), OperationOptions::new()).await.unwrap();

    let options = OperationOptions::new().with("reason", json!("gdpr"));
    service.delete(&saved["_id"], options.clone()).await.unwrap();

    let events = events.lock().unwrap();
    assert_eq!(
        *events,
        [ServiceEvent::Delete {
            id: json!("1"),
            options
        }]
    );
}

#[tokio::test]
async fn delete_many_removes_matches_and_emits_the_query() {
    let service = contacts();
    let queries = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&queries);
    service.on(EventKind::DeleteMany, move |event| {
        if let ServiceEvent::DeleteMany { query } = event {
            log.lock().unwrap().push(query.clone());
        }
    });

    service.create(contact(), OperationOptions::new()).await.unwrap();
    service.create(contact(), OperationOptions::new()).await.unwrap();
    let mut other = contact();
    other.insert("name".into(), json!("Ben"));
    service.create(other, OperationOptions::new()).await.unwrap();

    let query = entity(json!({ "name": "Paul" }));
    service.delete_many(query.clone()).await.unwrap();

    assert_eq!(service.count(&Query::new()).await.unwrap(), 1);
    assert_eq!(*queries.lock().unwrap(), [query]);
}
