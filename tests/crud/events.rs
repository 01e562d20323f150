//! Mutation events.

use std::sync::{Arc, Mutex};

use crud_service::{EventKind, OperationOptions, ServiceEvent};
use serde_json::json;

use crate::support::{contact, contacts, entity, Contacts};

fn capture(service: &Contacts, kind: EventKind) -> Arc<Mutex<Vec<ServiceEvent>>> {
    let events = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&events);
    service.on(kind, move |event| log.lock().unwrap().push(event.clone()));
    events
}

#[tokio::test]
async fn create_event_carries_the_saved_entity_and_options() {
    let service = contacts();
    let events = capture(&service, EventKind::Create);

    let options = OperationOptions::new().with("test", json!("Test"));
    let saved = service.create(contact(), options.clone()).await.unwrap();

    let events = events.lock().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].entity(), Some(&saved));
    assert_eq!(events[0].options(), Some(&options));
    assert_eq!(events[0].options().unwrap().extra["test"], json!("Test"));
}

#[tokio::test]
async fn event_fires_after_the_write_and_before_return() {
    let service = contacts();
    let store = service.store().clone();
    let stored_when_notified = Arc::new(Mutex::new(None));
    let seen = Arc::clone(&stored_when_notified);
    service.on(EventKind::Create, move |event| {
        let id = &event.entity().unwrap()["_id"];
        *seen.lock().unwrap() = Some(store.raw(id).is_some());
    });

    service.create(contact(), OperationOptions::new()).await.unwrap();
    assert_eq!(*stored_when_notified.lock().unwrap(), Some(true));
}

#[tokio::test]
async fn failed_operations_emit_nothing() {
    let service = contacts();
    let events = capture(&service, EventKind::Create);

    service
        .create(entity(json!({ "name": "Paul" })), OperationOptions::new())
        .await
        .unwrap_err();
    assert!(events.lock().unwrap().is_empty());
}

#[tokio::test]
async fn update_event_reports_no_value() {
    let service = contacts();
    let events = capture(&service, EventKind::Update);
    let mut missing = contact();
    missing.insert("_id".into(), json!("99"));

    service.update(missing, OperationOptions::new()).await.unwrap();

    let events = events.lock().unwrap();
    assert_eq!(events.len(), 1);
    assert!(matches!(&events[0], ServiceEvent::Update { entity: None, .. }));
}

#[tokio::test]
async fn partial_update_event_carries_the_original() {
    let service = contacts();
    let events = capture(&service, EventKind::PartialUpdate);
    let saved = service.create(contact(), OperationOptions::new()).await.unwrap();

    service
        .partial_update(
            entity(json!({ "_id": saved["_id"], "name": "Serby" })),
            OperationOptions::new(),
        )
        .await
        .unwrap();

    let events = events.lock().unwrap();
    let ServiceEvent::PartialUpdate {
        entity: Some(updated),
        original,
        ..
    } = &events[0]
    else {
        panic!("expected a partial update event");
    };
    assert_eq!(original["name"], json!("Paul"));
    assert_eq!(updated["name"], json!("Serby"));
}

#[tokio::test]
async fn on_any_sees_every_mutation_in_order() {
    let service = contacts();
    let kinds = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&kinds);
    service
        .events()
        .on_any(move |event| log.lock().unwrap().push(event.kind()));

    let saved = service.create(contact(), OperationOptions::new()).await.unwrap();
    service.update(saved.clone(), OperationOptions::new()).await.unwrap();
    service
        .partial_update(
            entity(json!({ "_id": saved["_id"], "mobile": "07700" })),
            OperationOptions::new(),
        )
        .await
        .unwrap();
    service.delete(&saved["_id"], OperationOptions::new()).await.unwrap();
    service.delete_many(crud_service::Query::new()).await.unwrap();

    assert_eq!(*kinds.lock().unwrap(), EventKind::ALL);
}

#[cfg(feature = "emitter")]
#[tokio::test]
async fn forwards_events_to_an_event_emitter() {
    use crud_service::EventEmitter;
    use std::time::Duration;

    let service = contacts();
    let received = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&received);
    let mut emitter = EventEmitter::new();
    emitter.on("create", move |payload: String| log.lock().unwrap().push(payload));
    service.events().forward_to(emitter);

    service.create(contact(), OperationOptions::new()).await.unwrap();

    // EventEmitter is async, give it time
    tokio::time::sleep(Duration::from_millis(50)).await;
    let received = received.lock().unwrap();
    assert_eq!(received.len(), 1);
    let payload: serde_json::Value = serde_json::from_str(&received[0]).unwrap();
    assert_eq!(payload["event"], json!("create"));
    assert_eq!(payload["entity"]["name"], json!("Paul"));
}
