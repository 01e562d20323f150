//! find (buffered and streamed) and count.

use crud_service::{FindOptions, OperationOptions, Query, Store};
use futures::TryStreamExt;
use serde_json::json;

use crate::support::{contact, contacts, entity, Contacts};

async fn seed(service: &Contacts) {
    for name in ["Paul", "Ben", "Dom", "Paul"] {
        let mut input = contact();
        input.insert("name".into(), json!(name));
        service.create(input, OperationOptions::new()).await.unwrap();
    }
}

#[tokio::test]
async fn find_buffered_filters_by_field() {
    let service = contacts();
    seed(&service).await;

    let found = service
        .find_buffered(&entity(json!({ "name": "Paul" })), FindOptions::new())
        .await
        .unwrap();
    let ids: Vec<_> = found.iter().map(|e| e["_id"].clone()).collect();
    assert_eq!(ids, [json!("1"), json!("4")]);
}

#[tokio::test]
async fn find_buffered_pages() {
    let service = contacts();
    seed(&service).await;

    let page = service
        .find_buffered(&Query::new(), FindOptions::new().skip(1).limit(2))
        .await
        .unwrap();
    let names: Vec<_> = page.iter().map(|e| e["name"].clone()).collect();
    assert_eq!(names, [json!("Ben"), json!("Dom")]);
}

#[tokio::test]
async fn find_all_streams_stripped_entities() {
    let service = contacts();
    seed(&service).await;
    let mut raw = contact();
    raw.insert("legacy".into(), json!(1));
    service.store().create(raw).await.unwrap();

    let streamed: Vec<_> = service
        .find_all(&Query::new(), FindOptions::new())
        .try_collect()
        .await
        .unwrap();
    let buffered = service
        .find_buffered(&Query::new(), FindOptions::new())
        .await
        .unwrap();

    assert_eq!(streamed.len(), 5);
    assert_eq!(streamed, buffered);
    assert!(streamed.iter().all(|e| !e.contains_key("legacy")));
}

#[tokio::test]
async fn count_matches() {
    let service = contacts();
    seed(&service).await;

    assert_eq!(service.count(&Query::new()).await.unwrap(), 4);
    assert_eq!(
        service.count(&entity(json!({ "name": "Paul" }))).await.unwrap(),
        2
    );
    assert_eq!(
        service.count(&entity(json!({ "name": "Nobody" }))).await.unwrap(),
        0
    );
}
