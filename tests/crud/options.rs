//! tag / persist / validate combinations.
//!
//! `persist` narrows what is written; only `validate` (or `tag`) narrows what
//! is checked.

use crud_service::{OperationOptions, ServiceOptions};
use serde_json::json;

use crate::support::{contact, contacts, contacts_with, entity};

#[tokio::test]
async fn persist_alone_still_validates_every_field() {
    let service = contacts();
    let err = service
        .create(entity(json!({ "name": "Paul" })), OperationOptions::new().persist("c"))
        .await
        .unwrap_err();

    let errors = err.field_errors().unwrap();
    assert_eq!(errors.keys().collect::<Vec<_>>(), ["email", "name"]);
}

#[tokio::test]
async fn persist_with_matching_validate_succeeds() {
    let service = contacts();
    let saved = service
        .create(
            entity(json!({ "name": "Paul", "mobile": "07700" })),
            OperationOptions::new().persist("c").validate("c"),
        )
        .await
        .unwrap();

    assert_eq!(saved["mobile"], json!("07700"));
    assert!(!saved.contains_key("name"));
}

#[tokio::test]
async fn validate_narrows_checks_but_not_the_write() {
    let service = contacts();
    let saved = service
        .create(entity(json!({ "name": "Paul" })), OperationOptions::new().validate("a"))
        .await
        .unwrap();

    assert_eq!(saved["name"], json!("Paul"));
    assert!(saved.contains_key("email"));
    assert!(saved["email"].is_null());
}

#[tokio::test]
async fn tag_narrows_both() {
    let service = contacts();
    let saved = service
        .create(entity(json!({ "name": "Paul" })), OperationOptions::new().tag("a"))
        .await
        .unwrap();

    assert_eq!(saved["name"], json!("Paul"));
    assert!(!saved.contains_key("email"));
}

#[tokio::test]
async fn validate_overrides_tag() {
    let service = contacts();
    let err = service
        .create(
            entity(json!({ "name": "Paul" })),
            OperationOptions::new().tag("a").validate("b"),
        )
        .await
        .unwrap_err();

    assert_eq!(
        err.field_errors().unwrap().keys().collect::<Vec<_>>(),
        ["email"]
    );
}

#[tokio::test]
async fn persist_overrides_tag_for_the_write_only() {
    let service = contacts();
    let saved = service
        .create(
            entity(json!({ "name": "Paul", "email": "paul@serby.net", "mobile": "07700" })),
            OperationOptions::new().tag("c").persist("b"),
        )
        .await
        .unwrap();

    assert_eq!(saved["email"], json!("paul@serby.net"));
    assert!(!saved.contains_key("mobile"));
    assert!(!saved.contains_key("name"));
}

#[tokio::test]
async fn sub_schemas_are_tag_filtered_by_default() {
    let service = contacts();
    let mut input = contact();
    input.insert("mobile".into(), json!("07700"));
    input.insert("comments".into(), json!([{ "thread": "t1", "comment": "hi" }]));

    let saved = service
        .create(input, OperationOptions::new().tag("c"))
        .await
        .unwrap();
    assert_eq!(saved["mobile"], json!("07700"));
    assert!(!saved.contains_key("comments"));
}

#[tokio::test]
async fn ignore_tag_for_sub_schema_keeps_sub_schemas_whole() {
    let service = contacts_with(ServiceOptions {
        ignore_tag_for_sub_schema: true,
        ..ServiceOptions::default()
    });
    let mut input = contact();
    input.insert("mobile".into(), json!("07700"));
    input.insert("comments".into(), json!([{ "thread": "t1", "comment": "hi" }]));

    let saved = service
        .create(input, OperationOptions::new().tag("c"))
        .await
        .unwrap();
    assert_eq!(saved["comments"], json!([{ "thread": "t1", "comment": "hi" }]));
}

#[tokio::test]
async fn ignore_tag_for_sub_schema_can_be_set_per_call() {
    let service = contacts();
    let mut input = contact();
    input.insert("comments".into(), json!([{ "thread": "t1", "comment": "hi" }]));

    let saved = service
        .create(
            input,
            OperationOptions::new().tag("c").ignore_tag_for_sub_schema(true),
        )
        .await
        .unwrap();
    assert_eq!(saved["comments"], json!([{ "thread": "t1", "comment": "hi" }]));
}

#[tokio::test]
async fn set_reaches_validators() {
    use crud_service::validators::validator_fn;
    use crud_service::{CrudService, EntitySchema, FieldSpec, FieldType, InMemoryStore};

    let schema = EntitySchema::new("Account")
        .with_field(FieldSpec::new("_id", FieldType::String))
        .with_field(FieldSpec::new("role", FieldType::String).validator(validator_fn(|field| {
            let admin = field.set.and_then(|set| set["admin"].as_bool()).unwrap_or(false);
            match field.value.and_then(|v| v.as_str()) {
                Some("owner") if !admin => Some("Role requires admin".to_string()),
                _ => None,
            }
        })));
    let service = CrudService::new("Account", schema, InMemoryStore::new()).unwrap();

    let err = service
        .create(entity(json!({ "role": "owner" })), OperationOptions::new())
        .await
        .unwrap_err();
    assert_eq!(err.field_errors().unwrap()["role"], "Role requires admin");

    let saved = service
        .create(
            entity(json!({ "role": "owner" })),
            OperationOptions::new().set(json!({ "admin": true })),
        )
        .await
        .unwrap();
    assert_eq!(saved["role"], json!("owner"));
}
