//! HTTP transport - exposes a `CrudService` as a REST resource.
//!
//! Requires the `http` feature. Uses axum for routing.
//!
//! ## Routes
//!
//! - `POST /` - create. Body = JSON entity.
//! - `GET /` - find. Query parameters are field-equality filters; `skip` and `limit` page.
//! - `GET /count` - count, same filters as find.
//! - `GET /:id` - read.
//! - `PUT /:id` - update.
//! - `PATCH /:id` - partial update.
//! - `DELETE /:id` - delete.
//!
//! Mutating routes, delete included, accept `tag`, `persist` and `validate`
//! query parameters; delete forwards them to its event.
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use crud_service::{http, CrudService, InMemoryStore};
//!
//! let contacts = Arc::new(CrudService::new("Contact", contact_schema(), InMemoryStore::new())?);
//!
//! // Nest under the service slug with other axum routes
//! let app = axum::Router::new().nest("/contact", http::router(contacts.clone()));
//!
//! // Or serve directly
//! http::serve(contacts, "0.0.0.0:3000").await?;
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Path, Query as QueryParams, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::entity::{Entity, Query};
use crate::error::ServiceError;
use crate::options::OperationOptions;
use crate::schema::Schema;
use crate::service::CrudService;
use crate::store::{FindOptions, Store};

/// Options accepted on mutating routes.
#[derive(Debug, Default, Deserialize)]
struct HttpOptions {
    tag: Option<String>,
    persist: Option<String>,
    validate: Option<String>,
}

impl From<HttpOptions> for OperationOptions {
    fn from(options: HttpOptions) -> Self {
        OperationOptions {
            tag: options.tag,
            persist: options.persist,
            validate: options.validate,
            ..OperationOptions::default()
        }
    }
}

/// Build an axum `Router` serving the given service.
pub fn router<S, T>(service: Arc<CrudService<S, T>>) -> Router
where
    S: Schema + 'static,
    T: Store + 'static,
{
    Router::new()
        .route("/", get(find_handler).post(create_handler))
        .route("/count", get(count_handler))
        .route(
            "/:id",
            get(read_handler)
                .put(update_handler)
                .patch(partial_update_handler)
                .delete(delete_handler),
        )
        .with_state(service)
}

/// Serve the service over HTTP at the given address (e.g. `"0.0.0.0:3000"`).
pub async fn serve<S, T>(service: Arc<CrudService<S, T>>, addr: &str) -> Result<(), std::io::Error>
where
    S: Schema + 'static,
    T: Store + 'static,
{
    let app = router(service);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await
}

async fn create_handler<S, T>(
    State(service): State<Arc<CrudService<S, T>>>,
    QueryParams(options): QueryParams<HttpOptions>,
    Json(entity): Json<Entity>,
) -> Response
where
    S: Schema + 'static,
    T: Store + 'static,
{
    match service.create(entity, options.into()).await {
        Ok(saved) => (StatusCode::CREATED, Json(saved)).into_response(),
        Err(e) => error_response(e),
    }
}

async fn find_handler<S, T>(
    State(service): State<Arc<CrudService<S, T>>>,
    QueryParams(params): QueryParams<HashMap<String, String>>,
) -> Response
where
    S: Schema + 'static,
    T: Store + 'static,
{
    let (query, paging) = match find_params(service.as_ref(), params) {
        Ok(parsed) => parsed,
        Err(response) => return response,
    };
    match service.find_buffered(&query, paging).await {
        Ok(found) => Json(found).into_response(),
        Err(e) => error_response(e),
    }
}

async fn count_handler<S, T>(
    State(service): State<Arc<CrudService<S, T>>>,
    QueryParams(params): QueryParams<HashMap<String, String>>,
) -> Response
where
    S: Schema + 'static,
    T: Store + 'static,
{
    let (query, _) = match find_params(service.as_ref(), params) {
        Ok(parsed) => parsed,
        Err(response) => return response,
    };
    match service.count(&query).await {
        Ok(count) => Json(json!({ "count": count })).into_response(),
        Err(e) => error_response(e),
    }
}

async fn read_handler<S, T>(
    State(service): State<Arc<CrudService<S, T>>>,
    Path(id): Path<String>,
) -> Response
where
    S: Schema + 'static,
    T: Store + 'static,
{
    match service.read(&Value::String(id)).await {
        Ok(Some(entity)) => Json(entity).into_response(),
        Ok(None) => not_found(),
        Err(e) => error_response(e),
    }
}

async fn update_handler<S, T>(
    State(service): State<Arc<CrudService<S, T>>>,
    Path(id): Path<String>,
    QueryParams(options): QueryParams<HttpOptions>,
    Json(mut entity): Json<Entity>,
) -> Response
where
    S: Schema + 'static,
    T: Store + 'static,
{
    entity.insert(service.id_property().to_string(), Value::String(id));
    match service.update(entity, options.into()).await {
        Ok(Some(saved)) => Json(saved).into_response(),
        Ok(None) => not_found(),
        Err(e) => error_response(e),
    }
}

async fn partial_update_handler<S, T>(
    State(service): State<Arc<CrudService<S, T>>>,
    Path(id): Path<String>,
    QueryParams(options): QueryParams<HttpOptions>,
    Json(mut patch): Json<Entity>,
) -> Response
where
    S: Schema + 'static,
    T: Store + 'static,
{
    patch.insert(service.id_property().to_string(), Value::String(id));
    match service.partial_update(patch, options.into()).await {
        Ok(Some(saved)) => Json(saved).into_response(),
        Ok(None) => not_found(),
        Err(e) => error_response(e),
    }
}

async fn delete_handler<S, T>(
    State(service): State<Arc<CrudService<S, T>>>,
    Path(id): Path<String>,
    QueryParams(options): QueryParams<HttpOptions>,
) -> Response
where
    S: Schema + 'static,
    T: Store + 'static,
{
    match service.delete(&Value::String(id), options.into()).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(e),
    }
}

/// Split find parameters into paging and a typed equality filter.
///
/// Only declared fields filter; values are cast to the field's type.
fn find_params<S, T>(
    service: &CrudService<S, T>,
    params: HashMap<String, String>,
) -> Result<(Query, FindOptions), Response>
where
    S: Schema + 'static,
    T: Store,
{
    let mut query = Query::new();
    let mut paging = FindOptions::new();
    for (key, value) in params {
        match key.as_str() {
            "skip" => paging.skip = Some(parse_count(&key, &value)?),
            "limit" => paging.limit = Some(parse_count(&key, &value)?),
            _ => {
                let schema = service.schema();
                if let Some(field) = schema.field(&key) {
                    let typed = schema.cast_property(field.field_type(), &Value::String(value));
                    query.insert(key, typed);
                }
            }
        }
    }
    Ok((query, paging))
}

fn parse_count(key: &str, value: &str) -> Result<usize, Response> {
    value.parse().map_err(|_| {
        let body = json!({ "error": format!("{} must be a non-negative integer", key) });
        (StatusCode::BAD_REQUEST, Json(body)).into_response()
    })
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "not found" }))).into_response()
}

fn error_response(e: ServiceError) -> Response {
    let status = StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let body = match e.field_errors() {
        Some(errors) => json!({ "error": e.to_string(), "errors": errors }),
        None => json!({ "error": e.to_string() }),
    };
    (status, Json(body)).into_response()
}
