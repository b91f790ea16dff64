use axum::{
    extract::{Path, State},
    http::StatusCode,
    middleware,
    routing::{get, post, put},
    Json, Router,
};
use futures::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId};
use mongodb::options::{FindOneAndUpdateOptions, FindOptions, ReturnDocument};
use serde_json::{json, Value};

use crate::auth::{require_admin, require_auth};
use crate::error::{ApiError, ApiJson};
use crate::model::service::{Service, ServiceInput, ServiceResponse};
use crate::state::AppState;

// Reads are public; mutations sit behind the auth and admin gates.
pub fn service_router(state: AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/api/services", get(list_services))
        .route("/api/services/:id", get(get_service));
    let admin = Router::new()
        .route("/api/services", post(create_service))
        .route("/api/services/:id", put(update_service).delete(delete_service))
        .route_layer(middleware::from_fn(require_admin))
        .route_layer(middleware::from_fn_with_state(state, require_auth));
    public.merge(admin)
}

fn parse_service_id(id: &str) -> Result<ObjectId, ApiError> {
    ObjectId::parse_str(id).map_err(|_| ApiError::NotFound("Service"))
}

async fn list_services(
    State(state): State<AppState>,
) -> Result<Json<Vec<ServiceResponse>>, ApiError> {
    let options = FindOptions::builder().sort(doc! { "createdAt": -1 }).build();
    let services: Vec<Service> = state
        .services()
        .find(doc! {}, options)
        .await?
        .try_collect()
        .await?;
    Ok(Json(services.into_iter().map(ServiceResponse::from).collect()))
}

async fn get_service(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ServiceResponse>, ApiError> {
    let id = parse_service_id(&id)?;
    let service = state
        .services()
        .find_one(doc! { "_id": id }, None)
        .await?
        .ok_or(ApiError::NotFound("Service"))?;
    Ok(Json(service.into()))
}

async fn create_service(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<ServiceInput>,
) -> Result<(StatusCode, Json<ServiceResponse>), ApiError> {
    let mut service = input.into_service().map_err(ApiError::Validation)?;
    let inserted = state.services().insert_one(&service, None).await?;
    service.id = inserted.inserted_id.as_object_id();
    tracing::info!("created service {:?}", service.title);
    Ok((StatusCode::CREATED, Json(service.into())))
}

async fn update_service(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(input): ApiJson<ServiceInput>,
) -> Result<Json<ServiceResponse>, ApiError> {
    let id = parse_service_id(&id)?;
    let mut set = input.into_update().map_err(ApiError::Validation)?;
    set.insert("updatedAt", mongodb::bson::DateTime::now());

    let options = FindOneAndUpdateOptions::builder()
        .return_document(ReturnDocument::After)
        .build();
    let updated = state
        .services()
        .find_one_and_update(doc! { "_id": id }, doc! { "$set": set }, options)
        .await?
        .ok_or(ApiError::NotFound("Service"))?;
    Ok(Json(updated.into()))
}

async fn delete_service(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let id = parse_service_id(&id)?;
    let result = state.services().delete_one(doc! { "_id": id }, None).await?;
    if result.deleted_count == 0 {
        return Err(ApiError::NotFound("Service"));
    }
    tracing::info!("deleted service {}", id.to_hex());
    Ok(Json(json!({ "message": "Service deleted successfully" })))
}
