use std::collections::{HashMap, HashSet};

use axum::{
    extract::{Path, State},
    http::StatusCode,
    middleware,
    routing::{get, post},
    Extension, Json, Router,
};
use futures::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId};
use mongodb::options::{FindOneAndUpdateOptions, FindOptions, ReturnDocument};
use serde_json::{json, Value};

use crate::auth::{authorize_owner, require_auth, CurrentUser};
use crate::error::{ApiError, ApiJson, FieldError};
use crate::model::booking::{Booking, BookingDetail, BookingInput, BookingResponse};
use crate::model::service::{Service, ServiceBrief};
use crate::model::user::{Role, User, UserBrief};
use crate::state::AppState;

// Every booking route requires an authenticated requester; the finer
// owner-or-admin decisions happen per handler once the record is loaded.
pub fn booking_router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/api/bookings", post(create_booking).get(list_bookings))
        .route(
            "/api/bookings/:id",
            get(get_booking).put(update_booking).delete(delete_booking),
        )
        .route_layer(middleware::from_fn_with_state(state, require_auth))
}

fn parse_booking_id(id: &str) -> Result<ObjectId, ApiError> {
    ObjectId::parse_str(id).map_err(|_| ApiError::NotFound("Booking"))
}

async fn create_booking(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    ApiJson(input): ApiJson<BookingInput>,
) -> Result<(StatusCode, Json<BookingResponse>), ApiError> {
    let mut booking = input.into_booking(user.id).map_err(ApiError::Validation)?;

    // The reference must point at a real service before anything is written.
    let service = state
        .services()
        .find_one(doc! { "_id": booking.service }, None)
        .await?
        .ok_or_else(|| {
            ApiError::Validation(vec![FieldError::new("service", "service does not exist")])
        })?;

    let inserted = state.bookings().insert_one(&booking, None).await?;
    booking.id = inserted.inserted_id.as_object_id();
    tracing::info!("created booking for user {}", user.id.to_hex());

    let response = BookingResponse::new(
        booking,
        Some(ServiceBrief::from(&service)),
        Some(UserBrief {
            id: user.id.to_hex(),
            name: user.name,
            email: user.email,
        }),
    );
    Ok((StatusCode::CREATED, Json(response)))
}

async fn list_bookings(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<Vec<BookingResponse>>, ApiError> {
    let filter = if user.role == Role::Admin {
        doc! {}
    } else {
        doc! { "user": user.id }
    };
    let options = FindOptions::builder().sort(doc! { "createdAt": -1 }).build();
    let bookings: Vec<Booking> = state
        .bookings()
        .find(filter, options)
        .await?
        .try_collect()
        .await?;

    // Batch-resolve the referenced services and users, then join in memory.
    let service_ids: Vec<ObjectId> = bookings
        .iter()
        .map(|b| b.service)
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    let user_ids: Vec<ObjectId> = bookings
        .iter()
        .map(|b| b.user)
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();

    let services: HashMap<ObjectId, Service> = state
        .services()
        .find(doc! { "_id": { "$in": service_ids } }, None)
        .await?
        .try_collect::<Vec<_>>()
        .await?
        .into_iter()
        .filter_map(|s| s.id.map(|id| (id, s)))
        .collect();
    let users: HashMap<ObjectId, User> = state
        .users()
        .find(doc! { "_id": { "$in": user_ids } }, None)
        .await?
        .try_collect::<Vec<_>>()
        .await?
        .into_iter()
        .filter_map(|u| u.id.map(|id| (id, u)))
        .collect();

    let responses = bookings
        .into_iter()
        .map(|booking| {
            let service = services.get(&booking.service).map(ServiceBrief::from);
            let owner = users.get(&booking.user).map(UserBrief::from);
            BookingResponse::new(booking, service, owner)
        })
        .collect();
    Ok(Json(responses))
}

async fn get_booking(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Json<BookingDetail>, ApiError> {
    let id = parse_booking_id(&id)?;
    let booking = state
        .bookings()
        .find_one(doc! { "_id": id }, None)
        .await?
        .ok_or(ApiError::NotFound("Booking"))?;
    authorize_owner(&user, booking.user)?;

    let service = state
        .services()
        .find_one(doc! { "_id": booking.service }, None)
        .await?;
    let owner = state
        .users()
        .find_one(doc! { "_id": booking.user }, None)
        .await?;
    Ok(Json(BookingDetail::new(
        booking,
        service,
        owner.as_ref().map(UserBrief::from),
    )))
}

async fn update_booking(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
    ApiJson(input): ApiJson<BookingInput>,
) -> Result<Json<BookingResponse>, ApiError> {
    let id = parse_booking_id(&id)?;
    let booking = state
        .bookings()
        .find_one(doc! { "_id": id }, None)
        .await?
        .ok_or(ApiError::NotFound("Booking"))?;
    authorize_owner(&user, booking.user)?;

    let mut set = input.into_update().map_err(ApiError::Validation)?;
    set.insert("updatedAt", mongodb::bson::DateTime::now());

    let options = FindOneAndUpdateOptions::builder()
        .return_document(ReturnDocument::After)
        .build();
    let updated = state
        .bookings()
        .find_one_and_update(doc! { "_id": id }, doc! { "$set": set }, options)
        .await?
        .ok_or(ApiError::NotFound("Booking"))?;

    let service = state
        .services()
        .find_one(doc! { "_id": updated.service }, None)
        .await?;
    let owner = state
        .users()
        .find_one(doc! { "_id": updated.user }, None)
        .await?;
    Ok(Json(BookingResponse::new(
        updated,
        service.as_ref().map(ServiceBrief::from),
        owner.as_ref().map(UserBrief::from),
    )))
}

async fn delete_booking(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let id = parse_booking_id(&id)?;
    let booking = state
        .bookings()
        .find_one(doc! { "_id": id }, None)
        .await?
        .ok_or(ApiError::NotFound("Booking"))?;
    authorize_owner(&user, booking.user)?;

    state.bookings().delete_one(doc! { "_id": id }, None).await?;
    tracing::info!("deleted booking {}", id.to_hex());
    Ok(Json(json!({ "message": "Booking deleted successfully" })))
}
