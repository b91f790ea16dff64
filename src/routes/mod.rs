use axum::Router;

use crate::state::AppState;

pub mod auth;
pub mod bookings;
pub mod services;

pub fn api_router(state: AppState) -> Router {
    Router::new()
        .merge(auth::auth_router(state.clone()))
        .merge(services::service_router(state.clone()))
        .merge(bookings::booking_router(state.clone()))
        .with_state(state)
}
