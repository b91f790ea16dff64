use std::sync::Arc;

use dotenv::dotenv;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::EnvFilter;

use door2day_api::{config::Config, db, routes, state::AppState};

#[tokio::main]
async fn main() {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env();
    let db = db::connect(&config)
        .await
        .expect("Failed to connect to MongoDB");

    let state = AppState {
        db,
        config: Arc::new(config),
    };
    db::ensure_indexes(&state)
        .await
        .expect("Failed to create indexes");
    db::seed_admin(&state).await.expect("Failed to seed admin");

    let addr = state.config.listen_addr.clone();
    let app = routes::api_router(state)
        .layer(TraceLayer::new_for_http())
        // CORS for the storefront frontend
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind listen address");
    tracing::info!("listening on http://{}", addr);

    axum::serve(listener, app).await.expect("server error");
}
