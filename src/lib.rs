use std::sync::Arc;

#[macro_use]
extern crate lazy_static;

use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        Method,
    },
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{app::util::events::EventSink, provider::service::Gateway, quota::service::QuotaGuard};

pub mod app;
pub mod generations;
pub mod images;
pub mod provider;
pub mod quota;

pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<Gateway>,
    pub quota: Arc<QuotaGuard>,
    pub events: Arc<dyn EventSink>,
}

pub fn router(state: AppState, max_upload_bytes: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_methods([Method::POST, Method::GET]);

    let api = Router::new()
        .route("/health", get(app::controller::get_health))
        // generations
        .route(
            "/bg-removal",
            post(generations::controller::remove_background),
        )
        .route(
            "/generate-image",
            post(generations::controller::generate_image),
        )
        .route(
            "/styleImage/single",
            post(generations::controller::style_image_single),
        )
        .route("/styleImage", post(generations::controller::style_image))
        .route("/add-Tattoo", post(generations::controller::add_tattoo))
        .route(
            "/generateImage",
            post(generations::controller::generate_with_references),
        );

    Router::new()
        .nest("/api", api)
        .fallback(app::controller::not_found)
        // layers
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
