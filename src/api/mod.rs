pub mod dto;
pub mod errors;
pub mod handlers;

use axum::{extract::FromRef, routing::{get, post}, Router};
use sqlx::PgPool;
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;

use crate::relay::RelayClient;
use handlers::ApiDoc;

/// Shared by every handler. `relay` is `None` when no device address is configured.
#[derive(Debug, Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub relay: Option<RelayClient>,
}

impl AppState {
    pub fn new(pool: PgPool, relay: Option<RelayClient>) -> Self {
        Self { pool, relay }
    }
}

impl FromRef<AppState> for PgPool {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}

pub fn router(state: AppState) -> Router {
    let (router, api) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .route(
            "/api/energy/",
            get(handlers::readings::list_readings).post(handlers::readings::create_reading),
        )
        .route(
            "/api/energy/{id}/",
            get(handlers::readings::get_reading)
                .put(handlers::readings::update_reading)
                .patch(handlers::readings::patch_reading)
                .delete(handlers::readings::delete_reading),
        )
        .route(
            "/api/stats/power/{window}/",
            get(handlers::stats::power_report),
        )
        .route("/api/device/relay/", post(handlers::relay::relay_control))
        .with_state(state)
        .split_for_parts();

    router
        .route("/health", get(handlers::health))
        .route(
            "/api-docs/openapi.json",
            get(move || async move { axum::Json(api) }),
        )
}
