pub mod readings;
pub mod relay;
pub mod stats;

use utoipa::OpenApi;

use super::dto::{
    EnergyReadingDto, EnergyReadingInput, EnergyReadingPatch, PowerBucketDto, RelayRequest,
    RelayResponse,
};
use crate::stats::PowerWindow;

// ---------------------------------------------------------------------------
// Health check
// ---------------------------------------------------------------------------

/// Returns `200 OK` with `{"status":"ok"}` when the server is running.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy"),
    ),
    tag = "system"
)]
pub async fn health() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({ "status": "ok" }))
}

// ---------------------------------------------------------------------------
// OpenAPI spec
// ---------------------------------------------------------------------------

#[derive(OpenApi)]
#[openapi(
    paths(
        readings::list_readings,
        readings::create_reading,
        readings::get_reading,
        readings::update_reading,
        readings::patch_reading,
        readings::delete_reading,
        stats::power_report,
        relay::relay_control,
        health,
    ),
    components(schemas(
        EnergyReadingDto,
        EnergyReadingInput,
        EnergyReadingPatch,
        PowerBucketDto,
        PowerWindow,
        RelayRequest,
        RelayResponse,
    )),
    tags(
        (name = "energy", description = "Energy reading CRUD"),
        (name = "stats",  description = "Average power reports"),
        (name = "device", description = "Device relay control"),
        (name = "system", description = "System endpoints"),
    ),
    info(
        title = "Energy Monitor API",
        version = "0.1.0",
        description = "REST API for energy-meter readings, power reports and relay control"
    )
)]
pub struct ApiDoc;
