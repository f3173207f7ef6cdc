use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::{
    api::{
        dto::{EnergyReadingDto, EnergyReadingInput, EnergyReadingPatch, ListParams},
        errors::AppError,
    },
    db::{self, models::ReadingFilter},
};

fn not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("energy reading {id} not found"))
}

/// List readings, newest first unless `ordering=created_at` is given.
#[utoipa::path(
    get,
    path = "/api/energy/",
    params(
        ("device_id"      = Option<String>,        Query, description = "Exact device id"),
        ("search"         = Option<String>,        Query, description = "Case-insensitive substring of device id"),
        ("created_after"  = Option<chrono::DateTime<chrono::Utc>>, Query, description = "Inclusive lower bound on created_at (RFC3339)"),
        ("created_before" = Option<chrono::DateTime<chrono::Utc>>, Query, description = "Inclusive upper bound on created_at (RFC3339)"),
        ("ordering"       = Option<String>,        Query, description = "`-created_at` (default) or `created_at`"),
        ("limit"          = Option<i64>,           Query, description = "Maximum number of rows"),
        ("offset"         = Option<i64>,           Query, description = "Rows to skip"),
    ),
    responses(
        (status = 200, description = "Energy readings", body = Vec<EnergyReadingDto>),
        (status = 400, description = "Invalid query parameters"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "energy"
)]
pub async fn list_readings(
    State(pool): State<PgPool>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Vec<EnergyReadingDto>>, AppError> {
    let Query(params) = params?;
    let filter = ReadingFilter::try_from(params)?;
    let rows = db::readings::list(&pool, &filter).await?;

    Ok(Json(rows.into_iter().map(Into::into).collect()))
}

/// Store a new reading. `created_at` is assigned by the server.
#[utoipa::path(
    post,
    path = "/api/energy/",
    request_body = EnergyReadingInput,
    responses(
        (status = 201, description = "Reading stored", body = EnergyReadingDto),
        (status = 400, description = "Invalid body"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "energy"
)]
pub async fn create_reading(
    State(pool): State<PgPool>,
    payload: Result<Json<EnergyReadingInput>, JsonRejection>,
) -> Result<(StatusCode, Json<EnergyReadingDto>), AppError> {
    let Json(input) = payload?;
    let reading = db::readings::insert(&pool, &input.into_new_reading()?).await?;

    info!(
        reading = %reading,
        active_power_w = reading.active_power_w,
        "Energy reading stored"
    );
    Ok((StatusCode::CREATED, Json(reading.into())))
}

#[utoipa::path(
    get,
    path = "/api/energy/{id}/",
    params(
        ("id" = Uuid, Path, description = "Reading id"),
    ),
    responses(
        (status = 200, description = "Energy reading", body = EnergyReadingDto),
        (status = 404, description = "No such reading"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "energy"
)]
pub async fn get_reading(
    State(pool): State<PgPool>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<EnergyReadingDto>, AppError> {
    let Path(id) = id?;
    let reading = db::readings::find(&pool, id)
        .await?
        .ok_or_else(|| not_found(id))?;

    Ok(Json(reading.into()))
}

/// Replace every measured value of a reading. An omitted `device_id` keeps the stored one.
#[utoipa::path(
    put,
    path = "/api/energy/{id}/",
    params(
        ("id" = Uuid, Path, description = "Reading id"),
    ),
    request_body = EnergyReadingInput,
    responses(
        (status = 200, description = "Updated reading", body = EnergyReadingDto),
        (status = 400, description = "Invalid body"),
        (status = 404, description = "No such reading"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "energy"
)]
pub async fn update_reading(
    State(pool): State<PgPool>,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<EnergyReadingInput>, JsonRejection>,
) -> Result<Json<EnergyReadingDto>, AppError> {
    let Path(id) = id?;
    let Json(input) = payload?;
    let reading = db::readings::update(&pool, id, &input.into_changes()?)
        .await?
        .ok_or_else(|| not_found(id))?;

    info!(reading = %reading, "Energy reading replaced");
    Ok(Json(reading.into()))
}

/// Update only the fields present in the body.
#[utoipa::path(
    patch,
    path = "/api/energy/{id}/",
    params(
        ("id" = Uuid, Path, description = "Reading id"),
    ),
    request_body = EnergyReadingPatch,
    responses(
        (status = 200, description = "Updated reading", body = EnergyReadingDto),
        (status = 400, description = "Invalid body"),
        (status = 404, description = "No such reading"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "energy"
)]
pub async fn patch_reading(
    State(pool): State<PgPool>,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<EnergyReadingPatch>, JsonRejection>,
) -> Result<Json<EnergyReadingDto>, AppError> {
    let Path(id) = id?;
    let Json(patch) = payload?;
    let reading = db::readings::update(&pool, id, &patch.into_changes()?)
        .await?
        .ok_or_else(|| not_found(id))?;

    info!(reading = %reading, "Energy reading updated");
    Ok(Json(reading.into()))
}

#[utoipa::path(
    delete,
    path = "/api/energy/{id}/",
    params(
        ("id" = Uuid, Path, description = "Reading id"),
    ),
    responses(
        (status = 204, description = "Reading deleted"),
        (status = 404, description = "No such reading"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "energy"
)]
pub async fn delete_reading(
    State(pool): State<PgPool>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<StatusCode, AppError> {
    let Path(id) = id?;
    if !db::readings::delete(&pool, id).await? {
        return Err(not_found(id));
    }

    info!(id = %id, "Energy reading deleted");
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
