use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};

use crate::{
    api::{
        dto::{RelayRequest, RelayResponse},
        errors::AppError,
        AppState,
    },
    relay::{RelayError, RelayState},
};

/// Forward `{"state": "on" | "off"}` to the device's `/relay` endpoint.
///
/// The device's status code is returned as-is together with its raw body.
/// Nothing is sent when the device address is unset or the state is invalid.
#[utoipa::path(
    post,
    path = "/api/device/relay/",
    request_body = RelayRequest,
    responses(
        (status = 200, description = "Device answer, mirrored with the device's status code", body = RelayResponse),
        (status = 400, description = "State is not 'on' or 'off'"),
        (status = 500, description = "Device address not configured"),
        (status = 502, description = "Device unreachable or timed out"),
    ),
    tag = "device"
)]
pub async fn relay_control(
    State(state): State<AppState>,
    payload: Result<Json<RelayRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<RelayResponse>), AppError> {
    let relay = state.relay.as_ref().ok_or(RelayError::NotConfigured)?;

    let Json(request) = payload?;
    let relay_state: RelayState = request.state.as_deref().unwrap_or_default().parse()?;

    let reply = relay.send(relay_state).await?;
    let status = StatusCode::from_u16(reply.status).unwrap_or(StatusCode::BAD_GATEWAY);

    Ok((
        status,
        Json(RelayResponse {
            esp_status: reply.status,
            esp_body: reply.body,
        }),
    ))
}
