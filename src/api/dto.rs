use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::errors::AppError;
use crate::db::models::{
    EnergyReading, NewReading, Ordering, PowerBucket, ReadingChanges, ReadingFilter,
    DEFAULT_DEVICE_ID, DEVICE_ID_MAX_LEN,
};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct EnergyReadingDto {
    pub id: Uuid,
    pub device_id: String,
    /// Device clock, epoch milliseconds.
    pub timestamp_ms: i64,
    /// Volts (RMS)
    pub voltage_v: f64,
    /// Amperes (RMS)
    pub current_a: f64,
    /// Watts
    pub active_power_w: f64,
    /// Volt-amperes
    pub apparent_power_va: f64,
    /// Volt-amperes reactive
    pub reactive_power_var: f64,
    /// Server-assigned on creation.
    pub created_at: DateTime<Utc>,
}

impl From<EnergyReading> for EnergyReadingDto {
    fn from(r: EnergyReading) -> Self {
        Self {
            id: r.id,
            device_id: r.device_id,
            timestamp_ms: r.timestamp_ms,
            voltage_v: r.voltage_v,
            current_a: r.current_a,
            active_power_w: r.active_power_w,
            apparent_power_va: r.apparent_power_va,
            reactive_power_var: r.reactive_power_var,
            created_at: r.created_at,
        }
    }
}

/// Request body for `POST /api/energy/` and `PUT /api/energy/{id}/`.
///
/// `id` and `created_at` are read-only and ignored when present.
#[derive(Debug, Deserialize, ToSchema)]
pub struct EnergyReadingInput {
    /// Defaults to `"esp32"` on create; kept as stored on update.
    #[serde(default, deserialize_with = "non_null")]
    pub device_id: Option<String>,
    pub timestamp_ms: i64,
    pub voltage_v: f64,
    pub current_a: f64,
    pub active_power_w: f64,
    pub apparent_power_va: f64,
    pub reactive_power_var: f64,
}

impl EnergyReadingInput {
    pub fn into_new_reading(self) -> Result<NewReading, AppError> {
        let device_id = match self.device_id {
            Some(id) => validate_device_id(id)?,
            None => DEFAULT_DEVICE_ID.to_owned(),
        };

        Ok(NewReading {
            device_id,
            timestamp_ms: self.timestamp_ms,
            voltage_v: self.voltage_v,
            current_a: self.current_a,
            active_power_w: self.active_power_w,
            apparent_power_va: self.apparent_power_va,
            reactive_power_var: self.reactive_power_var,
        })
    }

    pub fn into_changes(self) -> Result<ReadingChanges, AppError> {
        Ok(ReadingChanges {
            device_id: self.device_id.map(validate_device_id).transpose()?,
            timestamp_ms: Some(self.timestamp_ms),
            voltage_v: Some(self.voltage_v),
            current_a: Some(self.current_a),
            active_power_w: Some(self.active_power_w),
            apparent_power_va: Some(self.apparent_power_va),
            reactive_power_var: Some(self.reactive_power_var),
        })
    }
}

/// Request body for `PATCH /api/energy/{id}/`. Omitted fields are left as stored.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct EnergyReadingPatch {
    #[serde(default, deserialize_with = "non_null")]
    pub device_id: Option<String>,
    #[serde(default, deserialize_with = "non_null")]
    pub timestamp_ms: Option<i64>,
    #[serde(default, deserialize_with = "non_null")]
    pub voltage_v: Option<f64>,
    #[serde(default, deserialize_with = "non_null")]
    pub current_a: Option<f64>,
    #[serde(default, deserialize_with = "non_null")]
    pub active_power_w: Option<f64>,
    #[serde(default, deserialize_with = "non_null")]
    pub apparent_power_va: Option<f64>,
    #[serde(default, deserialize_with = "non_null")]
    pub reactive_power_var: Option<f64>,
}

/// An absent field becomes `None` through `#[serde(default)]`; a present one
/// must hold a value, so an explicit `null` fails deserialisation.
fn non_null<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

impl EnergyReadingPatch {
    pub fn into_changes(self) -> Result<ReadingChanges, AppError> {
        Ok(ReadingChanges {
            device_id: self.device_id.map(validate_device_id).transpose()?,
            timestamp_ms: self.timestamp_ms,
            voltage_v: self.voltage_v,
            current_a: self.current_a,
            active_power_w: self.active_power_w,
            apparent_power_va: self.apparent_power_va,
            reactive_power_var: self.reactive_power_var,
        })
    }
}

fn validate_device_id(device_id: String) -> Result<String, AppError> {
    if device_id.trim().is_empty() {
        return Err(AppError::Validation("device_id may not be blank".to_owned()));
    }
    if device_id.chars().count() > DEVICE_ID_MAX_LEN {
        return Err(AppError::Validation(format!(
            "device_id must be at most {DEVICE_ID_MAX_LEN} characters"
        )));
    }
    Ok(device_id)
}

/// Query string of `GET /api/energy/`.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub device_id: Option<String>,
    pub search: Option<String>,
    pub created_after: Option<DateTime<Utc>>,
    pub created_before: Option<DateTime<Utc>>,
    /// `-created_at` (default) or `created_at`.
    pub ordering: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl TryFrom<ListParams> for ReadingFilter {
    type Error = AppError;

    fn try_from(p: ListParams) -> Result<Self, Self::Error> {
        let ordering = match p.ordering.as_deref() {
            None | Some("-created_at") => Ordering::Newest,
            Some("created_at") => Ordering::Oldest,
            Some(other) => {
                return Err(AppError::Validation(format!(
                    "ordering must be 'created_at' or '-created_at', got {other:?}"
                )))
            }
        };

        for (name, value) in [("limit", p.limit), ("offset", p.offset)] {
            if value.is_some_and(|v| v < 0) {
                return Err(AppError::Validation(format!("{name} must not be negative")));
            }
        }

        Ok(Self {
            device_id: p.device_id,
            search: p.search.filter(|s| !s.is_empty()),
            created_after: p.created_after,
            created_before: p.created_before,
            ordering,
            limit: p.limit,
            offset: p.offset,
        })
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PowerBucketDto {
    /// Start of the bucket (UTC).
    pub ts: DateTime<Utc>,
    /// Mean active power in watts, two decimals.
    pub avg_w: f64,
}

impl From<PowerBucket> for PowerBucketDto {
    fn from(b: PowerBucket) -> Self {
        Self {
            ts: b.ts,
            avg_w: b.avg_w,
        }
    }
}

/// Request body for `POST /api/device/relay/`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RelayRequest {
    /// `"on"` or `"off"`.
    pub state: Option<String>,
}

/// The device's answer, mirrored with its own status code.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RelayResponse {
    pub esp_status: u16,
    /// Raw response body as sent by the device.
    pub esp_body: String,
}
