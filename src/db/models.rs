use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Device name stored when a sample arrives without one.
pub const DEFAULT_DEVICE_ID: &str = "esp32";

/// Upper bound on `device_id`, mirrors the `VARCHAR(32)` column.
pub const DEVICE_ID_MAX_LEN: usize = 32;

/// One sample posted by the metering device.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct EnergyReading {
    pub id: Uuid,
    pub device_id: String,
    /// Device clock, epoch milliseconds.
    pub timestamp_ms: i64,
    pub voltage_v: f64,
    pub current_a: f64,
    pub active_power_w: f64,
    pub apparent_power_va: f64,
    pub reactive_power_var: f64,
    /// Assigned by the database on insert; never rewritten.
    pub created_at: DateTime<Utc>,
}

impl fmt::Display for EnergyReading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} @ {}",
            self.device_id,
            self.created_at.format("%Y-%m-%d %H:%M:%S")
        )
    }
}

/// Column values for a new row. `id` and `created_at` come from the database.
#[derive(Debug, Clone)]
pub struct NewReading {
    pub device_id: String,
    pub timestamp_ms: i64,
    pub voltage_v: f64,
    pub current_a: f64,
    pub active_power_w: f64,
    pub apparent_power_va: f64,
    pub reactive_power_var: f64,
}

/// Column updates; `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default)]
pub struct ReadingChanges {
    pub device_id: Option<String>,
    pub timestamp_ms: Option<i64>,
    pub voltage_v: Option<f64>,
    pub current_a: Option<f64>,
    pub active_power_w: Option<f64>,
    pub apparent_power_va: Option<f64>,
    pub reactive_power_var: Option<f64>,
}

/// Listing order over `created_at`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Ordering {
    Oldest,
    #[default]
    Newest,
}

impl Ordering {
    pub(crate) fn sql(self) -> &'static str {
        match self {
            Ordering::Oldest => "created_at ASC, id ASC",
            Ordering::Newest => "created_at DESC, id DESC",
        }
    }
}

/// Filters applied when listing readings. Every field is optional.
#[derive(Debug, Clone, Default)]
pub struct ReadingFilter {
    pub device_id: Option<String>,
    /// Case-insensitive substring of `device_id`.
    pub search: Option<String>,
    pub created_after: Option<DateTime<Utc>>,
    pub created_before: Option<DateTime<Utc>>,
    pub ordering: Ordering,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Mean active power of one time bucket.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct PowerBucket {
    /// Start of the bucket.
    pub ts: DateTime<Utc>,
    /// Watts, rounded to two decimals.
    pub avg_w: f64,
}
