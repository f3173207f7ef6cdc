//! Lookback windows for the average-power reports.

use chrono::{DateTime, Datelike, TimeDelta, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Report window, as it appears in `/api/stats/power/{window}/`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PowerWindow {
    /// Last 60 minutes, per-minute buckets.
    Hour,
    /// Last 24 hours, hourly buckets.
    Day,
    /// Last 7 days, daily buckets.
    Week,
    /// Last 30 days, daily buckets.
    Month,
    /// Since January 1st (UTC) of the current year, monthly buckets.
    Year,
}

/// Granularity a window's readings are truncated to before averaging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bucket {
    Minute,
    Hour,
    Day,
    Month,
}

impl Bucket {
    /// Field name understood by Postgres `date_trunc`.
    pub fn as_str(self) -> &'static str {
        match self {
            Bucket::Minute => "minute",
            Bucket::Hour => "hour",
            Bucket::Day => "day",
            Bucket::Month => "month",
        }
    }
}

impl PowerWindow {
    pub fn bucket(self) -> Bucket {
        match self {
            PowerWindow::Hour => Bucket::Minute,
            PowerWindow::Day => Bucket::Hour,
            PowerWindow::Week | PowerWindow::Month => Bucket::Day,
            PowerWindow::Year => Bucket::Month,
        }
    }

    /// Earliest `created_at` included in the report when evaluated at `now`.
    pub fn since(self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            PowerWindow::Hour => now - TimeDelta::hours(1),
            PowerWindow::Day => now - TimeDelta::days(1),
            PowerWindow::Week => now - TimeDelta::days(7),
            PowerWindow::Month => now - TimeDelta::days(30),
            PowerWindow::Year => Utc
                .with_ymd_and_hms(now.year(), 1, 1, 0, 0, 0)
                .single()
                .expect("January 1st midnight is unambiguous in UTC"),
        }
    }
}
