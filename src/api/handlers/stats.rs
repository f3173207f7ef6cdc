use axum::{
    extract::{rejection::PathRejection, Path, State},
    Json,
};
use chrono::Utc;
use sqlx::PgPool;

use crate::{
    api::{dto::PowerBucketDto, errors::AppError},
    db,
    stats::PowerWindow,
};

/// Mean active power per bucket over a fixed lookback window, oldest bucket first.
///
/// | window | lookback                 | bucket |
/// |--------|--------------------------|--------|
/// | hour   | 1 hour                   | minute |
/// | day    | 1 day                    | hour   |
/// | week   | 7 days                   | day    |
/// | month  | 30 days                  | day    |
/// | year   | since Jan 1st (UTC)      | month  |
///
/// Buckets without readings are omitted.
#[utoipa::path(
    get,
    path = "/api/stats/power/{window}/",
    params(
        ("window" = PowerWindow, Path, description = "Report window"),
    ),
    responses(
        (status = 200, description = "Average power per bucket", body = Vec<PowerBucketDto>),
        (status = 400, description = "Unknown window"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "stats"
)]
pub async fn power_report(
    State(pool): State<PgPool>,
    window: Result<Path<PowerWindow>, PathRejection>,
) -> Result<Json<Vec<PowerBucketDto>>, AppError> {
    let Path(window) = window?;
    let since = window.since(Utc::now());
    let buckets = db::stats::average_power(&pool, since, window.bucket()).await?;

    Ok(Json(buckets.into_iter().map(Into::into).collect()))
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Datelike, DurationRound, TimeDelta, TimeZone, Utc};
    use serde_json::Value;
    use sqlx::PgPool;

    use crate::api::handlers::test_support::test_server;

    async fn insert_at(pool: &PgPool, created_at: DateTime<Utc>, active_power_w: f64) {
        sqlx::query(
            "INSERT INTO energy_readings \
             (timestamp_ms, voltage_v, current_a, active_power_w, \
              apparent_power_va, reactive_power_var, created_at) \
             VALUES ($1, 230.0, 1.0, $2, 0.0, 0.0, $3)",
        )
        .bind(created_at.timestamp_millis())
        .bind(active_power_w)
        .bind(created_at)
        .execute(pool)
        .await
        .unwrap();
    }

    fn bucket_ts(v: &Value) -> DateTime<Utc> {
        v["ts"].as_str().unwrap().parse().unwrap()
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn empty_report_is_empty_array(pool: PgPool) {
        let server = test_server(pool, None);
        for window in ["hour", "day", "week", "month", "year"] {
            let resp = server.get(&format!("/api/stats/power/{window}/")).await;
            resp.assert_status_ok();
            let body: Value = resp.json();
            assert_eq!(body, serde_json::json!([]), "window {window}");
        }
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn unknown_window_is_rejected(pool: PgPool) {
        let server = test_server(pool, None);
        let resp = server.get("/api/stats/power/decade/").await;
        resp.assert_status_bad_request();
        let body: Value = resp.json();
        assert!(body["error"].as_str().unwrap().contains("decade"));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn hour_report_averages_per_minute(pool: PgPool) {
        let minute = Utc::now().duration_trunc(TimeDelta::minutes(1)).unwrap();
        let a = minute - TimeDelta::minutes(30);
        let b = minute - TimeDelta::minutes(10);

        insert_at(&pool, b + TimeDelta::seconds(5), 60.0).await;
        insert_at(&pool, a + TimeDelta::seconds(1), 100.0).await;
        insert_at(&pool, a + TimeDelta::seconds(50), 101.0).await;
        // Outside the one-hour window.
        insert_at(&pool, minute - TimeDelta::hours(2), 5000.0).await;

        let server = test_server(pool, None);
        let resp = server.get("/api/stats/power/hour/").await;
        resp.assert_status_ok();

        let body: Vec<Value> = resp.json();
        assert_eq!(body.len(), 2);
        assert_eq!(bucket_ts(&body[0]), a);
        assert_eq!(body[0]["avg_w"], 100.5);
        assert_eq!(bucket_ts(&body[1]), b);
        assert_eq!(body[1]["avg_w"], 60.0);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn day_report_skips_empty_hours(pool: PgPool) {
        let hour = Utc::now().duration_trunc(TimeDelta::hours(1)).unwrap();
        for offset in [3, 7, 20] {
            insert_at(&pool, hour - TimeDelta::hours(offset) + TimeDelta::minutes(15), offset as f64)
                .await;
        }

        let server = test_server(pool, None);
        let body: Vec<Value> = server.get("/api/stats/power/day/").await.json();

        assert_eq!(body.len(), 3);
        let stamps: Vec<_> = body.iter().map(bucket_ts).collect();
        assert!(stamps.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(body[0]["avg_w"], 20.0);
        assert_eq!(body[2]["avg_w"], 3.0);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn week_and_month_reports_use_daily_buckets(pool: PgPool) {
        let today = Utc::now().duration_trunc(TimeDelta::days(1)).unwrap();
        insert_at(&pool, today - TimeDelta::days(2) + TimeDelta::hours(1), 10.0).await;
        insert_at(&pool, today - TimeDelta::days(2) + TimeDelta::hours(9), 30.0).await;
        insert_at(&pool, today - TimeDelta::days(20) + TimeDelta::hours(1), 7.0).await;

        let server = test_server(pool, None);

        let week: Vec<Value> = server.get("/api/stats/power/week/").await.json();
        assert_eq!(week.len(), 1);
        assert_eq!(bucket_ts(&week[0]), today - TimeDelta::days(2));
        assert_eq!(week[0]["avg_w"], 20.0);

        let month: Vec<Value> = server.get("/api/stats/power/month/").await.json();
        assert_eq!(month.len(), 2);
        assert_eq!(bucket_ts(&month[0]), today - TimeDelta::days(20));
        assert_eq!(month[0]["avg_w"], 7.0);
        assert_eq!(month[1]["avg_w"], 20.0);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn year_report_uses_monthly_buckets_since_january(pool: PgPool) {
        let year = Utc::now().year();
        let jan = Utc.with_ymd_and_hms(year, 1, 1, 0, 0, 0).unwrap();

        insert_at(&pool, jan + TimeDelta::hours(1), 40.0).await;
        insert_at(&pool, jan + TimeDelta::days(3), 50.0).await;
        // Last year's reading is outside the window.
        insert_at(&pool, jan - TimeDelta::hours(1), 1000.0).await;

        let server = test_server(pool, None);
        let body: Vec<Value> = server.get("/api/stats/power/year/").await.json();

        assert_eq!(body.len(), 1);
        assert_eq!(bucket_ts(&body[0]), jan);
        assert_eq!(body[0]["avg_w"], 45.0);
    }
}
