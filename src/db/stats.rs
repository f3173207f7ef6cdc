use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::models::PowerBucket;
use crate::stats::Bucket;

/// Mean `active_power_w` per `bucket` for readings created at or after `since`,
/// oldest bucket first. Buckets without readings are absent.
///
/// Buckets are cut in UTC. The mean is rounded through `numeric`, so the
/// shortest decimal form of the average is rounded half away from zero
/// (an average of 10.005 yields 10.01).
pub async fn average_power(
    pool: &PgPool,
    since: DateTime<Utc>,
    bucket: Bucket,
) -> Result<Vec<PowerBucket>> {
    sqlx::query_as::<_, PowerBucket>(
        r#"
        SELECT date_trunc($1, created_at AT TIME ZONE 'UTC') AT TIME ZONE 'UTC' AS ts,
               ROUND(AVG(active_power_w)::numeric, 2)::float8          AS avg_w
        FROM energy_readings
        WHERE created_at >= $2
        GROUP BY 1
        ORDER BY 1
        "#,
    )
    .bind(bucket.as_str())
    .bind(since)
    .fetch_all(pool)
    .await
    .with_context(|| format!("failed to aggregate power per {}", bucket.as_str()))
}

#[cfg(test)]
mod tests {
    use chrono::{DurationRound, TimeDelta};

    use super::*;

    async fn insert_at(pool: &PgPool, created_at: DateTime<Utc>, active_power_w: f64) {
        sqlx::query(
            "INSERT INTO energy_readings \
             (timestamp_ms, voltage_v, current_a, active_power_w, \
              apparent_power_va, reactive_power_var, created_at) \
             VALUES (0, 230.0, 1.0, $1, 0.0, 0.0, $2)",
        )
        .bind(active_power_w)
        .bind(created_at)
        .execute(pool)
        .await
        .unwrap();
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn averages_each_bucket_in_ascending_order(pool: PgPool) {
        let hour = Utc::now().duration_trunc(TimeDelta::hours(1)).unwrap();
        let early = hour - TimeDelta::hours(5);
        let late = hour - TimeDelta::hours(2);

        insert_at(&pool, early + TimeDelta::minutes(1), 100.0).await;
        insert_at(&pool, early + TimeDelta::minutes(40), 200.0).await;
        insert_at(&pool, late + TimeDelta::minutes(10), 10.0).await;
        insert_at(&pool, late + TimeDelta::minutes(20), 20.0).await;
        insert_at(&pool, late + TimeDelta::minutes(30), 40.0).await;

        let rows = average_power(&pool, hour - TimeDelta::days(1), Bucket::Hour)
            .await
            .unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].ts, early);
        assert_eq!(rows[0].avg_w, 150.0);
        assert_eq!(rows[1].ts, late);
        assert_eq!(rows[1].avg_w, 23.33);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn readings_before_since_are_excluded(pool: PgPool) {
        let now = Utc::now();
        insert_at(&pool, now - TimeDelta::days(3), 999.0).await;
        insert_at(&pool, now - TimeDelta::minutes(5), 1.0).await;

        let rows = average_power(&pool, now - TimeDelta::days(1), Bucket::Day)
            .await
            .unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].avg_w, 1.0);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn half_cent_average_rounds_up(pool: PgPool) {
        let minute = Utc::now().duration_trunc(TimeDelta::minutes(1)).unwrap();
        insert_at(&pool, minute - TimeDelta::minutes(3), 10.0).await;
        insert_at(&pool, minute - TimeDelta::minutes(3), 10.01).await;

        let rows = average_power(&pool, minute - TimeDelta::hours(1), Bucket::Minute)
            .await
            .unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].avg_w, 10.01);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn empty_table_yields_no_buckets(pool: PgPool) {
        let rows = average_power(&pool, Utc::now() - TimeDelta::days(30), Bucket::Day)
            .await
            .unwrap();
        assert!(rows.is_empty());
    }
}
