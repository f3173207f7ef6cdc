use anyhow::{Context, Result};
use sqlx::PgPool;
use uuid::Uuid;

use super::models::{EnergyReading, NewReading, ReadingChanges, ReadingFilter};

const COLUMNS: &str = "id, device_id, timestamp_ms, voltage_v, current_a, \
                       active_power_w, apparent_power_va, reactive_power_var, created_at";

pub async fn insert(pool: &PgPool, new: &NewReading) -> Result<EnergyReading> {
    let sql = format!(
        r#"
        INSERT INTO energy_readings
            (device_id, timestamp_ms, voltage_v, current_a,
             active_power_w, apparent_power_va, reactive_power_var)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING {COLUMNS}
        "#
    );

    sqlx::query_as::<_, EnergyReading>(&sql)
        .bind(&new.device_id)
        .bind(new.timestamp_ms)
        .bind(new.voltage_v)
        .bind(new.current_a)
        .bind(new.active_power_w)
        .bind(new.apparent_power_va)
        .bind(new.reactive_power_var)
        .fetch_one(pool)
        .await
        .context("failed to insert energy reading")
}

pub async fn find(pool: &PgPool, id: Uuid) -> Result<Option<EnergyReading>> {
    let sql = format!("SELECT {COLUMNS} FROM energy_readings WHERE id = $1");

    sqlx::query_as::<_, EnergyReading>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .with_context(|| format!("failed to fetch energy reading {id}"))
}

/// `ILIKE` pattern matching `term` anywhere, with `\`, `%` and `_` taken literally.
fn substring_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

pub async fn list(pool: &PgPool, filter: &ReadingFilter) -> Result<Vec<EnergyReading>> {
    // A NULL limit means "no limit" in Postgres.
    let sql = format!(
        r#"
        SELECT {COLUMNS}
        FROM energy_readings
        WHERE ($1::text        IS NULL OR device_id = $1)
          AND ($2::text        IS NULL OR device_id ILIKE $2 ESCAPE '\')
          AND ($3::timestamptz IS NULL OR created_at >= $3)
          AND ($4::timestamptz IS NULL OR created_at <= $4)
        ORDER BY {order}
        LIMIT $5::bigint OFFSET COALESCE($6::bigint, 0)
        "#,
        order = filter.ordering.sql(),
    );

    sqlx::query_as::<_, EnergyReading>(&sql)
        .bind(filter.device_id.as_deref())
        .bind(filter.search.as_deref().map(substring_pattern))
        .bind(filter.created_after)
        .bind(filter.created_before)
        .bind(filter.limit)
        .bind(filter.offset)
        .fetch_all(pool)
        .await
        .context("failed to list energy readings")
}

/// Apply `changes` to one row. `created_at` is never part of the update.
pub async fn update(
    pool: &PgPool,
    id: Uuid,
    changes: &ReadingChanges,
) -> Result<Option<EnergyReading>> {
    let sql = format!(
        r#"
        UPDATE energy_readings SET
            device_id          = COALESCE($2, device_id),
            timestamp_ms       = COALESCE($3, timestamp_ms),
            voltage_v          = COALESCE($4, voltage_v),
            current_a          = COALESCE($5, current_a),
            active_power_w     = COALESCE($6, active_power_w),
            apparent_power_va  = COALESCE($7, apparent_power_va),
            reactive_power_var = COALESCE($8, reactive_power_var)
        WHERE id = $1
        RETURNING {COLUMNS}
        "#
    );

    sqlx::query_as::<_, EnergyReading>(&sql)
        .bind(id)
        .bind(changes.device_id.as_deref())
        .bind(changes.timestamp_ms)
        .bind(changes.voltage_v)
        .bind(changes.current_a)
        .bind(changes.active_power_w)
        .bind(changes.apparent_power_va)
        .bind(changes.reactive_power_var)
        .fetch_optional(pool)
        .await
        .with_context(|| format!("failed to update energy reading {id}"))
}

/// Returns `false` when no row had this id.
pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM energy_readings WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .with_context(|| format!("failed to delete energy reading {id}"))?;

    Ok(result.rows_affected() > 0)
}
