//! Webhook idempotency tracking

use sqlx::PgPool;

use crate::util::now_millis;

/// Insert-first idempotency: returns `true` if this event id is new
/// and the caller should process it, `false` if already handled.
pub async fn try_claim(
    pool: &PgPool,
    event_id: &str,
    event_type: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO processed_webhook_events (event_id, event_type, processed_at)
         VALUES ($1, $2, $3)
         ON CONFLICT (event_id) DO NOTHING",
    )
    .bind(event_id)
    .bind(event_type)
    .bind(now_millis())
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Drop a claim after a failed processing attempt so the provider's
/// redelivery of the same event gets handled instead of skipped.
pub async fn release(pool: &PgPool, event_id: &str) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM processed_webhook_events WHERE event_id = $1")
        .bind(event_id)
        .execute(pool)
        .await?;
    Ok(())
}
