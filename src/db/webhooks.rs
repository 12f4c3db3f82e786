use sqlx::PgExecutor;

/// Records a webhook event id. Returns false when it was already processed.
///
/// Insert-first instead of check-then-insert, so concurrent deliveries of the
/// same event cannot both proceed.
pub async fn record_event<'e>(db: impl PgExecutor<'e>, event_id: &str, event_type: &str) -> Result<bool, sqlx::Error> {
    let r = sqlx::query(
        "INSERT INTO processed_webhook_events (event_id, event_type, processed_at) VALUES ($1, $2, NOW())
         ON CONFLICT DO NOTHING",
    )
    .bind(event_id)
    .bind(event_type)
    .execute(db)
    .await?;
    Ok(r.rows_affected() == 1)
}

/// Drops the record so a failed delivery can be retried by the sender.
pub async fn forget_event<'e>(db: impl PgExecutor<'e>, event_id: &str) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM processed_webhook_events WHERE event_id = $1").bind(event_id).execute(db).await?;
    Ok(())
}
