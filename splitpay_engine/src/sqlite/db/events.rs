use chrono::{Duration, Utc};
use log::trace;
use sqlx::SqliteConnection;

/// Claims an event id for processing. The `ON CONFLICT DO NOTHING` makes the check-and-record atomic: exactly one
/// caller observes `true` per id, concurrent deliveries of the same id see `false`.
pub async fn claim_event(event_id: &str, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    // processed_at is bound rather than left to the column default, so the purge cutoff
    // comparison always sees the same timestamp format.
    let result = sqlx::query(
        r#"
            INSERT INTO processed_events (event_id, processed_at) VALUES ($1, $2)
            ON CONFLICT (event_id) DO NOTHING;
        "#,
    )
    .bind(event_id)
    .bind(Utc::now())
    .execute(conn)
    .await?;
    let claimed = result.rows_affected() == 1;
    trace!("📝️ Claim on event {event_id}: {claimed}");
    Ok(claimed)
}

/// Returns a previously claimed event id so a later redelivery can be processed.
pub async fn release_event(event_id: &str, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM processed_events WHERE event_id = $1").bind(event_id).execute(conn).await?;
    trace!("📝️ Released claim on event {event_id}");
    Ok(())
}

/// Deletes processed-event records older than the given duration. Returns the number of records removed.
pub async fn purge_events_older_than(older_than: Duration, conn: &mut SqliteConnection) -> Result<u64, sqlx::Error> {
    let cutoff = Utc::now() - older_than;
    let result =
        sqlx::query("DELETE FROM processed_events WHERE processed_at < $1").bind(cutoff).execute(conn).await?;
    Ok(result.rows_affected())
}
