use chrono::Duration;
use log::*;
use splitpay_engine::{traits::OrderStore, SqliteDatabase};
use tokio::task::JoinHandle;

/// Starts the processed-event purge worker. Do not await the returned JoinHandle, as it will run
/// indefinitely.
///
/// The worker trims the idempotency guard down to the retention window once an hour. The window
/// must comfortably exceed the processor's redelivery horizon, otherwise a late redelivery of an
/// already-applied event would be processed a second time.
pub fn start_purge_worker(db: SqliteDatabase, retention: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(std::time::Duration::from_secs(3600));
        info!("🕰️ Processed-event purge worker started (retention: {}h)", retention.num_hours());
        loop {
            timer.tick().await;
            debug!("🕰️ Running processed-event purge job");
            match db.purge_processed_events(retention).await {
                Ok(purged) => {
                    if purged > 0 {
                        info!("🕰️ Purged {purged} processed event records");
                    }
                },
                Err(e) => {
                    error!("🕰️ Error running processed-event purge job: {e}");
                },
            }
        }
    })
}
