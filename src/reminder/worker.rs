use super::engine::{local_now, ReminderEngine};

/// Drive the engine on a fixed period. Ticks are strictly sequential; the
/// interval cannot overlap itself within one task.
pub fn spawn_reminder_worker(engine: ReminderEngine, tick_secs: u64) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(tick_secs));
        loop {
            interval.tick().await;
            let fired = engine.tick(local_now()).await;
            for firing in &fired {
                tracing::debug!(
                    schedule_id = %firing.schedule_id,
                    user_id = %firing.user_id,
                    name = %firing.name,
                    notified = firing.notified,
                    "Reminder delivered"
                );
            }
            if !fired.is_empty() {
                tracing::info!(count = fired.len(), "Reminder scan fired entries");
            }
        }
    });
}
