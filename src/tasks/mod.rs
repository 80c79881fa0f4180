//! Background scheduled tasks for the application.
//!
//! Currently the only recurring job is the locker inactivity sweep, which
//! scans approved assignments and reminds long-idle users over SMS and
//! in-app notification. Call `spawn_all` once during startup to launch it.

use crate::services::ReminderService;

/// Spawn all background tasks.
///
/// Notes
/// - The sweep is idempotent: per-channel reminders deduplicate within a
///   rolling window, so overlapping runs do not double-send.
/// - This function detaches tasks via `tokio::spawn`; it does not block.
pub fn spawn_all(reminder_service: ReminderService) {
    // 每天扫描一次长期未使用的杆柜
    {
        let svc = reminder_service.clone();
        tokio::spawn(async move {
            loop {
                match svc.run_inactivity_sweep().await {
                    Ok(report) if report.processed > 0 => {
                        log::info!(
                            "Inactivity sweep done: found {}, processed {}, successful {}",
                            report.total_found,
                            report.processed,
                            report.successful
                        );
                    }
                    Ok(_) => {}
                    Err(e) => log::error!("Failed to run inactivity sweep: {e:?}"),
                }
                tokio::time::sleep(std::time::Duration::from_secs(24 * 3600)).await;
            }
        });
    }
}
