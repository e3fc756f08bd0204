// src/scheduler.rs
// =============================================================================
// Runs the link sweep once a day at a fixed local hour.
//
// The loop sleeps until the next hh:00, runs validate_all(), logs what
// happened and goes back to sleep. A failed sweep is logged and the loop
// carries on; tomorrow's run is not affected.
//
// If the on-demand endpoint happens to be mid-sweep at hh:00, the shared
// SweepGuard turns the scheduled run into a no-op.
// =============================================================================

use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, NaiveDateTime, NaiveTime};
use tokio::task::JoinHandle;

use crate::checker::{LinkValidator, SweepOutcome};

/// Next occurrence of `hour:00` strictly after `now`.
///
/// Hours above 23 are clamped to 23.
pub fn next_run(now: NaiveDateTime, hour: u32) -> NaiveDateTime {
    let time = NaiveTime::from_hms_opt(hour.min(23), 0, 0).unwrap_or(NaiveTime::MIN);
    let today = now.date().and_time(time);

    if today > now {
        today
    } else {
        today + chrono::Duration::days(1)
    }
}

// How long to sleep from `now` until the next run.
fn delay_until_next(now: NaiveDateTime, hour: u32) -> Duration {
    (next_run(now, hour) - now)
        .to_std()
        .unwrap_or(Duration::ZERO)
}

/// Spawn the daily sweep loop. The task runs until the runtime shuts down.
pub fn spawn_daily(validator: Arc<LinkValidator>, hour: u32) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let now = Local::now().naive_local();
            let delay = delay_until_next(now, hour);
            log::info!(
                "Next scheduled link sweep at {}",
                next_run(now, hour).format("%Y-%m-%d %H:%M")
            );
            tokio::time::sleep(delay).await;

            match validator.validate_all().await {
                Ok(SweepOutcome::Completed(report)) => log::info!(
                    "Scheduled sweep finished: {} checked, {} invalid",
                    report.checked(),
                    report.invalid()
                ),
                Ok(SweepOutcome::Skipped) => {
                    log::info!("Scheduled sweep skipped, another sweep is running")
                }
                Err(e) => log::error!("Scheduled sweep failed: {}", e),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn at(day: u32, hour: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, day)
            .unwrap()
            .and_hms_opt(hour, min, 0)
            .unwrap()
    }

    #[test]
    fn test_next_run_later_today() {
        assert_eq!(next_run(at(10, 1, 30), 2), at(10, 2, 0));
    }

    #[test]
    fn test_next_run_tomorrow_when_past() {
        assert_eq!(next_run(at(10, 14, 0), 2), at(11, 2, 0));
    }

    #[test]
    fn test_next_run_is_strictly_after_now() {
        assert_eq!(next_run(at(10, 2, 0), 2), at(11, 2, 0));
    }

    #[test]
    fn test_next_run_crosses_month_end() {
        assert_eq!(next_run(at(31, 23, 59), 0), NaiveDate::from_ymd_opt(2024, 4, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap());
    }

    #[test]
    fn test_delay() {
        assert_eq!(delay_until_next(at(10, 1, 30), 2), Duration::from_secs(30 * 60));
        assert_eq!(delay_until_next(at(10, 2, 0), 2), Duration::from_secs(24 * 3600));
    }
}
