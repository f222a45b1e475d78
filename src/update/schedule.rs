//! Update scheduling.
//!
//! The wall clock only picks the first check (the next configured local
//! hour); after that the task counts monotonic time, so clock changes and
//! DST shifts do not bunch up or skip checks.

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Days, TimeZone};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;

use crate::config::{QUICK_CHECK_DELAY, QUICK_CHECK_THRESHOLD};

/// When the background task runs its first checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulePlan {
    /// Delay until the first daily check
    pub first_check: Duration,
    /// Delay of an extra one-shot check, if any
    pub quick_check: Option<Duration>,
}

impl SchedulePlan {
    /// Plans checks starting at `now`.
    ///
    /// # Arguments
    ///
    /// * `now` - Current local time
    /// * `hour` - Local hour of the daily check (clamped to 0-23)
    /// * `had_existing_file` - Whether a database was already on disk at
    ///   startup. Such a file may be old, so if the daily check is more than
    ///   five minutes away a one-shot check runs after a minute.
    pub fn from_now<Tz: TimeZone>(now: &DateTime<Tz>, hour: u32, had_existing_file: bool) -> Self {
        let next = next_daily_check(now, hour);
        let first_check = next
            .signed_duration_since(now.clone())
            .to_std()
            .unwrap_or(Duration::ZERO);

        let quick_check = (had_existing_file && first_check > QUICK_CHECK_THRESHOLD)
            .then_some(QUICK_CHECK_DELAY);

        SchedulePlan {
            first_check,
            quick_check,
        }
    }
}

/// Returns the next occurrence of `hour:00` local time strictly after `now`.
///
/// A local time that does not exist on a given day (DST gap) is skipped to
/// the following day.
pub fn next_daily_check<Tz: TimeZone>(now: &DateTime<Tz>, hour: u32) -> DateTime<Tz> {
    let tz = now.timezone();
    let hour = hour.min(23);
    let today = now.date_naive();

    for offset in 0..=2 {
        let Some(date) = today.checked_add_days(Days::new(offset)) else {
            break;
        };
        let Some(naive) = date.and_hms_opt(hour, 0, 0) else {
            continue;
        };
        if let Some(at) = tz.from_local_datetime(&naive).earliest() {
            if at > *now {
                return at;
            }
        }
    }

    now.clone() + chrono::Duration::days(1)
}

/// Handle to a running schedule task.
#[derive(Debug)]
pub struct ScheduleHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl ScheduleHandle {
    /// Signals the task to stop without waiting for it.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Stops the task and waits for it to finish.
    ///
    /// A check in progress is abandoned at its next await point.
    pub async fn stop(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            log::warn!("Update schedule task ended abnormally: {}", e);
        }
    }
}

/// Spawns the periodic check task.
///
/// Runs `check` at `plan.first_check`, then every `period` after it. The
/// optional quick check runs once in between. `check` handles its own
/// errors; a failed check never ends the schedule.
///
/// Must be called within a Tokio runtime.
pub fn spawn_schedule<F, Fut>(plan: SchedulePlan, period: Duration, check: F) -> ScheduleHandle
where
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let cancel = CancellationToken::new();
    let token = cancel.clone();

    let task = tokio::spawn(async move {
        let start = Instant::now();
        let mut next_daily = start + plan.first_check;
        let mut quick = plan.quick_check.map(|delay| start + delay);

        loop {
            let (due, is_quick) = match quick {
                Some(at) if at < next_daily => (at, true),
                _ => (next_daily, false),
            };

            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                _ = sleep_until(due) => {}
            }

            if is_quick {
                quick = None;
            } else {
                next_daily += period;
            }

            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                _ = check() => {}
            }
        }

        log::debug!("Update schedule task shutting down");
    });

    ScheduleHandle { cancel, task }
}
