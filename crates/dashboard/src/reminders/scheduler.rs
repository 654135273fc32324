use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use super::ReminderRunner;

const MAX_PERIOD: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Runs the reminder batch on a fixed period. The first run happens one full
/// period after `spawn`, never at startup.
#[derive(Clone, Debug)]
pub struct ReminderScheduler {
    runner: Arc<ReminderRunner>,
    period: Duration,
}

impl ReminderScheduler {
    /// `period` is clamped to between one millisecond and one year.
    #[must_use]
    pub fn new(runner: Arc<ReminderRunner>, period: Duration) -> Self {
        Self {
            runner,
            period: period.clamp(Duration::from_millis(1), MAX_PERIOD),
        }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let start = Instant::now()
                .checked_add(self.period)
                .unwrap_or_else(Instant::now);
            let mut interval = interval_at(start, self.period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            tracing::info!(
                period_hours = self.period.as_secs() / 3600,
                "reminder scheduler started"
            );

            loop {
                interval.tick().await;

                match self.runner.run(Utc::now()).await {
                    Ok(summary) => tracing::info!(
                        total = summary.total_emails,
                        sent = summary.success_count,
                        failed = summary.failure_count,
                        "scheduled reminder run finished"
                    ),
                    Err(error) => {
                        tracing::error!(error = %format!("{error:#}"), "scheduled reminder run failed");
                    }
                }
            }
        })
    }
}
