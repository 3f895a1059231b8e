use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use metrics::counter;
use tracing::warn;

use crate::{
    clock::{BusinessCalendar, Clock},
    config::{AppConfig, DeliveryTracking},
    db::DbPool,
    errors::ServiceError,
    events::EventSender,
    services::{delivery::DeliveryTracker, metrics::MetricsService},
};

pub mod assignments;
pub mod projects;
pub mod roster;
pub mod tasks;
pub mod timers;

/// Everything a command needs to run: storage, the event bus, time and the
/// handful of settings that change business behavior.
#[derive(Clone)]
pub struct CommandContext {
    pub db: Arc<DbPool>,
    pub event_sender: Arc<EventSender>,
    pub clock: Arc<dyn Clock>,
    pub calendar: BusinessCalendar,
    pub available_minutes_per_day: i32,
    pub delivery_tracking: DeliveryTracking,
}

impl CommandContext {
    pub fn new(
        db: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        clock: Arc<dyn Clock>,
        config: &AppConfig,
    ) -> Self {
        let calendar = BusinessCalendar::from_offset_minutes(config.timezone_offset_minutes)
            .unwrap_or_else(|| {
                warn!(
                    offset = config.timezone_offset_minutes,
                    "invalid timezone offset; falling back to UTC"
                );
                BusinessCalendar::utc()
            });
        Self {
            db,
            event_sender,
            clock,
            calendar,
            available_minutes_per_day: config.available_minutes_per_day,
            delivery_tracking: config.delivery_tracking,
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn today(&self) -> NaiveDate {
        self.calendar.today(self.clock.as_ref())
    }

    pub fn metrics(&self) -> MetricsService {
        MetricsService::new(
            self.db.clone(),
            self.clock.clone(),
            self.calendar,
            self.available_minutes_per_day,
        )
    }

    pub fn delivery_tracker(&self) -> DeliveryTracker {
        DeliveryTracker::new(self.db.clone(), self.clock.clone(), self.metrics())
    }
}

/// Command trait for implementing the Command Pattern
///
/// A command validates its input, performs its writes inside one database
/// transaction and publishes domain events only after that transaction
/// commits.
#[async_trait]
pub trait Command: Send + Sync {
    /// The return type of the command when executed successfully
    type Result: Send;

    /// A short name used in logs and metrics.
    fn name(&self) -> &'static str;

    async fn execute(&self, ctx: &CommandContext) -> Result<Self::Result, ServiceError>;
}

/// Runs `command`, retrying exactly once when it fails with a conflict.
pub async fn run<C: Command>(command: &C, ctx: &CommandContext) -> Result<C::Result, ServiceError> {
    match command.execute(ctx).await {
        Err(err) if err.is_retryable() => {
            warn!(command = command.name(), error = %err, "conflict; retrying once");
            counter!("worklog.command.retries", 1, "command" => command.name());
            command.execute(ctx).await
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Flaky {
        calls: AtomicUsize,
        failures: usize,
        error: fn() -> ServiceError,
    }

    #[async_trait]
    impl Command for Flaky {
        type Result = usize;

        fn name(&self) -> &'static str {
            "flaky"
        }

        async fn execute(&self, _ctx: &CommandContext) -> Result<usize, ServiceError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                Err((self.error)())
            } else {
                Ok(call)
            }
        }
    }

    async fn context() -> CommandContext {
        let db = sea_orm::Database::connect("sqlite::memory:").await.unwrap();
        let (sender, _rx) = EventSender::channel(4);
        let config = AppConfig::new("sqlite::memory:".into(), "127.0.0.1".into(), 0, "test".into());
        CommandContext::new(
            Arc::new(db),
            Arc::new(sender),
            Arc::new(crate::clock::SystemClock),
            &config,
        )
    }

    #[tokio::test]
    async fn retries_a_conflict_once() {
        let ctx = context().await;
        let cmd = Flaky {
            calls: AtomicUsize::new(0),
            failures: 1,
            error: || ServiceError::Conflict("race".into()),
        };
        assert_eq!(run(&cmd, &ctx).await.unwrap(), 1);

        let cmd = Flaky {
            calls: AtomicUsize::new(0),
            failures: 2,
            error: || ServiceError::Conflict("race".into()),
        };
        assert!(matches!(run(&cmd, &ctx).await, Err(ServiceError::Conflict(_))));
        assert_eq!(cmd.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn never_retries_preconditions() {
        let ctx = context().await;
        let cmd = Flaky {
            calls: AtomicUsize::new(0),
            failures: 1,
            error: || ServiceError::precondition(crate::errors::Precondition::NoActiveTimer),
        };
        assert!(run(&cmd, &ctx).await.is_err());
        assert_eq!(cmd.calls.load(Ordering::SeqCst), 1);
    }
}
