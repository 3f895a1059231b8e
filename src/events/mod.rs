use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::errors::ServiceError;

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Creates a sender together with the receiving end of a bounded channel.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Event>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self::new(tx), rx)
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), ServiceError> {
        self.sender
            .send(event)
            .await
            .map_err(|e| ServiceError::EventError(format!("Failed to send event: {}", e)))
    }

    /// Publishes an event after commit. A closed or full bus is logged and
    /// never fails the caller.
    pub async fn send_or_log(&self, event: Event) {
        let name = event.name();
        if let Err(e) = self.send(event).await {
            warn!(event = name, error = %e, "event dropped");
        }
    }
}

/// Domain events published by the command layer once a transaction commits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    ProjectCreated {
        project_id: Uuid,
        hs_id: String,
    },
    ProjectUpdated {
        project_id: Uuid,
        /// `(incharge, delivery_date)` pairs whose metrics are stale.
        affected: Vec<(Uuid, NaiveDate)>,
    },
    ProjectStatusChanged {
        project_id: Uuid,
        status_id: Uuid,
    },
    ProjectDelivered {
        project_id: Uuid,
        delivery_date: NaiveDate,
    },
    TaskCreated {
        project_id: Uuid,
        task_id: Uuid,
    },
    AssignmentUpdated {
        assignment_id: Uuid,
        team_member_id: Uuid,
        /// Local completion date when the assignment is completed.
        completed_on: Option<NaiveDate>,
    },
    AssignmentCompleted {
        assignment_id: Uuid,
        team_member_id: Uuid,
        date: NaiveDate,
    },
    TimerStarted {
        assignment_id: Uuid,
        team_member_id: Uuid,
    },
    TimerStopped {
        assignment_id: Uuid,
        team_member_id: Uuid,
        session_id: Uuid,
        date: NaiveDate,
    },
    ManualTimeAdded {
        assignment_id: Uuid,
        team_member_id: Uuid,
        session_id: Uuid,
        date: NaiveDate,
    },
    SessionEdited {
        assignment_id: Uuid,
        team_member_id: Uuid,
        session_id: Uuid,
        date: NaiveDate,
    },
    RosterUpdated {
        team_member_id: Uuid,
        date: NaiveDate,
    },
    MiscHoursAppended {
        team_member_id: Uuid,
        date: NaiveDate,
    },
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::ProjectCreated { .. } => "project_created",
            Event::ProjectUpdated { .. } => "project_updated",
            Event::ProjectStatusChanged { .. } => "project_status_changed",
            Event::ProjectDelivered { .. } => "project_delivered",
            Event::TaskCreated { .. } => "task_created",
            Event::AssignmentUpdated { .. } => "assignment_updated",
            Event::AssignmentCompleted { .. } => "assignment_completed",
            Event::TimerStarted { .. } => "timer_started",
            Event::TimerStopped { .. } => "timer_stopped",
            Event::ManualTimeAdded { .. } => "manual_time_added",
            Event::SessionEdited { .. } => "session_edited",
            Event::RosterUpdated { .. } => "roster_updated",
            Event::MiscHoursAppended { .. } => "misc_hours_appended",
        }
    }

    /// The `(team_member, date)` whose daily metrics this event invalidates.
    pub fn metrics_key(&self) -> Option<(Uuid, NaiveDate)> {
        match self {
            Event::AssignmentCompleted {
                team_member_id,
                date,
                ..
            }
            | Event::TimerStopped {
                team_member_id,
                date,
                ..
            }
            | Event::ManualTimeAdded {
                team_member_id,
                date,
                ..
            }
            | Event::SessionEdited {
                team_member_id,
                date,
                ..
            }
            | Event::RosterUpdated {
                team_member_id,
                date,
            }
            | Event::MiscHoursAppended {
                team_member_id,
                date,
            } => Some((*team_member_id, *date)),
            Event::AssignmentUpdated {
                team_member_id,
                completed_on: Some(date),
                ..
            } => Some((*team_member_id, *date)),
            _ => None,
        }
    }
}

/// Reacts to events pulled off the bus. Implementations must be idempotent:
/// delivery is at-least-once.
#[async_trait]
pub trait EventHandler: Send + Sync {
    fn name(&self) -> &'static str;

    async fn handle_event(&self, event: &Event) -> Result<(), ServiceError>;
}

/// Drains the bus, dispatching every event to each handler in order.
/// Handler failures are logged and do not stop the loop.
pub async fn process_events(mut rx: mpsc::Receiver<Event>, handlers: Vec<Arc<dyn EventHandler>>) {
    info!(handlers = handlers.len(), "Starting event processing loop");

    while let Some(event) = rx.recv().await {
        debug!(event = event.name(), "processing event");
        for handler in &handlers {
            if let Err(e) = handler.handle_event(&event).await {
                error!(
                    handler = handler.name(),
                    event = event.name(),
                    error = %e,
                    "event handler failed"
                );
            }
        }
    }

    warn!("Event processing loop has ended");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<&'static str>>,
    }

    #[async_trait]
    impl EventHandler for Recorder {
        fn name(&self) -> &'static str {
            "recorder"
        }

        async fn handle_event(&self, event: &Event) -> Result<(), ServiceError> {
            self.seen.lock().unwrap().push(event.name());
            Ok(())
        }
    }

    struct Failing;

    #[async_trait]
    impl EventHandler for Failing {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn handle_event(&self, _event: &Event) -> Result<(), ServiceError> {
            Err(ServiceError::InternalError("boom".into()))
        }
    }

    #[tokio::test]
    async fn loop_dispatches_to_every_handler_despite_failures() {
        let (sender, rx) = EventSender::channel(8);
        let recorder = Arc::new(Recorder::default());
        let handlers: Vec<Arc<dyn EventHandler>> = vec![Arc::new(Failing), recorder.clone()];

        sender
            .send(Event::ProjectCreated {
                project_id: Uuid::new_v4(),
                hs_id: "A1".into(),
            })
            .await
            .unwrap();
        sender.send_or_log(Event::TimerStarted {
            assignment_id: Uuid::new_v4(),
            team_member_id: Uuid::new_v4(),
        })
        .await;
        drop(sender);

        process_events(rx, handlers).await;
        assert_eq!(
            *recorder.seen.lock().unwrap(),
            vec!["project_created", "timer_started"]
        );
    }

    #[tokio::test]
    async fn send_on_closed_bus_is_an_event_error() {
        let (sender, rx) = EventSender::channel(1);
        drop(rx);
        let err = sender
            .send(Event::RosterUpdated {
                team_member_id: Uuid::new_v4(),
                date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::EventError(_)));
    }

    #[test]
    fn metrics_key_covers_time_events_only() {
        let tm = Uuid::new_v4();
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        let stop = Event::TimerStopped {
            assignment_id: Uuid::new_v4(),
            team_member_id: tm,
            session_id: Uuid::new_v4(),
            date,
        };
        assert_eq!(stop.metrics_key(), Some((tm, date)));
        let start = Event::TimerStarted {
            assignment_id: Uuid::new_v4(),
            team_member_id: tm,
        };
        assert_eq!(start.metrics_key(), None);
    }
}
