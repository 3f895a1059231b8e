mod common;

use assert_matches::assert_matches;
use chrono::Duration;
use common::{date, TestApp};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use worklog_api::{
    commands::timers::manual_entry_command::ManualEntryCommand,
    entities::{
        active_timer, daily_time_total,
        time_session::SessionType,
        timer_action_log::{self, TimerAction},
    },
    errors::{Precondition, ServiceError},
};

async fn daily_total(app: &TestApp, assignment_id: uuid::Uuid) -> Vec<daily_time_total::Model> {
    daily_time_total::Entity::find()
        .filter(daily_time_total::Column::TaskAssignmentId.eq(assignment_id))
        .order_by_asc(daily_time_total::Column::DateWorked)
        .all(app.db())
        .await
        .unwrap()
}

#[tokio::test]
async fn start_and_stop_records_a_session_and_daily_total() {
    let app = TestApp::new().await;
    let assignment = app.assignment_for_tm("Harbour View", 120).await;

    let timer = app
        .services()
        .timers
        .start(app.tm_actor(), assignment.id)
        .await
        .unwrap();
    assert_eq!(timer.task_assignment_id, assignment.id);
    assert_eq!(timer.team_member_id, app.tm.id);

    let view = app
        .services()
        .timers
        .active_timer(app.tm_actor())
        .await
        .unwrap()
        .expect("timer should be running");
    assert_eq!(view.assignment_id, assignment.assignment_id);
    assert_eq!(view.elapsed_minutes, 0);

    app.advance(Duration::minutes(45) + Duration::seconds(59));
    let stopped = app
        .services()
        .timers
        .stop(app.tm_actor(), Some("Drafted elevations".into()))
        .await
        .unwrap();

    assert_eq!(stopped.session.duration_minutes, 45);
    assert_eq!(stopped.session.session_type, SessionType::Timer);
    assert_eq!(stopped.session.date_worked, date(2024, 3, 4));
    assert_eq!(stopped.session.description.as_deref(), Some("Drafted elevations"));

    let totals = daily_total(&app, assignment.id).await;
    assert_eq!(totals.len(), 1);
    assert_eq!(totals[0].total_minutes, 45);

    let remaining = active_timer::Entity::find().all(app.db()).await.unwrap();
    assert!(remaining.is_empty());

    let actions: Vec<TimerAction> = timer_action_log::Entity::find()
        .filter(timer_action_log::Column::TaskAssignmentId.eq(assignment.id))
        .order_by_asc(timer_action_log::Column::LoggedAt)
        .all(app.db())
        .await
        .unwrap()
        .into_iter()
        .map(|row| row.action)
        .collect();
    assert_eq!(actions, vec![TimerAction::Start, TimerAction::Stop]);
}

#[tokio::test]
async fn short_sessions_count_as_one_minute() {
    let app = TestApp::new().await;
    let assignment = app.assignment_for_tm("Quick Look", 60).await;

    app.services()
        .timers
        .start(app.tm_actor(), assignment.id)
        .await
        .unwrap();
    app.advance(Duration::seconds(12));
    let stopped = app.services().timers.stop(app.tm_actor(), None).await.unwrap();

    assert_eq!(stopped.session.duration_minutes, 1);
}

#[tokio::test]
async fn sessions_on_the_same_day_accumulate() {
    let app = TestApp::new().await;
    let assignment = app.assignment_for_tm("Lake Front", 300).await;

    app.work(app.tm_actor(), assignment.id, 30).await;
    app.advance(Duration::minutes(10));
    app.work(app.tm_actor(), assignment.id, 20).await;

    let totals = daily_total(&app, assignment.id).await;
    assert_eq!(totals.len(), 1);
    assert_eq!(totals[0].total_minutes, 50);

    let sessions = app
        .services()
        .timers
        .sessions(assignment.id, app.tm.id)
        .await
        .unwrap();
    assert_eq!(sessions.len(), 2);
}

#[tokio::test]
async fn a_second_timer_is_refused_while_one_runs() {
    let app = TestApp::new().await;
    let project = app.create_project("Twin Towers").await;
    let task = app.create_task(&project).await;
    let first = app.create_assignment(&task, app.tm.id, 60).await;
    let second = app.create_assignment(&task, app.tm.id, 60).await;

    app.services()
        .timers
        .start(app.tm_actor(), first.id)
        .await
        .unwrap();

    let err = app
        .services()
        .timers
        .start(app.tm_actor(), second.id)
        .await
        .unwrap_err();
    assert_matches!(
        err,
        ServiceError::PreconditionFailed(Precondition::AnotherTimerRunning { ref assignment_id })
            if assignment_id == &first.assignment_id
    );

    let again = app
        .services()
        .timers
        .start(app.tm_actor(), first.id)
        .await
        .unwrap_err();
    assert_matches!(
        again,
        ServiceError::PreconditionFailed(Precondition::AnotherTimerRunning { .. })
    );
}

#[tokio::test]
async fn only_the_assignee_can_run_a_timer() {
    let app = TestApp::new().await;
    let assignment = app.assignment_for_tm("Garden Court", 60).await;

    let err = app
        .services()
        .timers
        .start(worklog_api::auth::Actor::from(&app.tm2), assignment.id)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::Forbidden(_));
}

#[tokio::test]
async fn stopping_without_a_timer_fails() {
    let app = TestApp::new().await;

    let err = app
        .services()
        .timers
        .stop(app.tm_actor(), None)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::PreconditionFailed(Precondition::NoActiveTimer));
}

#[tokio::test]
async fn completed_assignments_reject_timers() {
    let app = TestApp::new().await;
    let assignment = app.assignment_for_tm("Sunset Villas", 60).await;
    app.work(app.tm_actor(), assignment.id, 15).await;
    app.services()
        .assignments
        .complete(app.tm_actor(), assignment.id)
        .await
        .unwrap();

    let err = app
        .services()
        .timers
        .start(app.tm_actor(), assignment.id)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::PreconditionFailed(Precondition::AssignmentCompleted));
}

#[tokio::test]
async fn manual_entries_are_dated_and_summed() {
    let app = TestApp::new().await;
    let assignment = app.assignment_for_tm("Riverside", 240).await;

    let result = app
        .services()
        .timers
        .add_manual_entry(ManualEntryCommand {
            actor: app.tm_actor(),
            assignment_id: assignment.id,
            date_worked: date(2024, 3, 1),
            hours: 1,
            minutes: 30,
            description: Some("Site visit".into()),
        })
        .await
        .unwrap();

    assert_eq!(result.session.session_type, SessionType::Manual);
    assert_eq!(result.session.duration_minutes, 90);
    assert_eq!(result.session.date_worked, date(2024, 3, 1));

    app.work(app.tm_actor(), assignment.id, 25).await;

    let totals = daily_total(&app, assignment.id).await;
    let by_date: Vec<_> = totals
        .iter()
        .map(|t| (t.date_worked, t.total_minutes))
        .collect();
    assert_eq!(by_date, vec![(date(2024, 3, 1), 90), (date(2024, 3, 4), 25)]);
}

#[tokio::test]
async fn manual_entries_are_validated() {
    let app = TestApp::new().await;
    let assignment = app.assignment_for_tm("Hilltop", 240).await;
    let entry = |date_worked, hours, minutes| ManualEntryCommand {
        actor: app.tm_actor(),
        assignment_id: assignment.id,
        date_worked,
        hours,
        minutes,
        description: None,
    };

    let zero = app
        .services()
        .timers
        .add_manual_entry(entry(date(2024, 3, 4), 0, 0))
        .await
        .unwrap_err();
    assert_matches!(zero, ServiceError::ValidationError(ref f) if f.contains("minutes"));

    let future = app
        .services()
        .timers
        .add_manual_entry(entry(date(2024, 3, 5), 1, 0))
        .await
        .unwrap_err();
    assert_matches!(future, ServiceError::ValidationError(ref f) if f.contains("date_worked"));

    let out_of_range = app
        .services()
        .timers
        .add_manual_entry(entry(date(2024, 3, 4), 0, 75))
        .await
        .unwrap_err();
    assert_matches!(out_of_range, ServiceError::ValidationError(_));
}

#[tokio::test]
async fn editing_a_session_rewrites_the_daily_total() {
    let app = TestApp::new().await;
    let assignment = app.assignment_for_tm("Palm Grove", 240).await;
    app.work(app.tm_actor(), assignment.id, 40).await;
    app.work(app.tm_actor(), assignment.id, 20).await;

    let sessions = app
        .services()
        .timers
        .sessions(assignment.id, app.tm.id)
        .await
        .unwrap();
    let edited = app
        .services()
        .timers
        .edit_session(app.tm_actor(), sessions[0].id, 55)
        .await
        .unwrap();

    assert_eq!(edited.previous_duration_minutes, 40);
    assert_eq!(edited.session.duration_minutes, 55);
    assert!(edited.session.is_edited);
    assert_eq!(edited.daily_total_minutes, 75);

    let totals = daily_total(&app, assignment.id).await;
    assert_eq!(totals[0].total_minutes, 75);
}

#[tokio::test]
async fn manual_sessions_and_foreign_sessions_cannot_be_edited() {
    let app = TestApp::new().await;
    let assignment = app.assignment_for_tm("Bay Point", 240).await;
    let manual = app
        .services()
        .timers
        .add_manual_entry(ManualEntryCommand {
            actor: app.tm_actor(),
            assignment_id: assignment.id,
            date_worked: date(2024, 3, 4),
            hours: 0,
            minutes: 30,
            description: None,
        })
        .await
        .unwrap();

    let err = app
        .services()
        .timers
        .edit_session(app.tm_actor(), manual.session.id, 45)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationError(ref f) if f.contains("session_id"));

    app.work(app.tm_actor(), assignment.id, 10).await;
    let timer_session = app
        .services()
        .timers
        .sessions(assignment.id, app.tm.id)
        .await
        .unwrap()
        .into_iter()
        .find(|s| s.session_type == SessionType::Timer)
        .unwrap();

    let foreign = app
        .services()
        .timers
        .edit_session(worklog_api::auth::Actor::from(&app.tm2), timer_session.id, 15)
        .await
        .unwrap_err();
    assert_matches!(foreign, ServiceError::Forbidden(_));

    let too_long = app
        .services()
        .timers
        .edit_session(app.tm_actor(), timer_session.id, 1441)
        .await
        .unwrap_err();
    assert_matches!(too_long, ServiceError::ValidationError(_));
}

#[tokio::test]
async fn sessions_crossing_midnight_belong_to_the_start_day() {
    let app = TestApp::new().await;
    let assignment = app.assignment_for_tm("Night Shift", 120).await;

    app.advance(Duration::hours(14) + Duration::minutes(45));
    app.services()
        .timers
        .start(app.tm_actor(), assignment.id)
        .await
        .unwrap();
    app.advance(Duration::minutes(30));
    assert_eq!(app.today(), date(2024, 3, 5));

    let stopped = app
        .services()
        .timers
        .stop(app.tm_actor(), None)
        .await
        .unwrap();

    assert_eq!(stopped.session.duration_minutes, 30);
    assert_eq!(stopped.session.date_worked, date(2024, 3, 4));
    let totals = daily_total(&app, assignment.id).await;
    assert_eq!(totals.len(), 1);
    assert_eq!(totals[0].date_worked, date(2024, 3, 4));
    assert_eq!(totals[0].total_minutes, 30);
}

#[tokio::test]
async fn one_minute_manual_entry_is_accepted_at_the_end_of_today() {
    let app = TestApp::new().await;
    let assignment = app.assignment_for_tm("Last Minute", 60).await;
    app.advance(Duration::hours(14) + Duration::minutes(59));
    assert_eq!(app.today(), date(2024, 3, 4));

    let entry = app
        .services()
        .timers
        .add_manual_entry(ManualEntryCommand {
            actor: app.tm_actor(),
            assignment_id: assignment.id,
            date_worked: date(2024, 3, 4),
            hours: 0,
            minutes: 1,
            description: None,
        })
        .await
        .unwrap();

    assert_eq!(entry.session.duration_minutes, 1);
    assert_eq!(entry.session.session_type, SessionType::Manual);
    assert_eq!(daily_total(&app, assignment.id).await[0].total_minutes, 1);
}

#[tokio::test]
async fn editing_a_session_to_its_own_duration_changes_nothing() {
    let app = TestApp::new().await;
    let assignment = app.assignment_for_tm("Same Length", 120).await;
    app.work(app.tm_actor(), assignment.id, 40).await;
    app.services()
        .timers
        .add_manual_entry(ManualEntryCommand {
            actor: app.tm_actor(),
            assignment_id: assignment.id,
            date_worked: date(2024, 3, 4),
            hours: 0,
            minutes: 15,
            description: None,
        })
        .await
        .unwrap();
    let before = daily_total(&app, assignment.id).await;
    assert_eq!(before[0].total_minutes, 55);

    let timer_session = app
        .services()
        .timers
        .sessions(assignment.id, app.tm.id)
        .await
        .unwrap()
        .into_iter()
        .find(|s| s.session_type == SessionType::Timer)
        .unwrap();
    let edited = app
        .services()
        .timers
        .edit_session(app.tm_actor(), timer_session.id, 40)
        .await
        .unwrap();

    assert_eq!(edited.previous_duration_minutes, 40);
    assert_eq!(edited.daily_total_minutes, 55);
    let after = daily_total(&app, assignment.id).await;
    assert_eq!(after.len(), 1);
    assert_eq!(after[0].id, before[0].id);
    assert_eq!(after[0].total_minutes, 55);
}
