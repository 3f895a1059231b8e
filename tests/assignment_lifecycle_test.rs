mod common;

use assert_matches::assert_matches;
use chrono::Duration;
use common::TestApp;
use rust_decimal_macros::dec;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use worklog_api::{
    auth::Actor,
    commands::{
        assignments::update_assignment_command::AssignmentChanges,
        tasks::create_project_task_command::NewProjectTask,
    },
    entities::{
        active_timer,
        project_task::TaskType,
        time_session,
        timer_action_log::{self, TimerAction},
    },
    errors::{Precondition, ServiceError},
};

#[tokio::test]
async fn tasks_and_assignments_get_sequential_ids() {
    let app = TestApp::new().await;
    let project = app.create_project("Maple Heights").await;

    let first_task = app.create_task(&project).await;
    let second_task = app.create_task(&project).await;
    assert_eq!(first_task.task_id, "TID_00001");
    assert_eq!(second_task.task_id, "TID_00002");
    assert_eq!(first_task.project_id, project.id);

    let first = app.create_assignment(&first_task, app.tm.id, 90).await;
    let second = app.create_assignment(&second_task, app.tm2.id, 45).await;
    assert_eq!(first.assignment_id, "ASID_000001");
    assert_eq!(second.assignment_id, "ASID_000002");
    assert!(first.is_active);
    assert!(!first.is_completed);
    assert_eq!(first.assigned_by, app.pm.id);
}

#[tokio::test]
async fn tasks_need_a_configured_project() {
    let app = TestApp::new().await;
    let mut input = app.new_project("Unplanned");
    input.project_incharge_id = None;
    let project = app
        .services()
        .projects
        .create(app.pm_actor(), input, false)
        .await
        .unwrap();

    let err = app
        .services()
        .assignments
        .create_task(
            app.pm_actor(),
            project.id,
            NewProjectTask {
                product_task_id: app.product_task.id,
                task_type: TaskType::New,
                estimated_time: 60,
            },
        )
        .await
        .unwrap_err();
    assert_matches!(
        err,
        ServiceError::PreconditionFailed(Precondition::MissingProjectConfiguration)
    );
}

#[tokio::test]
async fn tasks_must_use_the_projects_product() {
    let app = TestApp::new().await;
    let project = app.create_project("Cedar Walk").await;

    let err = app
        .services()
        .assignments
        .create_task(
            app.pm_actor(),
            project.id,
            NewProjectTask {
                product_task_id: app.foreign_product_task.id,
                task_type: TaskType::Rework,
                estimated_time: 60,
            },
        )
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationError(ref f) if f.contains("product_task_id"));
}

#[tokio::test]
async fn only_the_project_pm_manages_tasks() {
    let app = TestApp::new().await;
    let project = app.create_project("Oak Ridge").await;

    let err = app
        .services()
        .assignments
        .create_task(
            Actor::from(&app.other_pm),
            project.id,
            NewProjectTask {
                product_task_id: app.product_task.id,
                task_type: TaskType::New,
                estimated_time: 60,
            },
        )
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::Forbidden(_));

    let task = app.create_task(&project).await;
    let err = app
        .services()
        .assignments
        .create(app.tm_actor(), app.new_assignment(&task, app.tm.id, 60))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::Forbidden(_));
}

#[tokio::test]
async fn assignment_input_is_validated() {
    let app = TestApp::new().await;
    let project = app.create_project("Pine Crest").await;
    let task = app.create_task(&project).await;

    let mut input = app.new_assignment(&task, app.inactive.id, 0);
    input.expected_delivery_date = app.today();
    let err = app
        .services()
        .assignments
        .create(app.pm_actor(), input)
        .await
        .unwrap_err();

    let ServiceError::ValidationError(fields) = err else {
        panic!("expected a validation error, got {:?}", err);
    };
    assert!(fields.contains("projected_hours"));
    assert!(fields.contains("expected_delivery_date"));
    assert!(fields.contains("assigned_to"));
}

#[tokio::test]
async fn completing_stops_the_running_timer_first() {
    let app = TestApp::new().await;
    let assignment = app.assignment_for_tm("Willow Park", 60).await;

    app.services()
        .timers
        .start(app.tm_actor(), assignment.id)
        .await
        .unwrap();
    app.advance(Duration::minutes(50));

    let done = app
        .services()
        .assignments
        .complete(app.tm_actor(), assignment.id)
        .await
        .unwrap();

    assert!(done.assignment.is_completed);
    assert!(!done.assignment.is_active);
    assert_eq!(done.assignment.completion_date, Some(app.state.ctx.now()));
    assert_eq!(done.worked_minutes, 50);
    let stopped = done.stopped.expect("running timer should be stopped");
    assert_eq!(stopped.session.duration_minutes, 50);

    assert!(active_timer::Entity::find()
        .all(app.db())
        .await
        .unwrap()
        .is_empty());
    let sessions = time_session::Entity::find()
        .filter(time_session::Column::TaskAssignmentId.eq(assignment.id))
        .all(app.db())
        .await
        .unwrap();
    assert_eq!(sessions.len(), 1);

    let completions = timer_action_log::Entity::find()
        .filter(timer_action_log::Column::TaskAssignmentId.eq(assignment.id))
        .filter(timer_action_log::Column::Action.eq(TimerAction::Complete))
        .all(app.db())
        .await
        .unwrap();
    assert_eq!(completions.len(), 1);
}

#[tokio::test]
async fn completion_requires_recorded_time() {
    let app = TestApp::new().await;
    let assignment = app.assignment_for_tm("Empty Lot", 60).await;

    let err = app
        .services()
        .assignments
        .complete(app.tm_actor(), assignment.id)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::PreconditionFailed(Precondition::ZeroHoursWorked));
}

#[tokio::test]
async fn completion_happens_once_and_only_by_the_assignee() {
    let app = TestApp::new().await;
    let assignment = app.assignment_for_tm("Elm Square", 60).await;
    app.work(app.tm_actor(), assignment.id, 30).await;

    let foreign = app
        .services()
        .assignments
        .complete(Actor::from(&app.tm2), assignment.id)
        .await
        .unwrap_err();
    assert_matches!(foreign, ServiceError::Forbidden(_));

    app.services()
        .assignments
        .complete(app.tm_actor(), assignment.id)
        .await
        .unwrap();
    let again = app
        .services()
        .assignments
        .complete(app.tm_actor(), assignment.id)
        .await
        .unwrap_err();
    assert_matches!(again, ServiceError::PreconditionFailed(Precondition::AlreadyCompleted));
}

#[tokio::test]
async fn quality_rating_only_applies_after_completion() {
    let app = TestApp::new().await;
    let assignment = app.assignment_for_tm("Birch Lane", 60).await;

    let early = app
        .services()
        .assignments
        .update(
            app.pm_actor(),
            assignment.id,
            AssignmentChanges {
                quality_rating: Some(dec!(4.5)),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert_matches!(early, ServiceError::ValidationError(ref f) if f.contains("quality_rating"));

    app.work(app.tm_actor(), assignment.id, 30).await;
    app.services()
        .assignments
        .complete(app.tm_actor(), assignment.id)
        .await
        .unwrap();

    let rated = app
        .services()
        .assignments
        .update(
            app.pm_actor(),
            assignment.id,
            AssignmentChanges {
                quality_rating: Some(dec!(4.5)),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(rated.quality_rating.map(|r| r.round_dp(2)), Some(dec!(4.5)));

    let locked = app
        .services()
        .assignments
        .update(
            app.pm_actor(),
            assignment.id,
            AssignmentChanges {
                projected_hours: Some(120),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert_matches!(locked, ServiceError::ValidationError(ref f) if f.contains("assignment"));

    let out_of_range = app
        .services()
        .assignments
        .update(
            app.pm_actor(),
            assignment.id,
            AssignmentChanges {
                quality_rating: Some(dec!(5.5)),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert_matches!(out_of_range, ServiceError::ValidationError(_));
}

#[tokio::test]
async fn open_assignments_accept_new_plans() {
    let app = TestApp::new().await;
    let assignment = app.assignment_for_tm("Spruce Court", 60).await;

    let updated = app
        .services()
        .assignments
        .update(
            app.pm_actor(),
            assignment.id,
            AssignmentChanges {
                projected_hours: Some(150),
                sub_task: Some("  Rear elevation ".into()),
                expected_delivery_date: Some(app.today() + Duration::days(10)),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.projected_hours, 150);
    assert_eq!(updated.sub_task, "Rear elevation");
    assert_eq!(updated.expected_delivery_date, app.today() + Duration::days(10));

    let past = app
        .services()
        .assignments
        .update(
            app.pm_actor(),
            assignment.id,
            AssignmentChanges {
                expected_delivery_date: Some(app.today()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert_matches!(
        past,
        ServiceError::ValidationError(ref f) if f.contains("expected_delivery_date")
    );
}
