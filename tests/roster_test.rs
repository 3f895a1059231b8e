mod common;

use assert_matches::assert_matches;
use common::{date, start_instant, TestApp};
use sea_orm::{ActiveModelTrait, Set};
use uuid::Uuid;
use worklog_api::{
    auth::Actor,
    commands::roster::{
        append_misc_hours_command::AppendMiscHoursCommand,
        update_roster_status_command::RosterUpdate,
    },
    entities::{daily_roster::RosterStatus, holiday, user},
    errors::ServiceError,
};

fn misc(
    app: &TestApp,
    on: chrono::NaiveDate,
    activity: &str,
    hours: i32,
    minutes: i32,
) -> AppendMiscHoursCommand {
    AppendMiscHoursCommand {
        actor: app.tm_actor(),
        team_member_id: app.tm.id,
        date: on,
        activity: activity.into(),
        hours,
        minutes,
    }
}

async fn place_tm_in_chennai_with_holiday(app: &TestApp) {
    let mut member: user::ActiveModel = app.tm.clone().into();
    member.location = Set(Some("Chennai".into()));
    member.update(app.db()).await.unwrap();

    holiday::ActiveModel {
        id: Set(Uuid::new_v4()),
        date: Set(date(2024, 3, 8)),
        location: Set("Chennai".into()),
        name: Set("Maha Shivaratri".into()),
        is_active: Set(true),
        created_at: Set(start_instant()),
    }
    .insert(app.db())
    .await
    .unwrap();
}

#[tokio::test]
async fn days_default_from_the_calendar() {
    let app = TestApp::new().await;
    let roster = &app.services().roster;

    let monday = roster
        .day(app.tm_actor(), app.tm.id, date(2024, 3, 4))
        .await
        .unwrap();
    assert_eq!(monday.roster.status, RosterStatus::Present);
    assert!(monday.roster.is_auto_created);
    assert_eq!(monday.total_minutes, 0);

    let saturday = roster
        .day(app.tm_actor(), app.tm.id, date(2024, 3, 9))
        .await
        .unwrap();
    assert_eq!(saturday.roster.status, RosterStatus::WeekOff);

    let again = roster
        .day(app.pm_actor(), app.tm.id, date(2024, 3, 4))
        .await
        .unwrap();
    assert_eq!(again.roster.id, monday.roster.id);
}

#[tokio::test]
async fn holidays_follow_the_members_location() {
    let app = TestApp::new().await;
    place_tm_in_chennai_with_holiday(&app).await;

    let tm_day = app
        .services()
        .roster
        .day(app.tm_actor(), app.tm.id, date(2024, 3, 8))
        .await
        .unwrap();
    assert_eq!(tm_day.roster.status, RosterStatus::Holiday);

    let tm2_day = app
        .services()
        .roster
        .day(Actor::from(&app.tm2), app.tm2.id, date(2024, 3, 8))
        .await
        .unwrap();
    assert_eq!(tm2_day.roster.status, RosterStatus::Present);
}

#[tokio::test]
async fn weeks_start_on_sunday() {
    let app = TestApp::new().await;

    let week = app
        .services()
        .roster
        .week(app.tm_actor(), app.tm.id, date(2024, 3, 6))
        .await
        .unwrap();

    let dates: Vec<_> = week.iter().map(|d| d.date).collect();
    assert_eq!(dates.first(), Some(&date(2024, 3, 3)));
    assert_eq!(dates.last(), Some(&date(2024, 3, 9)));
    assert_eq!(dates.len(), 7);
    let statuses: Vec<_> = week.iter().map(|d| d.roster.status).collect();
    assert_eq!(statuses[0], RosterStatus::WeekOff);
    assert!(statuses[1..6].iter().all(|s| *s == RosterStatus::Present));
    assert_eq!(statuses[6], RosterStatus::WeekOff);
}

#[tokio::test]
async fn month_view_summarises_every_day() {
    let app = TestApp::new().await;

    let month = app
        .services()
        .roster
        .month(app.tm_actor(), app.tm.id, 2024, 3)
        .await
        .unwrap();

    assert_eq!(month.summary.present_days, 21);
    assert_eq!(month.summary.week_off_days, 10);
    assert_eq!(month.summary.holiday_days, 0);
    let days = month.weeks.iter().flatten().flatten().count();
    assert_eq!(days, 31);
    assert!(month.weeks.iter().all(|w| w.len() == 7));
}

#[tokio::test]
async fn month_view_counts_holidays() {
    let app = TestApp::new().await;
    place_tm_in_chennai_with_holiday(&app).await;

    let month = app
        .services()
        .roster
        .month(app.tm_actor(), app.tm.id, 2024, 3)
        .await
        .unwrap();

    assert_eq!(month.summary.present_days, 20);
    assert_eq!(month.summary.holiday_days, 1);
    assert_eq!(month.summary.week_off_days, 10);
}

#[tokio::test]
async fn invalid_months_are_rejected() {
    let app = TestApp::new().await;

    let err = app
        .services()
        .roster
        .month(app.tm_actor(), app.tm.id, 2024, 13)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationError(ref f) if f.contains("month"));
}

#[tokio::test]
async fn status_updates_are_self_or_pm() {
    let app = TestApp::new().await;
    let update = || RosterUpdate {
        status: RosterStatus::Leave,
        misc_hours: None,
        misc_description: None,
        notes: Some("Family function".into()),
    };

    let row = app
        .services()
        .roster
        .update_status(app.tm_actor(), app.tm.id, date(2024, 3, 5), update())
        .await
        .unwrap();
    assert_eq!(row.status, RosterStatus::Leave);
    assert!(!row.is_auto_created);
    assert_eq!(row.notes.as_deref(), Some("Family function"));

    let by_pm = app
        .services()
        .roster
        .update_status(
            app.pm_actor(),
            app.tm.id,
            date(2024, 3, 5),
            RosterUpdate {
                status: RosterStatus::HalfDay,
                misc_hours: Some(60),
                misc_description: Some("Training".into()),
                notes: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(by_pm.id, row.id);
    assert_eq!(by_pm.status, RosterStatus::HalfDay);
    assert_eq!(by_pm.misc_hours, 60);
    assert_eq!(by_pm.notes.as_deref(), Some("Family function"));

    let err = app
        .services()
        .roster
        .update_status(Actor::from(&app.tm2), app.tm.id, date(2024, 3, 5), update())
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::Forbidden(_));
}

#[tokio::test]
async fn misc_hours_accumulate_with_descriptions() {
    let app = TestApp::new().await;
    let roster = &app.services().roster;

    roster
        .append_misc_hours(misc(&app, date(2024, 3, 4), "Review", 1, 30))
        .await
        .unwrap();
    let row = roster
        .append_misc_hours(misc(&app, date(2024, 3, 4), "Call", 0, 15))
        .await
        .unwrap();

    assert_eq!(row.misc_hours, 105);
    assert_eq!(
        row.misc_description.as_deref(),
        Some("Review (01:30); Call (00:15)")
    );
}

#[tokio::test]
async fn misc_hours_are_validated() {
    let app = TestApp::new().await;
    let roster = &app.services().roster;

    let future = roster
        .append_misc_hours(misc(&app, date(2024, 3, 5), "Planning", 1, 0))
        .await
        .unwrap_err();
    assert_matches!(future, ServiceError::ValidationError(ref f) if f.contains("date"));

    let blank = roster
        .append_misc_hours(misc(&app, date(2024, 3, 4), "  ", 1, 0))
        .await
        .unwrap_err();
    assert_matches!(blank, ServiceError::ValidationError(ref f) if f.contains("activity"));

    let empty = roster
        .append_misc_hours(misc(&app, date(2024, 3, 4), "Idle", 0, 0))
        .await
        .unwrap_err();
    assert_matches!(empty, ServiceError::ValidationError(ref f) if f.contains("minutes"));

    let mut foreign = misc(&app, date(2024, 3, 4), "Review", 1, 0);
    foreign.actor = Actor::from(&app.tm2);
    let denied = roster.append_misc_hours(foreign).await.unwrap_err();
    assert_matches!(denied, ServiceError::Forbidden(_));
}

#[tokio::test]
async fn day_totals_combine_timer_and_misc_minutes() {
    let app = TestApp::new().await;
    let assignment = app.assignment_for_tm("Roster Site", 120).await;
    app.work(app.tm_actor(), assignment.id, 30).await;
    app.services()
        .roster
        .append_misc_hours(misc(&app, date(2024, 3, 4), "Standup", 0, 45))
        .await
        .unwrap();

    let day = app
        .services()
        .roster
        .day(app.tm_actor(), app.tm.id, date(2024, 3, 4))
        .await
        .unwrap();
    assert_eq!(day.assignment_minutes, 30);
    assert_eq!(day.roster.misc_hours, 45);
    assert_eq!(day.total_minutes, 75);
}

async fn concurrent_appends_keep_every_entry(app: TestApp) {
    let mut tasks = vec![];
    for n in 0..8 {
        let roster = app.services().roster.clone();
        let command = misc(&app, date(2024, 3, 4), &format!("Call {}", n), 0, 15);
        tasks.push(tokio::spawn(async move { roster.append_misc_hours(command).await }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let day = app
        .services()
        .roster
        .day(app.tm_actor(), app.tm.id, date(2024, 3, 4))
        .await
        .unwrap();
    assert_eq!(day.roster.misc_hours, 120);
    let description = day.roster.misc_description.unwrap_or_default();
    let entries: Vec<&str> = description.split("; ").collect();
    assert_eq!(entries.len(), 8, "{}", description);
    assert!(entries.iter().all(|e| e.ends_with("(00:15)")));
}

#[tokio::test]
async fn concurrent_misc_appends_keep_every_entry() {
    concurrent_appends_keep_every_entry(TestApp::new().await).await;
}

#[tokio::test]
#[ignore = "requires WORKLOG_TEST_POSTGRES_URL"]
async fn concurrent_misc_appends_keep_every_entry_on_postgres() {
    concurrent_appends_keep_every_entry(TestApp::postgres().await).await;
}
