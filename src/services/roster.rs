use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc, Weekday};
use sea_orm::{
    sea_query::{Expr, OnConflict},
    ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QuerySelect, Set,
};
use serde::Serialize;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::{
    auth::Actor,
    commands::{
        roster::{
            append_misc_hours_command::AppendMiscHoursCommand,
            update_roster_status_command::{RosterUpdate, UpdateRosterStatusCommand},
        },
        run, CommandContext,
    },
    entities::{
        daily_roster::{self, RosterStatus},
        daily_time_total, holiday, user,
    },
    errors::ServiceError,
};

/// Status a roster row starts with when nobody has set one.
pub fn default_status(date: NaiveDate, is_holiday: bool) -> RosterStatus {
    if is_holiday {
        RosterStatus::Holiday
    } else if matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
        RosterStatus::WeekOff
    } else {
        RosterStatus::Present
    }
}

pub async fn is_holiday<C: ConnectionTrait>(
    conn: &C,
    date: NaiveDate,
    location: Option<&str>,
) -> Result<bool, ServiceError> {
    let Some(location) = location else {
        return Ok(false);
    };
    let found = holiday::Entity::find()
        .filter(holiday::Column::Date.eq(date))
        .filter(holiday::Column::Location.eq(location))
        .filter(holiday::Column::IsActive.eq(true))
        .one(conn)
        .await?;
    Ok(found.is_some())
}

/// Returns the member's roster row for `date`, creating a defaulted one
/// when none exists. Concurrent callers end up with the same row.
pub async fn get_or_create<C: ConnectionTrait>(
    conn: &C,
    team_member_id: Uuid,
    date: NaiveDate,
    now: DateTime<Utc>,
) -> Result<daily_roster::Model, ServiceError> {
    if let Some(row) = find_roster(conn, team_member_id, date).await? {
        return Ok(row);
    }

    let member = user::Entity::find_by_id(team_member_id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::not_found("User", team_member_id))?;
    let holiday = is_holiday(conn, date, member.location.as_deref()).await?;

    let row = daily_roster::ActiveModel {
        id: Set(Uuid::new_v4()),
        team_member_id: Set(team_member_id),
        date: Set(date),
        status: Set(default_status(date, holiday)),
        misc_hours: Set(0),
        misc_description: Set(None),
        notes: Set(None),
        is_auto_created: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
    };
    daily_roster::Entity::insert(row)
        .on_conflict(
            OnConflict::columns([daily_roster::Column::TeamMemberId, daily_roster::Column::Date])
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(conn)
        .await?;
    debug!(%team_member_id, %date, "roster row defaulted");

    find_roster(conn, team_member_id, date)
        .await?
        .ok_or_else(|| ServiceError::InternalError("roster row vanished after insert".into()))
}

async fn find_roster<C: ConnectionTrait>(
    conn: &C,
    team_member_id: Uuid,
    date: NaiveDate,
) -> Result<Option<daily_roster::Model>, ServiceError> {
    Ok(daily_roster::Entity::find()
        .filter(daily_roster::Column::TeamMemberId.eq(team_member_id))
        .filter(daily_roster::Column::Date.eq(date))
        .one(conn)
        .await?)
}

/// Assignment minutes per date for one member, summed from daily totals.
pub async fn assignment_minutes_by_date<C: ConnectionTrait>(
    conn: &C,
    team_member_id: Uuid,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<HashMap<NaiveDate, i64>, ServiceError> {
    let rows: Vec<(NaiveDate, Option<i64>)> = daily_time_total::Entity::find()
        .select_only()
        .column(daily_time_total::Column::DateWorked)
        .column_as(Expr::col(daily_time_total::Column::TotalMinutes).sum(), "total")
        .filter(daily_time_total::Column::TeamMemberId.eq(team_member_id))
        .filter(daily_time_total::Column::DateWorked.between(from, to))
        .group_by(daily_time_total::Column::DateWorked)
        .into_tuple()
        .all(conn)
        .await?;
    Ok(rows
        .into_iter()
        .map(|(date, total)| (date, total.unwrap_or(0)))
        .collect())
}

/// A roster row with its derived hours. Assignment minutes are never stored.
#[derive(Debug, Clone, Serialize)]
pub struct RosterDay {
    pub date: NaiveDate,
    pub roster: daily_roster::Model,
    pub assignment_minutes: i64,
    pub total_minutes: i64,
}

impl RosterDay {
    pub fn new(roster: daily_roster::Model, assignment_minutes: i64) -> Self {
        Self {
            date: roster.date,
            total_minutes: assignment_minutes + i64::from(roster.misc_hours),
            roster,
            assignment_minutes,
        }
    }
}

/// First day of the Sunday-first week containing `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_sunday()))
}

/// Calendar rows for a month, Sunday first. Days outside the month are `None`.
pub fn month_grid(year: i32, month: u32) -> Option<Vec<[Option<NaiveDate>; 7]>> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let mut weeks = Vec::new();
    let mut cursor = week_start(first);
    loop {
        let mut week = [None; 7];
        for slot in week.iter_mut() {
            if cursor.month() == month && cursor.year() == year {
                *slot = Some(cursor);
            }
            cursor += Duration::days(1);
        }
        weeks.push(week);
        if cursor.month() != month || cursor.year() != year {
            break;
        }
    }
    Some(weeks)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MonthSummary {
    pub present_days: u32,
    pub half_days: u32,
    pub leave_days: u32,
    pub team_outing_days: u32,
    pub week_off_days: u32,
    pub holiday_days: u32,
    pub assignment_minutes: i64,
    pub misc_minutes: i64,
    pub total_minutes: i64,
}

impl MonthSummary {
    fn add(&mut self, day: &RosterDay) {
        match day.roster.status {
            RosterStatus::Present => self.present_days += 1,
            RosterStatus::HalfDay => self.half_days += 1,
            RosterStatus::Leave => self.leave_days += 1,
            RosterStatus::TeamOuting => self.team_outing_days += 1,
            RosterStatus::WeekOff => self.week_off_days += 1,
            RosterStatus::Holiday => self.holiday_days += 1,
        }
        self.assignment_minutes += day.assignment_minutes;
        self.misc_minutes += i64::from(day.roster.misc_hours);
        self.total_minutes += day.total_minutes;
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MonthView {
    pub team_member_id: Uuid,
    pub year: i32,
    pub month: u32,
    pub weeks: Vec<Vec<Option<RosterDay>>>,
    pub summary: MonthSummary,
}

/// Roster reads and writes for one member at a time.
#[derive(Clone)]
pub struct RosterService {
    ctx: Arc<CommandContext>,
}

impl RosterService {
    pub fn new(ctx: Arc<CommandContext>) -> Self {
        Self { ctx }
    }

    #[instrument(skip(self, update), fields(actor = %actor.id, team_member = %team_member_id, %date))]
    pub async fn update_status(
        &self,
        actor: Actor,
        team_member_id: Uuid,
        date: NaiveDate,
        update: RosterUpdate,
    ) -> Result<daily_roster::Model, ServiceError> {
        run(
            &UpdateRosterStatusCommand {
                actor,
                team_member_id,
                date,
                update,
            },
            &self.ctx,
        )
        .await
    }

    #[instrument(skip(self, command), fields(actor = %command.actor.id, team_member = %command.team_member_id))]
    pub async fn append_misc_hours(
        &self,
        command: AppendMiscHoursCommand,
    ) -> Result<daily_roster::Model, ServiceError> {
        run(&command, &self.ctx).await
    }

    async fn days(
        &self,
        team_member_id: Uuid,
        dates: &[NaiveDate],
    ) -> Result<Vec<RosterDay>, ServiceError> {
        let (Some(from), Some(to)) = (dates.iter().min(), dates.iter().max()) else {
            return Ok(Vec::new());
        };
        let db = self.ctx.db.as_ref();
        let now = self.ctx.now();
        let minutes = assignment_minutes_by_date(db, team_member_id, *from, *to).await?;

        let mut days = Vec::with_capacity(dates.len());
        for date in dates {
            let roster = get_or_create(db, team_member_id, *date, now).await?;
            days.push(RosterDay::new(
                roster,
                minutes.get(date).copied().unwrap_or(0),
            ));
        }
        Ok(days)
    }

    #[instrument(skip(self), fields(actor = %actor.id))]
    pub async fn day(
        &self,
        actor: Actor,
        team_member_id: Uuid,
        date: NaiveDate,
    ) -> Result<RosterDay, ServiceError> {
        actor.require_self_or_pm(team_member_id)?;
        self.days(team_member_id, &[date])
            .await?
            .pop()
            .ok_or_else(|| ServiceError::InternalError("empty roster day".into()))
    }

    /// The Sunday-first week containing `date`.
    #[instrument(skip(self), fields(actor = %actor.id))]
    pub async fn week(
        &self,
        actor: Actor,
        team_member_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<RosterDay>, ServiceError> {
        actor.require_self_or_pm(team_member_id)?;
        let start = week_start(date);
        let dates: Vec<NaiveDate> = (0..7).map(|i| start + Duration::days(i)).collect();
        self.days(team_member_id, &dates).await
    }

    #[instrument(skip(self), fields(actor = %actor.id))]
    pub async fn month(
        &self,
        actor: Actor,
        team_member_id: Uuid,
        year: i32,
        month: u32,
    ) -> Result<MonthView, ServiceError> {
        actor.require_self_or_pm(team_member_id)?;
        let grid = month_grid(year, month)
            .ok_or_else(|| ServiceError::validation("month", "invalid year or month"))?;
        let dates: Vec<NaiveDate> = grid.iter().flatten().flatten().copied().collect();
        let mut by_date: HashMap<NaiveDate, RosterDay> = self
            .days(team_member_id, &dates)
            .await?
            .into_iter()
            .map(|day| (day.date, day))
            .collect();

        let mut summary = MonthSummary::default();
        let weeks: Vec<Vec<Option<RosterDay>>> = grid
            .iter()
            .map(|week| {
                week.iter()
                    .map(|slot| {
                        let day = slot.and_then(|date| by_date.remove(&date));
                        if let Some(day) = &day {
                            summary.add(day);
                        }
                        day
                    })
                    .collect::<Vec<_>>()
            })
            .collect();

        Ok(MonthView {
            team_member_id,
            year,
            month,
            weeks,
            summary,
        })
    }
}
