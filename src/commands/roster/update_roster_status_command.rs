use async_trait::async_trait;
use chrono::NaiveDate;
use sea_orm::{ActiveModelTrait, Set, TransactionTrait};
use serde::Deserialize;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::{
    auth::Actor,
    commands::{Command, CommandContext},
    entities::daily_roster::{self, RosterStatus},
    errors::ServiceError,
    events::Event,
    services::roster::get_or_create,
};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RosterUpdate {
    pub status: RosterStatus,
    /// Minutes. Replaces the stored value when present.
    #[serde(default)]
    #[validate(range(min = 0, max = 1440, message = "misc hours must be between 0 and 24 hours"))]
    pub misc_hours: Option<i32>,
    #[serde(default)]
    #[validate(length(max = 2000))]
    pub misc_description: Option<String>,
    #[serde(default)]
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone)]
pub struct UpdateRosterStatusCommand {
    pub actor: Actor,
    pub team_member_id: Uuid,
    pub date: NaiveDate,
    pub update: RosterUpdate,
}

#[async_trait]
impl Command for UpdateRosterStatusCommand {
    type Result = daily_roster::Model;

    fn name(&self) -> &'static str {
        "update_roster_status"
    }

    #[instrument(skip(self, ctx), fields(actor = %self.actor.id, team_member = %self.team_member_id, date = %self.date))]
    async fn execute(&self, ctx: &CommandContext) -> Result<Self::Result, ServiceError> {
        self.actor.require_self_or_pm(self.team_member_id)?;
        self.update.validate()?;

        let txn = ctx.db.begin().await?;
        let now = ctx.now();
        let row = get_or_create(&txn, self.team_member_id, self.date, now).await?;

        let mut active: daily_roster::ActiveModel = row.into();
        active.status = Set(self.update.status);
        if let Some(minutes) = self.update.misc_hours {
            active.misc_hours = Set(minutes);
        }
        if let Some(description) = &self.update.misc_description {
            active.misc_description = Set(Some(description.clone()));
        }
        if let Some(notes) = &self.update.notes {
            active.notes = Set(Some(notes.clone()));
        }
        active.is_auto_created = Set(false);
        active.updated_at = Set(now);
        let updated = active.update(&txn).await?;

        txn.commit().await?;

        info!(status = ?updated.status, "roster updated");
        ctx.event_sender
            .send_or_log(Event::RosterUpdated {
                team_member_id: self.team_member_id,
                date: self.date,
            })
            .await;

        Ok(updated)
    }
}
