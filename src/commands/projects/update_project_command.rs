use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, EntityTrait, QuerySelect, Set, TransactionTrait};
use serde::Deserialize;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use super::{check_incharge, not_blank};
use crate::{
    auth::Actor,
    commands::{Command, CommandContext},
    entities::{city, product_subcategory, project},
    errors::{FieldErrors, ServiceError},
    events::Event,
    services::{
        delivery::resync_deliveries,
        projects::{check_project_dates, check_rating},
    },
};

/// Fields a PM may change after creation. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct ProjectChanges {
    #[validate(custom = "not_blank", length(max = 100))]
    pub opportunity_id: Option<String>,
    #[validate(custom = "not_blank", length(max = 255))]
    pub project_name: Option<String>,
    #[validate(custom = "not_blank", length(max = 255))]
    pub builder_name: Option<String>,
    #[validate(custom = "not_blank", length(max = 255))]
    pub account_manager: Option<String>,
    pub city_id: Option<Uuid>,
    pub product_subcategory_id: Option<Uuid>,
    #[validate(range(min = 1, message = "quantity must be greater than zero"))]
    pub quantity: Option<i32>,
    pub purchase_date: Option<NaiveDate>,
    pub sales_confirmation_date: Option<NaiveDate>,
    #[validate(range(min = 1, message = "turnaround must be at least one day"))]
    pub expected_tat_days: Option<i32>,
    pub project_incharge_id: Option<Uuid>,
    pub expected_completion_date: Option<NaiveDate>,
    pub delivery_performance_rating: Option<Decimal>,
}

#[derive(Debug, Clone)]
pub struct UpdateProjectCommand {
    pub actor: Actor,
    pub project_id: Uuid,
    pub changes: ProjectChanges,
}

#[async_trait]
impl Command for UpdateProjectCommand {
    type Result = project::Model;

    fn name(&self) -> &'static str {
        "update_project"
    }

    #[instrument(skip(self, ctx), fields(actor = %self.actor.id, project = %self.project_id))]
    async fn execute(&self, ctx: &CommandContext) -> Result<Self::Result, ServiceError> {
        let changes = &self.changes;
        let mut errors = match changes.validate() {
            Ok(()) => FieldErrors::new(),
            Err(err) => err.into(),
        };

        let txn = ctx.db.begin().await?;

        let before = project::Entity::find_by_id(self.project_id)
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::not_found("Project", self.project_id))?;
        self.actor.require_project_pm(&before)?;

        check_project_dates(
            &mut errors,
            changes.purchase_date.unwrap_or(before.purchase_date),
            changes
                .sales_confirmation_date
                .unwrap_or(before.sales_confirmation_date),
        );
        check_rating(
            &mut errors,
            "delivery_performance_rating",
            changes.delivery_performance_rating,
        );
        if let Some(city_id) = changes.city_id {
            if city::Entity::find_by_id(city_id).one(&txn).await?.is_none() {
                errors.add("city_id", "unknown city");
            }
        }
        if let Some(subcategory_id) = changes.product_subcategory_id {
            match product_subcategory::Entity::find_by_id(subcategory_id)
                .one(&txn)
                .await?
            {
                Some(sub) if sub.product_id == before.product_id => {}
                Some(_) => errors.add(
                    "product_subcategory_id",
                    "subcategory does not belong to the project's product",
                ),
                None => errors.add("product_subcategory_id", "unknown subcategory"),
            }
        }
        if let Some(incharge_id) = changes.project_incharge_id {
            check_incharge(&txn, incharge_id, &mut errors).await?;
        }
        errors.into_result()?;

        let now = ctx.now();
        let mut active: project::ActiveModel = before.clone().into();
        if let Some(v) = &changes.opportunity_id {
            active.opportunity_id = Set(v.trim().to_string());
        }
        if let Some(v) = &changes.project_name {
            active.project_name = Set(v.trim().to_string());
        }
        if let Some(v) = &changes.builder_name {
            active.builder_name = Set(v.trim().to_string());
        }
        if let Some(v) = &changes.account_manager {
            active.account_manager = Set(v.trim().to_string());
        }
        if let Some(v) = changes.city_id {
            active.city_id = Set(v);
        }
        if let Some(v) = changes.product_subcategory_id {
            active.product_subcategory_id = Set(Some(v));
        }
        if let Some(v) = changes.quantity {
            active.quantity = Set(v);
        }
        if let Some(v) = changes.purchase_date {
            active.purchase_date = Set(v);
        }
        if let Some(v) = changes.sales_confirmation_date {
            active.sales_confirmation_date = Set(v);
        }
        if let Some(v) = changes.expected_tat_days {
            active.expected_tat_days = Set(v);
        }
        if let Some(v) = changes.project_incharge_id {
            active.project_incharge_id = Set(Some(v));
        }
        if let Some(v) = changes.expected_completion_date {
            active.expected_completion_date = Set(Some(v));
        }
        if let Some(v) = changes.delivery_performance_rating {
            active.delivery_performance_rating = Set(Some(v));
        }
        active.updated_at = Set(now);
        let updated = active.update(&txn).await?;

        let affected = resync_deliveries(&txn, &before, &updated, now).await?;

        txn.commit().await?;

        info!(resynced = affected.len(), "project updated");
        ctx.event_sender
            .send_or_log(Event::ProjectUpdated {
                project_id: updated.id,
                affected: affected.clone(),
            })
            .await;

        let metrics = ctx.metrics();
        for (team_member_id, date) in affected {
            if let Err(err) = metrics.recompute(team_member_id, date).await {
                warn!(%team_member_id, %date, error = %err, "metrics recompute after project update failed");
            }
        }

        Ok(updated)
    }
}
