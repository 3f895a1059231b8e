use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, EntityTrait, Set, TransactionTrait};
use serde::Deserialize;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use super::{announce_delivery, append_history, check_incharge, check_status, not_blank};
use crate::{
    auth::Actor,
    commands::{Command, CommandContext},
    entities::{city, product, product_subcategory, project},
    errors::{FieldErrors, ServiceError},
    events::Event,
    services::{
        projects::{check_project_dates, check_rating, is_terminal_status},
        sequences::issue_hs_id,
    },
};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewProject {
    #[validate(custom = "not_blank", length(max = 100))]
    pub opportunity_id: String,
    #[validate(custom = "not_blank", length(max = 255))]
    pub project_name: String,
    #[validate(custom = "not_blank", length(max = 255))]
    pub builder_name: String,
    pub city_id: Uuid,
    pub product_id: Uuid,
    #[serde(default)]
    pub product_subcategory_id: Option<Uuid>,
    #[validate(range(min = 1, message = "quantity must be greater than zero"))]
    pub quantity: i32,
    pub purchase_date: NaiveDate,
    pub sales_confirmation_date: NaiveDate,
    /// Defaults to the product's turnaround.
    #[serde(default)]
    #[validate(range(min = 1, message = "turnaround must be at least one day"))]
    pub expected_tat_days: Option<i32>,
    #[validate(custom = "not_blank", length(max = 255))]
    pub account_manager: String,
    pub status_id: Uuid,
    #[serde(default)]
    pub project_incharge_id: Option<Uuid>,
    #[serde(default)]
    pub expected_completion_date: Option<NaiveDate>,
    #[serde(default)]
    pub delivery_performance_rating: Option<Decimal>,
}

/// Creates a project with the next `hs_id`. Unless the write is a bulk
/// import, the initial status is recorded in the history in the same
/// transaction.
#[derive(Debug, Clone)]
pub struct CreateProjectCommand {
    pub actor: Actor,
    pub project: NewProject,
    pub is_bulk_import: bool,
}

#[async_trait]
impl Command for CreateProjectCommand {
    type Result = project::Model;

    fn name(&self) -> &'static str {
        "create_project"
    }

    #[instrument(skip(self, ctx), fields(actor = %self.actor.id, bulk = self.is_bulk_import))]
    async fn execute(&self, ctx: &CommandContext) -> Result<Self::Result, ServiceError> {
        self.actor.require_pm()?;

        let input = &self.project;
        let mut errors = match input.validate() {
            Ok(()) => FieldErrors::new(),
            Err(err) => err.into(),
        };
        check_project_dates(&mut errors, input.purchase_date, input.sales_confirmation_date);
        check_rating(
            &mut errors,
            "delivery_performance_rating",
            input.delivery_performance_rating,
        );

        let txn = ctx.db.begin().await?;

        let product = product::Entity::find_by_id(input.product_id).one(&txn).await?;
        if product.is_none() {
            errors.add("product_id", "unknown product");
        }
        if city::Entity::find_by_id(input.city_id).one(&txn).await?.is_none() {
            errors.add("city_id", "unknown city");
        }
        if let Some(subcategory_id) = input.product_subcategory_id {
            match product_subcategory::Entity::find_by_id(subcategory_id)
                .one(&txn)
                .await?
            {
                None => errors.add("product_subcategory_id", "unknown subcategory"),
                Some(sub) if sub.product_id != input.product_id => errors.add(
                    "product_subcategory_id",
                    "subcategory does not belong to the selected product",
                ),
                Some(_) => {}
            }
        }
        let status = check_status(&txn, input.status_id, true, &mut errors).await?;
        if let Some(incharge_id) = input.project_incharge_id {
            check_incharge(&txn, incharge_id, &mut errors).await?;
        }
        errors.into_result()?;

        let product = product.ok_or_else(|| ServiceError::validation("product_id", "unknown product"))?;
        let status = status.ok_or_else(|| ServiceError::validation("status_id", "unknown status"))?;

        let hs_id = issue_hs_id(&txn).await?;
        let now = ctx.now();
        let project = project::ActiveModel {
            id: Set(Uuid::new_v4()),
            hs_id: Set(hs_id),
            opportunity_id: Set(input.opportunity_id.trim().to_string()),
            project_name: Set(input.project_name.trim().to_string()),
            builder_name: Set(input.builder_name.trim().to_string()),
            city_id: Set(input.city_id),
            product_id: Set(product.id),
            product_subcategory_id: Set(input.product_subcategory_id),
            quantity: Set(input.quantity),
            purchase_date: Set(input.purchase_date),
            sales_confirmation_date: Set(input.sales_confirmation_date),
            expected_tat_days: Set(input.expected_tat_days.unwrap_or(product.expected_tat_days)),
            account_manager: Set(input.account_manager.trim().to_string()),
            dpm_id: Set(self.actor.id),
            current_status_id: Set(status.id),
            project_incharge_id: Set(input.project_incharge_id),
            expected_completion_date: Set(input.expected_completion_date),
            delivery_performance_rating: Set(input.delivery_performance_rating),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        if !self.is_bulk_import {
            append_history(
                &txn,
                project.id,
                &status,
                self.actor.id,
                now,
                Some("Project Created".to_string()),
                now,
            )
            .await?;
        }

        txn.commit().await?;

        info!(project_id = %project.id, hs_id = %project.hs_id, "project created");
        ctx.event_sender
            .send_or_log(Event::ProjectCreated {
                project_id: project.id,
                hs_id: project.hs_id.clone(),
            })
            .await;
        if !self.is_bulk_import && is_terminal_status(&status.name) {
            announce_delivery(ctx, project.id, ctx.calendar.local_date(now)).await;
        }

        Ok(project)
    }
}
