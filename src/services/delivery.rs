use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use metrics::counter;
use sea_orm::{
    sea_query::OnConflict, ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait,
    QueryFilter, QuerySelect, Set, TransactionTrait,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    clock::Clock,
    db::DbPool,
    entities::{project, project_delivery},
    errors::ServiceError,
    events::{Event, EventHandler},
    services::metrics::MetricsService,
};

/// `actual - expected` in days. Positive means late.
pub fn days_variance(expected: Option<NaiveDate>, actual: NaiveDate) -> Option<i32> {
    expected.and_then(|expected| i32::try_from((actual - expected).num_days()).ok())
}

/// Records delivery snapshots and refreshes the incharge's daily metrics.
#[derive(Clone)]
pub struct DeliveryTracker {
    db: Arc<DbPool>,
    clock: Arc<dyn Clock>,
    metrics: MetricsService,
}

impl DeliveryTracker {
    pub fn new(db: Arc<DbPool>, clock: Arc<dyn Clock>, metrics: MetricsService) -> Self {
        Self { db, clock, metrics }
    }

    /// Upserts the `(project, delivery_date)` snapshot. Returns `None` when
    /// the project has no incharge to attribute the delivery to.
    #[instrument(skip(self), fields(project = %project_id, %delivery_date))]
    pub async fn track(
        &self,
        project_id: Uuid,
        delivery_date: NaiveDate,
    ) -> Result<Option<project_delivery::Model>, ServiceError> {
        let txn = self.db.begin().await?;

        let project = project::Entity::find_by_id(project_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::not_found("Project", project_id))?;
        let Some(incharge_id) = project.project_incharge_id else {
            warn!(hs_id = %project.hs_id, "project has no incharge; delivery not recorded");
            return Ok(None);
        };

        let now = self.clock.now();
        let existing = project_delivery::Entity::find()
            .filter(project_delivery::Column::ProjectId.eq(project_id))
            .filter(project_delivery::Column::DeliveryDate.eq(delivery_date))
            .lock_exclusive()
            .one(&txn)
            .await?;

        let delivery = match existing {
            Some(row) if row.delivery_performance_rating != project.delivery_performance_rating => {
                let mut active: project_delivery::ActiveModel = row.into();
                active.delivery_performance_rating = Set(project.delivery_performance_rating);
                active.updated_at = Set(now);
                active.update(&txn).await?
            }
            Some(row) => row,
            None => {
                insert_snapshot(&txn, &project, incharge_id, delivery_date, now).await?
            }
        };

        txn.commit().await?;

        counter!("worklog.deliveries.tracked", 1);
        info!(
            hs_id = %delivery.hs_id,
            variance = ?delivery.days_variance_snapshot,
            "delivery recorded"
        );

        self.metrics
            .recompute(delivery.project_incharge_id, delivery_date)
            .await?;
        Ok(Some(delivery))
    }
}

async fn insert_snapshot<C: ConnectionTrait>(
    conn: &C,
    project: &project::Model,
    incharge_id: Uuid,
    delivery_date: NaiveDate,
    now: DateTime<Utc>,
) -> Result<project_delivery::Model, ServiceError> {
    let row = project_delivery::ActiveModel {
        id: Set(Uuid::new_v4()),
        project_id: Set(project.id),
        delivery_date: Set(delivery_date),
        project_name: Set(project.project_name.clone()),
        hs_id: Set(project.hs_id.clone()),
        project_incharge_id: Set(incharge_id),
        expected_completion_date: Set(project.expected_completion_date),
        actual_completion_date: Set(delivery_date),
        delivery_performance_rating: Set(project.delivery_performance_rating),
        days_variance_snapshot: Set(days_variance(project.expected_completion_date, delivery_date)),
        created_at: Set(now),
        updated_at: Set(now),
    };
    project_delivery::Entity::insert(row)
        .on_conflict(
            OnConflict::columns([
                project_delivery::Column::ProjectId,
                project_delivery::Column::DeliveryDate,
            ])
            .do_nothing()
            .to_owned(),
        )
        .exec_without_returning(conn)
        .await?;

    project_delivery::Entity::find()
        .filter(project_delivery::Column::ProjectId.eq(project.id))
        .filter(project_delivery::Column::DeliveryDate.eq(delivery_date))
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::InternalError("delivery row missing after insert".into()))
}

/// Pushes a project's new incharge and rating onto its existing delivery
/// snapshots. Returns every `(incharge, date)` whose metrics are now stale,
/// covering both the previous and the new incharge.
pub async fn resync_deliveries<C: ConnectionTrait>(
    conn: &C,
    before: &project::Model,
    after: &project::Model,
    now: DateTime<Utc>,
) -> Result<Vec<(Uuid, NaiveDate)>, ServiceError> {
    if before.project_incharge_id == after.project_incharge_id
        && before.delivery_performance_rating == after.delivery_performance_rating
    {
        return Ok(Vec::new());
    }

    let deliveries = project_delivery::Entity::find()
        .filter(project_delivery::Column::ProjectId.eq(after.id))
        .all(conn)
        .await?;

    let mut affected = Vec::with_capacity(deliveries.len() * 2);
    for delivery in deliveries {
        affected.push((delivery.project_incharge_id, delivery.delivery_date));
        let date = delivery.delivery_date;
        let previous_incharge = delivery.project_incharge_id;

        let mut active: project_delivery::ActiveModel = delivery.into();
        if let Some(incharge_id) = after.project_incharge_id {
            if incharge_id != previous_incharge {
                active.project_incharge_id = Set(incharge_id);
                affected.push((incharge_id, date));
            }
        }
        active.delivery_performance_rating = Set(after.delivery_performance_rating);
        active.updated_at = Set(now);
        active.update(conn).await?;
    }

    affected.sort();
    affected.dedup();
    Ok(affected)
}

#[async_trait]
impl EventHandler for DeliveryTracker {
    fn name(&self) -> &'static str {
        "delivery_tracker"
    }

    async fn handle_event(&self, event: &Event) -> Result<(), ServiceError> {
        if let Event::ProjectDelivered {
            project_id,
            delivery_date,
        } = event
        {
            self.track(*project_id, *delivery_date).await?;
        }
        Ok(())
    }
}
