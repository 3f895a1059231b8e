//! Human-readable identifier sequences: project `HS_ID`s (`A1`..`A999`, `B1`..),
//! task ids (`TID_00001`) and assignment ids (`ASID_000001`).
//!
//! Every issuance first bumps the sequence's row in `sequence_locks`, which
//! holds a write lock on that row until the surrounding transaction ends.

use std::collections::BTreeMap;
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection,
    EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::{
    entities::{project, project_task, sequence_lock, task_assignment},
    errors::ServiceError,
};

pub const HS_ID_LOCK: &str = "hs_id";
pub const TASK_ID_LOCK: &str = "task_id";
pub const ASSIGNMENT_ID_LOCK: &str = "assignment_id";

const HS_MAX_NUMBER: u16 = 999;

static HS_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Z])([1-9][0-9]{0,2})$").expect("valid hs_id regex"));
static TASK_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^TID_(\d{5,})$").expect("valid task id regex"));
static ASSIGNMENT_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^ASID_(\d{6,})$").expect("valid assignment id regex"));

/// A parsed project id: bucket letter plus number in `1..=999`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HsId {
    pub letter: char,
    pub number: u16,
}

impl HsId {
    pub const FIRST: HsId = HsId {
        letter: 'A',
        number: 1,
    };

    pub fn parse(raw: &str) -> Option<Self> {
        let caps = HS_ID_RE.captures(raw)?;
        let letter = caps.get(1)?.as_str().chars().next()?;
        let number = caps.get(2)?.as_str().parse().ok()?;
        Some(Self { letter, number })
    }

    /// The id following `self`, rolling `A999` over to `B1`.
    pub fn successor(self) -> Result<Self, ServiceError> {
        if self.number < HS_MAX_NUMBER {
            return Ok(Self {
                letter: self.letter,
                number: self.number + 1,
            });
        }
        match self.letter {
            'Z' => Err(ServiceError::SequenceExhausted(format!(
                "hs_id sequence ends at {}",
                self
            ))),
            letter => Ok(Self {
                letter: (letter as u8 + 1) as char,
                number: 1,
            }),
        }
    }

    /// The `index`-th id of the sequence, zero based.
    pub fn nth(index: usize) -> Result<Self, ServiceError> {
        let bucket = index / HS_MAX_NUMBER as usize;
        if bucket >= 26 {
            return Err(ServiceError::SequenceExhausted(format!(
                "{} project ids exceed the Z bucket",
                index + 1
            )));
        }
        Ok(Self {
            letter: (b'A' + bucket as u8) as char,
            number: (index % HS_MAX_NUMBER as usize) as u16 + 1,
        })
    }
}

impl fmt::Display for HsId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.letter, self.number)
    }
}

/// Next id after the greatest of `existing`; `A1` when there is none.
/// Unparseable values are ignored.
pub fn next_hs_id<'a>(existing: impl IntoIterator<Item = &'a str>) -> Result<HsId, ServiceError> {
    existing
        .into_iter()
        .filter_map(HsId::parse)
        .max()
        .map_or(Ok(HsId::FIRST), HsId::successor)
}

pub fn format_task_id(n: u64) -> String {
    format!("TID_{:05}", n)
}

pub fn format_assignment_id(n: u64) -> String {
    format!("ASID_{:06}", n)
}

pub fn parse_task_id(raw: &str) -> Option<u64> {
    TASK_ID_RE.captures(raw)?.get(1)?.as_str().parse().ok()
}

pub fn parse_assignment_id(raw: &str) -> Option<u64> {
    ASSIGNMENT_ID_RE.captures(raw)?.get(1)?.as_str().parse().ok()
}

/// Bumps the lock row of `name`, serializing issuance until commit.
pub async fn acquire<C: ConnectionTrait>(conn: &C, name: &str) -> Result<(), ServiceError> {
    let result = sequence_lock::Entity::update_many()
        .col_expr(
            sequence_lock::Column::Version,
            Expr::col(sequence_lock::Column::Version).add(1),
        )
        .filter(sequence_lock::Column::Name.eq(name))
        .exec(conn)
        .await?;

    if result.rows_affected == 0 {
        warn!(sequence = name, "sequence lock row missing; creating it");
        sequence_lock::ActiveModel {
            name: Set(name.to_string()),
            version: Set(1),
        }
        .insert(conn)
        .await?;
    }
    Ok(())
}

/// Issues the next project id. Must run inside the transaction that inserts
/// the project.
pub async fn issue_hs_id<C: ConnectionTrait>(conn: &C) -> Result<String, ServiceError> {
    acquire(conn, HS_ID_LOCK).await?;

    let greatest: Option<String> = project::Entity::find()
        .select_only()
        .column(project::Column::HsId)
        .order_by_desc(Expr::cust("SUBSTR(hs_id, 1, 1)"))
        .order_by_desc(Expr::cust("LENGTH(hs_id)"))
        .order_by_desc(project::Column::HsId)
        .into_tuple()
        .one(conn)
        .await?;

    Ok(next_hs_id(greatest.as_deref())?.to_string())
}

pub async fn issue_task_id<C: ConnectionTrait>(conn: &C) -> Result<String, ServiceError> {
    acquire(conn, TASK_ID_LOCK).await?;

    let greatest: Option<String> = project_task::Entity::find()
        .select_only()
        .column(project_task::Column::TaskId)
        .order_by_desc(Expr::cust("LENGTH(task_id)"))
        .order_by_desc(project_task::Column::TaskId)
        .into_tuple()
        .one(conn)
        .await?;

    let next = greatest.as_deref().and_then(parse_task_id).unwrap_or(0) + 1;
    Ok(format_task_id(next))
}

pub async fn issue_assignment_id<C: ConnectionTrait>(conn: &C) -> Result<String, ServiceError> {
    acquire(conn, ASSIGNMENT_ID_LOCK).await?;

    let greatest: Option<String> = task_assignment::Entity::find()
        .select_only()
        .column(task_assignment::Column::AssignmentId)
        .order_by_desc(Expr::cust("LENGTH(assignment_id)"))
        .order_by_desc(task_assignment::Column::AssignmentId)
        .into_tuple()
        .one(conn)
        .await?;

    let next = greatest.as_deref().and_then(parse_assignment_id).unwrap_or(0) + 1;
    Ok(format_assignment_id(next))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BucketReport {
    pub letter: char,
    pub count: usize,
    pub max: u16,
    pub missing: Vec<u16>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SequenceReport {
    pub buckets: Vec<BucketReport>,
    /// Stored ids that do not match the `HS_ID` format.
    pub invalid: Vec<String>,
}

impl SequenceReport {
    pub fn is_contiguous(&self) -> bool {
        self.invalid.is_empty() && self.buckets.iter().all(|b| b.missing.is_empty())
    }
}

/// Groups ids by letter and lists the numbers missing from `1..=max`.
pub fn analyze_hs_ids<'a>(ids: impl IntoIterator<Item = &'a str>) -> SequenceReport {
    let mut buckets: BTreeMap<char, Vec<u16>> = BTreeMap::new();
    let mut invalid = Vec::new();

    for raw in ids {
        match HsId::parse(raw) {
            Some(id) => buckets.entry(id.letter).or_default().push(id.number),
            None => invalid.push(raw.to_string()),
        }
    }

    let buckets = buckets
        .into_iter()
        .map(|(letter, mut numbers)| {
            numbers.sort_unstable();
            let max = numbers.last().copied().unwrap_or(0);
            let missing = (1..=max)
                .filter(|n| numbers.binary_search(n).is_err())
                .collect();
            BucketReport {
                letter,
                count: numbers.len(),
                max,
                missing,
            }
        })
        .collect();

    SequenceReport { buckets, invalid }
}

/// Target ids for projects listed in creation order. Entries whose id is
/// already correct are omitted.
pub fn plan_renumbering(
    ordered: &[(uuid::Uuid, String)],
) -> Result<Vec<(uuid::Uuid, String)>, ServiceError> {
    let mut plan = Vec::new();
    for (index, (id, current)) in ordered.iter().enumerate() {
        let target = HsId::nth(index)?.to_string();
        if &target != current {
            plan.push((*id, target));
        }
    }
    Ok(plan)
}

#[instrument(skip(db))]
pub async fn check_hs_ids(db: &DatabaseConnection) -> Result<SequenceReport, ServiceError> {
    let ids: Vec<String> = project::Entity::find()
        .select_only()
        .column(project::Column::HsId)
        .into_tuple()
        .all(db)
        .await?;
    Ok(analyze_hs_ids(ids.iter().map(String::as_str)))
}

/// Renumbers every project in `created_at` order so each letter bucket is
/// contiguous from 1. Runs in two phases inside one transaction: first to
/// temporary ids, then to the targets, so the unique index never trips.
#[instrument(skip(db))]
pub async fn repair_hs_ids(db: &DatabaseConnection) -> Result<usize, ServiceError> {
    let txn = db.begin().await?;
    acquire(&txn, HS_ID_LOCK).await?;

    let ordered: Vec<(uuid::Uuid, String)> = project::Entity::find()
        .select_only()
        .column(project::Column::Id)
        .column(project::Column::HsId)
        .order_by_asc(project::Column::CreatedAt)
        .order_by_asc(project::Column::Id)
        .into_tuple()
        .all(&txn)
        .await?;

    let plan = plan_renumbering(&ordered)?;

    for (n, (id, _)) in plan.iter().enumerate() {
        project::Entity::update_many()
            .col_expr(project::Column::HsId, Expr::value(format!("#{:06}", n)))
            .filter(project::Column::Id.eq(*id))
            .exec(&txn)
            .await?;
    }
    for (id, target) in &plan {
        project::Entity::update_many()
            .col_expr(project::Column::HsId, Expr::value(target.clone()))
            .filter(project::Column::Id.eq(*id))
            .exec(&txn)
            .await?;
    }

    txn.commit().await?;
    info!(renumbered = plan.len(), "hs_id sequence repaired");
    Ok(plan.len())
}
