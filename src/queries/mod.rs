use async_trait::async_trait;
use rust_decimal::Decimal;
use sea_orm::DatabaseConnection;
use serde::Serialize;

use crate::errors::ServiceError;

pub mod assignment_queries;
pub mod project_queries;
pub mod report_queries;
pub mod timesheet_queries;

/// Trait representing a generic asynchronous query.
#[async_trait]
pub trait Query: Send + Sync {
    type Result: Send + Sync;

    /// Executes the query using the provided database pool.
    async fn execute(&self, db_pool: &DatabaseConnection) -> Result<Self::Result, ServiceError>;
}

/// One page of a listing. Pages are numbered from 1.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u64,
    pub per_page: u64,
    pub total_items: u64,
    pub total_pages: u64,
}

/// Mean rounded to two places; `None` for no values.
pub(crate) fn mean(values: impl IntoIterator<Item = Decimal>) -> Option<Decimal> {
    let (sum, n) = values
        .into_iter()
        .fold((Decimal::ZERO, 0i64), |(sum, n), v| (sum + v, n + 1));
    if n == 0 {
        return None;
    }
    sum.checked_div(Decimal::from(n)).map(|m| m.round_dp(2))
}

/// `100 * part / whole` rounded to two places; `None` when `whole` is zero.
pub(crate) fn ratio_pct(part: i64, whole: i64) -> Option<Decimal> {
    if whole == 0 {
        return None;
    }
    (Decimal::from(part) * Decimal::ONE_HUNDRED)
        .checked_div(Decimal::from(whole))
        .map(|p| p.round_dp(2))
}
