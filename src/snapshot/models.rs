use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

/// Derived per-(user, day) row: cumulative balance at end of day plus that
/// day's class totals. Maintained exclusively by `SnapshotService`; always
/// fully recomputed from the day's transaction set, never patched in place.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct DailyBalanceSnapshot {
    pub user_id: Uuid,
    pub day: NaiveDate,
    pub balance: i64,
    pub income: i64,
    pub expense: i64,
    pub savings: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Snapshot information returned in responses
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotResponse {
    /// Local calendar day this snapshot covers
    pub day: NaiveDate,
    /// Cumulative net balance as of end of day, in minor units
    #[schema(example = 70000)]
    pub balance: i64,
    /// Sum of that day's plain income transactions
    #[schema(example = 100000)]
    pub income: i64,
    /// Sum of that day's plain expense transactions
    #[schema(example = 30000)]
    pub expense: i64,
    /// Sum of that day's savings-linked transactions
    #[schema(example = 0)]
    pub savings: i64,
}

impl From<DailyBalanceSnapshot> for SnapshotResponse {
    fn from(s: DailyBalanceSnapshot) -> Self {
        Self {
            day: s.day,
            balance: s.balance,
            income: s.income,
            expense: s.expense,
            savings: s.savings,
        }
    }
}

/// One day's class totals, summed straight from the transaction log
#[derive(Debug, FromRow)]
pub struct DayTotals {
    pub income: i64,
    pub expense: i64,
    pub savings: i64,
}

/// Query parameters for the daily snapshot endpoint
#[derive(Debug, serde::Deserialize, IntoParams)]
pub struct DailyQuery {
    /// Local calendar day (YYYY-MM-DD)
    #[param(example = "2024-03-01")]
    pub date: NaiveDate,
}

/// Query parameters for the monthly snapshot endpoint
#[derive(Debug, serde::Deserialize, IntoParams)]
pub struct MonthlyQuery {
    /// Calendar year
    #[param(example = 2024)]
    pub year: i32,
    /// Calendar month (1-12)
    #[param(example = 3)]
    pub month: u32,
}
