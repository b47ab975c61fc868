use chrono::{Duration, NaiveDate};
use sqlx::PgPool;
use uuid::Uuid;

use super::models::{DailyBalanceSnapshot, DayTotals, SnapshotResponse};
use crate::dayclock::DayClock;
use crate::errors::AppError;

/// Maintainer of the derived daily balance ledger.
/// CRITICAL: recomputation runs inside the mutating request's database
/// transaction, after the row write and under the per-user ledger lock, so a
/// stale snapshot can never commit.
pub struct SnapshotService;

impl SnapshotService {
    /// Serialize this user's ledger mutations for the rest of the database
    /// transaction.
    ///
    /// Two concurrent units that both sum a day's rows before either commits
    /// would each miss the other's uncommitted row under read committed, and
    /// the later commit would overwrite the snapshot with a stale total. Row
    /// locks do not cover this: inserts of distinct rows on the same day
    /// never contend. The advisory lock is keyed on the user id and released
    /// automatically at commit or rollback.
    pub async fn lock_ledger(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        user_id: Uuid,
    ) -> Result<(), AppError> {
        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1::TEXT, 0))")
            .bind(user_id)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    /// Recompute and upsert one (user, day) snapshot from that day's
    /// transaction set.
    ///
    /// The carried balance is read from the latest persisted snapshot
    /// strictly before `day`, not only from `day - 1`: a gap of empty days
    /// carries the last known balance forward instead of resetting to zero.
    /// The upsert overwrites all four values, so re-running with no
    /// intervening mutation is a no-op.
    pub async fn recompute_day(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        clock: &DayClock,
        user_id: Uuid,
        day: NaiveDate,
    ) -> Result<DailyBalanceSnapshot, AppError> {
        let carried = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT balance FROM daily_balance_snapshots
            WHERE user_id = $1 AND day < $2
            ORDER BY day DESC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .bind(day)
        .fetch_optional(&mut **tx)
        .await?
        .unwrap_or(0);

        let (start, end) = clock.day_range(day);

        // Savings-linked rows count only towards savings, never towards
        // income/expense, regardless of their recorded kind.
        let totals = sqlx::query_as::<_, DayTotals>(
            r#"
            SELECT
                COALESCE(SUM(amount) FILTER (WHERE kind = 'income' AND savings_goal_id IS NULL), 0)::BIGINT AS income,
                COALESCE(SUM(amount) FILTER (WHERE kind = 'expense' AND savings_goal_id IS NULL), 0)::BIGINT AS expense,
                COALESCE(SUM(amount) FILTER (WHERE savings_goal_id IS NOT NULL), 0)::BIGINT AS savings
            FROM transactions
            WHERE user_id = $1 AND deleted_at IS NULL
              AND occurred_at >= $2 AND occurred_at < $3
            "#,
        )
        .bind(user_id)
        .bind(start)
        .bind(end)
        .fetch_one(&mut **tx)
        .await?;

        let balance = carried + totals.income - totals.expense - totals.savings;

        let snapshot = sqlx::query_as::<_, DailyBalanceSnapshot>(
            r#"
            INSERT INTO daily_balance_snapshots (user_id, day, balance, income, expense, savings)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (user_id, day) DO UPDATE SET
                balance = EXCLUDED.balance,
                income = EXCLUDED.income,
                expense = EXCLUDED.expense,
                savings = EXCLUDED.savings,
                updated_at = NOW()
            RETURNING user_id, day, balance, income, expense, savings, created_at, updated_at
            "#,
        )
        .bind(user_id)
        .bind(day)
        .bind(balance)
        .bind(totals.income)
        .bind(totals.expense)
        .bind(totals.savings)
        .fetch_one(&mut **tx)
        .await?;

        Ok(snapshot)
    }

    /// Recompute every snapshot a mutation could have invalidated.
    ///
    /// `affected` holds the day(s) the mutated transaction directly touches
    /// (two on a day-moving update). Since a balance change on an earlier day
    /// shifts every later day's carried balance, the recomputation rolls
    /// forward over all existing snapshot days from the earliest affected day,
    /// in ascending order, inside the same database transaction.
    pub async fn recompute_from(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        clock: &DayClock,
        user_id: Uuid,
        affected: &[NaiveDate],
    ) -> Result<(), AppError> {
        let Some(first) = affected.iter().min().copied() else {
            return Ok(());
        };

        let existing = sqlx::query_scalar::<_, NaiveDate>(
            "SELECT day FROM daily_balance_snapshots WHERE user_id = $1 AND day >= $2 ORDER BY day",
        )
        .bind(user_id)
        .bind(first)
        .fetch_all(&mut **tx)
        .await?;

        let mut days: Vec<NaiveDate> = affected.iter().copied().chain(existing).collect();
        days.sort_unstable();
        days.dedup();

        for day in days {
            Self::recompute_day(tx, clock, user_id, day).await?;
        }

        Ok(())
    }

    /// Get the persisted snapshot for one day, if any.
    pub async fn get_daily(
        pool: &PgPool,
        user_id: Uuid,
        day: NaiveDate,
    ) -> Result<Option<DailyBalanceSnapshot>, AppError> {
        let snapshot = sqlx::query_as::<_, DailyBalanceSnapshot>(
            r#"
            SELECT user_id, day, balance, income, expense, savings, created_at, updated_at
            FROM daily_balance_snapshots
            WHERE user_id = $1 AND day = $2
            "#,
        )
        .bind(user_id)
        .bind(day)
        .fetch_optional(pool)
        .await?;

        Ok(snapshot)
    }

    /// Get one row per calendar day of the month, in order.
    /// Days without a persisted snapshot are filled with zero totals and the
    /// balance carried from the nearest earlier snapshot.
    pub async fn get_monthly(
        pool: &PgPool,
        clock: &DayClock,
        user_id: Uuid,
        year: i32,
        month: u32,
    ) -> Result<Vec<SnapshotResponse>, AppError> {
        let days_in_month = clock
            .days_in_month(year, month)
            .ok_or_else(|| AppError::ValidationError("invalid year or month".to_string()))?;
        let first = NaiveDate::from_ymd_opt(year, month, 1)
            .ok_or_else(|| AppError::ValidationError("invalid year or month".to_string()))?;
        let next_month_first = first + Duration::days(i64::from(days_in_month));

        let rows = sqlx::query_as::<_, DailyBalanceSnapshot>(
            r#"
            SELECT user_id, day, balance, income, expense, savings, created_at, updated_at
            FROM daily_balance_snapshots
            WHERE user_id = $1 AND day >= $2 AND day < $3
            ORDER BY day
            "#,
        )
        .bind(user_id)
        .bind(first)
        .bind(next_month_first)
        .fetch_all(pool)
        .await?;

        // Balance entering the month, for filling leading gap days.
        let mut carried = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT balance FROM daily_balance_snapshots
            WHERE user_id = $1 AND day < $2
            ORDER BY day DESC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .bind(first)
        .fetch_optional(pool)
        .await?
        .unwrap_or(0);

        let mut persisted = rows.into_iter().peekable();
        let mut out = Vec::with_capacity(days_in_month as usize);
        for offset in 0..days_in_month {
            let day = first + Duration::days(i64::from(offset));
            if let Some(snapshot) = persisted.next_if(|s| s.day == day) {
                carried = snapshot.balance;
                out.push(SnapshotResponse::from(snapshot));
            } else {
                out.push(SnapshotResponse {
                    day,
                    balance: carried,
                    income: 0,
                    expense: 0,
                    savings: 0,
                });
            }
        }

        Ok(out)
    }
}
