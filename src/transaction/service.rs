use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::models::{
    CreateTransactionDto, SortOrder, Transaction, TransactionFilters, TransactionKind,
    UpdateTransactionDto,
};
use crate::category::CategoryService;
use crate::dayclock::DayClock;
use crate::errors::AppError;
use crate::goal::GoalService;
use crate::snapshot::SnapshotService;

/// Service layer for the transaction log.
/// CRITICAL: every mutation, its snapshot recomputation(s), and any goal
/// adjustment run in one database transaction; nothing commits partially.
pub struct TransactionService;

/// Sort key of the cursor row, used for seek-past-cursor pagination
#[derive(Debug, sqlx::FromRow)]
struct CursorRow {
    id: Uuid,
    amount: i64,
    occurred_at: DateTime<Utc>,
}

impl TransactionService {
    /// Create a transaction and bring its day's snapshot up to date.
    pub async fn create_transaction(
        pool: &PgPool,
        clock: &DayClock,
        user_id: Uuid,
        dto: CreateTransactionDto,
    ) -> Result<Transaction, AppError> {
        if dto.amount <= 0 {
            return Err(AppError::ValidationError(
                "amount must be positive".to_string(),
            ));
        }

        let mut tx = pool.begin().await?;
        SnapshotService::lock_ledger(&mut tx, user_id).await?;

        // A savings-linked transaction always debits the general balance, so
        // it is recorded as an expense regardless of the requested kind.
        let kind = if dto.savings_goal_id.is_some() {
            TransactionKind::Expense
        } else {
            dto.kind
        };

        if let Some(category_id) = dto.category_id {
            let category =
                CategoryService::validate_link(&mut tx, category_id, user_id, kind).await?;
            if category.is_none() {
                return Err(AppError::ValidationError(
                    "invalid category or category type mismatch".to_string(),
                ));
            }
        }

        if let Some(goal_id) = dto.savings_goal_id {
            if !GoalService::verify_ownership(&mut tx, goal_id, user_id).await? {
                return Err(AppError::ValidationError(
                    "invalid savings goal".to_string(),
                ));
            }
            // No goal adjustment on create: the goal's starting amount is set
            // when the goal itself is created.
        }

        let occurred_at = dto.occurred_at.unwrap_or_else(Utc::now);

        let transaction = sqlx::query_as::<_, Transaction>(
            r#"
            INSERT INTO transactions
                (user_id, kind, amount, description, category_id, savings_goal_id, occurred_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, user_id, kind, amount, description, category_id, savings_goal_id,
                      occurred_at, deleted_at, created_at, updated_at
            "#,
        )
        .bind(user_id)
        .bind(kind.as_str())
        .bind(dto.amount)
        .bind(&dto.description)
        .bind(dto.category_id)
        .bind(dto.savings_goal_id)
        .bind(occurred_at)
        .fetch_one(&mut *tx)
        .await?;

        SnapshotService::recompute_from(&mut tx, clock, user_id, &[clock.day_of(occurred_at)])
            .await?;

        tx.commit().await?;

        Ok(transaction)
    }

    /// Update a transaction, re-validating linkage and recomputing every
    /// affected day's snapshot.
    /// COMPLEX SCENARIOS:
    /// 1. Amount/kind change on the same day: that day recomputes, and its
    ///    balance change rolls forward
    /// 2. Date change: both the old and the new day recompute
    /// 3. Goal link or amount change: the goal's accumulated amount is
    ///    adjusted by the exact delta
    pub async fn update_transaction(
        pool: &PgPool,
        clock: &DayClock,
        user_id: Uuid,
        transaction_id: Uuid,
        dto: UpdateTransactionDto,
    ) -> Result<Transaction, AppError> {
        let mut tx = pool.begin().await?;
        SnapshotService::lock_ledger(&mut tx, user_id).await?;

        // 1. Fetch and lock the existing non-deleted row
        let old = sqlx::query_as::<_, Transaction>(
            r#"
            SELECT id, user_id, kind, amount, description, category_id, savings_goal_id,
                   occurred_at, deleted_at, created_at, updated_at
            FROM transactions
            WHERE id = $1 AND user_id = $2 AND deleted_at IS NULL
            FOR UPDATE
            "#,
        )
        .bind(transaction_id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Transaction not found".to_string()))?;

        // 2. Resolve the new goal link (explicit null unlinks)
        let new_goal_id = match &dto.savings_goal_id {
            Some(Some(goal_id)) => {
                if !GoalService::verify_ownership(&mut tx, *goal_id, user_id).await? {
                    return Err(AppError::ValidationError(
                        "invalid savings goal".to_string(),
                    ));
                }
                Some(*goal_id)
            }
            Some(None) => None,
            None => old.savings_goal_id,
        };

        // 3. Effective kind: the patch's kind if present, else the existing
        // one; a goal link forces expense.
        let requested_kind = dto.kind.unwrap_or_else(|| old.get_kind());
        let new_kind = if new_goal_id.is_some() {
            TransactionKind::Expense
        } else {
            requested_kind
        };

        // 4. Resolve the new category and re-validate linkage whenever the
        // category or the effective kind changed
        let new_category_id = match dto.category_id {
            Some(Some(category_id)) => Some(category_id),
            Some(None) => None,
            None => old.category_id,
        };
        if let Some(category_id) = new_category_id {
            let link_changed = dto.category_id.is_some() || new_kind != old.get_kind();
            if link_changed {
                let category =
                    CategoryService::validate_link(&mut tx, category_id, user_id, new_kind)
                        .await?;
                if category.is_none() {
                    return Err(AppError::ValidationError(
                        "invalid category or category type mismatch".to_string(),
                    ));
                }
            }
        }

        // Determine final values
        let new_amount = dto.amount.unwrap_or(old.amount);
        if new_amount <= 0 {
            return Err(AppError::ValidationError(
                "amount must be positive".to_string(),
            ));
        }
        let new_occurred_at = dto.occurred_at.unwrap_or(old.occurred_at);
        // Absent keeps the old description, explicit null clears it.
        let new_description = dto
            .description
            .unwrap_or_else(|| old.description.clone());

        // 5. Goal accumulated-amount deltas, inside the same unit of work
        Self::adjust_goal_for_update(&mut tx, &old, new_goal_id, new_amount, user_id).await?;

        // 6. Write the row
        let updated = sqlx::query_as::<_, Transaction>(
            r#"
            UPDATE transactions SET
                kind = $2,
                amount = $3,
                description = $4,
                category_id = $5,
                savings_goal_id = $6,
                occurred_at = $7,
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, user_id, kind, amount, description, category_id, savings_goal_id,
                      occurred_at, deleted_at, created_at, updated_at
            "#,
        )
        .bind(transaction_id)
        .bind(new_kind.as_str())
        .bind(new_amount)
        .bind(&new_description)
        .bind(new_category_id)
        .bind(new_goal_id)
        .bind(new_occurred_at)
        .fetch_one(&mut *tx)
        .await?;

        // 7. Recompute the pre-change day, plus the new day when the edit
        // moved the transaction across a local-midnight boundary
        let old_day = clock.day_of(old.occurred_at);
        let new_day = clock.day_of(new_occurred_at);
        let affected = if new_day == old_day {
            vec![old_day]
        } else {
            vec![old_day, new_day]
        };
        SnapshotService::recompute_from(&mut tx, clock, user_id, &affected).await?;

        tx.commit().await?;

        Ok(updated)
    }

    /// Soft-delete a transaction: the row stays, but vanishes from every
    /// listing and every aggregate.
    pub async fn delete_transaction(
        pool: &PgPool,
        clock: &DayClock,
        user_id: Uuid,
        transaction_id: Uuid,
    ) -> Result<(), AppError> {
        let mut tx = pool.begin().await?;
        SnapshotService::lock_ledger(&mut tx, user_id).await?;

        let old = sqlx::query_as::<_, Transaction>(
            r#"
            SELECT id, user_id, kind, amount, description, category_id, savings_goal_id,
                   occurred_at, deleted_at, created_at, updated_at
            FROM transactions
            WHERE id = $1 AND user_id = $2 AND deleted_at IS NULL
            FOR UPDATE
            "#,
        )
        .bind(transaction_id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Transaction not found".to_string()))?;

        if let Some(goal_id) = old.savings_goal_id {
            GoalService::adjust_amount(&mut tx, goal_id, user_id, -old.amount).await?;
        }

        sqlx::query("UPDATE transactions SET deleted_at = NOW(), updated_at = NOW() WHERE id = $1")
            .bind(transaction_id)
            .execute(&mut *tx)
            .await?;

        SnapshotService::recompute_from(&mut tx, clock, user_id, &[clock.day_of(old.occurred_at)])
            .await?;

        tx.commit().await?;

        Ok(())
    }

    /// Route a transaction edit's effect into the linked goal's accumulated
    /// amount: same goal gets the amount delta, a moved link reverses the old
    /// goal and applies the full new amount to the new one.
    async fn adjust_goal_for_update(
        tx: &mut sqlx::Transaction<'_, Postgres>,
        old: &Transaction,
        new_goal_id: Option<Uuid>,
        new_amount: i64,
        user_id: Uuid,
    ) -> Result<(), AppError> {
        match (old.savings_goal_id, new_goal_id) {
            (Some(goal_id), Some(new_id)) if goal_id == new_id => {
                if new_amount != old.amount {
                    GoalService::adjust_amount(tx, goal_id, user_id, new_amount - old.amount)
                        .await?;
                }
            }
            (Some(old_id), Some(new_id)) => {
                GoalService::adjust_amount(tx, old_id, user_id, -old.amount).await?;
                GoalService::adjust_amount(tx, new_id, user_id, new_amount).await?;
            }
            (Some(old_id), None) => {
                GoalService::adjust_amount(tx, old_id, user_id, -old.amount).await?;
            }
            (None, Some(new_id)) => {
                GoalService::adjust_amount(tx, new_id, user_id, new_amount).await?;
            }
            (None, None) => {}
        }

        Ok(())
    }

    /// Get a single non-deleted transaction by ID
    pub async fn get_transaction(
        pool: &PgPool,
        user_id: Uuid,
        transaction_id: Uuid,
    ) -> Result<Transaction, AppError> {
        sqlx::query_as::<_, Transaction>(
            r#"
            SELECT id, user_id, kind, amount, description, category_id, savings_goal_id,
                   occurred_at, deleted_at, created_at, updated_at
            FROM transactions
            WHERE id = $1 AND user_id = $2 AND deleted_at IS NULL
            "#,
        )
        .bind(transaction_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Transaction not found".to_string()))
    }

    /// List transactions with composable filters and cursor pagination.
    ///
    /// Paging seeks past the cursor row's (sort key, id) pair rather than
    /// using an offset, so pages stay stable under concurrent inserts and
    /// deletes. Returns the page plus `(has_more, next_cursor)`.
    pub async fn list_transactions(
        pool: &PgPool,
        clock: &DayClock,
        user_id: Uuid,
        filters: &TransactionFilters,
    ) -> Result<(Vec<Transaction>, bool, Option<Uuid>), AppError> {
        let limit = filters.limit.clamp(1, 100);
        let sort = filters.sort;

        // Resolve the cursor row's sort key up front. Soft-deleted cursor
        // rows still anchor the seek, so a page boundary that gets deleted
        // between fetches does not invalidate the cursor.
        let cursor_key = match filters.cursor {
            Some(cursor_id) => Some(
                sqlx::query_as::<_, CursorRow>(
                    "SELECT id, amount, occurred_at FROM transactions WHERE id = $1 AND user_id = $2",
                )
                .bind(cursor_id)
                .bind(user_id)
                .fetch_optional(pool)
                .await?
                .ok_or_else(|| AppError::ValidationError("unknown cursor".to_string()))?,
            ),
            None => None,
        };

        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(
            "SELECT id, user_id, kind, amount, description, category_id, savings_goal_id, \
             occurred_at, deleted_at, created_at, updated_at \
             FROM transactions WHERE user_id = ",
        );
        qb.push_bind(user_id);
        qb.push(" AND deleted_at IS NULL");

        if let Some(kind) = filters.kind {
            // A plain kind filter never surfaces savings-linked rows; those
            // are reachable only through savings_only.
            qb.push(" AND kind = ").push_bind(kind.as_str());
            qb.push(" AND savings_goal_id IS NULL");
        }

        if filters.savings_only {
            qb.push(" AND savings_goal_id IS NOT NULL");
        }

        if let Some(raw) = filters.category_ids.as_deref() {
            let ids = parse_category_ids(raw)?;
            if !ids.is_empty() {
                qb.push(" AND category_id = ANY(").push_bind(ids).push(")");
            }
        }

        if let Some(search) = filters.search.as_deref() {
            if !search.is_empty() {
                qb.push(" AND description ILIKE ")
                    .push_bind(format!("%{}%", escape_like(search)));
            }
        }

        // Explicit month range takes priority over the legacy single-month
        // filter; both are bucketed through the configured local offset.
        let month_bounds = match (
            filters.start_year,
            filters.start_month,
            filters.end_year,
            filters.end_month,
        ) {
            (Some(sy), Some(sm), Some(ey), Some(em)) => {
                let (start, _) = clock
                    .month_range(sy, sm)
                    .ok_or_else(|| AppError::ValidationError("invalid start month".to_string()))?;
                let (_, end) = clock
                    .month_range(ey, em)
                    .ok_or_else(|| AppError::ValidationError("invalid end month".to_string()))?;
                Some((start, end))
            }
            _ => match (filters.year, filters.month) {
                (Some(year), Some(month)) => Some(
                    clock
                        .month_range(year, month)
                        .ok_or_else(|| AppError::ValidationError("invalid month".to_string()))?,
                ),
                _ => None,
            },
        };
        if let Some((start, end)) = month_bounds {
            qb.push(" AND occurred_at >= ").push_bind(start);
            qb.push(" AND occurred_at < ").push_bind(end);
        }

        if let Some(min_amount) = filters.min_amount {
            qb.push(" AND amount >= ").push_bind(min_amount);
        }
        if let Some(max_amount) = filters.max_amount {
            qb.push(" AND amount <= ").push_bind(max_amount);
        }

        // Seek past the cursor in the active sort order via a composite row
        // comparison, with the id as tiebreaker.
        if let Some(cursor) = &cursor_key {
            let op = if sort.descending() { " < (" } else { " > (" };
            if sort.by_amount() {
                qb.push(" AND (amount, id)").push(op);
                qb.push_bind(cursor.amount);
            } else {
                qb.push(" AND (occurred_at, id)").push(op);
                qb.push_bind(cursor.occurred_at);
            }
            qb.push(", ").push_bind(cursor.id).push(")");
        }

        qb.push(match sort {
            SortOrder::Recent => " ORDER BY occurred_at DESC, id DESC",
            SortOrder::Oldest => " ORDER BY occurred_at ASC, id ASC",
            SortOrder::Expensive => " ORDER BY amount DESC, id DESC",
            SortOrder::Cheapest => " ORDER BY amount ASC, id ASC",
        });

        // Fetch one extra row to learn whether another page exists.
        qb.push(" LIMIT ").push_bind(limit + 1);

        let mut rows: Vec<Transaction> = qb.build_query_as().fetch_all(pool).await?;

        let has_more = rows.len() as i64 > limit;
        if has_more {
            rows.truncate(limit as usize);
        }
        let next_cursor = if has_more {
            rows.last().map(|t| t.id)
        } else {
            None
        };

        Ok((rows, has_more, next_cursor))
    }
}

/// Parse a comma-separated UUID list from a query parameter.
fn parse_category_ids(raw: &str) -> Result<Vec<Uuid>, AppError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            Uuid::parse_str(s)
                .map_err(|_| AppError::ValidationError(format!("invalid category id: {s}")))
        })
        .collect()
}

/// Escape LIKE wildcards so user input matches literally.
fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
