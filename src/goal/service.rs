use uuid::Uuid;

use crate::errors::AppError;

/// Savings-goal linkage consumed by the transaction mutations.
pub struct GoalService;

impl GoalService {
    /// Verify the goal exists and belongs to the user.
    pub async fn verify_ownership(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        goal_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, AppError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM savings_goals WHERE id = $1 AND user_id = $2)",
        )
        .bind(goal_id)
        .bind(user_id)
        .fetch_one(&mut **tx)
        .await?;

        Ok(exists)
    }

    /// Apply a signed delta to the goal's accumulated amount.
    ///
    /// Always an atomic increment, never a recomputation from linked
    /// transactions, so concurrent goal readers never observe a torn value.
    /// Runs inside the caller's database transaction; a failure here aborts
    /// the whole mutation.
    pub async fn adjust_amount(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        goal_id: Uuid,
        user_id: Uuid,
        delta: i64,
    ) -> Result<(), AppError> {
        if delta == 0 {
            return Ok(());
        }

        let result = sqlx::query(
            r#"
            UPDATE savings_goals
            SET accumulated_amount = accumulated_amount + $1, updated_at = NOW()
            WHERE id = $2 AND user_id = $3
            "#,
        )
        .bind(delta)
        .bind(goal_id)
        .bind(user_id)
        .execute(&mut **tx)
        .await?;

        // The link was validated inside this same unit of work, so a missing
        // row here means the unit must not commit.
        if result.rows_affected() == 0 {
            return Err(AppError::Consistency(format!(
                "savings goal {goal_id} disappeared during adjustment"
            )));
        }

        Ok(())
    }
}
