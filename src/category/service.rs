use uuid::Uuid;

use super::models::Category;
use crate::errors::AppError;
use crate::transaction::TransactionKind;

/// Linkage validator consumed by the transaction mutations.
pub struct CategoryService;

impl CategoryService {
    /// Verify the category exists, belongs to the user, and matches the
    /// transaction kind. `None` means the caller must fail validation.
    pub async fn validate_link(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        category_id: Uuid,
        user_id: Uuid,
        kind: TransactionKind,
    ) -> Result<Option<Category>, AppError> {
        let category = sqlx::query_as::<_, Category>(
            r#"
            SELECT id, user_id, name, kind, created_at, updated_at
            FROM categories
            WHERE id = $1 AND user_id = $2 AND kind = $3
            "#,
        )
        .bind(category_id)
        .bind(user_id)
        .bind(kind.as_str())
        .fetch_optional(&mut **tx)
        .await?;

        Ok(category)
    }
}
