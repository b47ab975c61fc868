use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

/// Transaction kind enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// Money spent (decreases the running balance)
    #[default]
    Expense,
    /// Money received (increases the running balance)
    Income,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Expense => "expense",
            TransactionKind::Income => "income",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "expense" => Some(TransactionKind::Expense),
            "income" => Some(TransactionKind::Income),
            _ => None,
        }
    }
}

/// Active sort key for transaction listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Newest first (occurred_at desc)
    #[default]
    Recent,
    /// Oldest first (occurred_at asc)
    Oldest,
    /// Largest amount first
    Expensive,
    /// Smallest amount first
    Cheapest,
}

impl SortOrder {
    /// Whether the sort walks the key space downwards.
    pub fn descending(&self) -> bool {
        matches!(self, SortOrder::Recent | SortOrder::Expensive)
    }

    /// Whether the primary sort key is the amount (otherwise the event time).
    pub fn by_amount(&self) -> bool {
        matches!(self, SortOrder::Expensive | SortOrder::Cheapest)
    }
}

/// Database model for transactions.
/// Rows are never physically deleted; a non-null `deleted_at` marks the row
/// logically absent from every listing and every aggregate.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Transaction {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: String,
    pub amount: i64,
    pub description: Option<String>,
    pub category_id: Option<Uuid>,
    pub savings_goal_id: Option<Uuid>,
    pub occurred_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    pub fn get_kind(&self) -> TransactionKind {
        TransactionKind::parse(&self.kind).unwrap_or_default()
    }
}

/// Transaction information returned in responses
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransactionResponse {
    /// Unique transaction identifier
    pub id: Uuid,
    /// Transaction kind (income, expense)
    #[schema(example = "expense")]
    pub kind: String,
    /// Transaction amount in minor units (always positive)
    #[schema(example = 30000)]
    pub amount: i64,
    /// Optional description
    #[schema(example = "Weekly groceries")]
    pub description: Option<String>,
    /// Category this transaction belongs to (optional)
    pub category_id: Option<Uuid>,
    /// Savings goal this transaction funds (optional)
    pub savings_goal_id: Option<Uuid>,
    /// Logical date of the event (user-editable)
    pub occurred_at: DateTime<Utc>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl From<Transaction> for TransactionResponse {
    fn from(t: Transaction) -> Self {
        Self {
            id: t.id,
            kind: t.kind,
            amount: t.amount,
            description: t.description,
            category_id: t.category_id,
            savings_goal_id: t.savings_goal_id,
            occurred_at: t.occurred_at,
            created_at: t.created_at,
            updated_at: t.updated_at,
        }
    }
}

/// Request body for creating a transaction
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateTransactionDto {
    /// Transaction kind (defaults to expense). A savings-linked transaction
    /// is always recorded as expense regardless of this field.
    #[serde(default)]
    pub kind: TransactionKind,

    /// Amount in minor units (must be positive)
    #[validate(range(min = 1, message = "Amount must be positive"))]
    #[schema(example = 30000)]
    pub amount: i64,

    /// Optional description (max 200 chars)
    #[validate(length(max = 200, message = "Description cannot exceed 200 characters"))]
    #[schema(example = "Weekly groceries")]
    pub description: Option<String>,

    /// Category to file this transaction under (optional)
    pub category_id: Option<Uuid>,

    /// Savings goal to link (optional)
    pub savings_goal_id: Option<Uuid>,

    /// Logical date of the event (defaults to now)
    pub occurred_at: Option<DateTime<Utc>>,
}

/// Request body for updating a transaction (PATCH - all fields optional)
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTransactionDto {
    /// Transaction kind
    pub kind: Option<TransactionKind>,

    /// Amount in minor units
    #[validate(range(min = 1, message = "Amount must be positive"))]
    #[schema(example = 45000)]
    pub amount: Option<i64>,

    /// Description (use null to clear it)
    #[validate(length(max = 200, message = "Description cannot exceed 200 characters"))]
    #[serde(default, deserialize_with = "deserialize_explicit_null")]
    #[schema(example = "Updated description")]
    pub description: Option<Option<String>>,

    /// Category ID (use null to make the transaction uncategorized)
    #[serde(default, deserialize_with = "deserialize_explicit_null")]
    pub category_id: Option<Option<Uuid>>,

    /// Savings goal ID (use null to unlink the goal)
    #[serde(default, deserialize_with = "deserialize_explicit_null")]
    pub savings_goal_id: Option<Option<Uuid>>,

    /// Logical date of the event
    pub occurred_at: Option<DateTime<Utc>>,
}

/// Distinguishes an absent field (keep existing) from an explicit JSON null
/// (clear the value): a present field always lands in the outer `Some`.
fn deserialize_explicit_null<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: serde::Deserialize<'de>,
{
    Ok(Some(Option::<T>::deserialize(deserializer)?))
}

/// Query parameters for listing transactions
#[derive(Debug, Deserialize, Validate, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct TransactionFilters {
    /// Filter by kind (income, expense). A plain expense filter excludes
    /// savings-linked rows.
    pub kind: Option<TransactionKind>,

    /// Comma-separated category UUIDs to match
    #[param(example = "c0ffee00-0000-0000-0000-000000000001,c0ffee00-0000-0000-0000-000000000002")]
    pub category_ids: Option<String>,

    /// Case-insensitive substring match on description
    #[param(example = "groceries")]
    pub search: Option<String>,

    /// Explicit month range start (takes priority over year/month)
    pub start_year: Option<i32>,
    pub start_month: Option<u32>,
    /// Explicit month range end (inclusive)
    pub end_year: Option<i32>,
    pub end_month: Option<u32>,

    /// Legacy single-month filter
    pub year: Option<i32>,
    pub month: Option<u32>,

    /// Inclusive amount range, in minor units
    pub min_amount: Option<i64>,
    pub max_amount: Option<i64>,

    /// Only savings-linked transactions
    #[serde(default)]
    pub savings_only: bool,

    /// Sort order (recent, oldest, expensive, cheapest)
    #[serde(default)]
    pub sort: SortOrder,

    /// Maximum results (1-100)
    #[validate(range(min = 1, max = 100))]
    #[serde(default = "default_limit")]
    #[param(example = 20)]
    pub limit: i64,

    /// Opaque cursor: id of the last row of the previous page
    pub cursor: Option<Uuid>,
}

fn default_limit() -> i64 {
    20
}

/// Paginated response wrapper
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PagedTransactionResponse {
    /// List of transactions
    pub data: Vec<TransactionResponse>,
    /// Whether another page exists past this one
    pub has_more: bool,
    /// Cursor for the next page (null on the last page)
    pub next_cursor: Option<Uuid>,
}

/// Path parameters for transaction ID
#[derive(Debug, Deserialize, IntoParams)]
pub struct TransactionIdPath {
    /// Transaction UUID
    pub id: Uuid,
}
