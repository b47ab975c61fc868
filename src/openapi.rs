use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::errors::ErrorResponse;
use crate::snapshot::SnapshotResponse;
use crate::transaction::{
    CreateTransactionDto, PagedTransactionResponse, SortOrder, TransactionKind,
    TransactionResponse, UpdateTransactionDto,
};

/// Security scheme modifier for the gateway-forwarded user id header
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "user_id_header",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::with_description(
                    "X-User-Id",
                    "User UUID forwarded by the authenticating gateway",
                ))),
            );
        }
    }
}

/// OpenAPI documentation configuration
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Daybook API",
        version = "1.0.0",
        description = "Transaction log and daily balance ledger service"
    ),
    servers(
        (url = "http://localhost:8080", description = "Development server")
    ),
    paths(
        crate::transaction::handlers::list_transactions,
        crate::transaction::handlers::get_transaction,
        crate::transaction::handlers::create_transaction,
        crate::transaction::handlers::update_transaction,
        crate::transaction::handlers::delete_transaction,
        crate::snapshot::handlers::get_daily_snapshot,
        crate::snapshot::handlers::get_monthly_snapshots,
    ),
    components(schemas(
        ErrorResponse,
        TransactionKind,
        SortOrder,
        TransactionResponse,
        CreateTransactionDto,
        UpdateTransactionDto,
        PagedTransactionResponse,
        SnapshotResponse,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "Transactions", description = "Transaction log mutations and listing"),
        (name = "Snapshots", description = "Derived daily balance ledger")
    )
)]
pub struct ApiDoc;
