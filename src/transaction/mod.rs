pub mod handlers;
mod models;
mod service;

pub use handlers::{
    create_transaction, delete_transaction, get_transaction, list_transactions, update_transaction,
};
pub use models::{
    CreateTransactionDto, PagedTransactionResponse, SortOrder, Transaction, TransactionFilters,
    TransactionKind, TransactionResponse, UpdateTransactionDto,
};
pub use service::TransactionService;
