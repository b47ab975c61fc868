pub mod handlers;
mod models;
mod service;

pub use handlers::{get_daily_snapshot, get_monthly_snapshots};
pub use models::{DailyBalanceSnapshot, SnapshotResponse};
pub use service::SnapshotService;
