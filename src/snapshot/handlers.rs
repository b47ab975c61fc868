use actix_web::{get, web, HttpResponse};
use sqlx::PgPool;

use crate::dayclock::DayClock;
use crate::errors::{AppError, ErrorResponse};
use crate::extractors::AuthenticatedUser;

use super::models::{DailyQuery, MonthlyQuery, SnapshotResponse};
use super::service::SnapshotService;

/// GET /snapshots/daily - Get the persisted snapshot for one local calendar day
#[utoipa::path(
    get,
    path = "/snapshots/daily",
    tag = "Snapshots",
    params(DailyQuery),
    responses(
        (status = 200, description = "Snapshot for the requested day", body = SnapshotResponse),
        (status = 404, description = "No snapshot for that day", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    security(("user_id_header" = []))
)]
#[get("/snapshots/daily")]
pub async fn get_daily_snapshot(
    pool: web::Data<PgPool>,
    auth: AuthenticatedUser,
    query: web::Query<DailyQuery>,
) -> Result<HttpResponse, AppError> {
    let snapshot = SnapshotService::get_daily(pool.get_ref(), auth.user_id, query.date)
        .await?
        .ok_or_else(|| AppError::NotFound("No snapshot for that day".to_string()))?;

    Ok(HttpResponse::Ok().json(SnapshotResponse::from(snapshot)))
}

/// GET /snapshots/monthly - One entry per calendar day of the month, gap days
/// filled with zero totals and the carried balance
#[utoipa::path(
    get,
    path = "/snapshots/monthly",
    tag = "Snapshots",
    params(MonthlyQuery),
    responses(
        (status = 200, description = "Snapshots for every day of the month", body = Vec<SnapshotResponse>),
        (status = 400, description = "Invalid year or month", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    security(("user_id_header" = []))
)]
#[get("/snapshots/monthly")]
pub async fn get_monthly_snapshots(
    pool: web::Data<PgPool>,
    clock: web::Data<DayClock>,
    auth: AuthenticatedUser,
    query: web::Query<MonthlyQuery>,
) -> Result<HttpResponse, AppError> {
    let snapshots = SnapshotService::get_monthly(
        pool.get_ref(),
        clock.get_ref(),
        auth.user_id,
        query.year,
        query.month,
    )
    .await?;

    Ok(HttpResponse::Ok().json(snapshots))
}
