//! Business reporting.

use axum::{
    Extension, Json,
    extract::{Query, State},
};
use chrono::Utc;

use crate::{
    db::DbPool,
    error::AppError,
    middleware::auth::AuthContext,
    models::report::{ReportQuery, SummaryReport},
    services::report_service,
};

/// `GET /api/v1/reports/summary?from=...&to=...`
///
/// Both bounds are RFC 3339 timestamps; the window defaults to the last 30
/// days and may not exceed 366 days.
pub async fn summary(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<ReportQuery>,
) -> Result<Json<SummaryReport>, AppError> {
    let (from, to) = query.window(Utc::now())?;
    let report = report_service::summary(&pool, auth.business_id, from, to).await?;
    Ok(Json(report))
}
