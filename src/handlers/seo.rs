//! `robots.txt` and `sitemap.xml` for search engines.

use axum::{extract::State, http::header, response::IntoResponse};

use crate::{error::AppError, services::seo, state::AppState};

pub async fn robots(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        seo::render_robots(state.config.base_url()),
    )
}

/// Every published space and listing of every business.
pub async fn sitemap(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let entries = seo::sitemap_entries(&state.pool).await?;

    Ok((
        [(header::CONTENT_TYPE, "application/xml; charset=utf-8")],
        seo::render_sitemap(state.config.base_url(), &entries),
    ))
}
