//! Public URLs, `sitemap.xml` and `robots.txt`.
//!
//! Public pages live under `PUBLIC_BASE_URL` as
//! `/{business}/spaces/{slug}` and `/{business}/listings/{slug}`.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{db::DbPool, error::AppError};

pub fn space_url(base_url: &str, business_slug: &str, space_slug: &str) -> String {
    format!("{base_url}/{business_slug}/spaces/{space_slug}")
}

pub fn listing_url(base_url: &str, business_slug: &str, listing_slug: &str) -> String {
    format!("{base_url}/{business_slug}/listings/{listing_slug}")
}

/// One `<url>` entry of the sitemap.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct SitemapEntry {
    pub business_slug: String,
    pub kind: String,
    pub slug: String,
    pub updated_at: DateTime<Utc>,
}

impl SitemapEntry {
    fn location(&self, base_url: &str) -> String {
        if self.kind == "listing" {
            listing_url(base_url, &self.business_slug, &self.slug)
        } else {
            space_url(base_url, &self.business_slug, &self.slug)
        }
    }
}

/// Every published space and listing across all businesses.
pub async fn sitemap_entries(pool: &DbPool) -> Result<Vec<SitemapEntry>, AppError> {
    let entries = sqlx::query_as::<_, SitemapEntry>(
        r#"
        SELECT b.slug AS business_slug, 'space' AS kind, s.slug, s.updated_at
        FROM spaces s
        JOIN businesses b ON b.id = s.business_id
        WHERE s.status = 'published'
        UNION ALL
        SELECT b.slug AS business_slug, 'listing' AS kind, l.slug, l.updated_at
        FROM listings l
        JOIN businesses b ON b.id = l.business_id
        WHERE l.status = 'published'
        ORDER BY business_slug, kind DESC, slug
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(entries)
}

/// Slug of a business, for building public URLs.
pub async fn business_slug(pool: &DbPool, business_id: Uuid) -> Result<String, AppError> {
    let row: Option<(String,)> = sqlx::query_as("SELECT slug FROM businesses WHERE id = $1")
        .bind(business_id)
        .fetch_optional(pool)
        .await?;

    row.map(|(slug,)| slug).ok_or(AppError::NotFound("Business"))
}

pub fn render_sitemap(base_url: &str, entries: &[SitemapEntry]) -> String {
    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n",
    );

    xml.push_str(&format!("  <url>\n    <loc>{}/</loc>\n  </url>\n", escape_xml(base_url)));

    for entry in entries {
        xml.push_str(&format!(
            "  <url>\n    <loc>{}</loc>\n    <lastmod>{}</lastmod>\n  </url>\n",
            escape_xml(&entry.location(base_url)),
            entry.updated_at.format("%Y-%m-%d")
        ));
    }

    xml.push_str("</urlset>\n");
    xml
}

pub fn render_robots(base_url: &str) -> String {
    format!("User-agent: *\nAllow: /\nDisallow: /api/\n\nSitemap: {base_url}/sitemap.xml\n")
}

fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
