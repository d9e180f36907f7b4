//! Bootstrap a business and its first admin API key.
//!
//! ```text
//! create-business "Loft Co" loft-co
//! ```
//!
//! The key is printed once and cannot be recovered afterwards.

use anyhow::Context;
use spaces_marketplace_server::{config::Config, db, services::business_service};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .init();

    let mut args = std::env::args().skip(1);
    let (name, slug) = match (args.next(), args.next()) {
        (Some(name), Some(slug)) => (name, slug),
        _ => anyhow::bail!("usage: create-business <name> <slug>"),
    };

    let config = Config::from_env()?;
    let pool = db::create_pool(&config.database_url, 1).await?;
    db::run_migrations(&pool).await?;

    let (business, key) = business_service::create_business(&pool, &name, &slug)
        .await
        .with_context(|| format!("creating business '{slug}'"))?;
    let raw_key = key.key.context("key missing from creation response")?;

    println!("Business: {} ({})", business.name, business.slug);
    println!("ID:       {}", business.id);
    println!("API key:  {raw_key}");
    println!();
    println!("Store the key now; it is not shown again.");

    Ok(())
}
