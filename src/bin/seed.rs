use std::path::PathBuf;

use anyhow::Context;
use staylink::{
    config::AppConfig,
    seed::{self, SeedData},
    store::postgres,
    telemetry,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    telemetry::init("staylink=info,sqlx=warn");

    let config = AppConfig::from_env()?;
    let dir = PathBuf::from(std::env::var("SEED_DIR").unwrap_or_else(|_| "data".into()));
    let data = SeedData::load(&dir).with_context(|| format!("load fixtures from {}", dir.display()))?;

    let db = postgres::connect(&config).await?;
    postgres::migrate(&db).await;

    let result = seed::run(&postgres::repositories(&db), data).await;
    db.close().await;
    if let Err(e) = &result {
        tracing::error!(error = ?e, "seeding failed");
    }
    result
}
