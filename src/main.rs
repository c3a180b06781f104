use std::time::Duration;

use anyhow::Context;
use barbell::config::Config;
use barbell::graphql::{build_schema, router};
use barbell::{cron, store};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;
    if config.staff_token.is_none() {
        warn!("BARBELL_STAFF_TOKEN is not set, anyone can use the API");
    }

    let store = store::connect(&config).await?;
    tokio::spawn(cron::expire_memberships(
        store.clone(),
        Duration::from_secs(config.expiry_sweep_secs),
    ));

    let app = router(build_schema(store, config.clone()), &config);

    info!(addr = %config.addr, "listening");
    axum::Server::bind(&config.addr)
        .serve(app.into_make_service())
        .await
        .context("Server error")?;

    Ok(())
}
