//! Background jobs that run alongside the API server.

use std::time::Duration;

use tracing::{info, warn};

use crate::models::member::Member;
use crate::store::SharedStore;
use crate::util::today;

/// Marks lapsed memberships as expired every `every`, forever.
pub async fn expire_memberships(store: SharedStore, every: Duration) {
    let mut interval = tokio::time::interval(every);

    loop {
        interval.tick().await;

        match Member::expire_lapsed(today(), &*store).await {
            Ok(0) => {}
            Ok(expired) => info!(expired, "marked lapsed memberships as expired"),
            Err(error) => warn!(%error, "failed to sweep lapsed memberships"),
        }
    }
}
