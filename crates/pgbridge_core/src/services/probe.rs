//! Connectivity probe (test mode).
//!
//! Verifies that a connection opens, that a loader can be built against it,
//! and that a trivial round trip succeeds. Never reads the input stream and
//! never calls the loader's ingestion path.

use crate::error::TargetError;
use crate::models::{ProbeOutcome, ProbeResult, TargetConfig};
use crate::services::connection::{release, Connector, SqlConnection};
use crate::services::loader::LoaderFactory;

/// Statement used for the round trip.
pub const PROBE_QUERY: &str = "SELECT 1";

/// Run the probe. Errors never escape; they become `connected: false`.
pub async fn probe(
    connector: &dyn Connector,
    loaders: &dyn LoaderFactory,
    config: &TargetConfig,
) -> ProbeResult {
    let outcome = match connector.open(config).await {
        Ok(mut conn) => {
            let result = round_trip(conn.as_mut(), loaders, config).await;
            release(conn, result.is_ok()).await;
            match result {
                Ok(()) => ProbeOutcome::Connected,
                Err(e) => ProbeOutcome::failed(&e),
            }
        }
        Err(e) => ProbeOutcome::failed(&e),
    };

    match &outcome {
        ProbeOutcome::Connected => {
            tracing::info!(target = %config.display_url(), "Probe succeeded");
        }
        ProbeOutcome::Failed(reason) => {
            tracing::warn!(target = %config.display_url(), reason = %reason, "Probe failed");
        }
    }
    outcome.into()
}

async fn round_trip(
    conn: &mut dyn SqlConnection,
    loaders: &dyn LoaderFactory,
    config: &TargetConfig,
) -> Result<(), TargetError> {
    let mut loader = loaders.build(conn, config)?;
    loader.execute(PROBE_QUERY).await?;
    Ok(())
}
