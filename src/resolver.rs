//! Date-to-height resolution against the gateway
//!
//! Binary-searches the height space for the first block whose timestamp is at
//! or after a target instant. A failed probe narrows the upper bound: heights
//! that cannot be fetched count as "after the target", never as "before", so
//! the search is biased toward a valid, existing height at or after the
//! target.

use std::time::Duration;
use tracing::{debug, info, instrument};

use crate::error::AppError;
use crate::gateway::GatewayClient;

/// Find the first block height whose timestamp is >= `target_unix`
///
/// Returns `current max height + 1` when no block satisfies the target, so
/// downstream streaming yields zero blocks instead of an error. Failure to
/// fetch the current max height is fatal to resolution.
#[instrument(skip(gateway, probe_delay))]
pub async fn resolve_start_height(
    gateway: &GatewayClient,
    target_unix: i64,
    probe_delay: Duration,
) -> Result<u64, AppError> {
    let info = gateway
        .network_info()
        .await
        .map_err(|e| AppError::resolution(e.to_string()))?;

    let mut low: i64 = 0;
    let mut high: i64 = info.height as i64;
    let mut best: Option<u64> = None;

    while low <= high {
        let mid = low + (high - low) / 2;

        match gateway.block_by_height(mid as u64).await {
            Ok(block) => {
                if block.timestamp >= target_unix {
                    // Candidate found, keep looking for an earlier one.
                    best = Some(mid as u64);
                    high = mid - 1;
                } else {
                    low = mid + 1;
                }
            }
            Err(e) => {
                // This height might not exist, so search lower.
                debug!(height = mid, error = %e, "Probe failed, narrowing upper bound");
                high = mid - 1;
            }
        }

        tokio::time::sleep(probe_delay).await;
    }

    match best {
        Some(height) => {
            info!(height, target_unix, "Resolved start height");
            Ok(height)
        }
        None => {
            info!(
                target_unix,
                max_height = info.height,
                "No block at or after target timestamp, chain has not reached this date"
            );
            Ok(info.height + 1)
        }
    }
}
