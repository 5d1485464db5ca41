//! Per-day block streaming and the backward visual-content search
//!
//! A stream runs as a producer task that emits [`ServerMessage`]s into an
//! mpsc channel; the WebSocket route forwards the channel to the client.
//! Cancellation is cooperative: the session token and the channel state are
//! checked at the top of every height iteration and again immediately before
//! each emission, so a superseded stream stops within one gateway round-trip.

use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::classify;
use crate::config::Config;
use crate::day::DayWindow;
use crate::error::AppError;
use crate::gateway::GatewayClient;
use crate::metrics;
use crate::protocol::{ServerMessage, StreamedBlock};
use crate::resolver::resolve_start_height;
use crate::transactions::fetch_block_transactions;

/// Whether a day stream emits every block or only visual ones
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamMode {
    Full,
    VisualOnly,
}

/// Everything a stream task needs, cheap to clone per request
#[derive(Clone)]
pub struct StreamContext {
    pub gateway: GatewayClient,
    pub page_size: u32,
    pub probe_delay: Duration,
    pub page_delay: Duration,
    pub block_delay: Duration,
    pub send_timeout: Duration,
    pub visual_search_days: u32,
}

impl StreamContext {
    pub fn from_config(config: &Config, gateway: GatewayClient) -> Self {
        Self {
            gateway,
            page_size: config.page_size,
            probe_delay: config.probe_delay(),
            page_delay: config.page_delay(),
            block_delay: config.block_delay(),
            send_timeout: config.send_timeout(),
            visual_search_days: config.visual_search_days,
        }
    }
}

/// Stream one day of blocks to the client
///
/// Returns whether at least one visual block was emitted. A resolver failure
/// emits a single `error` message and surfaces as `Err`; a failed block fetch
/// skips that height; cancellation and client disconnect end the stream
/// silently. Only a completed unfiltered stream emits `dayStreamComplete`.
#[instrument(skip(ctx, token, out, window), fields(day = %window, mode = ?mode))]
pub async fn stream_day(
    ctx: &StreamContext,
    window: DayWindow,
    mode: StreamMode,
    token: &CancellationToken,
    out: &mpsc::Sender<ServerMessage>,
) -> Result<bool, AppError> {
    // Two announcements before resolution: one naming the day, one marking
    // the start of the chain search itself.
    for message in [
        ServerMessage::loading(format!("Finding start block for {}...", window)),
        ServerMessage::loading("Finding start block for the day..."),
    ] {
        if send(out, message, ctx.send_timeout).await.is_err() {
            return Ok(false);
        }
    }

    let start_height = match resolve_start_height(
        &ctx.gateway,
        window.start_timestamp(),
        ctx.probe_delay,
    )
    .await
    {
        Ok(height) => height,
        Err(e) => {
            warn!(error = %e, "Height resolution failed");
            let _ = send(
                out,
                ServerMessage::error("Failed to find start block."),
                ctx.send_timeout,
            )
            .await;
            return Err(e);
        }
    };

    if send(
        out,
        ServerMessage::loading(format!("Streaming blocks for {}...", window)),
        ctx.send_timeout,
    )
    .await
    .is_err()
    {
        return Ok(false);
    }

    let end_timestamp = window.end_timestamp();
    let mut current_height = start_height;
    let mut visual_sent = false;
    let mut completed = false;

    loop {
        if token.is_cancelled() || out.is_closed() {
            info!(height = current_height, "Stream cancelled or client gone, stopping");
            break;
        }

        let block = match ctx.gateway.block_by_height(current_height).await {
            Ok(block) => block,
            Err(e) => {
                // A missing or invalid height is not a stream-ending error.
                warn!(height = current_height, error = %e, "Failed to process block, skipping");
                current_height += 1;
                continue;
            }
        };

        if block.timestamp > end_timestamp {
            info!(height = current_height, "End of day reached, stopping stream");
            completed = true;
            break;
        }

        let transactions =
            fetch_block_transactions(&ctx.gateway, current_height, ctx.page_size, ctx.page_delay)
                .await;

        let is_visual = transactions.iter().any(|tx| classify::is_visual(&tx.tags));

        if mode == StreamMode::Full || is_visual {
            // Re-check before emission so no payload from a superseded stream
            // slips out after the replacement began.
            if token.is_cancelled() {
                break;
            }

            let payload = StreamedBlock {
                height: current_height,
                timestamp: block.timestamp,
                extra: block.extra,
                transactions,
                is_visual,
            };

            if send(out, ServerMessage::NewBlock { data: payload }, ctx.send_timeout)
                .await
                .is_err()
            {
                break;
            }

            metrics::record_blocks_streamed(1);
            if is_visual {
                visual_sent = true;
            }
        }

        current_height += 1;
        tokio::time::sleep(ctx.block_delay).await;
    }

    if completed && mode == StreamMode::Full {
        let _ = send(out, ServerMessage::DayStreamComplete, ctx.send_timeout).await;
    }

    Ok(visual_sent)
}

/// Search backwards from the requested day for visual content
///
/// Runs the day streamer in visual-only mode over consecutive days in
/// descending order. The first day with a qualifying block ends the search
/// with `dayStreamComplete`; exhausting the window emits a single
/// not-found notification. Cancellation ends the search silently.
#[instrument(skip(ctx, token, out, start), fields(day = %start))]
pub async fn search_visual_days(
    ctx: &StreamContext,
    start: DayWindow,
    token: &CancellationToken,
    out: &mpsc::Sender<ServerMessage>,
) -> Result<(), AppError> {
    let mut window = start;

    for attempt in 0..ctx.visual_search_days {
        if token.is_cancelled() || out.is_closed() {
            return Ok(());
        }

        let found = stream_day(ctx, window, StreamMode::VisualOnly, token, out).await?;

        if token.is_cancelled() {
            return Ok(());
        }

        if found {
            info!(day = %window, "Visual content found, ending search");
            let _ = send(out, ServerMessage::DayStreamComplete, ctx.send_timeout).await;
            return Ok(());
        }

        if attempt + 1 == ctx.visual_search_days {
            let _ = send(
                out,
                ServerMessage::error(format!(
                    "No visual content found in the last {} days.",
                    ctx.visual_search_days
                )),
                ctx.send_timeout,
            )
            .await;
        }

        window = window.previous();
    }

    Ok(())
}

/// Send a message through the channel with a timeout for slow clients
async fn send(
    out: &mpsc::Sender<ServerMessage>,
    message: ServerMessage,
    timeout: Duration,
) -> Result<(), ()> {
    match tokio::time::timeout(timeout, out.send(message)).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(_)) => {
            warn!("Failed to send message, client disconnected");
            Err(())
        }
        Err(_) => {
            warn!(
                timeout_secs = timeout.as_secs(),
                "Send timeout, dropping slow client"
            );
            Err(())
        }
    }
}
