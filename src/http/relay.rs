//! Bounded body relay.
//!
//! Moves a body stream from a producer to a consumer through a bounded
//! channel:
//!
//! ```text
//! producer stream ──▶ pump task ──▶ mpsc(capacity) ──▶ ReceiverStream ──▶ consumer
//! ```
//!
//! # Design Decisions
//! - The pump only reads the next chunk once the previous one was accepted
//!   by the channel, so a slow consumer slows the producer down
//! - Dropping the consumer closes the channel; the pump notices, stops and
//!   drops the producer (for an upstream response this aborts the fetch)
//! - A producer error is forwarded once and ends the relay; the consumer
//!   sees a truncated body

use axum::body::Bytes;
use futures_util::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

/// Relay `stream` through a channel holding at most `capacity` chunks.
pub fn relay<S, E>(stream: S, capacity: usize, label: &'static str) -> ReceiverStream<Result<Bytes, E>>
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    let (tx, rx) = mpsc::channel(capacity.max(1));

    tokio::spawn(async move {
        let mut stream = std::pin::pin!(stream);
        let mut relayed: u64 = 0;

        loop {
            tokio::select! {
                _ = tx.closed() => {
                    tracing::debug!(body = label, bytes = relayed, "Body consumer went away, stopping relay");
                    break;
                }
                chunk = stream.next() => match chunk {
                    Some(Ok(bytes)) => {
                        relayed += bytes.len() as u64;
                        if tx.send(Ok(bytes)).await.is_err() {
                            tracing::debug!(body = label, bytes = relayed, "Body consumer went away, stopping relay");
                            break;
                        }
                    }
                    Some(Err(e)) => {
                        tracing::warn!(body = label, bytes = relayed, error = %e, "Body stream failed");
                        let _ = tx.send(Err(e)).await;
                        break;
                    }
                    None => break,
                },
            }
        }
    });

    ReceiverStream::new(rx)
}
