//! Body fork.
//!
//! A response body can be consumed once. When the same bytes must reach the
//! client and the cache store, the source is pumped by a background task into
//! two channels, giving two bodies that can be read independently.
//!
//! The primary branch is bounded, so a slow client applies backpressure to the
//! pump. The secondary branch is unbounded so its consumer never stalls the
//! primary. A branch whose reader goes away is dropped from the pump and the
//! other keeps flowing; the pump stops once both are gone or the source ends.

use std::io;

use axum::body::Body;
use bytes::Bytes;
use futures_util::{stream, StreamExt};
use tokio::sync::mpsc;

/// Chunks buffered ahead of the primary reader.
const PRIMARY_BUFFER: usize = 16;

type Chunk = Result<Bytes, io::Error>;

/// Split `source` into `(primary, secondary)` bodies carrying the same bytes.
///
/// Must be called from within a Tokio runtime.
pub fn tee(source: Body) -> (Body, Body) {
    let (primary_tx, primary_rx) = mpsc::channel::<Chunk>(PRIMARY_BUFFER);
    let (secondary_tx, secondary_rx) = mpsc::unbounded_channel::<Chunk>();

    tokio::spawn(async move {
        let mut source = source.into_data_stream();
        let mut primary = Some(primary_tx);
        let mut secondary = Some(secondary_tx);

        while let Some(next) = source.next().await {
            let (for_primary, for_secondary) = match next {
                Ok(bytes) => (Ok(bytes.clone()), Ok(bytes)),
                Err(e) => {
                    let message = e.to_string();
                    (Err(io::Error::other(message.clone())), Err(io::Error::other(message)))
                }
            };
            let failed = for_primary.is_err();

            if let Some(tx) = &primary {
                if tx.send(for_primary).await.is_err() {
                    tracing::debug!("Tee primary reader dropped");
                    primary = None;
                }
            }
            if let Some(tx) = &secondary {
                if tx.send(for_secondary).is_err() {
                    tracing::debug!("Tee secondary reader dropped");
                    secondary = None;
                }
            }

            if failed || (primary.is_none() && secondary.is_none()) {
                break;
            }
        }
    });

    let primary = stream::unfold(primary_rx, |mut rx| async move {
        rx.recv().await.map(|chunk| (chunk, rx))
    });
    let secondary = stream::unfold(secondary_rx, |mut rx| async move {
        rx.recv().await.map(|chunk| (chunk, rx))
    });

    (Body::from_stream(primary), Body::from_stream(secondary))
}
