//! Newline-delimited JSON front end for the dispatcher.
//!
//! Each input line is one request and each reply is written as one line.
//! The trainer is always disposed when serving stops, even when the
//! request stream ends with an error.

use crate::neural::network::QNetwork;
use crate::services::dispatcher::{channel, Dispatcher, DispatcherHandle};
use crate::services::protocol::{Request, Response};
use crate::{Auto2048Error, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;

/// Serve requests read from `input` until it ends, an unknown request kind
/// arrives, or the dispatcher's cancellation token fires.
pub async fn serve_lines<N, I, O>(dispatcher: Dispatcher<N>, input: I, output: O) -> Result<()>
where
    N: QNetwork,
    I: AsyncBufRead + Unpin,
    O: AsyncWrite + Unpin,
{
    let cancel = dispatcher.cancellation();
    let (handle, rx) = channel(16);
    let (trainer, forwarded) = tokio::join!(
        dispatcher.serve(rx),
        forward_lines(handle, input, output, cancel)
    );
    trainer.dispose()?;
    forwarded
}

async fn forward_lines<I, O>(
    handle: DispatcherHandle,
    input: I,
    mut output: O,
    cancel: CancellationToken,
) -> Result<()>
where
    I: AsyncBufRead + Unpin,
    O: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    loop {
        let line = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                log::info!("interrupted, closing the request stream");
                return Ok(());
            }
            line = lines.next_line() => line?,
        };
        let Some(line) = line else {
            return Ok(());
        };
        if line.trim().is_empty() {
            continue;
        }

        let reply = match Request::from_json(&line) {
            Ok(request) => handle.request(request).await,
            Err(e @ Auto2048Error::UnknownRequest(_)) => return Err(e),
            Err(e) => Err(e),
        };
        let response = reply.unwrap_or_else(|e| Response::Error {
            error: e.to_string(),
        });
        output.write_all(response.to_json()?.as_bytes()).await?;
        output.write_all(b"\n").await?;
        output.flush().await?;
    }
}
