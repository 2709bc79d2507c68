//! Unix-socket endpoints for the record stream and the control surface.
//!
//! The stream endpoint relays fixed 16-byte records to each connected
//! client, one record per successful read; concurrent clients compete for
//! records first come, first served. The control endpoint speaks a line
//! protocol: `get <attr>` and `set <attr> <value>`, answering with the
//! attribute text, `ok`, or `err <kind>`.

use std::path::Path;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::attrs::{Attr, AttrSet};
use crate::device::DeviceHandle;
use crate::error::DeviceError;

/// Bind a Unix listener, replacing any stale socket file.
pub fn bind(path: &Path) -> Result<UnixListener> {
    if path.exists() {
        std::fs::remove_file(path)
            .with_context(|| format!("removing stale socket {}", path.display()))?;
    }

    UnixListener::bind(path).with_context(|| format!("binding {}", path.display()))
}

/// Accept loop for the record stream endpoint.
pub async fn serve_stream(listener: UnixListener, device: DeviceHandle, cancel: CancellationToken) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            accepted = listener.accept() => match accepted {
                Ok((conn, _addr)) => {
                    let device = device.clone();
                    let cancel = cancel.clone();
                    tokio::spawn(async move {
                        if let Err(e) = relay_records(conn, device, cancel).await {
                            debug!(error = %e, "stream client finished");
                        }
                    });
                }
                Err(e) => warn!(error = %e, "stream accept failed"),
            }
        }
    }
}

/// Push records to one stream client until it disconnects or the device
/// stops.
async fn relay_records(
    mut conn: UnixStream,
    device: DeviceHandle,
    cancel: CancellationToken,
) -> Result<()> {
    let reader = device.open()?;

    loop {
        let sample = tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            sample = reader.next_sample() => match sample {
                Ok(sample) => sample,
                Err(DeviceError::Stopping) => return Ok(()),
                Err(e) => return Err(e.into()),
            },
        };

        if let Err(e) = conn.write_all(&sample.to_bytes()).await {
            // The record was already consumed; the contract tolerates the
            // loss when the consumer cannot take delivery.
            debug!(
                error = %e,
                kind = DeviceError::Fault.token(),
                "record delivery failed",
            );
            return Ok(());
        }
    }
}

/// Accept loop for the control endpoint.
pub async fn serve_control(listener: UnixListener, attrs: AttrSet, cancel: CancellationToken) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            accepted = listener.accept() => match accepted {
                Ok((conn, _addr)) => {
                    let attrs = attrs.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handle_control(conn, attrs).await {
                            debug!(error = %e, "control client finished");
                        }
                    });
                }
                Err(e) => warn!(error = %e, "control accept failed"),
            }
        }
    }
}

/// Serve `get`/`set` lines on one control connection.
async fn handle_control(conn: UnixStream, attrs: AttrSet) -> Result<()> {
    let (read_half, mut write_half) = conn.into_split();
    let mut lines = BufReader::new(read_half).lines();

    while let Some(line) = lines.next_line().await? {
        let reply = dispatch(&attrs, line.trim()).await;
        write_half.write_all(reply.as_bytes()).await?;
    }

    Ok(())
}

/// Execute one control request and render the reply.
async fn dispatch(attrs: &AttrSet, line: &str) -> String {
    let mut parts = line.splitn(3, ' ');

    match (parts.next(), parts.next(), parts.next()) {
        (Some("get"), Some(name), None) => match Attr::from_name(name) {
            Some(attr) => match attrs.show(attr).await {
                Ok(text) => text,
                Err(e) => err_reply(e),
            },
            None => err_reply(DeviceError::InvalidArgument),
        },
        (Some("set"), Some(name), Some(value)) => match Attr::from_name(name) {
            Some(attr) if attr.writable() => match attrs.store(attr, value).await {
                Ok(()) => "ok\n".to_string(),
                Err(e) => err_reply(e),
            },
            Some(_) => err_reply(DeviceError::InvalidArgument),
            None => err_reply(DeviceError::InvalidArgument),
        },
        _ => err_reply(DeviceError::InvalidArgument),
    }
}

fn err_reply(e: DeviceError) -> String {
    format!("err {}\n", e.token())
}
