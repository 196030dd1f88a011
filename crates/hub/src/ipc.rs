//! Line-delimited JSON socket server for views.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use farmlore_proto::{Outbound, PeerId, decode_inbound, encode_line};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::hub::HubEvent;

static NEXT_PEER: AtomicU64 = AtomicU64::new(1);

/// Serves views on a Unix domain socket at `socket_path` until `shutdown`.
///
/// A stale socket file is replaced. Each accepted connection becomes a peer:
/// its lines are decoded and forwarded as [`HubEvent::Inbound`], and messages
/// queued for it are written back one JSON object per line.
///
/// # Errors
///
/// Returns an error if the socket cannot be bound or a stale one removed.
pub async fn serve(
	socket_path: impl AsRef<Path>,
	events: mpsc::UnboundedSender<HubEvent>,
	shutdown: CancellationToken,
) -> std::io::Result<()> {
	let path = socket_path.as_ref();
	if path.exists() {
		tokio::fs::remove_file(path).await?;
	}

	let listener = UnixListener::bind(path)?;
	tracing::info!(path = %path.display(), "IPC server listening");

	loop {
		tokio::select! {
			_ = shutdown.cancelled() => {
				tracing::info!("IPC server shutting down");
				break;
			}
			res = listener.accept() => {
				match res {
					Ok((stream, _addr)) => {
						tokio::spawn(handle_connection(stream, events.clone(), shutdown.clone()));
					}
					Err(e) => {
						tracing::error!(error = %e, "Failed to accept connection");
					}
				}
			}
		}
	}

	if let Err(error) = tokio::fs::remove_file(path).await {
		tracing::debug!(path = %path.display(), %error, "socket already gone");
	}
	Ok(())
}

/// Runs one view connection until it closes or `shutdown` fires.
pub(crate) async fn handle_connection(
	stream: UnixStream,
	events: mpsc::UnboundedSender<HubEvent>,
	shutdown: CancellationToken,
) {
	let peer = PeerId(NEXT_PEER.fetch_add(1, Ordering::Relaxed));
	tracing::info!(%peer, "view connected");

	let (reader, writer) = stream.into_split();
	let (sink, outbox) = mpsc::unbounded_channel();
	if events.send(HubEvent::Connected { peer, sink }).is_err() {
		tracing::warn!(%peer, "hub gone, dropping connection");
		return;
	}

	let writer_task = tokio::spawn(write_loop(peer, writer, outbox));
	tokio::select! {
		_ = shutdown.cancelled() => {}
		_ = read_loop(peer, reader, &events) => {}
	}

	let _ = events.send(HubEvent::Disconnected { peer });
	writer_task.abort();
	tracing::info!(%peer, "view disconnected");
}

async fn read_loop(peer: PeerId, reader: OwnedReadHalf, events: &mpsc::UnboundedSender<HubEvent>) {
	let mut lines = BufReader::new(reader).lines();
	loop {
		let line = match lines.next_line().await {
			Ok(Some(line)) => line,
			Ok(None) => break,
			Err(error) => {
				tracing::warn!(%peer, %error, "read failed");
				break;
			}
		};
		if line.trim().is_empty() {
			continue;
		}
		let message = match decode_inbound(&line) {
			Ok(message) => message,
			Err(error) => {
				tracing::warn!(%peer, %error, "malformed message");
				continue;
			}
		};
		if events.send(HubEvent::Inbound { peer, message }).is_err() {
			break;
		}
	}
}

/// Drains `outbox` onto the socket. Ends on a write failure, which drops the
/// receiver so the registry notices on its next send.
async fn write_loop(peer: PeerId, mut writer: OwnedWriteHalf, mut outbox: mpsc::UnboundedReceiver<Outbound>) {
	while let Some(message) = outbox.recv().await {
		let mut line = match encode_line(&message) {
			Ok(line) => line,
			Err(error) => {
				tracing::error!(%peer, %error, "cannot encode message");
				continue;
			}
		};
		line.push('\n');
		if let Err(error) = writer.write_all(line.as_bytes()).await {
			tracing::warn!(%peer, %error, "write failed");
			break;
		}
	}
}
