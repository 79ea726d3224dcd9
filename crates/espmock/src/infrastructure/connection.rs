//! One client connection: a read loop and a writer task.
//!
//! ```text
//!   socket read half ──► FrameAssembler ──► Session::handle_frame
//!                                                 │
//!                                   SessionHandle (bounded mpsc)
//!                                                 │
//!   socket write half ◄── writer task ◄───────────┘
//! ```
//!
//! Replies and broadcasts both go through the session's channel, so frames
//! reach the socket whole and in the order they were queued, no matter which
//! task queued them.
//!
//! # Teardown order
//!
//! 1. the read loop ends (EOF, read error, disconnect request, shutdown,
//!    eviction by the hub, receive buffer over its limit),
//! 2. the session unregisters from the hub, so no new broadcast targets it,
//! 3. the writer is told to flush what is already queued and close.
//!
//! The flush gets [`FLUSH_GRACE`]; a peer that does not read by then has its
//! writer aborted, so a stuck socket can never hold up shutdown.

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use espmock_core::{Frame, FrameAssembler};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::application::device_state::DeviceHub;
use crate::application::session::{Flow, Session, SessionError, SessionHandle, SessionId};

/// Bytes requested per socket read.
const READ_CHUNK_SIZE: usize = 4096;

/// Frames that may wait in a session's output queue.
const OUTBOUND_QUEUE_DEPTH: usize = 256;

/// How long a closing connection may spend writing out its queue.
pub const FLUSH_GRACE: Duration = Duration::from_secs(2);

/// Why a connection's read loop ended.
#[derive(Debug)]
enum CloseReason {
    PeerClosed,
    ReadFailed(std::io::Error),
    DisconnectRequested,
    Session(SessionError),
    Shutdown,
    Evicted,
    BufferOverflow(usize),
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CloseReason::PeerClosed => write!(f, "peer closed the connection"),
            CloseReason::ReadFailed(e) => write!(f, "read error: {e}"),
            CloseReason::DisconnectRequested => write!(f, "client requested disconnect"),
            CloseReason::Session(e) => write!(f, "{e}"),
            CloseReason::Shutdown => write!(f, "server shutting down"),
            CloseReason::Evicted => write!(f, "dropped by the device for not reading"),
            CloseReason::BufferOverflow(n) => {
                write!(f, "{n} byte(s) buffered without a complete frame")
            }
        }
    }
}

/// Serves one accepted connection until it ends.
///
/// Never returns an error: every failure is confined to this connection and
/// logged here.
pub async fn serve_connection(
    stream: TcpStream,
    peer: SocketAddr,
    hub: Arc<DeviceHub>,
    shutdown: CancellationToken,
) {
    let id = hub.next_session_id();
    info!("session {id}: client connected from {peer}");

    let (read_half, write_half) = stream.into_split();
    let (tx, rx) = mpsc::channel(OUTBOUND_QUEUE_DEPTH);
    let flush_and_close = CancellationToken::new();
    let writer = tokio::spawn(write_frames(write_half, rx, flush_and_close.clone(), id));

    let mut session = Session::new(SessionHandle::new(id, tx), peer, hub);
    let reason = read_frames(read_half, &mut session, &shutdown).await;

    session.close().await;
    drop(session);
    finish_writer(id, writer, &flush_and_close, FLUSH_GRACE).await;

    info!("session {id}: disconnected ({reason})");
}

/// Tells the writer to flush and close, aborting it after `grace`.
async fn finish_writer(
    id: SessionId,
    mut writer: JoinHandle<()>,
    flush_and_close: &CancellationToken,
    grace: Duration,
) {
    flush_and_close.cancel();
    match tokio::time::timeout(grace, &mut writer).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!("session {id}: writer task failed: {e}"),
        Err(_) => {
            warn!("session {id}: peer not reading; dropping unsent output after {grace:?}");
            writer.abort();
        }
    }
}

/// Reads from the socket and dispatches every complete frame.
async fn read_frames<R>(
    reader: R,
    session: &mut Session,
    shutdown: &CancellationToken,
) -> CloseReason
where
    R: AsyncRead + Unpin,
{
    read_frames_with(reader, session, shutdown, FrameAssembler::new()).await
}

/// [`read_frames`] with a caller-chosen assembler (and so buffer limit).
async fn read_frames_with<R>(
    mut reader: R,
    session: &mut Session,
    shutdown: &CancellationToken,
    mut assembler: FrameAssembler,
) -> CloseReason
where
    R: AsyncRead + Unpin,
{
    let evicted = session.eviction_token();
    let mut chunk = vec![0u8; READ_CHUNK_SIZE];
    let mut stall_reported = false;

    loop {
        let n = tokio::select! {
            _ = shutdown.cancelled() => return CloseReason::Shutdown,
            _ = evicted.cancelled() => return CloseReason::Evicted,
            read = reader.read(&mut chunk) => match read {
                Ok(0) => return CloseReason::PeerClosed,
                Ok(n) => n,
                Err(e) => return CloseReason::ReadFailed(e),
            },
        };

        for frame in assembler.feed(&chunk[..n]) {
            debug!(
                "session {}: received type {} ({} byte payload)",
                session.id(),
                frame.msg_type,
                frame.payload.len()
            );
            // A reply may wait on this session's own full queue.
            let handled = tokio::select! {
                _ = shutdown.cancelled() => return CloseReason::Shutdown,
                _ = evicted.cancelled() => return CloseReason::Evicted,
                handled = session.handle_frame(&frame) => handled,
            };
            match handled {
                Ok(Flow::Continue) => {}
                Ok(Flow::Close) => return CloseReason::DisconnectRequested,
                Err(e) => return CloseReason::Session(e),
            }
        }

        if assembler.over_limit() {
            return CloseReason::BufferOverflow(assembler.buffered().len());
        }

        // A corrupt preamble halts extraction for good; say so once.
        if let Some(stall) = assembler.stall() {
            if !stall_reported {
                warn!(
                    "session {}: stream halted on corrupt input: {stall:?}",
                    session.id()
                );
                stall_reported = true;
            }
        }
    }
}

/// Drains the session's output queue into the socket.
///
/// Runs until every sender is gone, a write fails, or `flush_and_close` is
/// cancelled.  In the last case the frames already queued are still written
/// before the socket is shut down; [`finish_writer`] bounds how long that may
/// take.
async fn write_frames<W>(
    mut writer: W,
    mut rx: mpsc::Receiver<Frame>,
    flush_and_close: CancellationToken,
    id: SessionId,
) where
    W: AsyncWrite + Unpin,
{
    loop {
        tokio::select! {
            biased;

            next = rx.recv() => match next {
                Some(frame) => {
                    if let Err(e) = writer.write_all(&frame.to_bytes()).await {
                        debug!("session {id}: write failed: {e}");
                        return;
                    }
                }
                None => break,
            },

            _ = flush_and_close.cancelled() => {
                rx.close();
                while let Some(frame) = rx.recv().await {
                    if let Err(e) = writer.write_all(&frame.to_bytes()).await {
                        debug!("session {id}: write failed while flushing: {e}");
                        return;
                    }
                }
                break;
            }
        }
    }

    if let Err(e) = writer.shutdown().await {
        debug!("session {id}: socket shutdown failed: {e}");
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
