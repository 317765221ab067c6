//! The UDP acceptor (spec §4.5, §6): binds the listen socket, reads
//! datagrams in a loop, and spawns one pipeline task per datagram. Grounded
//! on `original_source/names.go::Server.serve`, which polls with a 1-second
//! read deadline so it can notice a closed stop channel between packets —
//! reworked here onto `tokio::select!` against a `CancellationToken`, the
//! idiomatic async equivalent of that same "poll with a bounded wait"
//! pattern.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;

use crate::errors::IoError;
use crate::pipeline::Pipeline;

/// Maximum size of an inbound UDP datagram this binary will read (spec §6:
/// "1024-byte inbound buffer").
const MAX_DATAGRAM: usize = 1024;

/// Binds `addr` and serves UDP DNS queries through `pipeline` until
/// `shutdown` is cancelled. Each datagram is handled on its own spawned
/// task so one slow upstream race never blocks the next query from being
/// read off the socket (spec §5: "no head-of-line blocking across
/// independent queries").
pub async fn serve(addr: SocketAddr, pipeline: Arc<Pipeline>, shutdown: CancellationToken) -> Result<(), IoError> {
    let socket = Arc::new(UdpSocket::bind(addr).await.map_err(IoError::Bind)?);
    tracing::info!(%addr, "listening for DNS queries");

    let mut buf = vec![0u8; MAX_DATAGRAM];
    loop {
        let (len, src) = tokio::select! {
            _ = shutdown.cancelled() => {
                tracing::info!("shutdown signal received, closing listener");
                break;
            }
            result = socket.recv_from(&mut buf) => {
                match result {
                    Ok(v) => v,
                    Err(source) => {
                        let e = IoError::Read(source);
                        tracing::warn!(error = %e, "read from socket failed");
                        continue;
                    }
                }
            }
        };

        let datagram = buf[..len].to_vec();
        let socket = socket.clone();
        let pipeline = pipeline.clone();
        tokio::spawn(async move {
            let (reply, outcome) = pipeline.handle(&datagram).await;
            tracing::debug!(?outcome, %src, "query handled");
            if let Some(reply) = reply {
                if let Err(source) = socket.send_to(&reply, src).await {
                    let e = IoError::Write(source);
                    tracing::warn!(error = %e, %src, "failed to write reply");
                }
            }
        });
    }

    Ok(())
}

/// Installs SIGINT/SIGTERM handlers that cancel `token` on first signal
/// (spec §6: "SIGINT and SIGTERM both trigger a graceful shutdown"). On
/// platforms without `tokio::signal::unix` this degrades to SIGINT only.
pub async fn wait_for_shutdown_signal(token: CancellationToken) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigint = match signal(SignalKind::interrupt()) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(error = %e, "failed to install SIGINT handler");
                return;
            }
        };
        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(error = %e, "failed to install SIGTERM handler");
                return;
            }
        };
        tokio::select! {
            _ = sigint.recv() => tracing::info!("received SIGINT"),
            _ = sigterm.recv() => tracing::info!("received SIGTERM"),
        }
        token.cancel();
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
        token.cancel();
    }
}
