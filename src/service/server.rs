//! Sequential TCP accept loop.
//!
//! One connection is served from authentication to result delivery before the
//! next `accept`. A shutdown request is only observed between sessions; a
//! session blocked in a read is never interrupted.

use crate::error::Result;
use crate::protocol::events::SessionEvent;
use crate::protocol::session::{Session, SessionContext};
use crate::utils::metrics::Metrics;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tracing::{error, info, instrument, warn};

pub struct Server {
    listener: TcpListener,
    ctx: SessionContext,
    metrics: Option<Arc<Metrics>>,
}

impl Server {
    /// Bind the listening socket.
    #[instrument(skip(ctx))]
    pub async fn bind(address: &str, ctx: SessionContext) -> Result<Self> {
        let listener = TcpListener::bind(address).await?;
        info!(address = %listener.local_addr()?, "Listening");
        Ok(Self {
            listener,
            ctx,
            metrics: None,
        })
    }

    /// Log a metrics snapshot when the server stops. The same instance should
    /// be part of the context's event sink for the counters to move.
    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Serve until CTRL+C.
    pub async fn run(self) -> Result<()> {
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>(1);

        tokio::spawn(async move {
            if let Ok(()) = tokio::signal::ctrl_c().await {
                info!("Received CTRL+C signal, shutting down");
                let _ = shutdown_tx.send(()).await;
            }
        });

        self.run_with_shutdown(shutdown_rx).await
    }

    /// Serve until a message arrives on `shutdown_rx` or every sender is dropped.
    pub async fn run_with_shutdown(self, mut shutdown_rx: mpsc::Receiver<()>) -> Result<()> {
        loop {
            let (stream, peer) = tokio::select! {
                _ = shutdown_rx.recv() => {
                    info!("Shutting down server");
                    break;
                }
                accepted = self.listener.accept() => match accepted {
                    Ok(conn) => conn,
                    Err(e) => {
                        error!(error = %e, "Error accepting connection");
                        continue;
                    }
                },
            };

            self.serve(stream, peer).await;
        }

        if let Some(metrics) = &self.metrics {
            metrics.log_metrics();
        }
        Ok(())
    }

    #[instrument(skip(self, stream), fields(peer = %peer))]
    async fn serve(&self, stream: TcpStream, peer: SocketAddr) {
        self.ctx.sink().record(&SessionEvent::Connected {
            peer: peer.to_string(),
        });

        match Session::new(stream, self.ctx.clone()).run().await {
            Ok(summary) => info!(
                vectors = summary.vectors,
                saturated = summary.saturated,
                "Session complete"
            ),
            Err(e) => warn!(error = %e, kind = ?e.kind(), "Session failed"),
        }
    }
}
