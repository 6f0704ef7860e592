//! Connection session: one peer, one pass through the protocol.
//!
//! ```text
//! AwaitingAuth --OK--> AwaitingVectorCount --> ReceivingVectors --> SendingResults --> Done
//!      |ERR                   |                      |                    |
//!      +----------------------+----------------------+--------------------+--> Failed
//! ```
//!
//! Every error edge is terminal. Format and credential failures are answered
//! with `ERR`; transport failures get no reply. No partial result set is ever
//! written.

use crate::core::codec::VectorCodec;
use crate::core::message::{AuthRequest, REPLY_ERR, REPLY_OK};
use crate::core::product;
use crate::core::{ResultSet, VectorBatch};
use crate::credentials::CredentialStore;
use crate::error::{ErrorKind, ProtocolError, Result};
use crate::protocol::events::{EventSink, SessionEvent};
use crate::protocol::verifier;
use crate::utils::metrics::Timer;
use futures::{SinkExt, StreamExt};
use std::fmt;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::codec::Framed;
use tracing::{debug, instrument};

/// Bytes accepted by the single read that carries the authentication message.
pub const AUTH_READ_BUFFER: usize = 1024;

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    AwaitingAuth,
    AwaitingVectorCount,
    ReceivingVectors,
    SendingResults,
    Done,
    Failed,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Done | SessionState::Failed)
    }
}

/// Collaborators shared by every session a server runs.
#[derive(Clone)]
pub struct SessionContext {
    store: Arc<dyn CredentialStore>,
    sink: Arc<dyn EventSink>,
    accepted_login: Arc<str>,
}

impl SessionContext {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        sink: Arc<dyn EventSink>,
        accepted_login: impl Into<Arc<str>>,
    ) -> Self {
        Self {
            store,
            sink,
            accepted_login: accepted_login.into(),
        }
    }

    pub fn accepted_login(&self) -> &str {
        &self.accepted_login
    }

    pub fn sink(&self) -> &dyn EventSink {
        self.sink.as_ref()
    }
}

impl fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionContext")
            .field("accepted_login", &self.accepted_login)
            .finish_non_exhaustive()
    }
}

/// What a successful session produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionSummary {
    /// Vectors received and answered.
    pub vectors: usize,
    /// Results that were saturation sentinels.
    pub saturated: usize,
}

/// A single connection driven from authentication to the result frame.
pub struct Session<S> {
    stream: S,
    ctx: SessionContext,
    state: SessionState,
}

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S, ctx: SessionContext) -> Self {
        Self {
            stream,
            ctx,
            state: SessionState::AwaitingAuth,
        }
    }

    /// Run the session to a terminal state. Consumes the session; the stream
    /// is shut down and dropped on return.
    #[instrument(skip(self), name = "session")]
    pub async fn run(mut self) -> Result<SessionSummary> {
        let result = self.drive().await;

        let outcome = match &result {
            Ok(_) => SessionState::Done,
            Err(e) => {
                if e.warrants_reply() {
                    self.reject().await;
                } else if e.kind() == ErrorKind::Transport {
                    self.ctx.sink.record(&SessionEvent::TransportFailed {
                        state: self.state,
                        error: e.to_string(),
                    });
                }
                SessionState::Failed
            }
        };
        self.state = outcome;

        if let Err(e) = self.stream.shutdown().await {
            debug!(error = %e, "Stream shutdown failed");
        }
        self.ctx.sink.record(&SessionEvent::Closed { outcome });

        result
    }

    async fn drive(&mut self) -> Result<SessionSummary> {
        self.authenticate().await?;

        let mut framed = Framed::new(&mut self.stream, VectorCodec::new());

        self.state = SessionState::AwaitingVectorCount;
        let batch = match framed.next().await {
            Some(Ok(batch)) => batch,
            Some(Err(e)) => {
                if framed.codec().in_progress() {
                    self.state = SessionState::ReceivingVectors;
                }
                return Err(e);
            }
            None => return Err(ProtocolError::ConnectionClosed),
        };

        self.state = SessionState::ReceivingVectors;
        self.ctx.sink.record(&SessionEvent::BatchReceived {
            vectors: batch.len(),
        });
        let (results, saturated) = compute(&batch, self.ctx.sink.as_ref());

        self.state = SessionState::SendingResults;
        let vectors = results.len();
        framed.send(results).await?;
        self.ctx
            .sink
            .record(&SessionEvent::ResultsSent { results: vectors });

        Ok(SessionSummary { vectors, saturated })
    }

    async fn authenticate(&mut self) -> Result<()> {
        let mut buf = [0u8; AUTH_READ_BUFFER];
        let n = self.stream.read(&mut buf).await?;
        if n == 0 {
            return Err(ProtocolError::ConnectionClosed);
        }

        let request = match AuthRequest::parse(&buf[..n], &self.ctx.accepted_login) {
            Ok(request) => request,
            Err(reason) => {
                self.ctx.sink.record(&SessionEvent::AuthMalformed {
                    reason: reason.clone(),
                });
                return Err(reason.into());
            }
        };

        self.ctx.sink.record(&SessionEvent::AuthAttempt {
            login: request.login().to_owned(),
            salt: request.salt().to_owned(),
            hash_prefix: request.redacted_hash(),
        });

        if let Err(reason) = verifier::check(
            self.ctx.store.as_ref(),
            request.login(),
            request.salt(),
            request.claimed_hash(),
        ) {
            self.ctx.sink.record(&SessionEvent::AuthFailed {
                login: request.login().to_owned(),
                reason,
            });
            return Err(reason.into());
        }

        write_reply(&mut self.stream, REPLY_OK).await?;
        self.ctx.sink.record(&SessionEvent::Authenticated {
            login: request.login().to_owned(),
        });
        Ok(())
    }

    /// Best-effort `ERR`; the session fails whether or not it is delivered.
    async fn reject(&mut self) {
        if let Err(e) = write_reply(&mut self.stream, REPLY_ERR).await {
            debug!(error = %e, "Could not deliver ERR reply");
        }
    }
}

async fn write_reply<W: AsyncWrite + Unpin>(stream: &mut W, reply: &[u8]) -> std::io::Result<()> {
    stream.write_all(reply).await?;
    stream.flush().await
}

/// Multiply every vector, reporting saturated results to the sink.
fn compute(batch: &VectorBatch, sink: &dyn EventSink) -> (ResultSet, usize) {
    let _timer = Timer::start("compute_batch");
    let mut saturated = 0;

    let results = batch
        .iter()
        .enumerate()
        .map(|(index, vector)| {
            let outcome = product::evaluate(vector);
            if outcome.is_saturated() {
                saturated += 1;
                sink.record(&SessionEvent::Saturated {
                    index,
                    value: outcome.value(),
                });
            }
            outcome.value()
        })
        .collect();

    (results, saturated)
}
