//! Peer-side client: authenticate, submit one batch, read the results.

use crate::core::codec::ResultCodec;
use crate::core::message::{AuthRequest, REPLY_ERR, REPLY_OK, SALT_LEN};
use crate::core::{ResultSet, VectorBatch};
use crate::error::{ProtocolError, Result};
use crate::protocol::verifier;
use futures::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_util::codec::Framed;
use tracing::{debug, instrument};

/// Default wait for a server reply.
pub const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_secs(30);

pub struct Client<S = TcpStream> {
    stream: S,
    response_timeout: Duration,
}

impl Client<TcpStream> {
    #[instrument]
    pub async fn connect(address: &str) -> Result<Self> {
        let stream = TcpStream::connect(address).await?;
        Ok(Self::new(stream))
    }
}

impl<S> Client<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            response_timeout: DEFAULT_RESPONSE_TIMEOUT,
        }
    }

    pub fn with_response_timeout(mut self, response_timeout: Duration) -> Self {
        self.response_timeout = response_timeout;
        self
    }

    /// Authenticate with a fresh random salt.
    pub async fn authenticate(&mut self, login: &str, secret: &str) -> Result<()> {
        let salt = rand::random::<u64>().to_be_bytes();
        self.authenticate_with_salt(login, secret, salt).await
    }

    #[instrument(skip(self, secret, salt))]
    pub async fn authenticate_with_salt(
        &mut self,
        login: &str,
        secret: &str,
        salt: [u8; SALT_LEN],
    ) -> Result<()> {
        let request = AuthRequest::new(
            login,
            &hex::encode_upper(salt),
            &verifier::expected_hash(&salt, secret),
        )?;

        self.stream.write_all(&request.to_bytes()).await?;
        self.stream.flush().await?;

        let reply = timeout(self.response_timeout, self.read_reply())
            .await
            .map_err(|_| ProtocolError::Timeout)??;

        match reply.as_slice() {
            r if r == REPLY_OK => {
                debug!("Authenticated");
                Ok(())
            }
            r if r == REPLY_ERR => Err(ProtocolError::AuthDenied),
            [] => Err(ProtocolError::ConnectionClosed),
            other => Err(ProtocolError::UnexpectedReply(other.to_vec())),
        }
    }

    /// Collect reply bytes until they spell `OK`, reach `ERR`'s length, stop
    /// being a prefix of either, or the server closes.
    async fn read_reply(&mut self) -> Result<Vec<u8>> {
        let mut reply = [0u8; 3];
        let mut filled = 0;

        while filled < reply.len() {
            let n = self.stream.read(&mut reply[filled..]).await?;
            if n == 0 {
                break;
            }
            filled += n;

            let got = &reply[..filled];
            if got == REPLY_OK || !(REPLY_OK.starts_with(got) || REPLY_ERR.starts_with(got)) {
                break;
            }
        }

        Ok(reply[..filled].to_vec())
    }

    /// Submit a batch and wait for its results. The server closes the
    /// connection afterwards.
    #[instrument(skip(self, batch), fields(vectors = batch.len()))]
    pub async fn compute(&mut self, batch: VectorBatch) -> Result<ResultSet> {
        let mut framed = Framed::new(&mut self.stream, ResultCodec);
        framed.send(batch).await?;

        timeout(self.response_timeout, framed.next())
            .await
            .map_err(|_| ProtocolError::Timeout)?
            .ok_or(ProtocolError::ConnectionClosed)?
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::core::message::AUTH_MESSAGE_LEN;
    use tokio::io::duplex;

    /// Answer the auth message in separate writes, then either hang up or
    /// wait for the client to go away.
    async fn authenticate_against(chunks: &'static [&'static [u8]], close: bool) -> Result<()> {
        let (client_side, mut server_side) = duplex(1024);
        let server = tokio::spawn(async move {
            let mut request = [0u8; AUTH_MESSAGE_LEN];
            server_side.read_exact(&mut request).await.unwrap();
            for chunk in chunks {
                server_side.write_all(chunk).await.unwrap();
                server_side.flush().await.unwrap();
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
            if !close {
                let _ = server_side.read(&mut [0u8; 1]).await;
            }
        });

        let mut client = Client::new(client_side).with_response_timeout(Duration::from_secs(5));
        let result = client.authenticate("user", "P@ssw0rd").await;
        drop(client);
        server.await.unwrap();
        result
    }

    #[tokio::test]
    async fn test_err_split_across_writes_is_denied() {
        let err = authenticate_against(&[b"E", b"RR"], false)
            .await
            .unwrap_err();
        assert!(matches!(err, ProtocolError::AuthDenied));
    }

    #[tokio::test]
    async fn test_ok_split_across_writes_is_accepted() {
        authenticate_against(&[b"O", b"K"], false).await.unwrap();
    }

    #[tokio::test]
    async fn test_foreign_reply_fails_without_waiting() {
        let err = authenticate_against(&[b"X"], false).await.unwrap_err();
        assert!(matches!(err, ProtocolError::UnexpectedReply(ref r) if r == b"X"));
    }

    #[tokio::test]
    async fn test_truncated_reply_then_close() {
        let err = authenticate_against(&[b"ER"], true).await.unwrap_err();
        assert!(matches!(err, ProtocolError::UnexpectedReply(ref r) if r == b"ER"));

        let err = authenticate_against(&[], true).await.unwrap_err();
        assert!(matches!(err, ProtocolError::ConnectionClosed));
    }
}
