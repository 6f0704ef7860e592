//! End-to-end tests: a real TCP listener driven by the peer-side client

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use vcalc::core::message::AuthRequest;
use vcalc::core::product::{SATURATED_NEGATIVE, SATURATED_POSITIVE};
use vcalc::credentials::CredentialDb;
use vcalc::error::{ErrorKind, ProtocolError};
use vcalc::protocol::events::TracingSink;
use vcalc::protocol::verifier;
use vcalc::utils::metrics::Metrics;
use vcalc::{Client, Server, SessionContext};

const ZERO_SALT: [u8; 8] = [0; 8];

struct Running {
    addr: SocketAddr,
    metrics: Arc<Metrics>,
    shutdown: mpsc::Sender<()>,
    handle: JoinHandle<vcalc::Result<()>>,
}

impl Running {
    async fn stop(self) -> Arc<Metrics> {
        self.shutdown.send(()).await.unwrap();
        tokio::time::timeout(Duration::from_secs(5), self.handle)
            .await
            .expect("server stops")
            .expect("server task")
            .expect("server result");
        self.metrics
    }
}

async fn start_server() -> Running {
    let db = CredentialDb::parse("user:P@ssw0rd\nanon:other\n");
    let metrics = Arc::new(Metrics::new());
    let ctx = SessionContext::new(
        Arc::new(db),
        Arc::new((TracingSink, metrics.clone())),
        "user",
    );

    let server = Server::bind("127.0.0.1:0", ctx)
        .await
        .expect("bind")
        .with_metrics(metrics.clone());
    let addr = server.local_addr().unwrap();

    let (shutdown, rx) = mpsc::channel(1);
    let handle = tokio::spawn(server.run_with_shutdown(rx));

    Running {
        addr,
        metrics,
        shutdown,
        handle,
    }
}

async fn client(addr: SocketAddr) -> Client {
    Client::connect(&addr.to_string())
        .await
        .expect("connect")
        .with_response_timeout(Duration::from_secs(5))
}

#[tokio::test]
async fn test_full_exchange() {
    let server = start_server().await;

    let mut client = client(server.addr).await;
    client.authenticate("user", "P@ssw0rd").await.expect("auth");
    let results = client
        .compute(vec![vec![2.0, 3.0, 4.0], vec![], vec![1.0, 0.0, 5.0]])
        .await
        .expect("results");
    assert_eq!(results, vec![24.0, 0.0, 0.0]);

    let snapshot = server.stop().await.snapshot();
    assert_eq!(snapshot.sessions_completed, 1);
    assert_eq!(snapshot.auth_success, 1);
    assert_eq!(snapshot.vectors_processed, 3);
}

#[tokio::test]
async fn test_saturation_over_tcp() {
    let server = start_server().await;

    let mut client = client(server.addr).await;
    client
        .authenticate_with_salt("user", "P@ssw0rd", ZERO_SALT)
        .await
        .expect("auth");
    let results = client
        .compute(vec![vec![1e300, 1e300], vec![-1e300, 1e300], vec![1.5]])
        .await
        .unwrap();
    assert_eq!(results, vec![SATURATED_POSITIVE, SATURATED_NEGATIVE, 1.5]);

    let snapshot = server.stop().await.snapshot();
    assert_eq!(snapshot.saturations, 2);
}

#[tokio::test]
async fn test_wrong_secret_is_denied() {
    let server = start_server().await;

    let mut client = client(server.addr).await;
    let err = client
        .authenticate("user", "wrong")
        .await
        .expect_err("must be denied");
    assert!(matches!(err, ProtocolError::AuthDenied));
    assert_eq!(err.kind(), ErrorKind::Authentication);

    let snapshot = server.stop().await.snapshot();
    assert_eq!(snapshot.auth_failed, 1);
    assert_eq!(snapshot.sessions_failed, 1);
}

#[tokio::test]
async fn test_login_outside_configuration_is_denied() {
    let server = start_server().await;

    // "anon" has credentials but is not the accepted login.
    let mut client = client(server.addr).await;
    let err = client.authenticate("anon", "other").await.unwrap_err();
    assert!(matches!(err, ProtocolError::AuthDenied));

    let snapshot = server.stop().await.snapshot();
    assert_eq!(snapshot.auth_malformed, 1);
}

#[tokio::test]
async fn test_raw_malformed_message_gets_err() {
    let server = start_server().await;

    let mut stream = TcpStream::connect(server.addr).await.unwrap();
    stream.write_all(b"hello").await.unwrap();

    let mut reply = Vec::new();
    stream.read_to_end(&mut reply).await.unwrap();
    assert_eq!(reply, b"ERR");

    server.stop().await;
}

#[tokio::test]
async fn test_failed_session_does_not_stop_server() {
    let server = start_server().await;

    // Authenticate by hand, then vanish halfway through a two-vector batch.
    {
        let request = AuthRequest::new(
            "user",
            &hex::encode_upper(ZERO_SALT),
            &verifier::expected_hash(&ZERO_SALT, "P@ssw0rd"),
        )
        .unwrap();
        let mut stream = TcpStream::connect(server.addr).await.unwrap();
        stream.write_all(&request.to_bytes()).await.unwrap();

        let mut reply = [0u8; 2];
        stream.read_exact(&mut reply).await.unwrap();
        assert_eq!(&reply, b"OK");

        stream.write_all(&[0, 0, 0, 2, 0, 0, 0, 0]).await.unwrap();
    }

    let mut client = client(server.addr).await;
    client.authenticate("user", "P@ssw0rd").await.unwrap();
    let results = client.compute(vec![vec![-2.0, 4.0]]).await.unwrap();
    assert_eq!(results, vec![-8.0]);

    let snapshot = server.stop().await.snapshot();
    assert_eq!(snapshot.sessions_completed, 1);
    assert_eq!(snapshot.sessions_failed, 1);
    assert_eq!(snapshot.transport_errors, 1);
}

#[tokio::test]
async fn test_sessions_are_served_one_after_another() {
    let server = start_server().await;

    for i in 1..=3 {
        let mut client = client(server.addr).await;
        client.authenticate("user", "P@ssw0rd").await.unwrap();
        let results = client.compute(vec![vec![f64::from(i), 2.0]]).await.unwrap();
        assert_eq!(results, vec![f64::from(i) * 2.0]);
    }

    let snapshot = server.stop().await.snapshot();
    assert_eq!(snapshot.sessions_total, 3);
    assert_eq!(snapshot.sessions_completed, 3);
}

#[tokio::test]
async fn test_empty_batch_gets_empty_results() {
    let server = start_server().await;

    let mut client = client(server.addr).await;
    client.authenticate("user", "P@ssw0rd").await.unwrap();
    assert!(client.compute(Vec::new()).await.unwrap().is_empty());

    server.stop().await;
}
