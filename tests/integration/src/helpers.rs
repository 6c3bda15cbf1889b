//! Test helpers for integration tests
//!
//! Provides a relay server bound to an ephemeral port plus WebSocket client
//! shortcuts.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Result};
use futures_util::{SinkExt, StreamExt};
use paint_common::{AppConfig, RelayConfig, ServerConfig};
use paint_relay::{create_app, Registry, RelayState};
use reqwest::{Client, Response};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

/// Client side of a relay WebSocket
pub type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// How long a test waits for anything to arrive
pub const RECV_TIMEOUT: Duration = Duration::from_secs(5);

/// Test server instance that manages lifecycle
pub struct TestServer {
    pub addr: SocketAddr,
    pub client: Client,
    registry: Registry,
    _handle: JoinHandle<()>,
}

impl TestServer {
    /// Start a relay with default settings
    pub async fn start() -> Result<Self> {
        Self::start_with_relay(RelayConfig::default()).await
    }

    /// Start a relay with custom relay tuning
    pub async fn start_with_relay(relay: RelayConfig) -> Result<Self> {
        Self::start_with_config(test_config(relay, static_dir())).await
    }

    /// Start a relay with a full custom config
    pub async fn start_with_config(config: AppConfig) -> Result<Self> {
        let (registry, _registry_task) = Registry::start(&config.relay);
        let app = create_app(RelayState::new(registry.clone(), config));

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        let client = Client::builder().timeout(RECV_TIMEOUT).build()?;

        Ok(Self {
            addr,
            client,
            registry,
            _handle: handle,
        })
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Make a GET request
    pub async fn get(&self, path: &str) -> Result<Response> {
        let url = format!("{}{}", self.base_url(), path);
        Ok(self.client.get(&url).send().await?)
    }

    /// Open a WebSocket to `/ws`
    pub async fn connect(&self) -> Result<WsClient> {
        let (ws, _response) = connect_async(self.ws_url()).await?;
        Ok(ws)
    }

    /// Open `n` WebSockets and wait until the relay has registered all of them
    pub async fn connect_many(&self, n: usize) -> Result<Vec<WsClient>> {
        let mut clients = Vec::with_capacity(n);
        for _ in 0..n {
            clients.push(self.connect().await?);
        }
        self.wait_for_connections(n).await?;
        Ok(clients)
    }

    /// Poll the registry until it holds exactly `expected` connections
    pub async fn wait_for_connections(&self, expected: usize) -> Result<()> {
        let deadline = tokio::time::Instant::now() + RECV_TIMEOUT;
        loop {
            let count = self.registry.connection_count().await?;
            if count == expected {
                return Ok(());
            }
            if tokio::time::Instant::now() >= deadline {
                bail!("expected {expected} connections, registry has {count}");
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.registry.shutdown();
    }
}

/// Build a loopback config around the given relay tuning
pub fn test_config(relay: RelayConfig, static_dir: PathBuf) -> AppConfig {
    AppConfig {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            static_dir: static_dir.to_string_lossy().into_owned(),
        },
        relay,
        ..AppConfig::default()
    }
}

/// A fresh directory holding a minimal canvas page
pub fn static_dir() -> PathBuf {
    let dir = std::env::temp_dir().join(format!("paint-relay-it-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).ok();
    std::fs::write(dir.join("index.html"), INDEX_HTML).ok();
    dir
}

/// Body of the page written by [`static_dir`]
pub const INDEX_HTML: &str = "<!doctype html><canvas id=\"canvas\"></canvas>";

/// Send a text frame
pub async fn send_text(ws: &mut WsClient, text: &str) -> Result<()> {
    ws.send(Message::Text(text.to_string())).await?;
    Ok(())
}

/// Next data frame, skipping control frames
pub async fn next_data(ws: &mut WsClient) -> Result<Message> {
    loop {
        let next = tokio::time::timeout(RECV_TIMEOUT, ws.next()).await;
        match next {
            Err(_) => bail!("timed out waiting for a frame"),
            Ok(None) => bail!("connection ended"),
            Ok(Some(Err(e))) => bail!("read failed: {e}"),
            Ok(Some(Ok(Message::Ping(_) | Message::Pong(_)))) => {}
            Ok(Some(Ok(frame))) => return Ok(frame),
        }
    }
}

/// Next text frame; anything else is an error
pub async fn next_text(ws: &mut WsClient) -> Result<String> {
    match next_data(ws).await? {
        Message::Text(text) => Ok(text),
        other => bail!("expected a text frame, got {other:?}"),
    }
}

/// True if nothing but control frames arrives within `wait`
pub async fn stays_quiet(ws: &mut WsClient, wait: Duration) -> bool {
    let quiet = tokio::time::timeout(wait, async {
        loop {
            match ws.next().await {
                Some(Ok(Message::Ping(_) | Message::Pong(_))) => {}
                _ => return,
            }
        }
    })
    .await;
    quiet.is_err()
}

/// Wait until the server ends the connection
///
/// A close frame, a stream end and a reset all count.
pub async fn expect_closed(ws: &mut WsClient) -> Result<()> {
    let closed = tokio::time::timeout(RECV_TIMEOUT, async {
        loop {
            match ws.next().await {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => return,
                Some(Ok(_)) => {}
            }
        }
    })
    .await;
    if closed.is_err() {
        bail!("connection stayed open");
    }
    Ok(())
}
