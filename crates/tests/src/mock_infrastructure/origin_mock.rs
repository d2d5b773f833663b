//! Mock upstream origins.
//!
//! Wraps mockito for status/body mocks and hand-rolls a TCP listener that
//! accepts connections without ever answering, which is the only reliable way
//! to exercise the multiplexer's timeout path.

use mockito::{Mock, Server, ServerGuard};

/// Builder for mock upstream origins.
///
/// Uses mockito internally but provides gateway-specific helpers.
pub struct OriginMock {
    server: ServerGuard,
    mocks: Vec<Mock>,
}

impl OriginMock {
    /// Creates a new origin mock with a fresh mockito server.
    pub async fn new() -> Self {
        Self {
            server: Server::new_async().await,
            mocks: Vec::new(),
        }
    }

    /// Returns the URL of the mock origin.
    #[must_use]
    pub fn url(&self) -> String {
        self.server.url()
    }

    /// Mocks `GET /` with the given status and body.
    pub fn mock_get(&mut self, status: usize, body: &str) -> &mut Self {
        let mock = self
            .server
            .mock("GET", "/")
            .with_status(status)
            .with_body(body)
            .create();

        self.mocks.push(mock);
        self
    }

    /// Mocks `GET /` with an extra response header.
    pub fn mock_get_with_header(
        &mut self,
        status: usize,
        header: (&str, &str),
        body: &str,
    ) -> &mut Self {
        let mock = self
            .server
            .mock("GET", "/")
            .with_status(status)
            .with_header(header.0, header.1)
            .with_body(body)
            .create();

        self.mocks.push(mock);
        self
    }
}

/// Binds a local listener that accepts connections but never writes a
/// response, and returns its URL. The accept loop lives on a spawned task
/// that ends with the test runtime.
pub async fn hung_origin() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind hung origin");
    let addr = listener.local_addr().expect("local addr");

    tokio::spawn(async move {
        let mut sockets = Vec::new();
        loop {
            match listener.accept().await {
                // Hold the socket open so the client keeps waiting.
                Ok((socket, _)) => sockets.push(socket),
                Err(_) => break,
            }
        }
    });

    format!("http://{addr}/")
}
