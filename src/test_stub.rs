//! Local HTTP stand-ins for the external services, used by client unit tests.

use axum::Router;
use tokio::net::TcpListener;

/// Mock upstream serving `router` on an ephemeral port.
pub(crate) struct StubServer {
    addr: String,
}

impl StubServer {
    pub(crate) async fn start(router: Router) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        Self {
            addr: format!("http://{}:{}", addr.ip(), addr.port()),
        }
    }

    /// Absolute URL for `path` on the stub.
    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{path}", self.addr)
    }
}
