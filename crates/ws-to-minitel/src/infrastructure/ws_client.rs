//! WebSocket client adapter built on tokio-tungstenite.
//!
//! Supports `ws://` and `wss://` URLs.  TLS uses the platform verifier by
//! default; `--insecure` swaps in a native-tls connector that accepts any
//! certificate and host name, for self-signed development servers.

use std::time::Duration;

use async_trait::async_trait;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::{
    connect_async_tls_with_config, Connector as TlsSetup, MaybeTlsStream, WebSocketStream,
};
use tracing::{debug, warn};

use crate::application::error::TransportError;
use crate::application::ports::Connector;
use crate::domain::SessionConfig;

/// The connection type produced by [`TungsteniteConnector`].
pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Production [`Connector`].
#[derive(Clone)]
pub struct TungsteniteConnector {
    tls: Option<native_tls::TlsConnector>,
    connect_timeout: Duration,
}

impl TungsteniteConnector {
    /// # Errors
    ///
    /// [`TransportError::Tls`] if the relaxed TLS connector cannot be built.
    pub fn new(accept_invalid_certs: bool, connect_timeout: Duration) -> Result<Self, TransportError> {
        let tls = if accept_invalid_certs {
            warn!("TLS certificate validation is disabled");
            Some(
                native_tls::TlsConnector::builder()
                    .danger_accept_invalid_certs(true)
                    .danger_accept_invalid_hostnames(true)
                    .build()?,
            )
        } else {
            None
        };
        Ok(Self {
            tls,
            connect_timeout,
        })
    }

    pub fn from_config(config: &SessionConfig) -> Result<Self, TransportError> {
        Self::new(config.accept_invalid_certs, config.connect_timeout)
    }
}

#[async_trait]
impl Connector for TungsteniteConnector {
    type Stream = WsStream;

    async fn connect(&self, url: &str) -> Result<WsStream, TransportError> {
        let tls = self.tls.clone().map(TlsSetup::NativeTls);
        let handshake = connect_async_tls_with_config(url, None, false, tls);

        let (stream, response) = timeout(self.connect_timeout, handshake)
            .await
            .map_err(|_| TransportError::ConnectTimeout {
                url: url.to_string(),
                timeout: self.connect_timeout,
            })?
            .map_err(|source| TransportError::Connect {
                url: url.to_string(),
                source,
            })?;

        debug!("WebSocket handshake with {url} done (HTTP {})", response.status());
        Ok(stream)
    }
}
