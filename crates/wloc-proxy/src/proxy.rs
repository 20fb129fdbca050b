//! Location spoofing proxy server.
//!
//! Wraps a hudsucker proxy with the interception handler and provides the
//! start/stop lifecycle used by embedders.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use hudsucker::certificate_authority::RcgenAuthority;
use hudsucker::rustls::crypto::aws_lc_rs::default_provider;
use hudsucker::Proxy;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use wloc_core::{Rewriter, SpoofConfig};

use crate::ca::{generate_ca, CaMaterial};
use crate::error::{ProxyError, Result};
use crate::handler::{HandlerConfig, ProxyHandler};
use crate::DEFAULT_PROXY_PORT;

/// How long [`ProxyHandle::stop`] waits for in-flight exchanges.
pub const SHUTDOWN_DEADLINE: Duration = Duration::from_secs(5);

/// Whether the proxy can terminate TLS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InterceptionMode {
    /// Location service traffic is intercepted.
    Mitm,
    /// No usable CA; every connection is tunneled.
    Passthrough {
        /// Why interception is unavailable.
        reason: String,
    },
}

impl InterceptionMode {
    /// Returns true if TLS interception is active.
    pub fn is_mitm(&self) -> bool {
        matches!(self, Self::Mitm)
    }
}

impl std::fmt::Display for InterceptionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Mitm => write!(f, "mitm"),
            Self::Passthrough { reason } => write!(f, "passthrough ({})", reason),
        }
    }
}

/// Proxy server configuration.
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    /// Address to bind the proxy to.
    pub addr: SocketAddr,
    /// CA material. `None` runs the proxy in passthrough mode.
    pub ca: Option<CaMaterial>,
    /// Spoofing configuration, fixed for the lifetime of the server.
    pub spoof: SpoofConfig,
}

impl ProxyConfig {
    /// Creates a configuration listening on the default loopback port.
    pub fn new(spoof: SpoofConfig) -> Self {
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], DEFAULT_PROXY_PORT)),
            ca: None,
            spoof,
        }
    }

    /// Sets the listen address.
    pub fn with_addr(mut self, addr: SocketAddr) -> Self {
        self.addr = addr;
        self
    }

    /// Sets the port (uses 127.0.0.1 as host).
    pub fn with_port(mut self, port: u16) -> Self {
        self.addr = SocketAddr::from(([127, 0, 0, 1], port));
        self
    }

    /// Sets the CA material.
    pub fn with_ca(mut self, ca: CaMaterial) -> Self {
        self.ca = Some(ca);
        self
    }

    /// Sets the spoofing configuration.
    pub fn with_spoof(mut self, spoof: SpoofConfig) -> Self {
        self.spoof = spoof;
        self
    }
}

/// Location spoofing proxy.
pub struct ProxyServer {
    config: ProxyConfig,
}

impl ProxyServer {
    /// Creates a new proxy server with the given configuration.
    pub fn new(config: ProxyConfig) -> Self {
        Self { config }
    }

    /// Returns the address the proxy is configured to listen on.
    pub fn addr(&self) -> SocketAddr {
        self.config.addr
    }

    /// Resolves the certificate authority and the resulting mode.
    ///
    /// Without usable CA material an ephemeral authority is created so the
    /// proxy can still be built; it never signs anything because every
    /// connection is tunneled.
    fn authority(&self) -> Result<(RcgenAuthority, Option<Arc<str>>, InterceptionMode)> {
        let failure = match &self.config.ca {
            Some(ca) => match ca.authority() {
                Ok(authority) => {
                    let pem: Arc<str> = Arc::from(ca.download_pem());
                    return Ok((authority, Some(pem), InterceptionMode::Mitm));
                }
                Err(e) => format!("CA could not be loaded: {}", e),
            },
            None => "no CA material provided".to_string(),
        };

        tracing::warn!("MITM disabled, running as plain passthrough: {}", failure);
        let placeholder = generate_ca()?.authority()?;
        Ok((
            placeholder,
            None,
            InterceptionMode::Passthrough { reason: failure },
        ))
    }

    /// Binds the listener and starts serving in the background.
    pub async fn start(self) -> Result<ProxyHandle> {
        let (authority, ca_cert_pem, mode) = self.authority()?;

        let listener = TcpListener::bind(self.config.addr).await?;
        let addr = listener.local_addr()?;

        let handler = ProxyHandler::new(HandlerConfig {
            rewriter: Arc::new(Rewriter::new(self.config.spoof)),
            ca_cert_pem,
        });

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let proxy = Proxy::builder()
            .with_listener(listener)
            .with_ca(authority)
            .with_rustls_connector(default_provider())
            .with_http_handler(handler)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            })
            .build()
            .map_err(|e| ProxyError::Proxy(e.to_string()))?;

        if self.config.spoof.enabled {
            tracing::info!(
                "Location spoofing configured for {}",
                self.config.spoof.coordinates
            );
        }
        tracing::info!("Starting location proxy on {} ({})", addr, mode);

        let handle = tokio::spawn(async move {
            if let Err(e) = proxy.start().await {
                tracing::error!("Proxy error: {}", e);
            }
            tracing::info!("Proxy server stopped");
        });

        Ok(ProxyHandle {
            shutdown_tx,
            addr,
            mode,
            handle,
        })
    }
}

/// Starts a proxy for `config`.
pub async fn start(config: ProxyConfig) -> Result<ProxyHandle> {
    ProxyServer::new(config).start().await
}

/// Handle for controlling a running proxy server.
pub struct ProxyHandle {
    shutdown_tx: oneshot::Sender<()>,
    addr: SocketAddr,
    mode: InterceptionMode,
    handle: tokio::task::JoinHandle<()>,
}

impl std::fmt::Debug for ProxyHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyHandle")
            .field("addr", &self.addr)
            .field("mode", &self.mode)
            .finish()
    }
}

impl ProxyHandle {
    /// Returns the address the proxy is listening on.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Returns whether interception is active.
    pub fn mode(&self) -> &InterceptionMode {
        &self.mode
    }

    /// Stops accepting connections and waits up to [`SHUTDOWN_DEADLINE`] for
    /// in-flight exchanges before force-closing them.
    pub async fn stop(self) -> Result<()> {
        self.stop_within(SHUTDOWN_DEADLINE).await
    }

    /// Like [`stop`](Self::stop) with a custom deadline.
    pub async fn stop_within(self, deadline: Duration) -> Result<()> {
        let _ = self.shutdown_tx.send(());

        let mut handle = self.handle;
        match tokio::time::timeout(deadline, &mut handle).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(ProxyError::Proxy(e.to_string())),
            Err(_) => {
                tracing::warn!("Graceful shutdown timed out after {:?}, aborting", deadline);
                handle.abort();
                Err(ProxyError::ShutdownTimeout(deadline))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wloc_core::Coordinates;

    fn spoof() -> SpoofConfig {
        SpoofConfig::new(Coordinates::new(51.510_420, -3.218_306).unwrap())
    }

    fn test_config() -> ProxyConfig {
        ProxyConfig::new(spoof()).with_port(0)
    }

    #[test]
    fn proxy_config_defaults() {
        let config = ProxyConfig::new(spoof());
        assert_eq!(config.addr.port(), DEFAULT_PROXY_PORT);
        assert!(config.addr.ip().is_loopback());
        assert!(config.ca.is_none());
    }

    #[test]
    fn proxy_config_with_port() {
        let config = test_config().with_port(9999);
        assert_eq!(config.addr.port(), 9999);
    }

    #[test]
    fn proxy_config_with_addr() {
        let addr = SocketAddr::from(([0, 0, 0, 0], 9999));
        let config = test_config().with_addr(addr);
        assert_eq!(config.addr, addr);
    }

    #[test]
    fn proxy_config_with_spoof() {
        let config = test_config().with_spoof(SpoofConfig::disabled());
        assert!(!config.spoof.enabled);
    }

    #[test]
    fn mode_display() {
        assert_eq!(InterceptionMode::Mitm.to_string(), "mitm");
        let degraded = InterceptionMode::Passthrough {
            reason: "no CA".into(),
        };
        assert_eq!(degraded.to_string(), "passthrough (no CA)");
        assert!(!degraded.is_mitm());
    }

    #[tokio::test]
    async fn start_with_ca_is_mitm() {
        let config = test_config().with_ca(generate_ca().unwrap());
        let handle = start(config).await.unwrap();

        assert!(handle.mode().is_mitm());
        assert_ne!(handle.addr().port(), 0);
        handle.stop().await.unwrap();
    }

    #[tokio::test]
    async fn start_without_ca_is_passthrough() {
        let handle = start(test_config()).await.unwrap();

        assert!(matches!(
            handle.mode(),
            InterceptionMode::Passthrough { .. }
        ));
        handle.stop().await.unwrap();
    }

    #[tokio::test]
    async fn start_fails_when_port_taken() {
        let first = start(test_config()).await.unwrap();
        let taken = ProxyConfig::new(spoof()).with_addr(first.addr());

        assert!(matches!(start(taken).await, Err(ProxyError::Io(_))));
        first.stop().await.unwrap();
    }
}
