//! wloc-proxy - selective MITM proxy that forges Wi-Fi location answers.
//!
//! Only the location service hosts are decrypted. Their lookups are answered
//! locally with the configured coordinates; every other connection is tunneled
//! without inspection.
//!
//! ## Features
//!
//! - Generates and persists a root CA on first run
//! - Mints per-host leaf certificates on the fly
//! - Serves the CA certificate on `mitm.it` for installation
//! - Falls back to plain passthrough when no CA is usable
//! - Forwards the original request whenever a rewrite fails
//!
//! ## Architecture
//!
//! ```text
//! Client CONNECT → ConnectDecision → Location host and CA loaded?
//!                                     │
//!                   ┌─────────────────┴─────────────────┐
//!                   │ No                                │ Yes
//!                   ▼                                   ▼
//!                Tunnel                          Terminate TLS
//!                                                       │
//!                                                       ▼
//!                                               Route::classify
//!                                                       │
//!                          ┌────────────────────────────┼───────────────┐
//!                          │ CaDownload                 │ Rewrite       │ Forward
//!                          ▼                            ▼               ▼
//!                     CA certificate            Rewriter::rewrite    Origin
//!                                                       │
//!                                      ┌────────────────┴──────┐
//!                                      │ Ok                    │ Err
//!                                      ▼                       ▼
//!                               Forged response        Forward unmodified
//! ```

mod ca;
mod domains;
mod error;
mod handler;
mod proxy;

pub use ca::{generate_ca, CaManager, CaManagerError, CaMaterial};
pub use domains::{
    is_ca_download_host, is_location_host, strip_port, ConnectDecision, Route,
    CA_DOWNLOAD_HOSTS, LOCATION_HOSTS, WLOC_PATH,
};
pub use error::{ProxyError, Result};
pub use handler::{HandlerConfig, ProxyHandler};
pub use proxy::{
    start, InterceptionMode, ProxyConfig, ProxyHandle, ProxyServer, SHUTDOWN_DEADLINE,
};

/// Default proxy port.
pub const DEFAULT_PROXY_PORT: u16 = 8888;

/// Crate version reported by the CLI.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
