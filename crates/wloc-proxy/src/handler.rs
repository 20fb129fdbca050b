//! HTTP handler for the location spoofing proxy.
//!
//! Makes the CONNECT-level interception decision and routes requests on
//! intercepted and plain HTTP connections.

use std::future::Future;
use std::sync::Arc;

use http_body_util::{BodyExt, Full};
use hudsucker::{
    hyper::{header, Request, Response, StatusCode},
    Body, HttpContext, HttpHandler, RequestOrResponse,
};
use hyper::body::Bytes;
use wloc_core::Rewriter;

use crate::domains::{strip_port, ConnectDecision, Route};

/// Content type of forged location responses.
const LOCATION_CONTENT_TYPE: &str = "application/octet-stream";

/// Content type and disposition of the CA certificate download.
const CA_CONTENT_TYPE: &str = "application/x-x509-ca-cert";
const CA_CONTENT_DISPOSITION: &str = "attachment; filename=mitm-ca.crt";

/// Bytes of a request body logged at debug level.
const BODY_PREVIEW_LEN: usize = 50;

/// Helper to convert bytes to Body
fn bytes_to_body(bytes: Bytes) -> Body {
    Body::from(Full::new(bytes))
}

/// Handler configuration.
#[derive(Clone)]
pub struct HandlerConfig {
    /// Rewrite pipeline, shared read-only by all connections.
    pub rewriter: Arc<Rewriter>,
    /// CA certificate served to clients. `None` disables interception.
    pub ca_cert_pem: Option<Arc<str>>,
}

impl std::fmt::Debug for HandlerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerConfig")
            .field("spoofing", &self.rewriter.is_enabled())
            .field("mitm", &self.ca_cert_pem.is_some())
            .finish()
    }
}

/// HTTP handler for the MITM proxy.
#[derive(Clone, Debug)]
pub struct ProxyHandler {
    config: HandlerConfig,
}

impl ProxyHandler {
    /// Creates a new proxy handler with the given configuration.
    pub fn new(config: HandlerConfig) -> Self {
        Self { config }
    }

    /// Returns true if TLS interception is available.
    pub fn mitm_available(&self) -> bool {
        self.config.ca_cert_pem.is_some()
    }

    /// Decides whether a CONNECT to `authority` is intercepted.
    pub fn connect_decision(&self, authority: &str) -> ConnectDecision {
        ConnectDecision::for_authority(authority, self.mitm_available())
    }

    /// Routes a request, taking the proxy's capabilities into account.
    pub fn route(&self, req: &Request<Body>) -> Route {
        let Some(host) = Self::extract_host(req) else {
            return Route::Forward;
        };
        match Route::classify(req.method(), &host, req.uri().path()) {
            Route::CaDownload if !self.mitm_available() => Route::Forward,
            Route::Rewrite if !self.config.rewriter.is_enabled() => Route::Forward,
            route => route,
        }
    }

    /// Creates the CA certificate download response.
    fn create_ca_response(pem: &str) -> Result<Response<Body>, http::Error> {
        Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, CA_CONTENT_TYPE)
            .header(header::CONTENT_DISPOSITION, CA_CONTENT_DISPOSITION)
            .header(header::CONTENT_LENGTH, pem.len())
            .body(bytes_to_body(Bytes::copy_from_slice(pem.as_bytes())))
    }

    /// Creates the forged location response.
    fn create_location_response(body: Bytes) -> Result<Response<Body>, http::Error> {
        Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, LOCATION_CONTENT_TYPE)
            .header(header::CONTENT_LENGTH, body.len())
            .body(bytes_to_body(body))
    }

    /// Serves the CA certificate, or forwards if it cannot.
    fn handle_ca_download(&self, req: Request<Body>) -> RequestOrResponse {
        let Some(pem) = &self.config.ca_cert_pem else {
            return RequestOrResponse::Request(req);
        };
        match Self::create_ca_response(pem) {
            Ok(response) => {
                tracing::info!("Serving CA certificate");
                RequestOrResponse::Response(response)
            }
            Err(e) => {
                tracing::warn!("Failed to build CA response: {}", e);
                RequestOrResponse::Request(req)
            }
        }
    }

    /// Handles a location lookup.
    ///
    /// Any failure forwards the original request with its body intact.
    async fn handle_location_request(&self, req: Request<Body>) -> RequestOrResponse {
        tracing::info!("Intercepting location request");

        let (mut parts, body) = req.into_parts();
        let body_bytes = match body.collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(e) => {
                tracing::warn!("Failed to read request body: {}", e);
                // The body is gone; the declared length no longer applies.
                parts.headers.remove(header::CONTENT_LENGTH);
                return RequestOrResponse::Request(Request::from_parts(parts, Body::empty()));
            }
        };

        let preview = &body_bytes[..body_bytes.len().min(BODY_PREVIEW_LEN)];
        tracing::debug!(
            "Read {} bytes from request body, first {}: {}",
            body_bytes.len(),
            preview.len(),
            hex_preview(preview)
        );

        let forward = |body_bytes: Bytes| {
            RequestOrResponse::Request(Request::from_parts(parts, bytes_to_body(body_bytes)))
        };

        let outcome = match self.config.rewriter.rewrite(&body_bytes) {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!("Location rewrite failed, forwarding unmodified: {}", e);
                return forward(body_bytes);
            }
        };

        match Self::create_location_response(outcome.body.clone()) {
            Ok(response) => {
                tracing::info!(
                    "Sending spoofed response ({} bytes, {} devices)",
                    outcome.body.len(),
                    outcome.devices
                );
                RequestOrResponse::Response(response)
            }
            Err(e) => {
                tracing::warn!("Failed to build spoofed response: {}", e);
                forward(body_bytes)
            }
        }
    }

    /// Extracts host from request URI or Host header.
    fn extract_host(req: &Request<Body>) -> Option<String> {
        // Try to get from URI first
        if let Some(host) = req.uri().host() {
            return Some(host.to_string());
        }

        // Fall back to Host header
        req.headers()
            .get(header::HOST)
            .and_then(|h| h.to_str().ok())
            .map(|s| strip_port(s).to_string())
    }
}

fn hex_preview(bytes: &[u8]) -> String {
    hex::encode(bytes)
}

impl HttpHandler for ProxyHandler {
    async fn handle_request(
        &mut self,
        _ctx: &HttpContext,
        req: Request<Body>,
    ) -> RequestOrResponse {
        match self.route(&req) {
            Route::CaDownload => self.handle_ca_download(req),
            Route::Rewrite => self.handle_location_request(req).await,
            Route::Forward => RequestOrResponse::Request(req),
        }
    }

    async fn handle_response(&mut self, _ctx: &HttpContext, res: Response<Body>) -> Response<Body> {
        // Pass through responses unchanged
        res
    }

    fn should_intercept(
        &mut self,
        _ctx: &HttpContext,
        req: &Request<Body>,
    ) -> impl Future<Output = bool> + Send {
        let authority = req
            .uri()
            .authority()
            .map(|a| a.as_str().to_string())
            .or_else(|| Self::extract_host(req))
            .unwrap_or_default();

        let decision = self.connect_decision(&authority);
        match decision {
            ConnectDecision::Intercept => {
                tracing::info!("MITM intercepting location service: {}", authority)
            }
            ConnectDecision::Tunnel => tracing::trace!("Tunneling {}", authority),
        }

        async move { decision == ConnectDecision::Intercept }
    }
}
