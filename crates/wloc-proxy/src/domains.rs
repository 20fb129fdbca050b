//! Interception routing.
//!
//! Decides which CONNECT targets get TLS terminated and what happens to each
//! request on a terminated (or plain HTTP) connection. Only the location
//! service is ever decrypted; every other host is tunneled untouched.

use hyper::Method;

/// Location service hosts whose TLS is terminated.
pub const LOCATION_HOSTS: &[&str] = &["gs-loc.apple.com", "gs-loc-cn.apple.com"];

/// Hosts that serve the CA certificate for installation.
pub const CA_DOWNLOAD_HOSTS: &[&str] = &["mitm.it", "www.mitm.it"];

/// Path of the Wi-Fi location lookup.
pub const WLOC_PATH: &str = "/clls/wloc";

/// What to do with a CONNECT request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectDecision {
    /// Terminate TLS with a leaf certificate minted by the local CA.
    Intercept,
    /// Relay the encrypted stream without inspection.
    Tunnel,
}

impl ConnectDecision {
    /// Decides how to handle a CONNECT to `authority` (`host[:port]`).
    ///
    /// `mitm_available` is false when no CA is loaded, in which case
    /// everything is tunneled.
    ///
    /// # Examples
    ///
    /// ```
    /// use wloc_proxy::ConnectDecision;
    ///
    /// assert_eq!(
    ///     ConnectDecision::for_authority("gs-loc.apple.com:443", true),
    ///     ConnectDecision::Intercept
    /// );
    /// assert_eq!(
    ///     ConnectDecision::for_authority("example.com:443", true),
    ///     ConnectDecision::Tunnel
    /// );
    /// ```
    pub fn for_authority(authority: &str, mitm_available: bool) -> Self {
        if mitm_available && is_location_host(authority) {
            Self::Intercept
        } else {
            Self::Tunnel
        }
    }
}

/// What to do with a single HTTP request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Answer with the CA certificate.
    CaDownload,
    /// Run the body through the rewrite pipeline.
    Rewrite,
    /// Send to the origin unchanged.
    Forward,
}

impl Route {
    /// Classifies a request by method, host and path.
    ///
    /// CONNECT requests are always forwarded; their fate is decided by
    /// [`ConnectDecision`].
    pub fn classify(method: &Method, host: &str, path: &str) -> Self {
        if method == Method::CONNECT {
            return Self::Forward;
        }
        if is_ca_download_host(host) {
            return Self::CaDownload;
        }
        if method == Method::POST && path == WLOC_PATH && is_location_host(host) {
            return Self::Rewrite;
        }
        Self::Forward
    }
}

/// Strips a trailing `:port` from a host, including bracketed IPv6 literals.
pub fn strip_port(host: &str) -> &str {
    if let Some(rest) = host.strip_prefix('[') {
        return rest.split(']').next().unwrap_or(rest);
    }
    match host.rsplit_once(':') {
        Some((name, port)) if !name.contains(':') && port.bytes().all(|b| b.is_ascii_digit()) => {
            name
        }
        _ => host,
    }
}

/// Checks if `host` (port optional) is a location service host.
pub fn is_location_host(host: &str) -> bool {
    matches_any(host, LOCATION_HOSTS)
}

/// Checks if `host` (port optional) serves the CA certificate.
pub fn is_ca_download_host(host: &str) -> bool {
    matches_any(host, CA_DOWNLOAD_HOSTS)
}

fn matches_any(host: &str, list: &[&str]) -> bool {
    let host = strip_port(host);
    let host = host.strip_suffix('.').unwrap_or(host);
    list.iter().any(|candidate| candidate.eq_ignore_ascii_case(host))
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== strip_port Tests ====================

    #[test]
    fn strip_port_removes_port() {
        assert_eq!(strip_port("gs-loc.apple.com:443"), "gs-loc.apple.com");
        assert_eq!(strip_port("example.com"), "example.com");
    }

    #[test]
    fn strip_port_ipv6() {
        assert_eq!(strip_port("[::1]:8888"), "::1");
        assert_eq!(strip_port("::1"), "::1");
    }

    #[test]
    fn strip_port_keeps_non_numeric_suffix() {
        assert_eq!(strip_port("host:abc"), "host:abc");
    }

    // ==================== Host Tests ====================

    #[test]
    fn location_hosts_match() {
        assert!(is_location_host("gs-loc.apple.com"));
        assert!(is_location_host("gs-loc-cn.apple.com:443"));
        assert!(is_location_host("GS-LOC.apple.com"));
        assert!(is_location_host("gs-loc.apple.com."));
    }

    #[test]
    fn location_hosts_are_exact() {
        assert!(!is_location_host("apple.com"));
        assert!(!is_location_host("www.gs-loc.apple.com"));
        assert!(!is_location_host("gs-loc.apple.com.evil.test"));
    }

    #[test]
    fn ca_download_hosts_match() {
        assert!(is_ca_download_host("mitm.it"));
        assert!(is_ca_download_host("www.mitm.it:80"));
        assert!(!is_ca_download_host("cdn.mitm.it"));
    }

    // ==================== ConnectDecision Tests ====================

    #[test]
    fn connect_intercepts_only_location_hosts() {
        for host in LOCATION_HOSTS {
            let authority = format!("{host}:443");
            assert_eq!(
                ConnectDecision::for_authority(&authority, true),
                ConnectDecision::Intercept
            );
        }
        for authority in ["example.com:443", "apple.com:443", "mitm.it:443"] {
            assert_eq!(
                ConnectDecision::for_authority(authority, true),
                ConnectDecision::Tunnel
            );
        }
    }

    #[test]
    fn connect_tunnels_everything_without_ca() {
        assert_eq!(
            ConnectDecision::for_authority("gs-loc.apple.com:443", false),
            ConnectDecision::Tunnel
        );
    }

    // ==================== Route Tests ====================

    #[test]
    fn route_rewrite_trigger() {
        assert_eq!(
            Route::classify(&Method::POST, "gs-loc.apple.com", "/clls/wloc"),
            Route::Rewrite
        );
        assert_eq!(
            Route::classify(&Method::POST, "gs-loc-cn.apple.com", "/clls/wloc"),
            Route::Rewrite
        );
    }

    #[test]
    fn route_requires_method_and_path() {
        assert_eq!(
            Route::classify(&Method::GET, "gs-loc.apple.com", "/clls/wloc"),
            Route::Forward
        );
        assert_eq!(
            Route::classify(&Method::POST, "gs-loc.apple.com", "/clls/wloc/extra"),
            Route::Forward
        );
        assert_eq!(
            Route::classify(&Method::POST, "example.com", "/clls/wloc"),
            Route::Forward
        );
    }

    #[test]
    fn route_ca_download_any_path() {
        assert_eq!(Route::classify(&Method::GET, "mitm.it", "/"), Route::CaDownload);
        assert_eq!(
            Route::classify(&Method::GET, "www.mitm.it", "/cert/pem"),
            Route::CaDownload
        );
    }

    #[test]
    fn route_connect_is_forwarded() {
        assert_eq!(
            Route::classify(&Method::CONNECT, "mitm.it", ""),
            Route::Forward
        );
        assert_eq!(
            Route::classify(&Method::CONNECT, "gs-loc.apple.com", ""),
            Route::Forward
        );
    }
}
