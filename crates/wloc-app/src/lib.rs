//! wloc-spoof - command-line front end for the location spoofing proxy.
//!
//! The binary wires persisted [`settings::SpoofSettings`] and command-line
//! overrides into a [`wloc_proxy::ProxyConfig`], starts the proxy and stops it
//! on Ctrl-C.

pub mod settings;

pub use settings::{ConfigError, SpoofSettings};
