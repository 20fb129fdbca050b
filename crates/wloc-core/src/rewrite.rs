//! Location rewrite pipeline.
//!
//! ```text
//! request body → envelope decode → AppleWLoc decode → mutate → sanitize
//!              → AppleWLoc encode → frame → response body
//! ```
//!
//! Each stage returns a [`RewriteError`] on failure. Callers forward the
//! original request untouched when rewriting fails.

use bytes::Bytes;
use prost::Message;

use crate::config::SpoofConfig;
use crate::envelope::RequestEnvelope;
use crate::error::Result;
use crate::frame::frame_response;
use crate::message::{AppleWLoc, Location};

/// Result of a successful rewrite.
#[derive(Debug, Clone)]
pub struct RewriteOutcome {
    /// Framed response body.
    pub body: Bytes,
    /// Number of access points that received the spoofed location.
    pub devices: usize,
}

/// Forges location responses from intercepted requests.
#[derive(Debug, Clone)]
pub struct Rewriter {
    config: SpoofConfig,
}

impl Rewriter {
    /// Creates a rewriter for the given configuration.
    pub fn new(config: SpoofConfig) -> Self {
        Self { config }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &SpoofConfig {
        &self.config
    }

    /// Returns true if requests should be rewritten.
    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Runs the full pipeline over a raw request body.
    pub fn rewrite(&self, body: &[u8]) -> Result<RewriteOutcome> {
        let envelope = RequestEnvelope::decode(body)?;
        tracing::debug!("Decoded envelope: {}", envelope);

        let mut message = AppleWLoc::decode(envelope.payload)?;
        tracing::debug!("Parsed AppleWLoc, wifi devices: {}", message.wifi_devices.len());

        let devices = self.apply(&mut message);
        sanitize(&mut message);

        let payload = message.encode_to_vec();
        let body = frame_response(&payload)?;

        Ok(RewriteOutcome { body, devices })
    }

    /// Overwrites the location of every access point in `message`.
    ///
    /// Devices without a location get one; devices without a BSSID are
    /// rewritten too. Returns the number of devices touched.
    pub fn apply(&self, message: &mut AppleWLoc) -> usize {
        let latitude = self.config.coordinates.latitude_fixed();
        let longitude = self.config.coordinates.longitude_fixed();
        let policy = &self.config.policy;

        for (index, device) in message.wifi_devices.iter_mut().enumerate() {
            tracing::debug!("Spoofing location for BSSID: {} (index {})", device.bssid, index);

            let location = device.location.get_or_insert_with(Location::default);
            location.latitude = Some(latitude);
            location.longitude = Some(longitude);
            location.horizontal_accuracy = Some(policy.horizontal_accuracy);
            location.vertical_accuracy = Some(policy.vertical_accuracy);
            location.altitude = Some(policy.altitude);
            location.unknown_value4 = Some(policy.unknown_value4);
            location.motion_activity_type = Some(policy.motion_activity_type);
            location.motion_activity_confidence = Some(policy.motion_activity_confidence);
        }

        message.wifi_devices.len()
    }
}

/// Clears summary fields that describe the original answer.
pub fn sanitize(message: &mut AppleWLoc) {
    message.num_cell_results = None;
    message.num_wifi_results = None;
    message.device_type = None;
}
