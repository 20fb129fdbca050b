//! Positioning message carried inside the request envelope.
//!
//! Hand-written `prost` messages for the parts of the schema this crate
//! touches. Optional scalars keep presence: `None` is not the same as zero on
//! the wire, and the client treats them differently.

use prost::Message;

/// Top-level Wi-Fi location request/response.
#[derive(Clone, PartialEq, Message)]
pub struct AppleWLoc {
    #[prost(int64, optional, tag = "1")]
    pub unknown_value0: Option<i64>,
    #[prost(message, repeated, tag = "2")]
    pub wifi_devices: Vec<WifiDevice>,
    /// Number of cell results in the original answer.
    #[prost(int32, optional, tag = "3")]
    pub num_cell_results: Option<i32>,
    /// Number of Wi-Fi results in the original answer.
    #[prost(int32, optional, tag = "4")]
    pub num_wifi_results: Option<i32>,
    #[prost(string, optional, tag = "5")]
    pub app_bundle_id: Option<String>,
    #[prost(message, optional, tag = "33")]
    pub device_type: Option<DeviceType>,
}

/// One observed access point.
#[derive(Clone, PartialEq, Message)]
pub struct WifiDevice {
    /// Hardware address, e.g. `aa:bb:cc:dd:ee:ff`.
    #[prost(string, tag = "1")]
    pub bssid: String,
    #[prost(message, optional, tag = "2")]
    pub location: Option<Location>,
    #[prost(int64, optional, tag = "3")]
    pub unknown_value3: Option<i64>,
    #[prost(string, optional, tag = "4")]
    pub unknown_value4: Option<String>,
}

/// Position attached to an access point. Latitude and longitude are degrees
/// scaled by 10^8.
#[derive(Clone, PartialEq, Message)]
pub struct Location {
    #[prost(int64, optional, tag = "1")]
    pub latitude: Option<i64>,
    #[prost(int64, optional, tag = "2")]
    pub longitude: Option<i64>,
    #[prost(int64, optional, tag = "3")]
    pub horizontal_accuracy: Option<i64>,
    #[prost(int64, optional, tag = "4")]
    pub unknown_value4: Option<i64>,
    #[prost(int64, optional, tag = "5")]
    pub altitude: Option<i64>,
    #[prost(int64, optional, tag = "6")]
    pub vertical_accuracy: Option<i64>,
    #[prost(int64, optional, tag = "7")]
    pub speed: Option<i64>,
    #[prost(int64, optional, tag = "8")]
    pub course: Option<i64>,
    #[prost(int64, optional, tag = "9")]
    pub timestamp: Option<i64>,
    #[prost(int64, optional, tag = "11")]
    pub motion_activity_type: Option<i64>,
    #[prost(int64, optional, tag = "12")]
    pub motion_activity_confidence: Option<i64>,
}

/// Requesting device description.
#[derive(Clone, PartialEq, Message)]
pub struct DeviceType {
    #[prost(string, tag = "1")]
    pub operating_system: String,
    #[prost(string, tag = "2")]
    pub model: String,
}

impl AppleWLoc {
    /// Builds a request for the given access points with no locations.
    pub fn for_bssids<I, S>(bssids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            wifi_devices: bssids
                .into_iter()
                .map(|bssid| WifiDevice {
                    bssid: bssid.into(),
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        }
    }
}
