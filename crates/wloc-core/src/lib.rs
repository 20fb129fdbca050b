//! wloc-core - wire formats and rewrite logic for Wi-Fi location responses.
//!
//! This crate has no I/O. It decodes the request envelope sent to the
//! location service, rewrites the positioning message it carries and frames
//! the forged response.
//!
//! ## Architecture
//!
//! ```text
//! body ─▶ envelope::RequestEnvelope ─▶ message::AppleWLoc
//!                                            │
//!                                 rewrite::Rewriter::apply
//!                                            │
//!                                            ▼
//!          frame::frame_response ◀── sanitize + encode
//! ```

pub mod config;
pub mod coordinate;
pub mod envelope;
mod error;
pub mod frame;
pub mod message;
pub mod rewrite;

pub use config::{LocationPolicy, SpoofConfig};
pub use coordinate::{to_degrees, to_fixed_point, Coordinates};
pub use envelope::RequestEnvelope;
pub use error::{CoordinateError, EnvelopeError, FrameError, Result, RewriteError};
pub use frame::{frame, frame_response, parse_frame, MAX_FRAME_PAYLOAD, RESPONSE_HEADER};
pub use message::{AppleWLoc, DeviceType, Location, WifiDevice};
pub use rewrite::{sanitize, RewriteOutcome, Rewriter};
