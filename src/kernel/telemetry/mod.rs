//! Session telemetry.
//!
//! # SAFETY INVARIANT
//! Telemetry is a READ-ONLY side-effect layer. Nothing in the reactor or the
//! services may branch on it.
//!
//! # PRIVACY INVARIANT
//! Events carry no user content: no phrase text, no audio, no technique
//! names typed by the user. Indices, labels, counts and durations only.

pub mod event;
pub mod metrics;
pub mod recorder;

pub use event::TelemetryEvent;
pub use metrics::TelemetrySnapshot;
pub use recorder::TelemetryRecorder;
