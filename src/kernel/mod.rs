pub mod aggregator;
pub mod cues;
pub mod event;
pub mod haptics;
pub mod phase;
pub mod reactor;
pub mod technique;
pub mod telemetry;
pub mod time;
