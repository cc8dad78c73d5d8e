//! Input adapters: the shared orientation sensor hub and the host-facing
//! action vocabulary.
//!
//! # Invariants
//! - The sensor source runs while at least one subscription is live and only
//!   then; the live count equals subscribes minus distinct releases.
//! - Readers never block on the sensor delivery context. Only the most recent
//!   sample is kept.

pub mod action;
mod hub;
mod sensor;
mod sources;

pub use action::GridAction;
pub use hub::{SampleSink, SensorHub, SensorSource, Subscription, SubscriptionId};
pub use sensor::{Attitude, SensorError, SensorSample};
pub use sources::{ManualSensor, ManualSensorControl, SyntheticGyro, UnavailableSensor};
