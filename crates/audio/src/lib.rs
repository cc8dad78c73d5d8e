//! Audio level metering for the radio visualizer.
//!
//! A capture context feeds PCM buffers into a [`LevelMeter`] and publishes the
//! smoothed result through a [`LevelTap`]; the render loop reads the newest
//! snapshot without blocking. Hosts without capture drive an [`IdlePattern`]
//! instead, which scrolls synthetic radio bursts across the same bars.
//!
//! # Invariants
//! - Every bar and level value lies in `[0, 1]`.
//! - Readers only ever see the latest snapshot; intermediate ones may be lost.

mod idle;
mod meter;

pub use idle::{IDLE_PATTERNS, IdlePattern};
pub use meter::{BAR_COUNT, LevelMeter, LevelSnapshot, LevelTap, WINDOW_SIZE};
