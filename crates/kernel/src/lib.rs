//! Grid Kernel: the infinite grid motion engine.
//!
//! # Invariants
//! - Velocity drift and sensor consumption are mutually exclusive; non-zero
//!   velocity always wins and no sensor subscription is held while it does.
//! - The position offset stays inside `[0, major_every * spacing)` per axis.
//! - Geometry is rebuilt only when spacing, the major interval, or the covered
//!   extent changes. Materials are refreshed every update.
//! - Per tick: geometry rebuild, then materials, then transform.

mod engine;
pub mod flight;
pub mod geometry;
pub mod motion;
pub mod schedule;
mod stats;
pub mod transition;

pub use engine::{GridEngine, GridMaterials, TickOutcome};
pub use flight::{AviationRig, FlightMode, FlightPhase};
pub use geometry::{GridGeometry, GridLine};
pub use motion::{GridTransform, MotionState};
pub use schedule::{Firing, TaskHandle, TaskId, TaskScheduler};
pub use stats::{EngineStats, FrameTimer};
pub use transition::{Tween, ease_in_out};
