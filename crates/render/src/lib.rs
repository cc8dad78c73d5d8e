//! Rendering Adapter: renderer-agnostic interface over a grid engine.
//!
//! # Invariants
//! - Renderers read engine state; they never mutate it.
//! - Projected segments are clipped against the near plane, so every emitted
//!   point is finite.
//! - One world unit on the unrotated grid plane maps to one point on screen.

mod camera;
mod renderer;

pub use camera::GridCamera;
pub use renderer::{DebugTextRenderer, GridFrame, LineFrameRenderer, Renderer, project_frame};
