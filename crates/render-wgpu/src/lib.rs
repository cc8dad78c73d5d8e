//! wgpu render backend for the grid engine.
//!
//! Draws the engine's cached line geometry as a single line list. The
//! per-frame transform and line colors travel through uniforms.
//!
//! # Invariants
//! - Renderer never mutates engine state.
//! - Vertex data is re-uploaded only when the engine's geometry generation
//!   changes; material and transform updates touch uniforms only.

mod gpu;
mod shaders;

pub use gpu::WgpuGridRenderer;
