//! # flare
//!
//! **A plugin-driven creative coding runtime.**
//!
//! A [`Runtime`] schedules an ordered list of [`Plugin`]s against one shared
//! [`FrameContext`]. Three plugin families ship with the crate:
//!
//! - [`Effect`]: a fullscreen shader drawn straight to the screen.
//! - [`Scene`]: an arena-backed scene graph of meshes with world transforms.
//! - [`Simulation`]: a ping-pong double buffer iterated every frame and
//!   displayed by a second shader.
//!
//! ## Quick Start
//!
//! ```no_run
//! use flare::*;
//!
//! fn main() -> Result<()> {
//!     run_with_config(AppConfig::new().title("Pulse"), |runtime| {
//!         runtime
//!             .plugin(ClearPlugin(Color::BLACK))
//!             .plugin(Effect::from_file("shaders/pulse.wgsl").named("pulse"))
//!             .render(|ctx, _gpu| {
//!                 if ctx.frame % 600 == 0 {
//!                     log::info!("t = {:.1}s", ctx.time);
//!                 }
//!                 Ok(())
//!             });
//!         Ok(())
//!     })
//! }
//! ```
//!
//! Everything the plugins submit goes through the [`RenderDevice`] seam, so the
//! whole stack also runs against the CPU-side [`HeadlessDevice`] in tests.

mod app;
mod camera;
mod clock;
mod color;
mod context;
pub mod device;
mod effect;
mod error;
mod geometry;
mod gpu;
mod hot_shader;
mod input;
mod material;
mod plugin;
mod runtime;
pub mod scene;
mod simulation;

pub use app::{AppConfig, run, run_with_config};
pub use camera::{Camera, CameraPlugin, Orbit};
pub use clock::{Clock, ManualClock, SystemClock};
pub use color::Color;
pub use context::{CameraMatrices, FrameContext, FrameUniforms, Pointer, StateMap};
pub use device::{
    FullscreenPass, GeometryId, HeadlessDevice, Output, OutputFormat, ProgramDescriptor,
    ProgramId, ProgramKind, RenderDevice, StatePrecision, TargetDescriptor, TargetId, WgpuDevice,
};
pub use effect::{ClearPlugin, Effect};
pub use error::{Error, Result};
pub use geometry::{Aabb, Geometry, Topology, Vertex};
pub use gpu::GpuContext;
pub use hot_shader::{ShaderFile, ShaderSource};
pub use input::{PointerEvent, handle_event};
pub use material::{BasicMaterial, Material, MaterialUniforms};
pub use plugin::{Named, Plugin, PluginExt, RenderFn};
pub use runtime::{RunState, Runtime, RuntimeConfig};
pub use scene::{NodeOptions, NodeTransform, Scene, SceneNode};
pub use simulation::{PingPong, Simulation, SimulationControl};

// Re-export glam types for convenience
pub use glam::{Mat3, Mat4, Quat, Vec2, Vec3, Vec4};
