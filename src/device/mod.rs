//! The GPU seam.
//!
//! Everything the runtime, scene graph and simulation engine submit to the GPU
//! goes through [`RenderDevice`]. Resources are addressed by small copyable
//! handles ([`TargetId`], [`ProgramId`], [`GeometryId`]) so plugins can hold them
//! across frames without borrowing the device.
//!
//! Two implementations ship with the crate:
//!
//! - [`WgpuDevice`]: renders to a window surface through wgpu.
//! - [`HeadlessDevice`]: a deterministic CPU stand-in that records every command
//!   and evaluates fullscreen programs as closures over a single texel.
//!
//! Submission is fire-and-forget. Nothing here waits for the GPU to finish; a
//! frame's commands are handed to the queue at [`end_frame`](RenderDevice::end_frame).

mod headless;
mod wgpu_device;

pub use headless::{Command, HeadlessDevice, Kernel};
pub use wgpu_device::WgpuDevice;

use glam::Mat4;

use crate::color::Color;
use crate::context::FrameUniforms;
use crate::error::Result;
use crate::geometry::Geometry;

/// Handle to an offscreen render target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TargetId(pub(crate) u32);

/// Handle to a compiled program.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ProgramId(pub(crate) u32);

/// Handle to uploaded geometry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GeometryId(pub(crate) u32);

/// Floating-point storage used for simulation state.
///
/// Half precision is cheaper and sufficient for most effects. Full precision
/// avoids drift when the same texel is rewritten thousands of times.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum StatePrecision {
    #[default]
    Half,
    Full,
}

impl StatePrecision {
    pub fn texture_format(self) -> wgpu::TextureFormat {
        match self {
            StatePrecision::Half => wgpu::TextureFormat::Rgba16Float,
            StatePrecision::Full => wgpu::TextureFormat::Rgba32Float,
        }
    }
}

/// Describes an offscreen target to allocate.
#[derive(Clone, Copy, Debug)]
pub struct TargetDescriptor<'a> {
    pub label: &'a str,
    pub width: u32,
    pub height: u32,
    pub precision: StatePrecision,
}

/// The pixel format a fullscreen program writes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    /// The window surface.
    Surface,
    /// An offscreen state target.
    State(StatePrecision),
}

/// What a program draws.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProgramKind {
    /// A single fullscreen triangle with entry points `vs` and `fs`.
    ///
    /// Bindings: `@group(0) @binding(0)` [`FrameUniforms`], `@binding(1)` the input
    /// texture (`texture_2d<f32>`), `@binding(2)` a non-filtering sampler.
    Fullscreen { output: OutputFormat },
    /// Geometry drawn to the surface with depth testing, entry points `vs` and `fs`.
    ///
    /// Vertex attributes follow [`Vertex::LAYOUT`](crate::geometry::Vertex::LAYOUT).
    /// `@group(0) @binding(0)` holds the model matrices and `@group(1) @binding(0)`
    /// holds the material's uniform bytes.
    Mesh,
}

/// Describes a program to compile.
#[derive(Clone, Copy, Debug)]
pub struct ProgramDescriptor<'a> {
    pub label: &'a str,
    pub source: &'a str,
    pub kind: ProgramKind,
}

/// Where a fullscreen pass writes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Output {
    Surface,
    Target(TargetId),
}

/// A single fullscreen draw.
#[derive(Clone, Copy, Debug)]
pub struct FullscreenPass {
    pub program: ProgramId,
    /// Target sampled at `@binding(1)`. `None` binds a zeroed placeholder.
    pub input: Option<TargetId>,
    pub output: Output,
    pub uniforms: FrameUniforms,
}

/// Capability interface between the core and a GPU backend.
pub trait RenderDevice {
    /// Current surface size in pixels.
    fn surface_size(&self) -> (u32, u32);

    /// Reconfigure the surface. Zero-sized dimensions are ignored.
    fn resize(&mut self, width: u32, height: u32);

    /// Acquire the surface frame and open a command stream.
    ///
    /// A frame left open by an aborted dispatch is discarded.
    fn begin_frame(&mut self) -> Result<()>;

    /// Submit the frame's commands and present.
    fn end_frame(&mut self) -> Result<()>;

    /// Clear the surface. Also used as the clear colour when nothing else
    /// touches the surface in a frame.
    fn clear(&mut self, color: Color);

    fn create_target(&mut self, desc: &TargetDescriptor) -> Result<TargetId>;

    fn destroy_target(&mut self, target: TargetId);

    /// Size of a live target.
    fn target_size(&self, target: TargetId) -> Option<(u32, u32)>;

    fn compile_program(&mut self, desc: &ProgramDescriptor) -> Result<ProgramId>;

    fn destroy_program(&mut self, program: ProgramId);

    /// Run a fullscreen program over every pixel of the output.
    fn fullscreen(&mut self, pass: &FullscreenPass) -> Result<()>;

    fn upload_geometry(&mut self, geometry: &Geometry) -> Result<GeometryId>;

    fn destroy_geometry(&mut self, geometry: GeometryId);

    /// Make `program` current for subsequent geometry draws and upload its
    /// uniform block.
    fn bind_program(&mut self, program: ProgramId, uniforms: &[u8]) -> Result<()>;

    /// Draw geometry with the bound program. Indexed when the geometry carries
    /// indices, non-indexed otherwise.
    fn draw_geometry(&mut self, geometry: GeometryId, model: Mat4) -> Result<()>;

    /// Drop any in-flight frame and bound state.
    fn release(&mut self) {}
}
