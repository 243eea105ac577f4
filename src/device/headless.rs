//! A CPU render device for tests and headless hosts.

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use glam::Mat4;

use super::{
    FullscreenPass, GeometryId, Output, ProgramDescriptor, ProgramId, ProgramKind, RenderDevice,
    StatePrecision, TargetDescriptor, TargetId,
};
use crate::color::Color;
use crate::context::FrameUniforms;
use crate::error::{Error, Result};
use crate::geometry::Geometry;

/// CPU stand-in for a fullscreen program.
///
/// Receives the input texel (if the pass has an input) and the pass uniforms,
/// and returns the texel written to the output.
pub type Kernel = Rc<dyn Fn(Option<[f32; 4]>, &FrameUniforms) -> [f32; 4]>;

/// A command recorded by [`HeadlessDevice`].
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    BeginFrame,
    EndFrame,
    Clear(Color),
    CreateTarget(TargetId),
    DestroyTarget(TargetId),
    CompileProgram(ProgramId),
    DestroyProgram(ProgramId),
    Fullscreen {
        program: ProgramId,
        input: Option<TargetId>,
        output: Output,
    },
    UploadGeometry(GeometryId),
    DestroyGeometry(GeometryId),
    BindProgram(ProgramId),
    Draw {
        geometry: GeometryId,
        vertices: u32,
        model: Mat4,
    },
    DrawIndexed {
        geometry: GeometryId,
        indices: u32,
        model: Mat4,
    },
}

struct HeadlessTarget {
    width: u32,
    height: u32,
    texel: [f32; 4],
}

struct HeadlessProgram {
    kind: ProgramKind,
    kernel: Option<Kernel>,
}

struct HeadlessGeometry {
    vertices: u32,
    indices: Option<u32>,
}

/// Deterministic device that evaluates every target as a single texel.
///
/// Fullscreen programs are looked up by source text among registered
/// [kernels](HeadlessDevice::with_kernel); an unregistered source copies its
/// input through unchanged (or writes zero without one). Sources marked with
/// [`reject`](HeadlessDevice::reject) fail to compile. New targets read as
/// `[0, 0, 0, 0]`.
///
/// ```
/// use flare::{HeadlessDevice, RenderDevice, TargetDescriptor, StatePrecision};
///
/// let mut device = HeadlessDevice::new(64, 64);
/// let target = device
///     .create_target(&TargetDescriptor {
///         label: "state",
///         width: 32,
///         height: 32,
///         precision: StatePrecision::Half,
///     })
///     .unwrap();
/// assert_eq!(device.target_texel(target), Some([0.0; 4]));
/// ```
pub struct HeadlessDevice {
    width: u32,
    height: u32,
    next_id: u32,
    kernels: HashMap<String, Kernel>,
    rejected: HashSet<String>,
    unsupported: HashSet<StatePrecision>,
    targets: HashMap<TargetId, HeadlessTarget>,
    programs: HashMap<ProgramId, HeadlessProgram>,
    geometries: HashMap<GeometryId, HeadlessGeometry>,
    bound: Option<ProgramId>,
    surface: [f32; 4],
    clear_color: Color,
    in_frame: bool,
    surface_touched: bool,
    frames: u64,
    commands: Vec<Command>,
}

impl HeadlessDevice {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            next_id: 1,
            kernels: HashMap::new(),
            rejected: HashSet::new(),
            unsupported: HashSet::new(),
            targets: HashMap::new(),
            programs: HashMap::new(),
            geometries: HashMap::new(),
            bound: None,
            surface: [0.0; 4],
            clear_color: Color::BLACK,
            in_frame: false,
            surface_touched: false,
            frames: 0,
            commands: Vec::new(),
        }
    }

    /// Register a kernel evaluated for programs compiled from `source`.
    pub fn with_kernel(
        mut self,
        source: impl Into<String>,
        kernel: impl Fn(Option<[f32; 4]>, &FrameUniforms) -> [f32; 4] + 'static,
    ) -> Self {
        self.kernels.insert(source.into(), Rc::new(kernel));
        self
    }

    /// Make programs compiled from `source` fail.
    pub fn reject(mut self, source: impl Into<String>) -> Self {
        self.rejected.insert(source.into());
        self
    }

    /// Make allocations with this precision fail, as on hardware without the format.
    pub fn without_precision(mut self, precision: StatePrecision) -> Self {
        self.unsupported.insert(precision);
        self
    }

    fn next_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Every command recorded so far.
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Drain the recorded commands.
    pub fn take_commands(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.commands)
    }

    /// Current value of a live target.
    pub fn target_texel(&self, target: TargetId) -> Option<[f32; 4]> {
        self.targets.get(&target).map(|t| t.texel)
    }

    /// Overwrite a target's value.
    pub fn set_target_texel(&mut self, target: TargetId, texel: [f32; 4]) -> Result<()> {
        let t = self
            .targets
            .get_mut(&target)
            .ok_or(Error::UnknownResource("target"))?;
        t.texel = texel;
        Ok(())
    }

    /// The last value written to the surface.
    pub fn surface_texel(&self) -> [f32; 4] {
        self.surface
    }

    pub fn live_targets(&self) -> usize {
        self.targets.len()
    }

    pub fn live_programs(&self) -> usize {
        self.programs.len()
    }

    pub fn live_geometries(&self) -> usize {
        self.geometries.len()
    }

    /// Frames submitted with [`end_frame`](RenderDevice::end_frame).
    pub fn frames_submitted(&self) -> u64 {
        self.frames
    }

    fn require_frame(&self) -> Result<()> {
        if self.in_frame {
            Ok(())
        } else {
            Err(Error::Surface("no frame in flight".into()))
        }
    }
}

impl RenderDevice for HeadlessDevice {
    fn surface_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.width = width;
            self.height = height;
        }
    }

    fn begin_frame(&mut self) -> Result<()> {
        self.in_frame = true;
        self.surface_touched = false;
        self.bound = None;
        self.commands.push(Command::BeginFrame);
        Ok(())
    }

    fn end_frame(&mut self) -> Result<()> {
        self.require_frame()?;
        if !self.surface_touched {
            self.surface = self.clear_color.to_array();
        }
        self.in_frame = false;
        self.frames += 1;
        self.commands.push(Command::EndFrame);
        Ok(())
    }

    fn clear(&mut self, color: Color) {
        self.clear_color = color;
        if self.in_frame {
            self.surface = color.to_array();
            self.surface_touched = true;
        }
        self.commands.push(Command::Clear(color));
    }

    fn create_target(&mut self, desc: &TargetDescriptor) -> Result<TargetId> {
        if self.unsupported.contains(&desc.precision) {
            return Err(Error::allocation(
                desc.label,
                format!("{:?} state targets are not renderable", desc.precision),
            ));
        }
        if desc.width == 0 || desc.height == 0 {
            return Err(Error::allocation(desc.label, "zero-sized target"));
        }

        let id = TargetId(self.next_id());
        self.targets.insert(
            id,
            HeadlessTarget {
                width: desc.width,
                height: desc.height,
                texel: [0.0; 4],
            },
        );
        self.commands.push(Command::CreateTarget(id));
        Ok(id)
    }

    fn destroy_target(&mut self, target: TargetId) {
        if self.targets.remove(&target).is_some() {
            self.commands.push(Command::DestroyTarget(target));
        }
    }

    fn target_size(&self, target: TargetId) -> Option<(u32, u32)> {
        self.targets.get(&target).map(|t| (t.width, t.height))
    }

    fn compile_program(&mut self, desc: &ProgramDescriptor) -> Result<ProgramId> {
        if self.rejected.contains(desc.source) {
            return Err(Error::compile(desc.label, "rejected by headless device"));
        }
        let id = ProgramId(self.next_id());
        let kernel = self.kernels.get(desc.source).cloned();
        self.programs.insert(
            id,
            HeadlessProgram {
                kind: desc.kind,
                kernel,
            },
        );
        self.commands.push(Command::CompileProgram(id));
        Ok(id)
    }

    fn destroy_program(&mut self, program: ProgramId) {
        if self.programs.remove(&program).is_some() {
            self.commands.push(Command::DestroyProgram(program));
        }
    }

    fn fullscreen(&mut self, pass: &FullscreenPass) -> Result<()> {
        self.require_frame()?;
        let program = self
            .programs
            .get(&pass.program)
            .ok_or(Error::UnknownResource("program"))?;
        if program.kind == ProgramKind::Mesh {
            return Err(Error::UnknownResource("fullscreen program"));
        }

        let input = match pass.input {
            Some(id) => Some(
                self.targets
                    .get(&id)
                    .ok_or(Error::UnknownResource("target"))?
                    .texel,
            ),
            None => None,
        };
        let texel = match &program.kernel {
            Some(kernel) => kernel(input, &pass.uniforms),
            None => input.unwrap_or([0.0; 4]),
        };

        match pass.output {
            Output::Surface => {
                self.surface = texel;
                self.surface_touched = true;
            }
            Output::Target(id) => {
                self.targets
                    .get_mut(&id)
                    .ok_or(Error::UnknownResource("target"))?
                    .texel = texel;
            }
        }

        self.commands.push(Command::Fullscreen {
            program: pass.program,
            input: pass.input,
            output: pass.output,
        });
        Ok(())
    }

    fn upload_geometry(&mut self, geometry: &Geometry) -> Result<GeometryId> {
        if geometry.vertex_count() == 0 {
            return Err(Error::allocation("geometry", "no vertices"));
        }
        let id = GeometryId(self.next_id());
        self.geometries.insert(
            id,
            HeadlessGeometry {
                vertices: geometry.vertex_count() as u32,
                indices: geometry
                    .indices
                    .as_ref()
                    .filter(|i| !i.is_empty())
                    .map(|i| i.len() as u32),
            },
        );
        self.commands.push(Command::UploadGeometry(id));
        Ok(id)
    }

    fn destroy_geometry(&mut self, geometry: GeometryId) {
        if self.geometries.remove(&geometry).is_some() {
            self.commands.push(Command::DestroyGeometry(geometry));
        }
    }

    fn bind_program(&mut self, program: ProgramId, _uniforms: &[u8]) -> Result<()> {
        if !self.programs.contains_key(&program) {
            return Err(Error::UnknownResource("program"));
        }
        self.bound = Some(program);
        self.commands.push(Command::BindProgram(program));
        Ok(())
    }

    fn draw_geometry(&mut self, geometry: GeometryId, model: Mat4) -> Result<()> {
        self.require_frame()?;
        if self.bound.is_none() {
            return Err(Error::UnknownResource("bound program"));
        }
        let g = self
            .geometries
            .get(&geometry)
            .ok_or(Error::UnknownResource("geometry"))?;
        self.commands.push(match g.indices {
            Some(indices) => Command::DrawIndexed {
                geometry,
                indices,
                model,
            },
            None => Command::Draw {
                geometry,
                vertices: g.vertices,
                model,
            },
        });
        self.surface_touched = true;
        Ok(())
    }

    fn release(&mut self) {
        self.in_frame = false;
        self.bound = None;
    }
}
