//! Materials: the program and uniform set a scene node draws with.

use crate::color::Color;
use crate::context::FrameContext;
use crate::device::{ProgramDescriptor, ProgramId, ProgramKind, RenderDevice};
use crate::error::{Error, Result};

/// A program plus its uniforms, bound before each draw of the node that owns it.
///
/// [`init`](Material::init) runs once, lazily, the first time the owning node is
/// rendered. [`bind`](Material::bind) runs before every draw and is expected to
/// make a mesh program current through [`RenderDevice::bind_program`], pulling
/// camera matrices from [`FrameContext::camera`].
pub trait Material {
    fn init(&mut self, ctx: &mut FrameContext, gpu: &mut dyn RenderDevice) -> Result<()>;

    fn bind(&mut self, ctx: &mut FrameContext, gpu: &mut dyn RenderDevice) -> Result<()>;

    /// Release GPU resources. Called exactly once when the owning node is removed.
    fn destroy(&mut self, gpu: &mut dyn RenderDevice);
}

/// Uniform block of [`BasicMaterial`], bound at `@group(1) @binding(0)`.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MaterialUniforms {
    pub view_proj: [[f32; 4]; 4],
    pub color: [f32; 4],
    pub camera_position: [f32; 4],
}

/// Vertex colour modulated by a flat colour, lit by a fixed directional light.
pub struct BasicMaterial {
    pub color: Color,
    program: Option<ProgramId>,
}

impl BasicMaterial {
    pub const SOURCE: &'static str = include_str!("shaders/basic.wgsl");

    pub fn new(color: Color) -> Self {
        Self {
            color,
            program: None,
        }
    }

    pub fn program(&self) -> Option<ProgramId> {
        self.program
    }

    /// The uniform block for the current camera.
    pub fn uniforms(&self, ctx: &FrameContext) -> MaterialUniforms {
        let camera = ctx.camera.unwrap_or_default();
        MaterialUniforms {
            view_proj: camera.view_projection.to_cols_array_2d(),
            color: self.color.to_array(),
            camera_position: camera.position.extend(1.0).to_array(),
        }
    }
}

impl Default for BasicMaterial {
    fn default() -> Self {
        Self::new(Color::WHITE)
    }
}

impl Material for BasicMaterial {
    fn init(&mut self, _ctx: &mut FrameContext, gpu: &mut dyn RenderDevice) -> Result<()> {
        let program = gpu.compile_program(&ProgramDescriptor {
            label: "Basic Material",
            source: Self::SOURCE,
            kind: ProgramKind::Mesh,
        })?;
        self.program = Some(program);
        Ok(())
    }

    fn bind(&mut self, ctx: &mut FrameContext, gpu: &mut dyn RenderDevice) -> Result<()> {
        let program = self
            .program
            .ok_or(Error::UnknownResource("material program"))?;
        let uniforms = self.uniforms(ctx);
        gpu.bind_program(program, bytemuck::bytes_of(&uniforms))?;
        ctx.program = Some(program);
        Ok(())
    }

    fn destroy(&mut self, gpu: &mut dyn RenderDevice) {
        if let Some(program) = self.program.take() {
            gpu.destroy_program(program);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::CameraMatrices;
    use crate::device::{Command, HeadlessDevice};
    use glam::{Mat4, Vec3};

    #[test]
    fn bind_before_init_fails() {
        let mut ctx = FrameContext::new(8, 8);
        let mut gpu = HeadlessDevice::new(8, 8);
        let mut material = BasicMaterial::default();
        assert!(matches!(
            material.bind(&mut ctx, &mut gpu),
            Err(Error::UnknownResource(_))
        ));
    }

    #[test]
    fn bind_publishes_program_and_camera() {
        let mut ctx = FrameContext::new(8, 8);
        let mut gpu = HeadlessDevice::new(8, 8);
        let mut material = BasicMaterial::new(Color::RED);
        material.init(&mut ctx, &mut gpu).unwrap();

        let view_projection = Mat4::from_translation(Vec3::new(0.0, 0.0, -3.0));
        ctx.camera = Some(CameraMatrices {
            view_projection,
            position: Vec3::new(0.0, 0.0, 3.0),
            ..Default::default()
        });
        material.bind(&mut ctx, &mut gpu).unwrap();

        let program = material.program().unwrap();
        assert_eq!(ctx.program, Some(program));
        assert_eq!(gpu.commands().last(), Some(&Command::BindProgram(program)));

        let uniforms = material.uniforms(&ctx);
        assert_eq!(uniforms.view_proj, view_projection.to_cols_array_2d());
        assert_eq!(uniforms.color, [1.0, 0.0, 0.0, 1.0]);
        assert_eq!(uniforms.camera_position, [0.0, 0.0, 3.0, 1.0]);
    }

    #[test]
    fn destroy_releases_the_program_once() {
        let mut ctx = FrameContext::new(8, 8);
        let mut gpu = HeadlessDevice::new(8, 8);
        let mut material = BasicMaterial::default();
        material.init(&mut ctx, &mut gpu).unwrap();
        assert_eq!(gpu.live_programs(), 1);

        material.destroy(&mut gpu);
        material.destroy(&mut gpu);
        assert_eq!(gpu.live_programs(), 0);
        assert!(material.program().is_none());
    }
}
