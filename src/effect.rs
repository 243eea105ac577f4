//! Fullscreen shader effects drawn straight to the surface.
//!
//! An [`Effect`] runs one fullscreen program per frame with no state of its
//! own: resolution, time and pointer arrive through [`FrameUniforms`]
//! at `@group(0) @binding(0)`.
//!
//! # Shader Requirements
//!
//! The WGSL source must define entry points named `vs` and `fs`. The vertex
//! shader generates a fullscreen triangle from the vertex index:
//!
//! ```wgsl
//! @vertex
//! fn vs(@builtin(vertex_index) vi: u32) -> @builtin(position) vec4f {
//!     let x = f32(i32(vi) - 1) * 2.0;
//!     let y = f32(i32(vi & 1u) * 4 - 1);
//!     return vec4f(x, y, 0.0, 1.0);
//! }
//! ```
//!
//! [`FrameUniforms`]: crate::FrameUniforms

use std::path::PathBuf;

use crate::color::Color;
use crate::context::FrameContext;
use crate::device::{FullscreenPass, Output, OutputFormat, ProgramKind, RenderDevice};
use crate::error::Result;
use crate::hot_shader::{ShaderSource, ShaderStage};
use crate::plugin::Plugin;

/// A screen-space fullscreen shader.
#[derive(Debug)]
pub struct Effect {
    stage: ShaderStage,
}

impl Effect {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            stage: ShaderStage::new("effect", ShaderSource::Inline(source.into())),
        }
    }

    /// Load the shader from `path` at init and recompile whenever it changes.
    pub fn from_file(path: impl Into<PathBuf>) -> Self {
        Self {
            stage: ShaderStage::new("effect", ShaderSource::watched(path)),
        }
    }

    /// Whether a compiled program is loaded.
    pub fn is_valid(&self) -> bool {
        self.stage.program().is_some()
    }
}

impl Plugin for Effect {
    fn init(&mut self, _ctx: &mut FrameContext, gpu: &mut dyn RenderDevice) -> Result<()> {
        self.stage.compile(
            gpu,
            ProgramKind::Fullscreen {
                output: OutputFormat::Surface,
            },
        )
    }

    fn render(&mut self, ctx: &mut FrameContext, gpu: &mut dyn RenderDevice) -> Result<()> {
        self.stage.reload(gpu);
        let Some(program) = self.stage.program() else {
            return Ok(());
        };
        gpu.fullscreen(&FullscreenPass {
            program,
            input: None,
            output: Output::Surface,
            uniforms: ctx.uniforms(ctx.size(), 0),
        })?;
        ctx.program = Some(program);
        Ok(())
    }

    fn destroy(&mut self, _ctx: &mut FrameContext, gpu: &mut dyn RenderDevice) {
        self.stage.destroy(gpu);
    }
}

/// Clears the surface to a solid colour. Register it first.
#[derive(Clone, Copy, Debug, Default)]
pub struct ClearPlugin(pub Color);

impl Plugin for ClearPlugin {
    fn render(&mut self, _ctx: &mut FrameContext, gpu: &mut dyn RenderDevice) -> Result<()> {
        gpu.clear(self.0);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::HeadlessDevice;

    #[test]
    fn effect_draws_uniforms_to_surface() {
        let mut ctx = FrameContext::new(320, 240);
        ctx.time = 2.5;
        let mut gpu = HeadlessDevice::new(320, 240)
            .with_kernel("gradient", |_, u| [u.time, u.resolution[0], u.resolution[1], 1.0]);
        let mut effect = Effect::new("gradient");
        effect.init(&mut ctx, &mut gpu).unwrap();
        assert!(effect.is_valid());

        gpu.begin_frame().unwrap();
        effect.render(&mut ctx, &mut gpu).unwrap();
        gpu.end_frame().unwrap();

        assert_eq!(gpu.surface_texel(), [2.5, 320.0, 240.0, 1.0]);
        assert!(ctx.program.is_some());
    }

    #[test]
    fn broken_effect_renders_nothing() {
        let mut ctx = FrameContext::new(8, 8);
        let mut gpu = HeadlessDevice::new(8, 8).reject("broken");
        let mut effect = Effect::new("broken");
        effect.init(&mut ctx, &mut gpu).unwrap();
        assert!(!effect.is_valid());

        gpu.begin_frame().unwrap();
        effect.render(&mut ctx, &mut gpu).unwrap();
        gpu.end_frame().unwrap();
        assert_eq!(gpu.surface_texel(), Color::BLACK.to_array());
    }

    #[test]
    fn missing_effect_file_fails_init() {
        let mut ctx = FrameContext::new(8, 8);
        let mut gpu = HeadlessDevice::new(8, 8);
        let mut effect = Effect::from_file("/no/such/effect.wgsl");
        assert!(effect.init(&mut ctx, &mut gpu).is_err());
    }

    #[test]
    fn clear_sets_surface_colour() {
        let mut ctx = FrameContext::new(8, 8);
        let mut gpu = HeadlessDevice::new(8, 8);
        gpu.begin_frame().unwrap();
        ClearPlugin(Color::RED).render(&mut ctx, &mut gpu).unwrap();
        gpu.end_frame().unwrap();
        assert_eq!(gpu.surface_texel(), [1.0, 0.0, 0.0, 1.0]);
    }
}
