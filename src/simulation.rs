//! Double-buffered (ping-pong) simulation engine.
//!
//! A [`Simulation`] owns two offscreen floating-point targets. Each frame it runs
//! the *simulate* program `iterations` times, every time reading the current
//! state and writing the other target, then swapping their roles. A *display*
//! program finally samples the newest state and draws it to the surface.
//!
//! ```text
//!   iteration 0:  read A ──simulate──▶ write B   swap
//!   iteration 1:  read B ──simulate──▶ write A   swap
//!   display:      read A ──display───▶ surface
//! ```
//!
//! State lives at `floor(viewport * scale)` resolution. Resizing reallocates
//! both targets and the previous state is discarded; new targets read as
//! transparent black.
//!
//! # Example
//!
//! ```no_run
//! use flare::Simulation;
//!
//! Simulation::new()
//!     .simulate_file("demos/shaders/fire_simulate.wgsl")
//!     .display_file("demos/shaders/fire_display.wgsl")
//!     .scale(0.5)
//!     .iterations(2)
//!     .go()
//!     .unwrap();
//! ```

use std::cell::Cell;
use std::path::PathBuf;
use std::rc::Rc;

use crate::app::{AppConfig, run_with_config};
use crate::context::FrameContext;
use crate::device::{
    FullscreenPass, Output, OutputFormat, ProgramKind, RenderDevice, StatePrecision,
    TargetDescriptor, TargetId,
};
use crate::error::Result;
use crate::hot_shader::{ShaderSource, ShaderStage};
use crate::plugin::Plugin;

/// A pair of values with alternating read and write roles.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PingPong<T> {
    read: T,
    write: T,
}

impl<T> PingPong<T> {
    /// `read` starts as the read side and `write` as the write side.
    pub fn new(read: T, write: T) -> Self {
        Self { read, write }
    }

    pub fn read(&self) -> &T {
        &self.read
    }

    pub fn write(&self) -> &T {
        &self.write
    }

    /// Exchange roles: the side just written becomes the side to read.
    pub fn swap(&mut self) {
        std::mem::swap(&mut self.read, &mut self.write);
    }

    pub fn into_inner(self) -> (T, T) {
        (self.read, self.write)
    }
}

/// Shared switch for pausing a simulation from outside the runtime.
///
/// While stopped, stepping is frozen but the display pass keeps drawing the
/// last state.
#[derive(Clone, Debug)]
pub struct SimulationControl {
    running: Rc<Cell<bool>>,
}

impl SimulationControl {
    fn new() -> Self {
        Self {
            running: Rc::new(Cell::new(true)),
        }
    }

    pub fn stop(&self) {
        self.running.set(false);
    }

    pub fn resume(&self) {
        self.running.set(true);
    }

    pub fn is_running(&self) -> bool {
        self.running.get()
    }
}

/// A feedback simulation rendered through two alternating state targets.
///
/// Both program stages are fullscreen programs (see
/// [`ProgramKind::Fullscreen`]). The previous state is bound at
/// `@group(0) @binding(1)`; [`FrameUniforms::iteration`](crate::FrameUniforms::iteration)
/// carries the sub-step index.
#[derive(Debug)]
pub struct Simulation {
    simulate: Option<ShaderStage>,
    display: Option<ShaderStage>,
    scale: f32,
    iterations: u32,
    precision: StatePrecision,
    control: SimulationControl,
    buffers: Option<PingPong<TargetId>>,
    size: (u32, u32),
}

impl Default for Simulation {
    fn default() -> Self {
        Self {
            simulate: None,
            display: None,
            scale: 1.0,
            iterations: 1,
            precision: StatePrecision::default(),
            control: SimulationControl::new(),
            buffers: None,
            size: (0, 0),
        }
    }
}

impl Simulation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Program that computes the next state from the previous one.
    pub fn simulate(mut self, source: impl Into<String>) -> Self {
        self.simulate = Some(ShaderStage::new(
            "simulate",
            ShaderSource::Inline(source.into()),
        ));
        self
    }

    /// Like [`simulate`](Self::simulate), read from a file and recompiled when it changes.
    pub fn simulate_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.simulate = Some(ShaderStage::new("simulate", ShaderSource::watched(path)));
        self
    }

    /// Program that draws the current state to the surface.
    pub fn display(mut self, source: impl Into<String>) -> Self {
        self.display = Some(ShaderStage::new(
            "display",
            ShaderSource::Inline(source.into()),
        ));
        self
    }

    /// Like [`display`](Self::display), read from a file and recompiled when it changes.
    pub fn display_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.display = Some(ShaderStage::new("display", ShaderSource::watched(path)));
        self
    }

    /// State resolution as a fraction of the viewport, in `(0, 1]`.
    pub fn scale(mut self, factor: f32) -> Self {
        self.scale = if factor.is_finite() && factor > 0.0 && factor <= 1.0 {
            factor
        } else {
            log::warn!("simulation scale {factor} is outside (0, 1], using 1");
            1.0
        };
        self
    }

    /// Simulate steps per displayed frame. At least one.
    pub fn iterations(mut self, n: u32) -> Self {
        self.iterations = n.max(1);
        self
    }

    pub fn precision(mut self, precision: StatePrecision) -> Self {
        self.precision = precision;
        self
    }

    /// A handle that can pause and resume stepping.
    pub fn control(&self) -> SimulationControl {
        self.control.clone()
    }

    pub fn stop(&self) {
        self.control.stop();
    }

    pub fn resume(&self) {
        self.control.resume();
    }

    /// The target holding the newest state, once initialized.
    pub fn state(&self) -> Option<TargetId> {
        self.buffers.as_ref().map(|b| *b.read())
    }

    pub fn buffers(&self) -> Option<&PingPong<TargetId>> {
        self.buffers.as_ref()
    }

    /// Current state resolution.
    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    /// Open a window running just this simulation.
    pub fn go(self) -> Result<()> {
        self.go_with(AppConfig::default())
    }

    pub fn go_with(self, config: AppConfig) -> Result<()> {
        run_with_config(config, move |runtime| {
            runtime.plugin(self);
            Ok(())
        })
    }

    fn scaled(&self, width: u32, height: u32) -> (u32, u32) {
        let scale = |v: u32| ((v as f32 * self.scale).floor() as u32).max(1);
        (scale(width), scale(height))
    }

    fn allocate(&mut self, ctx: &FrameContext, gpu: &mut dyn RenderDevice) -> Result<()> {
        let (width, height) = self.scaled(ctx.width, ctx.height);
        let desc = |label: &'static str| TargetDescriptor {
            label,
            width,
            height,
            precision: self.precision,
        };

        let a = gpu.create_target(&desc("Simulation State A"))?;
        let b = match gpu.create_target(&desc("Simulation State B")) {
            Ok(b) => b,
            Err(err) => {
                gpu.destroy_target(a);
                return Err(err);
            }
        };

        self.buffers = Some(PingPong::new(a, b));
        self.size = (width, height);
        log::info!(
            "allocated {width}x{height} {:?} simulation state",
            self.precision
        );
        Ok(())
    }

    fn release(&mut self, gpu: &mut dyn RenderDevice) {
        if let Some(buffers) = self.buffers.take() {
            let (a, b) = buffers.into_inner();
            gpu.destroy_target(a);
            gpu.destroy_target(b);
        }
    }

    fn compile_stages(&mut self, gpu: &mut dyn RenderDevice) -> Result<()> {
        let state = ProgramKind::Fullscreen {
            output: OutputFormat::State(self.precision),
        };
        let surface = ProgramKind::Fullscreen {
            output: OutputFormat::Surface,
        };
        if let Some(stage) = self.simulate.as_mut() {
            stage.compile(gpu, state)?;
        }
        if let Some(stage) = self.display.as_mut() {
            stage.compile(gpu, surface)?;
        }
        Ok(())
    }

    /// Release both targets and every compiled program.
    fn teardown(&mut self, gpu: &mut dyn RenderDevice) {
        self.release(gpu);
        for stage in [self.simulate.as_mut(), self.display.as_mut()]
            .into_iter()
            .flatten()
        {
            stage.destroy(gpu);
        }
    }
}

impl Plugin for Simulation {
    /// Allocates state and compiles both stages. Allocation failure is fatal; a
    /// stage that fails to compile is logged and skipped for the session.
    ///
    /// A failed init leaves nothing allocated, so it can be retried.
    fn init(&mut self, ctx: &mut FrameContext, gpu: &mut dyn RenderDevice) -> Result<()> {
        self.teardown(gpu);
        self.allocate(ctx, gpu)?;
        if let Err(err) = self.compile_stages(gpu) {
            self.teardown(gpu);
            return Err(err);
        }
        Ok(())
    }

    fn render(&mut self, ctx: &mut FrameContext, gpu: &mut dyn RenderDevice) -> Result<()> {
        for stage in [self.simulate.as_mut(), self.display.as_mut()]
            .into_iter()
            .flatten()
        {
            stage.reload(gpu);
        }

        let Some(buffers) = self.buffers.as_mut() else {
            return Ok(());
        };

        let simulate = self.simulate.as_ref().and_then(ShaderStage::program);
        if let (Some(program), true) = (simulate, self.control.is_running()) {
            for iteration in 0..self.iterations {
                gpu.fullscreen(&FullscreenPass {
                    program,
                    input: Some(*buffers.read()),
                    output: Output::Target(*buffers.write()),
                    uniforms: ctx.uniforms(self.size, iteration),
                })?;
                buffers.swap();
            }
            ctx.program = Some(program);
        }

        if let Some(program) = self.display.as_ref().and_then(ShaderStage::program) {
            gpu.fullscreen(&FullscreenPass {
                program,
                input: Some(*buffers.read()),
                output: Output::Surface,
                uniforms: ctx.uniforms(ctx.size(), 0),
            })?;
            ctx.program = Some(program);
        }
        Ok(())
    }

    /// Reallocates both targets at the new scaled size. Existing state is discarded.
    fn resize(&mut self, ctx: &mut FrameContext, gpu: &mut dyn RenderDevice) -> Result<()> {
        self.release(gpu);
        self.allocate(ctx, gpu)
    }

    fn destroy(&mut self, _ctx: &mut FrameContext, gpu: &mut dyn RenderDevice) {
        self.teardown(gpu);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{Command, HeadlessDevice};
    use crate::error::Error;

    const COUNT: &str = "count";
    const SHOW: &str = "show";

    fn counting_device(width: u32, height: u32) -> HeadlessDevice {
        HeadlessDevice::new(width, height).with_kernel(COUNT, |input, _| {
            let prev = input.unwrap_or_default();
            [prev[0] + 1.0, prev[1], prev[2], prev[3]]
        })
    }

    fn counter(iterations: u32) -> Simulation {
        Simulation::new()
            .simulate(COUNT)
            .display(SHOW)
            .iterations(iterations)
    }

    fn render_frame(sim: &mut Simulation, ctx: &mut FrameContext, gpu: &mut HeadlessDevice) {
        gpu.begin_frame().unwrap();
        sim.render(ctx, gpu).unwrap();
        gpu.end_frame().unwrap();
    }

    #[test]
    fn swap_twice_is_identity() {
        let mut pair = PingPong::new('a', 'b');
        let original = pair;
        pair.swap();
        assert_eq!((*pair.read(), *pair.write()), ('b', 'a'));
        pair.swap();
        assert_eq!(pair, original);
    }

    #[test]
    fn role_parity_follows_iteration_count() {
        for n in 0..7u32 {
            let mut pair = PingPong::new(0, 1);
            for _ in 0..n {
                pair.swap();
            }
            assert_eq!(*pair.read() as u32, n % 2);
        }
    }

    #[test]
    fn display_sees_every_iteration() {
        let mut ctx = FrameContext::new(64, 64);
        let mut gpu = counting_device(64, 64);
        let mut sim = counter(3);
        sim.init(&mut ctx, &mut gpu).unwrap();

        render_frame(&mut sim, &mut ctx, &mut gpu);
        assert_eq!(gpu.surface_texel()[0], 3.0);

        render_frame(&mut sim, &mut ctx, &mut gpu);
        assert_eq!(gpu.surface_texel()[0], 6.0);
    }

    #[test]
    fn each_iteration_reads_what_the_last_wrote() {
        let mut ctx = FrameContext::new(16, 16);
        let mut gpu = counting_device(16, 16);
        let mut sim = counter(3);
        sim.init(&mut ctx, &mut gpu).unwrap();
        let (a, b) = (*sim.buffers().unwrap().read(), *sim.buffers().unwrap().write());
        gpu.take_commands();

        render_frame(&mut sim, &mut ctx, &mut gpu);

        let passes: Vec<_> = gpu
            .commands()
            .iter()
            .filter_map(|c| match c {
                Command::Fullscreen { input, output, .. } => Some((*input, *output)),
                _ => None,
            })
            .collect();
        assert_eq!(
            passes,
            [
                (Some(a), Output::Target(b)),
                (Some(b), Output::Target(a)),
                (Some(a), Output::Target(b)),
                (Some(b), Output::Surface),
            ]
        );
        // Odd iteration count leaves the roles exchanged.
        assert_eq!(sim.state(), Some(b));
    }

    #[test]
    fn state_is_scaled_and_floored() {
        let mut ctx = FrameContext::new(101, 51);
        let mut gpu = counting_device(101, 51);
        let mut sim = counter(1).scale(0.5);
        sim.init(&mut ctx, &mut gpu).unwrap();
        assert_eq!(sim.size(), (50, 25));
        let state = sim.state().unwrap();
        assert_eq!(gpu.target_size(state), Some((50, 25)));
    }

    #[test]
    fn out_of_range_scale_falls_back_to_full_resolution() {
        assert_eq!(Simulation::new().scale(0.0).scale, 1.0);
        assert_eq!(Simulation::new().scale(f32::NAN).scale, 1.0);
        assert_eq!(Simulation::new().scale(4.0).scale, 1.0);
    }

    #[test]
    fn resize_discards_state() {
        let mut ctx = FrameContext::new(64, 64);
        let mut gpu = counting_device(64, 64);
        let mut sim = counter(1).scale(0.5);
        sim.init(&mut ctx, &mut gpu).unwrap();
        for _ in 0..4 {
            render_frame(&mut sim, &mut ctx, &mut gpu);
        }
        assert_eq!(gpu.target_texel(sim.state().unwrap()), Some([4.0, 0.0, 0.0, 0.0]));

        ctx.set_viewport(128, 32);
        sim.resize(&mut ctx, &mut gpu).unwrap();

        let buffers = *sim.buffers().unwrap();
        assert_eq!(gpu.live_targets(), 2);
        assert_eq!(sim.size(), (64, 16));
        assert_eq!(gpu.target_texel(*buffers.read()), Some([0.0; 4]));
        assert_eq!(gpu.target_texel(*buffers.write()), Some([0.0; 4]));

        render_frame(&mut sim, &mut ctx, &mut gpu);
        assert_eq!(gpu.surface_texel()[0], 1.0);
    }

    #[test]
    fn compile_failure_disables_only_that_stage() {
        let mut ctx = FrameContext::new(8, 8);
        let mut gpu = counting_device(8, 8).reject(SHOW);
        let mut sim = counter(2);
        sim.init(&mut ctx, &mut gpu).unwrap();
        gpu.take_commands();

        render_frame(&mut sim, &mut ctx, &mut gpu);

        let outputs: Vec<_> = gpu
            .commands()
            .iter()
            .filter_map(|c| match c {
                Command::Fullscreen { output, .. } => Some(*output),
                _ => None,
            })
            .collect();
        assert_eq!(outputs.len(), 2);
        assert!(!outputs.contains(&Output::Surface));
        assert_eq!(gpu.target_texel(sim.state().unwrap()), Some([2.0, 0.0, 0.0, 0.0]));
    }

    #[test]
    fn allocation_failure_is_fatal() {
        let mut ctx = FrameContext::new(8, 8);
        let mut gpu = counting_device(8, 8).without_precision(StatePrecision::Full);
        let mut sim = counter(1).precision(StatePrecision::Full);

        let err = sim.init(&mut ctx, &mut gpu).unwrap_err();
        assert!(matches!(err, Error::AllocationFailure { .. }));
        assert_eq!(gpu.live_targets(), 0);
        assert_eq!(gpu.live_programs(), 0);
    }

    #[test]
    fn stopped_simulation_still_displays() {
        let mut ctx = FrameContext::new(8, 8);
        let mut gpu = counting_device(8, 8);
        let mut sim = counter(1);
        let control = sim.control();
        sim.init(&mut ctx, &mut gpu).unwrap();

        render_frame(&mut sim, &mut ctx, &mut gpu);
        control.stop();
        render_frame(&mut sim, &mut ctx, &mut gpu);
        render_frame(&mut sim, &mut ctx, &mut gpu);
        assert_eq!(gpu.surface_texel()[0], 1.0);

        control.resume();
        render_frame(&mut sim, &mut ctx, &mut gpu);
        assert_eq!(gpu.surface_texel()[0], 2.0);
    }

    #[test]
    fn iteration_index_reaches_the_program() {
        let mut ctx = FrameContext::new(8, 8);
        let mut gpu = HeadlessDevice::new(8, 8)
            .with_kernel(COUNT, |input, u| {
                let prev = input.unwrap_or_default();
                [prev[0] + u.iteration as f32, u.resolution[0], 0.0, 0.0]
            });
        let mut sim = counter(4).scale(0.5);
        sim.init(&mut ctx, &mut gpu).unwrap();

        render_frame(&mut sim, &mut ctx, &mut gpu);
        assert_eq!(gpu.surface_texel()[0], 6.0);
        assert_eq!(gpu.surface_texel()[1], 4.0);
    }

    #[test]
    fn destroy_releases_everything() {
        let mut ctx = FrameContext::new(8, 8);
        let mut gpu = counting_device(8, 8);
        let mut sim = counter(1);
        sim.init(&mut ctx, &mut gpu).unwrap();
        assert_eq!((gpu.live_targets(), gpu.live_programs()), (2, 2));

        sim.destroy(&mut ctx, &mut gpu);
        assert_eq!((gpu.live_targets(), gpu.live_programs()), (0, 0));
        assert!(sim.state().is_none());
    }

    #[test]
    fn failed_init_releases_everything() {
        let mut ctx = FrameContext::new(8, 8);
        let mut gpu = counting_device(8, 8);
        let mut sim = Simulation::new()
            .simulate(COUNT)
            .display_file("/no/such/display.wgsl");

        let err = sim.init(&mut ctx, &mut gpu).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
        assert_eq!((gpu.live_targets(), gpu.live_programs()), (0, 0));
        assert!(sim.state().is_none());

        assert!(sim.init(&mut ctx, &mut gpu).is_err());
        assert_eq!((gpu.live_targets(), gpu.live_programs()), (0, 0));
    }

    #[test]
    fn repeated_init_does_not_leak() {
        let mut ctx = FrameContext::new(8, 8);
        let mut gpu = counting_device(8, 8);
        let mut sim = counter(1);
        sim.init(&mut ctx, &mut gpu).unwrap();
        sim.init(&mut ctx, &mut gpu).unwrap();
        assert_eq!((gpu.live_targets(), gpu.live_programs()), (2, 2));
    }
}
