//! The frame scheduler.
//!
//! A [`Runtime`] owns an ordered list of plugins, the single [`FrameContext`] they
//! share and the [`RenderDevice`] they draw with. The host calls
//! [`frame`](Runtime::frame) once per tick of its frame clock (the window's
//! redraw cycle in [`run`](crate::run)); each call advances time and dispatches
//! every plugin's render hook in registration order.
//!
//! ```text
//!            start            stop
//!   Idle ───────────▶ Running ─────▶ Stopped
//!    ▲                   ▲              │
//!    │                   └──── start ───┘
//!    └──────────── destroy (from any state)
//! ```
//!
//! Restarting after a stop resets the delta baseline to the restart instant, so
//! the paused interval shows up neither in `delta` nor in `time`.

use std::time::Duration;

use glam::Vec2;

use crate::clock::{Clock, SystemClock};
use crate::context::FrameContext;
use crate::device::RenderDevice;
use crate::error::{Error, Result};
use crate::plugin::{Named, Plugin, RenderFn};

/// Scheduler tuning.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RuntimeConfig {
    /// Upper bound on a single frame's delta. Longer gaps (a minimized window,
    /// a debugger break) are reported as this much time.
    pub max_delta: Duration,
    /// Factor applied to pointer velocity after every frame.
    pub pointer_decay: f32,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_delta: Duration::from_millis(100),
            pointer_decay: 0.9,
        }
    }
}

/// Lifecycle state of a [`Runtime`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RunState {
    #[default]
    Idle,
    Running,
    Stopped,
}

struct Slot {
    plugin: Box<dyn Plugin>,
    ready: bool,
}

/// Drives an ordered pipeline of plugins once per frame.
pub struct Runtime<D: RenderDevice> {
    device: D,
    slots: Vec<Slot>,
    ctx: FrameContext,
    config: RuntimeConfig,
    clock: Box<dyn Clock>,
    state: RunState,
    initialized: bool,
    /// Clock reading at the first start.
    origin: Option<Duration>,
    /// Total time spent stopped since `origin`.
    paused: Duration,
    stopped_at: Option<Duration>,
    last: Duration,
}

impl<D: RenderDevice> Runtime<D> {
    /// Create an idle runtime drawing with `device`, timed by the system clock.
    pub fn new(device: D) -> Self {
        let (width, height) = device.surface_size();
        Self {
            device,
            slots: Vec::new(),
            ctx: FrameContext::new(width, height),
            config: RuntimeConfig::default(),
            clock: Box::new(SystemClock::new()),
            state: RunState::Idle,
            initialized: false,
            origin: None,
            paused: Duration::ZERO,
            stopped_at: None,
            last: Duration::ZERO,
        }
    }

    pub fn with_config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the time source. Only meaningful before the first [`start`](Self::start).
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Append a plugin to the pipeline.
    ///
    /// Plugins added after [`start`](Self::start) are initialized at the beginning
    /// of the next frame, before any plugin renders.
    pub fn plugin(&mut self, plugin: impl Plugin + 'static) -> &mut Self {
        self.slots.push(Slot {
            plugin: Box::new(plugin),
            ready: false,
        });
        self
    }

    /// Append a render-only callback.
    pub fn render<F>(&mut self, f: F) -> &mut Self
    where
        F: FnMut(&mut FrameContext, &mut dyn RenderDevice) -> Result<()> + 'static,
    {
        self.plugin(RenderFn(f))
    }

    /// Initialize every plugin in registration order and begin producing frames.
    ///
    /// Calling this while already running does nothing. An `init` failure is
    /// returned and leaves the runtime not running.
    pub fn start(&mut self) -> Result<()> {
        if self.state == RunState::Running {
            return Ok(());
        }

        if !self.initialized {
            let (width, height) = self.device.surface_size();
            self.ctx.set_viewport(width, height);
        }
        self.init_pending()?;
        self.initialized = true;

        let now = self.clock.now();
        match (self.origin, self.stopped_at.take()) {
            (None, _) => self.origin = Some(now),
            (Some(_), Some(stopped_at)) => self.paused += now.saturating_sub(stopped_at),
            (Some(_), None) => {}
        }
        self.last = now;
        self.state = RunState::Running;
        log::info!("runtime started with {} plugins", self.slots.len());
        Ok(())
    }

    /// Stop scheduling frames. Plugins keep their resources.
    pub fn stop(&mut self) {
        if self.state == RunState::Running {
            self.stopped_at = Some(self.clock.now());
            self.state = RunState::Stopped;
            log::info!("runtime stopped at frame {}", self.ctx.frame);
        }
    }

    /// Produce one frame.
    ///
    /// Returns `Ok(true)` while the runtime is running and `Ok(false)` once it is
    /// not, in which case nothing was rendered. A plugin error aborts the rest of
    /// the frame and is returned unchanged.
    pub fn frame(&mut self) -> Result<bool> {
        if self.state != RunState::Running {
            return Ok(false);
        }
        self.init_pending()?;

        let now = self.clock.now();
        let delta = now.saturating_sub(self.last).min(self.config.max_delta);
        self.last = now;

        let origin = self.origin.unwrap_or(now);
        let elapsed = now.saturating_sub(origin).saturating_sub(self.paused);
        self.ctx.time = elapsed.as_secs_f32();
        self.ctx.delta = delta.as_secs_f32();
        self.ctx.frame += 1;

        self.device.begin_frame()?;
        for slot in &mut self.slots {
            slot.plugin.render(&mut self.ctx, &mut self.device)?;
        }
        self.device.end_frame()?;

        self.ctx.pointer.decay(self.config.pointer_decay);
        Ok(self.state == RunState::Running)
    }

    /// Replace the plugin tagged `name` in place.
    ///
    /// The old plugin is destroyed first. If the runtime has been started the
    /// replacement is initialized immediately; otherwise it is initialized with
    /// the rest at [`start`](Self::start). A replacement without a tag of its own
    /// inherits `name`.
    pub fn hot(&mut self, name: &str, plugin: impl Plugin + 'static) -> Result<()> {
        let index = self
            .slots
            .iter()
            .position(|slot| slot.plugin.name() == Some(name))
            .ok_or_else(|| Error::UnknownPlugin(name.to_string()))?;

        let slot = &mut self.slots[index];
        if slot.ready {
            slot.plugin.destroy(&mut self.ctx, &mut self.device);
        }

        slot.plugin = if plugin.name().is_some() {
            Box::new(plugin)
        } else {
            Box::new(Named::new(name, plugin))
        };
        slot.ready = false;

        if self.initialized {
            slot.plugin.init(&mut self.ctx, &mut self.device)?;
            slot.ready = true;
        }
        log::info!("hot-swapped plugin '{name}'");
        Ok(())
    }

    /// Destroy every plugin in registration order and empty the pipeline.
    pub fn reset(&mut self) {
        for slot in &mut self.slots {
            if slot.ready {
                slot.plugin.destroy(&mut self.ctx, &mut self.device);
            }
        }
        self.slots.clear();
    }

    /// Stop, destroy every plugin and release device state. The runtime returns
    /// to [`RunState::Idle`] with a fresh timeline.
    pub fn destroy(&mut self) {
        self.stop();
        self.reset();
        self.device.release();

        self.state = RunState::Idle;
        self.initialized = false;
        self.origin = None;
        self.stopped_at = None;
        self.paused = Duration::ZERO;

        self.ctx.time = 0.0;
        self.ctx.delta = 0.0;
        self.ctx.frame = 0;
        self.ctx.pointer = Default::default();
        self.ctx.program = None;
        self.ctx.camera = None;
        self.ctx.state.clear();
        log::info!("runtime destroyed");
    }

    /// Apply a new viewport size and dispatch every initialized plugin's resize hook.
    ///
    /// Zero-sized viewports (a minimized window) are ignored.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        self.device.resize(width, height);
        self.ctx.set_viewport(width, height);
        log::debug!("viewport resized to {width}x{height}");

        for slot in &mut self.slots {
            if slot.ready {
                slot.plugin.resize(&mut self.ctx, &mut self.device)?;
            }
        }
        Ok(())
    }

    /// Record a pointer position in pixels. Movement accumulates into velocity.
    pub fn pointer_moved(&mut self, x: f32, y: f32) {
        let size = Vec2::new(self.ctx.width.max(1) as f32, self.ctx.height.max(1) as f32);
        let position = Vec2::new(x, y) / size;
        let pointer = &mut self.ctx.pointer;
        pointer.velocity += position - pointer.position;
        pointer.position = position;
    }

    pub fn pointer_button(&mut self, down: bool) {
        self.ctx.pointer.down = down;
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == RunState::Running
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// The shared frame context.
    pub fn context(&self) -> &FrameContext {
        &self.ctx
    }

    pub fn context_mut(&mut self) -> &mut FrameContext {
        &mut self.ctx
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    /// Identity tags of the registered plugins, in order.
    pub fn names(&self) -> Vec<Option<&str>> {
        self.slots.iter().map(|slot| slot.plugin.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    fn init_pending(&mut self) -> Result<()> {
        for slot in &mut self.slots {
            if !slot.ready {
                slot.plugin.init(&mut self.ctx, &mut self.device)?;
                slot.ready = true;
            }
        }
        Ok(())
    }
}

impl<D: RenderDevice> Drop for Runtime<D> {
    fn drop(&mut self) {
        self.reset();
    }
}
