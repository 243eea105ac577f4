//! The capability interface every pipeline unit satisfies.
//!
//! A [`Plugin`] implements any subset of `init`, `render`, `resize` and
//! `destroy`; the rest default to no-ops. Plugins run in the order they were
//! registered with the [`Runtime`](crate::Runtime), and that order is load-bearing:
//! clear before draw, camera before anything that reads camera matrices.
//!
//! # Example
//!
//! ```
//! use flare::{FrameContext, Plugin, PluginExt, RenderDevice, Result};
//!
//! struct Spin {
//!     angle: f32,
//! }
//!
//! impl Plugin for Spin {
//!     fn render(&mut self, ctx: &mut FrameContext, _gpu: &mut dyn RenderDevice) -> Result<()> {
//!         self.angle += ctx.delta;
//!         ctx.state.insert("angle", self.angle);
//!         Ok(())
//!     }
//! }
//!
//! let spin = Spin { angle: 0.0 }.named("spin");
//! assert_eq!(spin.name(), Some("spin"));
//! ```

use crate::context::FrameContext;
use crate::device::RenderDevice;
use crate::error::Result;

/// A unit of per-frame behaviour.
///
/// GPU resources a plugin creates in [`init`](Plugin::init) belong to it until
/// [`destroy`](Plugin::destroy) is called. The runtime guarantees `init` runs
/// before the first `render`, and `destroy` runs at most once per `init`.
pub trait Plugin {
    /// Identity tag used by [`Runtime::hot`](crate::Runtime::hot).
    fn name(&self) -> Option<&str> {
        None
    }

    /// Acquire GPU resources. Called once, before the first frame.
    fn init(&mut self, _ctx: &mut FrameContext, _gpu: &mut dyn RenderDevice) -> Result<()> {
        Ok(())
    }

    /// Record this frame's work.
    ///
    /// An error aborts the remaining plugins for the frame.
    fn render(&mut self, _ctx: &mut FrameContext, _gpu: &mut dyn RenderDevice) -> Result<()> {
        Ok(())
    }

    /// The viewport changed. `ctx.width` and `ctx.height` already hold the new size.
    fn resize(&mut self, _ctx: &mut FrameContext, _gpu: &mut dyn RenderDevice) -> Result<()> {
        Ok(())
    }

    /// Release everything acquired in `init`.
    fn destroy(&mut self, _ctx: &mut FrameContext, _gpu: &mut dyn RenderDevice) {}
}

impl<P: Plugin + ?Sized> Plugin for Box<P> {
    fn name(&self) -> Option<&str> {
        (**self).name()
    }

    fn init(&mut self, ctx: &mut FrameContext, gpu: &mut dyn RenderDevice) -> Result<()> {
        (**self).init(ctx, gpu)
    }

    fn render(&mut self, ctx: &mut FrameContext, gpu: &mut dyn RenderDevice) -> Result<()> {
        (**self).render(ctx, gpu)
    }

    fn resize(&mut self, ctx: &mut FrameContext, gpu: &mut dyn RenderDevice) -> Result<()> {
        (**self).resize(ctx, gpu)
    }

    fn destroy(&mut self, ctx: &mut FrameContext, gpu: &mut dyn RenderDevice) {
        (**self).destroy(ctx, gpu)
    }
}

/// A bare render callback normalized into a plugin.
pub struct RenderFn<F>(pub F);

impl<F> Plugin for RenderFn<F>
where
    F: FnMut(&mut FrameContext, &mut dyn RenderDevice) -> Result<()>,
{
    fn render(&mut self, ctx: &mut FrameContext, gpu: &mut dyn RenderDevice) -> Result<()> {
        (self.0)(ctx, gpu)
    }
}

/// Attaches an identity tag to a plugin that has none.
pub struct Named<P> {
    name: String,
    inner: P,
}

impl<P> Named<P> {
    pub fn new(name: impl Into<String>, inner: P) -> Self {
        Self {
            name: name.into(),
            inner,
        }
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }

    pub fn inner_mut(&mut self) -> &mut P {
        &mut self.inner
    }
}

impl<P: Plugin> Plugin for Named<P> {
    fn name(&self) -> Option<&str> {
        Some(&self.name)
    }

    fn init(&mut self, ctx: &mut FrameContext, gpu: &mut dyn RenderDevice) -> Result<()> {
        self.inner.init(ctx, gpu)
    }

    fn render(&mut self, ctx: &mut FrameContext, gpu: &mut dyn RenderDevice) -> Result<()> {
        self.inner.render(ctx, gpu)
    }

    fn resize(&mut self, ctx: &mut FrameContext, gpu: &mut dyn RenderDevice) -> Result<()> {
        self.inner.resize(ctx, gpu)
    }

    fn destroy(&mut self, ctx: &mut FrameContext, gpu: &mut dyn RenderDevice) {
        self.inner.destroy(ctx, gpu)
    }
}

/// Extension methods available on every plugin.
pub trait PluginExt: Plugin + Sized {
    /// Tag this plugin so it can be replaced with [`Runtime::hot`](crate::Runtime::hot).
    fn named(self, name: impl Into<String>) -> Named<Self> {
        Named::new(name, self)
    }
}

impl<P: Plugin> PluginExt for P {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::HeadlessDevice;

    struct Silent;
    impl Plugin for Silent {}

    #[test]
    fn default_hooks_are_no_ops() {
        let mut ctx = FrameContext::new(4, 4);
        let mut gpu = HeadlessDevice::new(4, 4);
        let mut plugin = Silent;
        assert!(plugin.name().is_none());
        plugin.init(&mut ctx, &mut gpu).unwrap();
        plugin.render(&mut ctx, &mut gpu).unwrap();
        plugin.resize(&mut ctx, &mut gpu).unwrap();
        plugin.destroy(&mut ctx, &mut gpu);
        assert!(gpu.commands().is_empty());
    }

    #[test]
    fn render_fn_forwards_to_closure() {
        let mut ctx = FrameContext::new(4, 4);
        let mut gpu = HeadlessDevice::new(4, 4);
        let mut plugin = RenderFn(|ctx: &mut FrameContext, _: &mut dyn RenderDevice| {
            ctx.state.insert("hit", true);
            Ok(())
        });
        plugin.render(&mut ctx, &mut gpu).unwrap();
        assert_eq!(ctx.state.get::<bool>("hit"), Some(&true));
    }

    #[test]
    fn named_wraps_and_boxes_keep_the_tag() {
        let boxed: Box<dyn Plugin> = Box::new(Silent.named("silent"));
        assert_eq!(boxed.name(), Some("silent"));
    }

    struct Counter(u32);
    impl Plugin for Counter {
        fn render(&mut self, _: &mut FrameContext, _: &mut dyn RenderDevice) -> Result<()> {
            self.0 += 1;
            Ok(())
        }
    }

    #[test]
    fn named_forwards_hooks_to_the_inner_plugin() {
        let mut ctx = FrameContext::new(4, 4);
        let mut gpu = HeadlessDevice::new(4, 4);
        let mut named = Counter(0).named("counter");
        named.render(&mut ctx, &mut gpu).unwrap();
        named.render(&mut ctx, &mut gpu).unwrap();
        assert_eq!(named.inner().0, 2);

        named.inner_mut().0 = 10;
        named.render(&mut ctx, &mut gpu).unwrap();
        assert_eq!(named.inner().0, 11);
        assert_eq!(named.name(), Some("counter"));
    }
}
