//! Per-frame shared state handed to every plugin.
//!
//! One [`FrameContext`] exists per [`Runtime`](crate::Runtime). The runtime owns it
//! for its whole lifetime and lends it to each plugin hook in registration order.
//!
//! # Ordering contract
//!
//! Nothing here is locked. Plugins read and write fields directly, and a value
//! written by one plugin is visible to every plugin registered after it in the
//! same frame. The well-known slots are:
//!
//! - [`camera`](FrameContext::camera): written by a camera plugin, read by materials.
//!   The camera plugin must be registered before any scene that draws with it.
//! - [`program`](FrameContext::program): the program most recently bound by a
//!   material or pass.
//! - [`state`](FrameContext::state): free-form values for inter-plugin communication.

use std::any::Any;
use std::collections::HashMap;

use glam::{Mat4, Vec2, Vec3};

use crate::device::ProgramId;

/// Normalized pointer state.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Pointer {
    /// Position in `[0, 1]` across the viewport, origin top-left.
    pub position: Vec2,
    /// Accumulated movement in normalized units; decays after every frame.
    pub velocity: Vec2,
    /// Whether the primary button is held.
    pub down: bool,
}

impl Pointer {
    /// Scale velocity towards zero, snapping tiny residues to exactly zero.
    pub fn decay(&mut self, factor: f32) {
        self.velocity *= factor;
        if self.velocity.length_squared() < 1e-10 {
            self.velocity = Vec2::ZERO;
        }
    }
}

/// Camera matrices published into the context for materials to consume.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraMatrices {
    pub view: Mat4,
    pub projection: Mat4,
    pub view_projection: Mat4,
    pub position: Vec3,
}

impl Default for CameraMatrices {
    fn default() -> Self {
        Self {
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
            view_projection: Mat4::IDENTITY,
            position: Vec3::ZERO,
        }
    }
}

/// Free-form typed values keyed by name.
#[derive(Default)]
pub struct StateMap {
    values: HashMap<String, Box<dyn Any>>,
}

impl StateMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a value, replacing whatever was under `key`.
    pub fn insert<T: Any>(&mut self, key: impl Into<String>, value: T) {
        self.values.insert(key.into(), Box::new(value));
    }

    /// Typed read. Returns `None` when absent or stored with a different type.
    pub fn get<T: Any>(&self, key: &str) -> Option<&T> {
        self.values.get(key).and_then(|v| v.downcast_ref())
    }

    pub fn get_mut<T: Any>(&mut self, key: &str) -> Option<&mut T> {
        self.values.get_mut(key).and_then(|v| v.downcast_mut())
    }

    /// Read a value or insert one produced by `init`.
    pub fn get_or_insert_with<T: Any>(&mut self, key: &str, init: impl FnOnce() -> T) -> &mut T {
        let present = matches!(self.values.get(key), Some(v) if v.is::<T>());
        if !present {
            self.values.insert(key.to_string(), Box::new(init()));
        }
        // The slot holds a `T` at this point.
        self.values
            .get_mut(key)
            .and_then(|v| v.downcast_mut())
            .unwrap_or_else(|| unreachable!())
    }

    pub fn remove(&mut self, key: &str) -> bool {
        self.values.remove(key).is_some()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }
}

impl std::fmt::Debug for StateMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.values.keys()).finish()
    }
}

/// Standard uniforms uploaded for every fullscreen pass.
///
/// Bound at `@group(0) @binding(0)`. The layout matches WGSL struct alignment
/// (48 bytes, 16-byte aligned).
///
/// # WGSL Declaration
///
/// ```wgsl
/// struct Frame {
///     resolution: vec2f,
///     time: f32,
///     delta: f32,
///     pointer: vec2f,
///     pointer_velocity: vec2f,
///     frame: u32,
///     pointer_down: u32,
///     iteration: u32,
///     _pad: u32,
/// }
/// @group(0) @binding(0) var<uniform> u: Frame;
/// ```
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct FrameUniforms {
    /// Size in pixels of the target being rendered.
    pub resolution: [f32; 2],
    pub time: f32,
    pub delta: f32,
    pub pointer: [f32; 2],
    pub pointer_velocity: [f32; 2],
    /// Frame counter, truncated to 32 bits.
    pub frame: u32,
    pub pointer_down: u32,
    /// Sub-step index within the frame for iterated passes.
    pub iteration: u32,
    pub _pad: u32,
}

/// Shared per-frame context.
#[derive(Debug)]
pub struct FrameContext {
    /// Seconds since the runtime first started, excluding stopped intervals.
    pub time: f32,
    /// Seconds since the previous frame, clamped to the runtime's `max_delta`.
    pub delta: f32,
    /// Frames rendered so far; the first frame sees `1`.
    pub frame: u64,
    /// Viewport width in pixels.
    pub width: u32,
    /// Viewport height in pixels.
    pub height: u32,
    /// `width / height`, or `1.0` for a degenerate viewport.
    pub aspect: f32,
    pub pointer: Pointer,
    /// The program most recently bound for drawing.
    pub program: Option<ProgramId>,
    /// Camera matrices for this frame, if a camera plugin published any.
    pub camera: Option<CameraMatrices>,
    pub state: StateMap,
}

impl FrameContext {
    pub(crate) fn new(width: u32, height: u32) -> Self {
        let mut ctx = Self {
            time: 0.0,
            delta: 0.0,
            frame: 0,
            width: 0,
            height: 0,
            aspect: 1.0,
            pointer: Pointer::default(),
            program: None,
            camera: None,
            state: StateMap::new(),
        };
        ctx.set_viewport(width, height);
        ctx
    }

    pub(crate) fn set_viewport(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.aspect = if height > 0 {
            width as f32 / height as f32
        } else {
            1.0
        };
    }

    /// Viewport size in pixels.
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Build the uniform block for a pass rendering into `resolution`.
    pub fn uniforms(&self, resolution: (u32, u32), iteration: u32) -> FrameUniforms {
        FrameUniforms {
            resolution: [resolution.0 as f32, resolution.1 as f32],
            time: self.time,
            delta: self.delta,
            pointer: self.pointer.position.to_array(),
            pointer_velocity: self.pointer.velocity.to_array(),
            frame: self.frame as u32,
            pointer_down: self.pointer.down as u32,
            iteration,
            _pad: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn viewport_updates_aspect() {
        let mut ctx = FrameContext::new(800, 400);
        assert_eq!(ctx.aspect, 2.0);
        ctx.set_viewport(100, 0);
        assert_eq!(ctx.aspect, 1.0);
        assert_eq!(ctx.size(), (100, 0));
    }

    #[test]
    fn state_map_is_typed() {
        let mut state = StateMap::new();
        state.insert("count", 3u32);
        assert_eq!(state.get::<u32>("count"), Some(&3));
        assert_eq!(state.get::<f32>("count"), None);

        *state.get_mut::<u32>("count").unwrap() += 1;
        assert_eq!(state.get::<u32>("count"), Some(&4));

        assert!(state.remove("count"));
        assert!(state.is_empty());
    }

    #[test]
    fn state_map_get_or_insert_replaces_mismatched_type() {
        let mut state = StateMap::new();
        state.insert("speed", "fast");
        *state.get_or_insert_with("speed", || 1.0f32) += 1.0;
        assert_eq!(state.get::<f32>("speed"), Some(&2.0));
    }

    #[test]
    fn pointer_decay_snaps_to_zero() {
        let mut p = Pointer {
            velocity: Vec2::new(1.0, 0.0),
            ..Default::default()
        };
        p.decay(0.5);
        assert_eq!(p.velocity, Vec2::new(0.5, 0.0));
        for _ in 0..64 {
            p.decay(0.5);
        }
        assert_eq!(p.velocity, Vec2::ZERO);
    }

    #[test]
    fn uniforms_pack_pointer_state() {
        let mut ctx = FrameContext::new(64, 32);
        ctx.frame = 7;
        ctx.pointer.down = true;
        ctx.pointer.position = Vec2::new(0.25, 0.75);
        let u = ctx.uniforms((16, 8), 2);
        assert_eq!(u.resolution, [16.0, 8.0]);
        assert_eq!(u.frame, 7);
        assert_eq!(u.pointer_down, 1);
        assert_eq!(u.pointer, [0.25, 0.75]);
        assert_eq!(u.iteration, 2);
        assert_eq!(std::mem::size_of::<FrameUniforms>(), 48);
    }
}
