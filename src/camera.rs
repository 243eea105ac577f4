use std::f32::consts::{FRAC_PI_2, TAU};

use glam::{Mat4, Vec3};

use crate::context::{CameraMatrices, FrameContext};
use crate::device::RenderDevice;
use crate::error::Result;
use crate::plugin::Plugin;

/// A simple perspective camera.
///
/// Provides position, orientation, field of view and clip planes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    pub forward: Vec3,
    pub up: Vec3,
    /// Vertical field of view in radians.
    pub fov: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, 5.0),
            forward: Vec3::NEG_Z,
            up: Vec3::Y,
            fov: FRAC_PI_2,
            near: 0.1,
            far: 1000.0,
        }
    }
}

impl Camera {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn at(mut self, x: f32, y: f32, z: f32) -> Self {
        self.position = Vec3::new(x, y, z);
        self
    }

    pub fn looking_at(mut self, x: f32, y: f32, z: f32) -> Self {
        self.forward = (Vec3::new(x, y, z) - self.position).normalize_or(Vec3::NEG_Z);
        self
    }

    pub fn with_fov(mut self, fov_degrees: f32) -> Self {
        self.fov = fov_degrees.to_radians();
        self
    }

    pub fn with_clip(mut self, near: f32, far: f32) -> Self {
        self.near = near;
        self.far = far;
        self
    }

    /// Compute the right vector from forward and up.
    pub fn right(&self) -> Vec3 {
        self.forward.cross(self.up).normalize_or_zero()
    }

    /// Recompute up to be orthogonal to forward and right.
    pub fn orthogonal_up(&self) -> Vec3 {
        self.right().cross(self.forward).normalize_or_zero()
    }

    pub fn view(&self) -> Mat4 {
        Mat4::look_to_rh(self.position, self.forward, self.up)
    }

    pub fn projection(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(self.fov, aspect, self.near, self.far)
    }

    /// View and projection for a viewport of the given aspect ratio.
    pub fn matrices(&self, aspect: f32) -> CameraMatrices {
        let view = self.view();
        let projection = self.projection(aspect);
        CameraMatrices {
            view,
            projection,
            view_projection: projection * view,
            position: self.position,
        }
    }
}

/// A camera that circles a target point.
///
/// Dragging with the pointer held rotates it; `speed` adds a constant spin.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Orbit {
    pub target: Vec3,
    pub distance: f32,
    /// Horizontal angle in radians.
    pub azimuth: f32,
    /// Vertical angle in radians, kept short of the poles.
    pub elevation: f32,
    /// Auto-rotation in radians per second.
    pub speed: f32,
    /// Radians of rotation per full viewport width of drag.
    pub drag: f32,
}

impl Default for Orbit {
    fn default() -> Self {
        Self {
            target: Vec3::ZERO,
            distance: 5.0,
            azimuth: 0.0,
            elevation: 0.3,
            speed: 0.0,
            drag: TAU,
        }
    }
}

impl Orbit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn target(mut self, target: impl Into<Vec3>) -> Self {
        self.target = target.into();
        self
    }

    pub fn distance(mut self, distance: f32) -> Self {
        self.distance = distance.max(0.01);
        self
    }

    pub fn elevation(mut self, elevation: f32) -> Self {
        self.elevation = clamp_elevation(elevation);
        self
    }

    pub fn auto_rotate(mut self, speed: f32) -> Self {
        self.speed = speed;
        self
    }

    /// Advance by one frame of pointer input and elapsed time.
    pub fn update(&mut self, ctx: &FrameContext) {
        self.azimuth += self.speed * ctx.delta;
        if ctx.pointer.down {
            self.azimuth -= ctx.pointer.velocity.x * self.drag;
            self.elevation = clamp_elevation(self.elevation + ctx.pointer.velocity.y * self.drag);
        }
    }

    /// Place `camera` on the orbit, looking at the target.
    pub fn apply(&self, camera: &mut Camera) {
        let offset = Vec3::new(
            self.distance * self.elevation.cos() * self.azimuth.sin(),
            self.distance * self.elevation.sin(),
            self.distance * self.elevation.cos() * self.azimuth.cos(),
        );
        camera.position = self.target + offset;
        camera.forward = (self.target - camera.position).normalize_or(Vec3::NEG_Z);
        camera.up = Vec3::Y;
    }
}

fn clamp_elevation(elevation: f32) -> f32 {
    elevation.clamp(-FRAC_PI_2 + 0.01, FRAC_PI_2 - 0.01)
}

/// Publishes camera matrices into [`FrameContext::camera`] every frame.
///
/// Register it before any plugin whose materials read the camera.
#[derive(Clone, Debug, Default)]
pub struct CameraPlugin {
    pub camera: Camera,
    pub orbit: Option<Orbit>,
}

impl CameraPlugin {
    pub fn new(camera: Camera) -> Self {
        Self {
            camera,
            orbit: None,
        }
    }

    pub fn orbit(orbit: Orbit) -> Self {
        let mut camera = Camera::default();
        orbit.apply(&mut camera);
        Self {
            camera,
            orbit: Some(orbit),
        }
    }
}

impl Plugin for CameraPlugin {
    fn name(&self) -> Option<&str> {
        Some("camera")
    }

    fn render(&mut self, ctx: &mut FrameContext, _gpu: &mut dyn RenderDevice) -> Result<()> {
        if let Some(orbit) = self.orbit.as_mut() {
            orbit.update(ctx);
            orbit.apply(&mut self.camera);
        }
        ctx.camera = Some(self.camera.matrices(ctx.aspect));
        Ok(())
    }

    fn destroy(&mut self, ctx: &mut FrameContext, _gpu: &mut dyn RenderDevice) {
        ctx.camera = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::HeadlessDevice;

    #[test]
    fn looking_at_normalizes_forward() {
        let camera = Camera::new().at(0.0, 0.0, 10.0).looking_at(0.0, 0.0, 0.0);
        assert!(camera.forward.abs_diff_eq(Vec3::NEG_Z, 1e-6));
        assert!(camera.right().abs_diff_eq(Vec3::X, 1e-6));
        assert!(camera.orthogonal_up().abs_diff_eq(Vec3::Y, 1e-6));
    }

    #[test]
    fn view_moves_camera_to_origin() {
        let camera = Camera::new().at(1.0, 2.0, 3.0);
        let p = camera.view().transform_point3(Vec3::new(1.0, 2.0, 3.0));
        assert!(p.abs_diff_eq(Vec3::ZERO, 1e-6));
    }

    #[test]
    fn orbit_keeps_distance_and_faces_target() {
        let orbit = Orbit::new().target([1.0, 0.0, 0.0]).distance(4.0);
        let mut camera = Camera::default();
        orbit.apply(&mut camera);
        assert!((camera.position.distance(orbit.target) - 4.0).abs() < 1e-5);
        assert!(
            camera
                .forward
                .abs_diff_eq((orbit.target - camera.position).normalize(), 1e-6)
        );
    }

    #[test]
    fn plugin_publishes_matrices() {
        let mut ctx = FrameContext::new(200, 100);
        let mut gpu = HeadlessDevice::new(200, 100);
        let mut plugin = CameraPlugin::new(Camera::new().at(0.0, 1.0, 5.0));

        plugin.render(&mut ctx, &mut gpu).unwrap();
        let matrices = ctx.camera.unwrap();
        assert_eq!(matrices.position, Vec3::new(0.0, 1.0, 5.0));
        assert_eq!(matrices.projection, plugin.camera.projection(2.0));
        assert_eq!(matrices.view_projection, matrices.projection * matrices.view);

        plugin.destroy(&mut ctx, &mut gpu);
        assert!(ctx.camera.is_none());
    }

    #[test]
    fn auto_rotation_advances_with_delta() {
        let mut ctx = FrameContext::new(10, 10);
        ctx.delta = 0.5;
        let mut orbit = Orbit::new().auto_rotate(2.0);
        orbit.update(&ctx);
        assert!((orbit.azimuth - 1.0).abs() < 1e-6);
    }
}
