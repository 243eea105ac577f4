//! Scene nodes and their transforms.

use std::fmt;

use glam::{EulerRot, Mat4, Quat, Vec3};

use crate::context::FrameContext;
use crate::device::{GeometryId, RenderDevice};
use crate::error::Result;
use crate::geometry::{Aabb, Geometry};
use crate::material::Material;

/// Position, Euler rotation and scale of a node relative to its parent.
///
/// Rotation is in radians, applied intrinsically X then Y then Z.
///
/// # Example
///
/// ```
/// use flare::{NodeTransform, Vec3};
///
/// let transform = NodeTransform::new()
///     .position(Vec3::new(0.0, 2.0, -5.0))
///     .rotation(Vec3::new(0.0, 0.5, 0.0))
///     .uniform_scale(2.0);
/// assert_eq!(transform.matrix().transform_point3(Vec3::ZERO), Vec3::new(0.0, 2.0, -5.0));
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NodeTransform {
    pub position: Vec3,
    pub rotation: Vec3,
    pub scale: Vec3,
}

impl Default for NodeTransform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }
}

impl NodeTransform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    pub fn position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    pub fn rotation(mut self, rotation: Vec3) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    pub fn uniform_scale(mut self, scale: f32) -> Self {
        self.scale = Vec3::splat(scale);
        self
    }

    pub fn quat(&self) -> Quat {
        Quat::from_euler(EulerRot::XYZ, self.rotation.x, self.rotation.y, self.rotation.z)
    }

    /// Scale, then rotate, then translate.
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.quat(), self.position)
    }
}

/// Everything a node is created with.
///
/// ```
/// use flare::{BasicMaterial, Color, Geometry, NodeOptions, Vec3};
///
/// let options = NodeOptions::new()
///     .geometry(Geometry::cube())
///     .material(BasicMaterial::new(Color::RED))
///     .position(Vec3::new(1.0, 0.0, 0.0));
/// ```
pub struct NodeOptions {
    pub geometry: Option<Geometry>,
    pub material: Option<Box<dyn Material>>,
    pub transform: NodeTransform,
    pub visible: bool,
    /// Local-space bounds. Derived from the geometry when unset.
    pub bounds: Option<Aabb>,
}

impl Default for NodeOptions {
    fn default() -> Self {
        Self {
            geometry: None,
            material: None,
            transform: NodeTransform::default(),
            visible: true,
            bounds: None,
        }
    }
}

impl NodeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn geometry(mut self, geometry: Geometry) -> Self {
        self.geometry = Some(geometry);
        self
    }

    pub fn material(mut self, material: impl Material + 'static) -> Self {
        self.material = Some(Box::new(material));
        self
    }

    pub fn transform(mut self, transform: NodeTransform) -> Self {
        self.transform = transform;
        self
    }

    pub fn position(mut self, position: Vec3) -> Self {
        self.transform.position = position;
        self
    }

    pub fn rotation(mut self, rotation: Vec3) -> Self {
        self.transform.rotation = rotation;
        self
    }

    pub fn scale(mut self, scale: Vec3) -> Self {
        self.transform.scale = scale;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    pub fn bounds(mut self, bounds: Aabb) -> Self {
        self.bounds = Some(bounds);
        self
    }
}

/// Per-node behaviour run by [`Scene::update`](super::Scene::update) with
/// `(node, time, delta)`.
pub type UpdateFn = Box<dyn FnMut(&mut SceneNode, f32, f32)>;

/// An entry in the scene graph.
///
/// Parent and children are held by the owning [`Scene`](super::Scene) as arena
/// indices; a node only knows its own id and local state.
pub struct SceneNode {
    id: String,
    pub(super) parent: Option<usize>,
    pub(super) children: Vec<usize>,
    transform: NodeTransform,
    local: Mat4,
    pub(super) world: Mat4,
    /// Skips this node and its whole subtree when false.
    pub visible: bool,
    geometry: Option<Geometry>,
    geometry_handle: Option<GeometryId>,
    geometry_ready: bool,
    material: Option<Box<dyn Material>>,
    material_ready: bool,
    drawable: bool,
    local_bounds: Option<Aabb>,
    pub(super) world_bounds: Option<Aabb>,
    on_update: Option<UpdateFn>,
}

impl SceneNode {
    pub(super) fn new(id: String, parent: Option<usize>, options: NodeOptions) -> Self {
        let local_bounds = options
            .bounds
            .or_else(|| options.geometry.as_ref().and_then(Geometry::bounds));
        Self {
            id,
            parent,
            children: Vec::new(),
            transform: options.transform,
            local: options.transform.matrix(),
            world: options.transform.matrix(),
            visible: options.visible,
            geometry: options.geometry,
            geometry_handle: None,
            geometry_ready: false,
            material: options.material,
            material_ready: false,
            drawable: true,
            local_bounds,
            world_bounds: None,
            on_update: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn transform(&self) -> &NodeTransform {
        &self.transform
    }

    pub fn position(&self) -> Vec3 {
        self.transform.position
    }

    pub fn rotation(&self) -> Vec3 {
        self.transform.rotation
    }

    pub fn scale(&self) -> Vec3 {
        self.transform.scale
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.transform.position = position;
        self.local = self.transform.matrix();
    }

    pub fn set_rotation(&mut self, rotation: Vec3) {
        self.transform.rotation = rotation;
        self.local = self.transform.matrix();
    }

    pub fn set_scale(&mut self, scale: Vec3) {
        self.transform.scale = scale;
        self.local = self.transform.matrix();
    }

    pub fn set_transform(&mut self, transform: NodeTransform) {
        self.transform = transform;
        self.local = transform.matrix();
    }

    pub fn local_matrix(&self) -> Mat4 {
        self.local
    }

    /// World matrix as of the last render.
    pub fn world_matrix(&self) -> Mat4 {
        self.world
    }

    pub fn local_bounds(&self) -> Option<Aabb> {
        self.local_bounds
    }

    /// Local bounds pushed through the world matrix as of the last render.
    pub fn world_bounds(&self) -> Option<Aabb> {
        self.world_bounds
    }

    pub fn geometry(&self) -> Option<&Geometry> {
        self.geometry.as_ref()
    }

    pub fn material_mut(&mut self) -> Option<&mut (dyn Material + 'static)> {
        self.material.as_deref_mut()
    }

    /// False once the node's material failed to compile.
    pub fn is_drawable(&self) -> bool {
        self.drawable
    }

    /// Run `f` on every [`Scene::update`](super::Scene::update).
    pub fn on_update(&mut self, f: impl FnMut(&mut SceneNode, f32, f32) + 'static) {
        self.on_update = Some(Box::new(f));
    }

    pub(super) fn update(&mut self, time: f32, delta: f32) {
        if let Some(mut f) = self.on_update.take() {
            f(self, time, delta);
            // The callback may have installed a replacement.
            if self.on_update.is_none() {
                self.on_update = Some(f);
            }
        }
    }

    /// Compose with the parent's world matrix and refresh world bounds.
    pub(super) fn compose(&mut self, parent_world: Mat4) {
        self.world = parent_world * self.local;
        self.world_bounds = self.local_bounds.map(|b| b.transformed(self.world));
    }

    /// Upload geometry and initialize the material, each at most once.
    pub(super) fn prepare(
        &mut self,
        ctx: &mut FrameContext,
        gpu: &mut dyn RenderDevice,
    ) -> Result<()> {
        if !self.material_ready {
            self.material_ready = true;
            if let Some(material) = self.material.as_mut() {
                if let Err(err) = material.init(ctx, gpu) {
                    if !err.is_compile_failure() {
                        self.drawable = false;
                        return Err(err);
                    }
                    log::error!("scene node '{}': {err}; drawing disabled", self.id);
                    self.drawable = false;
                }
            }
        }

        if !self.geometry_ready {
            self.geometry_ready = true;
            if let Some(geometry) = self.geometry.as_ref() {
                match gpu.upload_geometry(geometry) {
                    Ok(handle) => self.geometry_handle = Some(handle),
                    Err(err) => {
                        self.drawable = false;
                        return Err(err);
                    }
                }
            }
        }
        Ok(())
    }

    /// Bind the material and issue this node's draw.
    pub(super) fn draw(&mut self, ctx: &mut FrameContext, gpu: &mut dyn RenderDevice) -> Result<()> {
        if !self.drawable {
            return Ok(());
        }
        let (Some(material), Some(handle)) = (self.material.as_mut(), self.geometry_handle) else {
            return Ok(());
        };
        material.bind(ctx, gpu)?;
        gpu.draw_geometry(handle, self.world)
    }

    /// Release GPU resources. The material's destroy runs exactly once.
    pub(super) fn teardown(&mut self, gpu: &mut dyn RenderDevice) {
        if let Some(mut material) = self.material.take() {
            material.destroy(gpu);
        }
        if let Some(handle) = self.geometry_handle.take() {
            gpu.destroy_geometry(handle);
        }
        self.drawable = false;
    }
}

impl fmt::Debug for SceneNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SceneNode")
            .field("id", &self.id)
            .field("parent", &self.parent)
            .field("children", &self.children)
            .field("transform", &self.transform)
            .field("visible", &self.visible)
            .field("drawable", &self.drawable)
            .finish_non_exhaustive()
    }
}
