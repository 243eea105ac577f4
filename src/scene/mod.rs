//! Hierarchical scene graph.
//!
//! A [`Scene`] is a forest of [`SceneNode`]s stored in a flat arena and
//! addressed by string id. Parent/child links are arena indices, so reparenting
//! and subtree removal never leave dangling references.
//!
//! Every [`render`](Scene::render) walks the forest from its roots and recomputes
//! each node's world matrix as `parent_world * local`. Geometry upload and
//! material initialization happen lazily, once per node, the first time the
//! node is visited.
//!
//! # Example
//!
//! ```
//! use flare::{BasicMaterial, Color, Geometry, HeadlessDevice, NodeOptions, Scene, Vec3};
//!
//! let mut scene = Scene::new();
//! scene.add("sun", None, NodeOptions::new().geometry(Geometry::cube()))?;
//! scene.add(
//!     "earth",
//!     Some("sun"),
//!     NodeOptions::new()
//!         .geometry(Geometry::cube())
//!         .material(BasicMaterial::new(Color::BLUE))
//!         .position(Vec3::new(3.0, 0.0, 0.0)),
//! )?;
//! assert_eq!(scene.parent("earth"), Some("sun"));
//! # Ok::<(), flare::Error>(())
//! ```

mod node;

pub use node::{NodeOptions, NodeTransform, SceneNode, UpdateFn};

use std::collections::HashMap;

use glam::Mat4;

use crate::context::FrameContext;
use crate::device::RenderDevice;
use crate::error::{Error, Result};
use crate::geometry::Aabb;
use crate::plugin::Plugin;

/// An arena-backed forest of scene nodes.
#[derive(Debug, Default)]
pub struct Scene {
    nodes: Vec<Option<SceneNode>>,
    free: Vec<usize>,
    ids: HashMap<String, usize>,
    roots: Vec<usize>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a node.
    ///
    /// If `parent` names an existing node the new node becomes its last child;
    /// otherwise it becomes a root. Ids are unique: re-using one fails with
    /// [`Error::DuplicateNode`] and leaves the existing node untouched.
    pub fn add(
        &mut self,
        id: impl Into<String>,
        parent: Option<&str>,
        options: NodeOptions,
    ) -> Result<&mut SceneNode> {
        let id = id.into();
        if self.ids.contains_key(&id) {
            return Err(Error::DuplicateNode(id));
        }

        let parent_key = parent.and_then(|p| self.ids.get(p).copied());
        if let (Some(p), None) = (parent, parent_key) {
            log::debug!("parent '{p}' of '{id}' not found, adding as root");
        }

        let node = SceneNode::new(id.clone(), parent_key, options);
        let key = match self.free.pop() {
            Some(key) => {
                self.nodes[key] = Some(node);
                key
            }
            None => {
                self.nodes.push(Some(node));
                self.nodes.len() - 1
            }
        };

        match parent_key {
            Some(p) => self.node_mut(p).children.push(key),
            None => self.roots.push(key),
        }
        self.ids.insert(id, key);
        Ok(self.node_mut(key))
    }

    pub fn get(&self, id: &str) -> Option<&SceneNode> {
        self.ids.get(id).and_then(|&key| self.nodes[key].as_ref())
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut SceneNode> {
        let key = *self.ids.get(id)?;
        self.nodes[key].as_mut()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Ids of the root nodes, in insertion order.
    pub fn roots(&self) -> Vec<&str> {
        self.roots.iter().map(|&key| self.node(key).id()).collect()
    }

    /// Ids of a node's children, in order. `None` if the node does not exist.
    pub fn children(&self, id: &str) -> Option<Vec<&str>> {
        let node = self.get(id)?;
        Some(node.children.iter().map(|&key| self.node(key).id()).collect())
    }

    /// Id of a node's parent. `None` for roots and unknown ids.
    pub fn parent(&self, id: &str) -> Option<&str> {
        let parent = self.get(id)?.parent?;
        Some(self.node(parent).id())
    }

    pub fn world_bounds(&self, id: &str) -> Option<Aabb> {
        self.get(id)?.world_bounds()
    }

    /// Remove a node and its entire subtree.
    ///
    /// Every removed node's resources are torn down exactly once. Returns the
    /// number of nodes removed.
    pub fn remove(&mut self, id: &str, gpu: &mut dyn RenderDevice) -> Result<usize> {
        let key = *self
            .ids
            .get(id)
            .ok_or_else(|| Error::UnknownNode(id.to_string()))?;
        self.detach(key);

        let mut stack = vec![key];
        let mut removed = 0;
        while let Some(key) = stack.pop() {
            let Some(mut node) = self.nodes[key].take() else {
                continue;
            };
            stack.extend(node.children.iter().copied());
            node.teardown(gpu);
            self.ids.remove(node.id());
            self.free.push(key);
            removed += 1;
        }
        log::debug!("removed '{id}' and {} descendants", removed - 1);
        Ok(removed)
    }

    /// Remove every node.
    pub fn clear(&mut self, gpu: &mut dyn RenderDevice) {
        for node in self.nodes.iter_mut().filter_map(Option::as_mut) {
            node.teardown(gpu);
        }
        self.nodes.clear();
        self.free.clear();
        self.ids.clear();
        self.roots.clear();
    }

    /// Move a node under `parent`, or make it a root with `None`.
    ///
    /// Fails with [`Error::HierarchyViolation`] if `parent` is the node itself or
    /// one of its descendants; the graph is unchanged in that case.
    pub fn set_parent(&mut self, id: &str, parent: Option<&str>) -> Result<()> {
        let key = *self
            .ids
            .get(id)
            .ok_or_else(|| Error::UnknownNode(id.to_string()))?;
        let parent_key = match parent {
            Some(p) => Some(
                *self
                    .ids
                    .get(p)
                    .ok_or_else(|| Error::UnknownNode(p.to_string()))?,
            ),
            None => None,
        };

        if let Some(p) = parent_key {
            if self.is_ancestor_or_self(key, p) {
                return Err(Error::HierarchyViolation {
                    node: id.to_string(),
                    parent: self.node(p).id().to_string(),
                });
            }
        }

        self.detach(key);
        match parent_key {
            Some(p) => self.node_mut(p).children.push(key),
            None => self.roots.push(key),
        }
        self.node_mut(key).parent = parent_key;
        Ok(())
    }

    /// Run every node's update callback.
    pub fn update(&mut self, time: f32, delta: f32) {
        for node in self.nodes.iter_mut().filter_map(Option::as_mut) {
            node.update(time, delta);
        }
    }

    /// Recompute world matrices and draw every visible node.
    ///
    /// A material that fails to compile disables only its own node's draw; the
    /// node's children are still traversed. Any other error aborts the traversal.
    pub fn render(&mut self, ctx: &mut FrameContext, gpu: &mut dyn RenderDevice) -> Result<()> {
        for i in 0..self.roots.len() {
            let root = self.roots[i];
            self.render_node(root, Mat4::IDENTITY, ctx, gpu)?;
        }
        Ok(())
    }

    fn render_node(
        &mut self,
        key: usize,
        parent_world: Mat4,
        ctx: &mut FrameContext,
        gpu: &mut dyn RenderDevice,
    ) -> Result<()> {
        let node = self.node_mut(key);
        if !node.visible {
            return Ok(());
        }
        node.compose(parent_world);
        node.prepare(ctx, gpu)?;
        node.draw(ctx, gpu)?;

        let world = node.world;
        let children = node.children.clone();
        for child in children {
            self.render_node(child, world, ctx, gpu)?;
        }
        Ok(())
    }

    /// Unlink a node from its parent's child list or from the roots.
    fn detach(&mut self, key: usize) {
        match self.node(key).parent {
            Some(p) => self.node_mut(p).children.retain(|&c| c != key),
            None => self.roots.retain(|&r| r != key),
        }
    }

    /// Whether `ancestor` is `key` or lies on the path from `key` up to its root.
    fn is_ancestor_or_self(&self, ancestor: usize, key: usize) -> bool {
        let mut current = Some(key);
        while let Some(k) = current {
            if k == ancestor {
                return true;
            }
            current = self.node(k).parent;
        }
        false
    }

    fn node(&self, key: usize) -> &SceneNode {
        match &self.nodes[key] {
            Some(node) => node,
            None => unreachable!("scene arena slot {key} is vacant"),
        }
    }

    fn node_mut(&mut self, key: usize) -> &mut SceneNode {
        match &mut self.nodes[key] {
            Some(node) => node,
            None => unreachable!("scene arena slot {key} is vacant"),
        }
    }
}

impl Plugin for Scene {
    fn render(&mut self, ctx: &mut FrameContext, gpu: &mut dyn RenderDevice) -> Result<()> {
        self.update(ctx.time, ctx.delta);
        Scene::render(self, ctx, gpu)
    }

    fn destroy(&mut self, _ctx: &mut FrameContext, gpu: &mut dyn RenderDevice) {
        self.clear(gpu);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Color;
    use crate::device::{Command, HeadlessDevice, ProgramDescriptor, ProgramId, ProgramKind};
    use crate::geometry::Geometry;
    use crate::material::{BasicMaterial, Material};
    use glam::Vec3;
    use std::cell::Cell;
    use std::f32::consts::FRAC_PI_2;
    use std::rc::Rc;

    #[derive(Clone, Default)]
    struct Counters {
        init: Rc<Cell<u32>>,
        destroy: Rc<Cell<u32>>,
    }

    struct CountingMaterial {
        source: &'static str,
        counters: Counters,
        program: Option<ProgramId>,
    }

    impl CountingMaterial {
        fn new(source: &'static str, counters: &Counters) -> Self {
            Self {
                source,
                counters: counters.clone(),
                program: None,
            }
        }
    }

    impl Material for CountingMaterial {
        fn init(&mut self, _: &mut FrameContext, gpu: &mut dyn RenderDevice) -> Result<()> {
            self.counters.init.set(self.counters.init.get() + 1);
            self.program = Some(gpu.compile_program(&ProgramDescriptor {
                label: "counting",
                source: self.source,
                kind: ProgramKind::Mesh,
            })?);
            Ok(())
        }

        fn bind(&mut self, ctx: &mut FrameContext, gpu: &mut dyn RenderDevice) -> Result<()> {
            let program = self.program.ok_or(Error::UnknownResource("program"))?;
            gpu.bind_program(program, &[])?;
            ctx.program = Some(program);
            Ok(())
        }

        fn destroy(&mut self, gpu: &mut dyn RenderDevice) {
            self.counters.destroy.set(self.counters.destroy.get() + 1);
            if let Some(program) = self.program.take() {
                gpu.destroy_program(program);
            }
        }
    }

    fn at(x: f32, y: f32, z: f32) -> NodeOptions {
        NodeOptions::new().position(Vec3::new(x, y, z))
    }

    fn drawable(x: f32, y: f32, z: f32) -> NodeOptions {
        at(x, y, z)
            .geometry(Geometry::cube())
            .material(BasicMaterial::new(Color::WHITE))
    }

    fn frame() -> (FrameContext, HeadlessDevice) {
        let mut gpu = HeadlessDevice::new(64, 64);
        gpu.begin_frame().unwrap();
        (FrameContext::new(64, 64), gpu)
    }

    fn draws(gpu: &HeadlessDevice) -> Vec<Mat4> {
        gpu.commands()
            .iter()
            .filter_map(|c| match c {
                Command::Draw { model, .. } | Command::DrawIndexed { model, .. } => Some(*model),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn child_world_translation_composes_with_parent() {
        let (mut ctx, mut gpu) = frame();
        let mut scene = Scene::new();
        scene.add("r", None, at(1.0, 0.0, 0.0)).unwrap();
        scene.add("c", Some("r"), at(0.0, 2.0, 0.0)).unwrap();

        scene.render(&mut ctx, &mut gpu).unwrap();

        let world = scene.get("c").unwrap().world_matrix();
        assert!(world.w_axis.truncate().abs_diff_eq(Vec3::new(1.0, 2.0, 0.0), 1e-6));
    }

    #[test]
    fn world_matrix_is_parent_world_times_local() {
        let (mut ctx, mut gpu) = frame();
        let mut scene = Scene::new();
        scene
            .add(
                "a",
                None,
                at(0.0, 1.0, 0.0)
                    .rotation(Vec3::new(0.0, FRAC_PI_2, 0.0))
                    .scale(Vec3::splat(2.0)),
            )
            .unwrap();
        scene
            .add("b", Some("a"), at(1.0, 0.0, 0.0).rotation(Vec3::new(0.3, 0.0, 0.0)))
            .unwrap();
        scene.add("c", Some("b"), at(0.0, 0.0, 1.0)).unwrap();

        scene.render(&mut ctx, &mut gpu).unwrap();

        let a = scene.get("a").unwrap();
        assert!(a.world_matrix().abs_diff_eq(a.local_matrix(), 1e-6));
        for (parent, child) in [("a", "b"), ("b", "c")] {
            let p = scene.get(parent).unwrap();
            let c = scene.get(child).unwrap();
            let expected = p.world_matrix() * c.local_matrix();
            assert!(c.world_matrix().abs_diff_eq(expected, 1e-6));
        }

        // Scaled by 2 and turned a quarter around Y, b's origin lands at -2 on Z.
        let b = scene.get("b").unwrap().world_matrix();
        let origin = b.transform_point3(Vec3::ZERO);
        assert!(origin.abs_diff_eq(Vec3::new(0.0, 1.0, -2.0), 1e-5));
    }

    #[test]
    fn setters_recompute_local_matrix() {
        let mut scene = Scene::new();
        let node = scene.add("n", None, NodeOptions::new()).unwrap();
        node.set_position(Vec3::new(1.0, 2.0, 3.0));
        node.set_scale(Vec3::splat(3.0));
        let expected = NodeTransform::new()
            .position(Vec3::new(1.0, 2.0, 3.0))
            .uniform_scale(3.0)
            .matrix();
        assert_eq!(node.local_matrix(), expected);
    }

    #[test]
    fn duplicate_ids_fail() {
        let mut scene = Scene::new();
        scene.add("n", None, at(1.0, 0.0, 0.0)).unwrap();
        let err = scene.add("n", None, at(5.0, 0.0, 0.0)).unwrap_err();
        assert!(matches!(err, Error::DuplicateNode(id) if id == "n"));
        assert_eq!(scene.get("n").unwrap().position(), Vec3::X);
        assert_eq!(scene.len(), 1);
    }

    #[test]
    fn unknown_parent_makes_a_root() {
        let mut scene = Scene::new();
        scene.add("orphan", Some("missing"), NodeOptions::new()).unwrap();
        assert_eq!(scene.roots(), ["orphan"]);
        assert_eq!(scene.parent("orphan"), None);
    }

    #[test]
    fn reparent_moves_between_child_lists() {
        let mut scene = Scene::new();
        scene.add("a", None, NodeOptions::new()).unwrap();
        scene.add("b", None, NodeOptions::new()).unwrap();
        scene.add("x", Some("a"), NodeOptions::new()).unwrap();

        scene.set_parent("x", Some("b")).unwrap();
        assert_eq!(scene.children("a").unwrap(), Vec::<&str>::new());
        assert_eq!(scene.children("b").unwrap(), ["x"]);
        assert_eq!(scene.parent("x"), Some("b"));

        scene.set_parent("x", Some("b")).unwrap();
        assert_eq!(scene.children("b").unwrap(), ["x"]);

        scene.set_parent("x", None).unwrap();
        assert_eq!(scene.roots(), ["a", "b", "x"]);
        assert_eq!(scene.children("b").unwrap(), Vec::<&str>::new());
    }

    #[test]
    fn reparented_node_composes_with_new_parent() {
        let (mut ctx, mut gpu) = frame();
        let mut scene = Scene::new();
        scene.add("a", None, at(1.0, 0.0, 0.0)).unwrap();
        scene
            .add("b", None, at(0.0, 0.0, 5.0).rotation(Vec3::new(0.0, 0.7, 0.0)))
            .unwrap();
        scene.add("x", Some("a"), at(0.0, 2.0, 0.0)).unwrap();
        scene.render(&mut ctx, &mut gpu).unwrap();

        scene.set_parent("x", Some("b")).unwrap();
        scene.render(&mut ctx, &mut gpu).unwrap();

        let parent = scene.get("b").unwrap().world_matrix();
        let x = scene.get("x").unwrap();
        assert!(x
            .world_matrix()
            .abs_diff_eq(parent * x.local_matrix(), 1e-6));
        assert!(x
            .world_matrix()
            .w_axis
            .truncate()
            .abs_diff_eq(Vec3::new(0.0, 2.0, 5.0), 1e-6));
    }

    #[test]
    fn reparent_rejects_cycles() {
        let mut scene = Scene::new();
        scene.add("a", None, NodeOptions::new()).unwrap();
        scene.add("b", Some("a"), NodeOptions::new()).unwrap();
        scene.add("c", Some("b"), NodeOptions::new()).unwrap();

        let err = scene.set_parent("a", Some("c")).unwrap_err();
        assert!(matches!(err, Error::HierarchyViolation { .. }));
        let err = scene.set_parent("b", Some("b")).unwrap_err();
        assert!(matches!(err, Error::HierarchyViolation { .. }));

        assert_eq!(scene.roots(), ["a"]);
        assert_eq!(scene.children("a").unwrap(), ["b"]);
        assert_eq!(scene.children("b").unwrap(), ["c"]);
    }

    #[test]
    fn reparent_unknown_nodes_fails() {
        let mut scene = Scene::new();
        scene.add("a", None, NodeOptions::new()).unwrap();
        assert!(matches!(
            scene.set_parent("a", Some("ghost")),
            Err(Error::UnknownNode(id)) if id == "ghost"
        ));
        assert!(matches!(
            scene.set_parent("ghost", None),
            Err(Error::UnknownNode(_))
        ));
    }

    #[test]
    fn remove_tears_down_each_descendant_once() {
        let counters = Counters::default();
        let (mut ctx, mut gpu) = frame();
        let mut scene = Scene::new();
        for (id, parent) in [("p", None), ("c1", Some("p")), ("c2", Some("p"))] {
            let options = NodeOptions::new()
                .geometry(Geometry::cube())
                .material(CountingMaterial::new("mesh", &counters));
            scene.add(id, parent, options).unwrap();
        }
        scene.add("other", None, NodeOptions::new()).unwrap();
        scene.render(&mut ctx, &mut gpu).unwrap();
        assert_eq!(gpu.live_geometries(), 3);

        let removed = scene.remove("p", &mut gpu).unwrap();

        assert_eq!(removed, 3);
        assert_eq!(counters.destroy.get(), 3);
        assert_eq!(gpu.live_geometries(), 0);
        assert_eq!(gpu.live_programs(), 0);
        assert_eq!(scene.roots(), ["other"]);
        assert!(!scene.contains("c1") && !scene.contains("c2"));
        assert_eq!(scene.len(), 1);
    }

    #[test]
    fn remove_child_unlinks_it_from_parent() {
        let mut gpu = HeadlessDevice::new(8, 8);
        let mut scene = Scene::new();
        scene.add("p", None, NodeOptions::new()).unwrap();
        scene.add("c", Some("p"), NodeOptions::new()).unwrap();
        scene.remove("c", &mut gpu).unwrap();
        assert_eq!(scene.children("p").unwrap(), Vec::<&str>::new());

        // Freed slots are reused without confusing the registry.
        scene.add("d", Some("p"), NodeOptions::new()).unwrap();
        assert_eq!(scene.children("p").unwrap(), ["d"]);
        assert!(matches!(
            scene.remove("c", &mut gpu),
            Err(Error::UnknownNode(_))
        ));
    }

    #[test]
    fn invisible_nodes_hide_their_subtree() {
        let (mut ctx, mut gpu) = frame();
        let mut scene = Scene::new();
        scene.add("shown", None, drawable(0.0, 0.0, 0.0)).unwrap();
        scene.add("hidden", None, drawable(1.0, 0.0, 0.0).hidden()).unwrap();
        scene.add("child", Some("hidden"), drawable(0.0, 1.0, 0.0)).unwrap();

        scene.render(&mut ctx, &mut gpu).unwrap();
        assert_eq!(draws(&gpu).len(), 1);

        scene.get_mut("hidden").unwrap().visible = true;
        gpu.take_commands();
        scene.render(&mut ctx, &mut gpu).unwrap();
        let models = draws(&gpu);
        assert_eq!(models.len(), 3);
        assert!(
            models[2]
                .w_axis
                .truncate()
                .abs_diff_eq(Vec3::new(1.0, 1.0, 0.0), 1e-6)
        );
    }

    #[test]
    fn draws_are_indexed_only_with_indices() {
        let (mut ctx, mut gpu) = frame();
        let mut scene = Scene::new();
        scene.add("cube", None, drawable(0.0, 0.0, 0.0)).unwrap();
        scene
            .add(
                "tri",
                None,
                NodeOptions::new()
                    .geometry(Geometry::triangle())
                    .material(BasicMaterial::default()),
            )
            .unwrap();

        scene.render(&mut ctx, &mut gpu).unwrap();

        let kinds: Vec<_> = gpu
            .commands()
            .iter()
            .filter_map(|c| match c {
                Command::DrawIndexed { indices, .. } => Some(("indexed", *indices)),
                Command::Draw { vertices, .. } => Some(("plain", *vertices)),
                _ => None,
            })
            .collect();
        assert_eq!(kinds, [("indexed", 36), ("plain", 3)]);
    }

    #[test]
    fn resources_initialize_once() {
        let counters = Counters::default();
        let (mut ctx, mut gpu) = frame();
        let mut scene = Scene::new();
        scene
            .add(
                "n",
                None,
                NodeOptions::new()
                    .geometry(Geometry::cube())
                    .material(CountingMaterial::new("mesh", &counters)),
            )
            .unwrap();

        for _ in 0..3 {
            scene.render(&mut ctx, &mut gpu).unwrap();
        }
        let uploads = gpu
            .commands()
            .iter()
            .filter(|c| matches!(c, Command::UploadGeometry(_)))
            .count();
        assert_eq!(counters.init.get(), 1);
        assert_eq!(uploads, 1);
        assert_eq!(draws(&gpu).len(), 3);
    }

    #[test]
    fn compile_failure_disables_only_that_node() {
        let counters = Counters::default();
        let mut gpu = HeadlessDevice::new(64, 64).reject("broken");
        gpu.begin_frame().unwrap();
        let mut ctx = FrameContext::new(64, 64);
        let mut scene = Scene::new();
        scene
            .add(
                "bad",
                None,
                NodeOptions::new()
                    .geometry(Geometry::cube())
                    .material(CountingMaterial::new("broken", &counters)),
            )
            .unwrap();
        scene
            .add(
                "good",
                Some("bad"),
                NodeOptions::new()
                    .geometry(Geometry::cube())
                    .material(CountingMaterial::new("mesh", &counters)),
            )
            .unwrap();

        scene.render(&mut ctx, &mut gpu).unwrap();
        scene.render(&mut ctx, &mut gpu).unwrap();

        assert!(!scene.get("bad").unwrap().is_drawable());
        assert!(scene.get("good").unwrap().is_drawable());
        assert_eq!(counters.init.get(), 2);
        assert_eq!(draws(&gpu).len(), 2);
    }

    #[test]
    fn world_bounds_follow_all_corners() {
        let (mut ctx, mut gpu) = frame();
        let mut scene = Scene::new();
        scene
            .add(
                "cube",
                None,
                drawable(5.0, 0.0, 0.0).rotation(Vec3::new(0.0, std::f32::consts::FRAC_PI_4, 0.0)),
            )
            .unwrap();
        assert!(scene.world_bounds("cube").is_none());

        scene.render(&mut ctx, &mut gpu).unwrap();

        let bounds = scene.world_bounds("cube").unwrap();
        let half_diagonal = 0.5 * std::f32::consts::SQRT_2;
        assert!(bounds.center().abs_diff_eq(Vec3::new(5.0, 0.0, 0.0), 1e-5));
        assert!((bounds.max.x - (5.0 + half_diagonal)).abs() < 1e-5);
        assert!((bounds.max.y - 0.5).abs() < 1e-5);
    }

    #[test]
    fn update_runs_node_callbacks() {
        let mut scene = Scene::new();
        scene
            .add("spinner", None, NodeOptions::new())
            .unwrap()
            .on_update(|node, time, _delta| node.set_rotation(Vec3::new(0.0, time, 0.0)));

        scene.update(1.5, 0.016);
        assert_eq!(scene.get("spinner").unwrap().rotation(), Vec3::new(0.0, 1.5, 0.0));
        scene.update(2.0, 0.016);
        assert_eq!(scene.get("spinner").unwrap().rotation(), Vec3::new(0.0, 2.0, 0.0));
    }

    #[test]
    fn plugin_destroy_clears_everything() {
        let counters = Counters::default();
        let (mut ctx, mut gpu) = frame();
        let mut scene = Scene::new();
        scene
            .add(
                "a",
                None,
                NodeOptions::new()
                    .geometry(Geometry::cube())
                    .material(CountingMaterial::new("mesh", &counters)),
            )
            .unwrap();
        Plugin::render(&mut scene, &mut ctx, &mut gpu).unwrap();
        Plugin::destroy(&mut scene, &mut ctx, &mut gpu);

        assert!(scene.is_empty());
        assert_eq!(counters.destroy.get(), 1);
        assert_eq!(gpu.live_geometries(), 0);
    }
}
