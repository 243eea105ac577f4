//! A small solar system: a spinning sun, an orbiting planet and its moon.
//!
//! Drag to orbit the camera.

use flare::{
    AppConfig, BasicMaterial, CameraPlugin, ClearPlugin, Color, Geometry, NodeOptions,
    Orbit, Result, Scene, Vec3, run_with_config,
};

fn main() -> Result<()> {
    run_with_config(AppConfig::new().title("Orbit").size(1280, 720), |runtime| {
        let mut scene = Scene::new();

        scene
            .add(
                "sun",
                None,
                NodeOptions::new()
                    .geometry(Geometry::cube())
                    .material(BasicMaterial::new(Color::rgb(1.0, 0.8, 0.2))),
            )?
            .on_update(|node, _time, delta| {
                let r = node.rotation();
                node.set_rotation(r + Vec3::new(0.0, 0.4 * delta, 0.0));
            });

        scene
            .add(
                "planet",
                Some("sun"),
                NodeOptions::new()
                    .geometry(Geometry::cube())
                    .material(BasicMaterial::new(Color::rgb(0.2, 0.5, 1.0)))
                    .position(Vec3::new(3.0, 0.0, 0.0))
                    .scale(Vec3::splat(0.5)),
            )?
            .on_update(|node, _time, delta| {
                let r = node.rotation();
                node.set_rotation(r + Vec3::new(0.0, 1.5 * delta, 0.0));
            });

        scene.add(
            "moon",
            Some("planet"),
            NodeOptions::new()
                .geometry(Geometry::cube())
                .material(BasicMaterial::new(Color::rgb(0.8, 0.8, 0.8)))
                .position(Vec3::new(2.0, 0.0, 0.0))
                .scale(Vec3::splat(0.4)),
        )?;

        scene.add(
            "ground",
            None,
            NodeOptions::new()
                .geometry(Geometry::plane(12.0))
                .material(BasicMaterial::new(Color::rgb(0.15, 0.15, 0.18)))
                .position(Vec3::new(0.0, -1.5, 0.0)),
        )?;

        let orbit = Orbit::new().distance(9.0).elevation(0.4).auto_rotate(0.1);
        runtime
            .plugin(ClearPlugin(Color::rgb(0.02, 0.02, 0.04)))
            .plugin(CameraPlugin::orbit(orbit))
            .plugin(scene);
        Ok(())
    })
}
