//! Shader playground: `flare [path/to/effect.wgsl]`.
//!
//! With a path, the effect is watched and recompiled on save. Without one a
//! built-in plasma runs.

use flare::{AppConfig, Effect, PluginExt, Result, run_with_config};

const PLASMA: &str = r#"
struct Frame {
    resolution: vec2f,
    time: f32,
    delta: f32,
    pointer: vec2f,
    pointer_velocity: vec2f,
    frame: u32,
    pointer_down: u32,
    iteration: u32,
    _pad: u32,
}

@group(0) @binding(0) var<uniform> u: Frame;

@vertex
fn vs(@builtin(vertex_index) vi: u32) -> @builtin(position) vec4f {
    let x = f32(i32(vi) - 1) * 2.0;
    let y = f32(i32(vi & 1u) * 4 - 1);
    return vec4f(x, y, 0.0, 1.0);
}

@fragment
fn fs(@builtin(position) pos: vec4f) -> @location(0) vec4f {
    let uv = pos.xy / u.resolution;
    let t = u.time * 0.5;
    let d = distance(uv, u.pointer);
    let v = sin(uv.x * 10.0 + t) + sin(uv.y * 12.0 - t) + sin(d * 24.0 - u.time * 3.0);
    let c = 0.5 + 0.5 * cos(vec3f(0.0, 2.1, 4.2) + v);
    return vec4f(c, 1.0);
}
"#;

fn main() -> Result<()> {
    let path = std::env::args().nth(1);
    let title = match &path {
        Some(path) => format!("flare - {path}"),
        None => "flare".to_string(),
    };

    run_with_config(AppConfig::new().title(title), move |runtime| {
        let effect = match path {
            Some(path) => Effect::from_file(path),
            None => Effect::new(PLASMA),
        };
        runtime.plugin(effect.named("effect"));
        Ok(())
    })
}
