//! Hot-swapping a named effect while the pipeline keeps running.
//!
//! Keys `1` to `3` replace the "pattern" effect in place; the overlay drawn
//! after it stays where it is. Space stops and restarts the clock.
//!
//! This demo drives a [`Runtime`] from its own event loop instead of
//! [`flare::run`], which is how a host embeds flare next to other code.

use std::sync::Arc;

use flare::{ClearPlugin, Color, Effect, PluginExt, Runtime, WgpuDevice, handle_event};
use winit::application::ApplicationHandler;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{Key, NamedKey};
use winit::window::{Window, WindowId};

const HEADER: &str = r#"
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
"#;

const PATTERNS: [&str; 3] = [
    // rings
    r#"
@fragment
fn fs(@builtin(position) pos: vec4f) -> @location(0) vec4f {
    let uv = (pos.xy - 0.5 * u.resolution) / u.resolution.y;
    let r = length(uv);
    let v = 0.5 + 0.5 * sin(r * 40.0 - u.time * 4.0);
    return vec4f(v * 0.9, v * 0.4, v * 0.2, 1.0);
}
"#,
    // checker
    r#"
@fragment
fn fs(@builtin(position) pos: vec4f) -> @location(0) vec4f {
    let cell = floor((pos.xy + vec2f(u.time * 60.0, 0.0)) / 40.0);
    let v = f32((i32(cell.x) + i32(cell.y)) & 1);
    return vec4f(0.1, 0.2 + 0.5 * v, 0.3 + 0.4 * v, 1.0);
}
"#,
    // waves
    r#"
@fragment
fn fs(@builtin(position) pos: vec4f) -> @location(0) vec4f {
    let uv = pos.xy / u.resolution;
    let v = sin(uv.x * 20.0 + sin(uv.y * 8.0 + u.time) * 2.0);
    let c = 0.5 + 0.5 * cos(vec3f(0.0, 2.0, 4.0) + v + u.time);
    return vec4f(c, 1.0);
}
"#,
];

const CURSOR: &str = r#"
@fragment
fn fs(@builtin(position) pos: vec4f) -> @location(0) vec4f {
    let d = distance(pos.xy, u.pointer * u.resolution);
    if (d > 12.0) {
        discard;
    }
    return vec4f(1.0, 1.0, 1.0, 1.0);
}
"#;

fn pattern(index: usize) -> Effect {
    Effect::new(format!("{HEADER}{}", PATTERNS[index % PATTERNS.len()]))
}

#[derive(Default)]
struct HotDemo {
    window: Option<Arc<Window>>,
    runtime: Option<Runtime<WgpuDevice>>,
}

impl HotDemo {
    fn key(&mut self, key: &Key) {
        let Some(runtime) = self.runtime.as_mut() else {
            return;
        };
        match key {
            Key::Character(c) => {
                let Some(index) = c.parse::<usize>().ok().filter(|i| (1..=3).contains(i)) else {
                    return;
                };
                if let Err(err) = runtime.hot("pattern", pattern(index - 1)) {
                    log::error!("{err}");
                }
            }
            Key::Named(NamedKey::Space) => {
                if runtime.is_running() {
                    runtime.stop();
                } else if let Err(err) = runtime.start() {
                    log::error!("{err}");
                }
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            _ => {}
        }
    }
}

impl ApplicationHandler for HotDemo {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.runtime.is_some() {
            return;
        }
        let attrs = Window::default_attributes().with_title("Hot swap (1-3, space)");
        let window = match event_loop.create_window(attrs) {
            Ok(window) => Arc::new(window),
            Err(err) => {
                log::error!("{err}");
                event_loop.exit();
                return;
            }
        };

        let mut runtime = match WgpuDevice::new(window.clone(), true) {
            Ok(device) => Runtime::new(device),
            Err(err) => {
                log::error!("{err}");
                event_loop.exit();
                return;
            }
        };
        runtime
            .plugin(ClearPlugin(Color::BLACK))
            .plugin(pattern(0).named("pattern"))
            .plugin(Effect::new(format!("{HEADER}{CURSOR}")).named("cursor"));
        if let Err(err) = runtime.start() {
            log::error!("{err}");
            event_loop.exit();
            return;
        }

        window.request_redraw();
        self.window = Some(window);
        self.runtime = Some(runtime);
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let (Some(window), Some(runtime)) = (&self.window, self.runtime.as_mut()) else {
            return;
        };
        if handle_event(runtime, &event) {
            return;
        }

        match event {
            WindowEvent::CloseRequested => {
                runtime.destroy();
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                if let Err(err) = runtime.resize(size.width, size.height) {
                    log::error!("{err}");
                }
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        logical_key,
                        state: ElementState::Pressed,
                        repeat: false,
                        ..
                    },
                ..
            } => self.key(&logical_key),
            WindowEvent::RedrawRequested => match runtime.frame() {
                Ok(true) => window.request_redraw(),
                Ok(false) => {}
                Err(err) => {
                    log::error!("frame aborted: {err}");
                    window.request_redraw();
                }
            },
            _ => {}
        }
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let event_loop = EventLoop::new().unwrap();
    event_loop.set_control_flow(ControlFlow::Poll);
    event_loop.run_app(&mut HotDemo::default()).unwrap();
}
