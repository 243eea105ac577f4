//! Windowed host for a [`Runtime`].
//!
//! [`run`] opens a window, binds a [`WgpuDevice`] to it and hands the runtime
//! to a setup closure for plugin registration. From then on the window's
//! redraw cycle is the frame clock.

use std::sync::Arc;

use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowAttributes, WindowId};

use crate::color::Color;
use crate::device::{RenderDevice, WgpuDevice};
use crate::error::{Error, Result};
use crate::input;
use crate::runtime::{Runtime, RuntimeConfig};

const DEFAULT_LOG_FILTER: &str = "info,wgpu_core=warn,wgpu_hal=warn,naga=warn";

/// Configuration for the app window.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    /// Surface colour for frames where no plugin clears.
    pub clear_color: Color,
    pub vsync: bool,
    pub runtime: RuntimeConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            title: "flare".to_string(),
            width: 800,
            height: 600,
            clear_color: Color::BLACK,
            vsync: true,
            runtime: RuntimeConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn clear_color(mut self, color: Color) -> Self {
        self.clear_color = color;
        self
    }

    pub fn vsync(mut self, vsync: bool) -> Self {
        self.vsync = vsync;
        self
    }

    pub fn runtime(mut self, runtime: RuntimeConfig) -> Self {
        self.runtime = runtime;
        self
    }
}

/// Run a flare application with the default window configuration.
///
/// # Example
/// ```no_run
/// use flare::{Effect, Result};
///
/// fn main() -> Result<()> {
///     flare::run(|runtime| {
///         runtime.plugin(Effect::from_file("shaders/plasma.wgsl"));
///         Ok(())
///     })
/// }
/// ```
pub fn run<S>(setup: S) -> Result<()>
where
    S: FnOnce(&mut Runtime<WgpuDevice>) -> Result<()> + 'static,
{
    run_with_config(AppConfig::default(), setup)
}

/// Run a flare application with custom configuration.
///
/// Blocks until the window closes. Returns the first fatal error: a missing
/// GPU capability, a failing setup closure or a plugin that could not
/// initialize. Errors raised while rendering a frame are logged and the next
/// frame is attempted.
///
/// Logging goes through `env_logger`; `RUST_LOG` overrides the default filter.
pub fn run_with_config<S>(config: AppConfig, setup: S) -> Result<()>
where
    S: FnOnce(&mut Runtime<WgpuDevice>) -> Result<()> + 'static,
{
    let _ = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(DEFAULT_LOG_FILTER),
    )
    .try_init();

    let event_loop = EventLoop::new().map_err(|e| Error::EventLoop(e.to_string()))?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = FlareApp {
        config,
        setup: Some(Box::new(setup)),
        running: None,
        error: None,
    };

    event_loop
        .run_app(&mut app)
        .map_err(|e| Error::EventLoop(e.to_string()))?;

    match app.error {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

type SetupFn = Box<dyn FnOnce(&mut Runtime<WgpuDevice>) -> Result<()>>;

struct Running {
    window: Arc<Window>,
    runtime: Runtime<WgpuDevice>,
}

struct FlareApp {
    config: AppConfig,
    setup: Option<SetupFn>,
    running: Option<Running>,
    error: Option<Error>,
}

impl FlareApp {
    fn launch(&mut self, event_loop: &ActiveEventLoop) -> Result<Running> {
        let window_attrs = WindowAttributes::default()
            .with_title(&self.config.title)
            .with_inner_size(winit::dpi::LogicalSize::new(
                self.config.width,
                self.config.height,
            ));
        let window = event_loop
            .create_window(window_attrs)
            .map_err(|e| Error::EventLoop(e.to_string()))?;
        let window = Arc::new(window);

        let device = WgpuDevice::new(window.clone(), self.config.vsync)?;
        let mut runtime = Runtime::new(device).with_config(self.config.runtime);
        runtime.device_mut().clear(self.config.clear_color);

        if let Some(setup) = self.setup.take() {
            setup(&mut runtime)?;
        }
        runtime.start()?;
        window.request_redraw();

        Ok(Running { window, runtime })
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: Error) {
        log::error!("{err}");
        if self.error.is_none() {
            self.error = Some(err);
        }
        event_loop.exit();
    }
}

impl ApplicationHandler for FlareApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.running.is_some() || self.setup.is_none() {
            return;
        }
        match self.launch(event_loop) {
            Ok(running) => self.running = Some(running),
            Err(err) => self.fail(event_loop, err),
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let Some(Running { window, runtime }) = self.running.as_mut() else {
            return;
        };

        if input::handle_event(runtime, &event) {
            return;
        }

        match event {
            WindowEvent::CloseRequested => {
                runtime.destroy();
                self.running = None;
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                if let Err(err) = runtime.resize(size.width, size.height) {
                    self.fail(event_loop, err);
                }
            }
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_builder() {
        let config = AppConfig::new()
            .title("Fire")
            .size(1280, 720)
            .clear_color(Color::RED)
            .vsync(false);
        assert_eq!(config.title, "Fire");
        assert_eq!((config.width, config.height), (1280, 720));
        assert_eq!(config.clear_color, Color::RED);
        assert!(!config.vsync);
        assert_eq!(config.runtime, RuntimeConfig::default());
    }
}
