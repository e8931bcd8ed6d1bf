// =============================================================================
// TRIGRID - Vulkan triangle grid demo
// =============================================================================
//
// Draws a full-screen grid of colored triangles with a single draw call per
// frame, and keeps presenting through resizes, minimization and surface
// invalidation.
//
// ARCHITECTURE OVERVIEW:
// ┌─────────────────────────────────────────────────────────────────┐
// │  main loop (pumps winit events, drives frames)                  │
// │    └── FrameLoop (fence → acquire → record → submit → present)  │
// │          └── Renderer (PresentBackend over Vulkan)              │
// │                ├── Swapchain + Framebuffers (rebuilt on repair) │
// │                ├── Pipeline, CommandRecorder, FrameSync slots   │
// │                └── VulkanDevice (instance, surface, queues)     │
// └─────────────────────────────────────────────────────────────────┘
//
// The main loop owns the event loop and pumps it between frames, so the
// frame loop can hand control back to the window system while it waits
// for a minimized window to come back.
//
// =============================================================================

mod backend;
mod config;
mod frame;
mod geometry;
mod renderer;

use anyhow::{Context, Result};
use ash::vk;
use backend::VulkanDevice;
use config::Config;
use frame::{FrameLoop, FrameStatus, ResizeSignal, WindowSystem};
use raw_window_handle::{HasRawDisplayHandle, HasRawWindowHandle};
use renderer::Renderer;
use std::fs::OpenOptions;
use std::io::Write;
use std::sync::Arc;
use std::time::{Duration, Instant};
use winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop},
    platform::pump_events::{EventLoopExtPumpEvents, PumpStatus},
    window::{Window, WindowAttributes, WindowId},
};

/// How long a minimized window blocks in the event system per check
const MINIMIZED_POLL: Duration = Duration::from_millis(16);

// =============================================================================
// ENTRY POINT
// =============================================================================

fn main() -> Result<()> {
    // Load configuration from config.toml
    let config = Config::load();

    // Initialize logging
    init_logging(&config);
    log::info!("Starting trigrid");
    log::info!(
        "Window: {}x{} ({})",
        config.window.width,
        config.window.height,
        if config.window.resizable { "resizable" } else { "fixed" }
    );
    log::info!(
        "Present mode: {}, vertex upload: {:?}",
        config.graphics.present_mode,
        config.graphics.vertex_upload
    );

    let mut event_loop = EventLoop::new()?;
    let resize = ResizeSignal::new();
    let mut shell = Shell::new(&config, resize.clone());

    run(&config, &mut event_loop, &mut shell, resize)?;

    if let Some(e) = shell.error.take() {
        return Err(e);
    }
    log::info!("Shutdown complete");
    Ok(())
}

/// Initialize logging, optionally redirected to the configured log file.
/// RUST_LOG overrides the Info default.
fn init_logging(config: &Config) {
    use env_logger::{Builder, Target};
    use log::LevelFilter;

    let mut builder = Builder::new();
    builder.filter_level(LevelFilter::Info).parse_default_env();

    let mut file_error = None;
    if config.debug.log_to_file {
        match OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&config.debug.log_file)
        {
            Ok(mut file) => {
                let _ = writeln!(file, "=== trigrid log ===");
                let _ = writeln!(file, "Started: {:?}", std::time::SystemTime::now());
                builder.target(Target::Pipe(Box::new(file)));
            }
            Err(e) => file_error = Some(e),
        }
    }

    builder.init();

    if let Some(e) = file_error {
        log::warn!(
            "Could not open log file {}: {}. Logging to stderr.",
            config.debug.log_file,
            e
        );
    }
}

// =============================================================================
// MAIN LOOP
// =============================================================================

fn run(
    config: &Config,
    event_loop: &mut EventLoop<()>,
    shell: &mut Shell,
    resize: ResizeSignal,
) -> Result<()> {
    let mut frames: Option<FrameLoop<Renderer>> = None;
    let mut fps = FpsCounter::new();
    let mut result = Ok(());

    loop {
        // ─────────────────────────────────────────────────────────────────────
        // Drain pending window events without blocking
        // ─────────────────────────────────────────────────────────────────────
        if let PumpStatus::Exit(code) = event_loop.pump_app_events(Some(Duration::ZERO), shell) {
            log::info!("Event loop exited with code {}", code);
            break;
        }
        if shell.exit_requested {
            break;
        }
        let Some(window) = shell.window.clone() else {
            continue;
        };

        // ─────────────────────────────────────────────────────────────────────
        // Bring up Vulkan once the window exists
        // ─────────────────────────────────────────────────────────────────────
        if frames.is_none() {
            match init_vulkan(config, &window, resize.clone()) {
                Ok(frame_loop) => frames = Some(frame_loop),
                Err(e) => {
                    result = Err(e);
                    break;
                }
            }
        }
        let Some(frame_loop) = frames.as_mut() else {
            continue;
        };

        // ─────────────────────────────────────────────────────────────────────
        // One frame
        // ─────────────────────────────────────────────────────────────────────
        let mut window_system = WinitWindow {
            event_loop: &mut *event_loop,
            shell: &mut *shell,
        };
        match frame_loop.render_frame(&mut window_system) {
            Ok(FrameStatus::Presented) => {
                if config.debug.show_fps {
                    fps.tick(&window, &config.window.title);
                }
            }
            Ok(FrameStatus::Repaired) => {}
            Ok(FrameStatus::Exiting) => break,
            Err(e) => {
                log::error!("Render error: {}", e);
                result = Err(anyhow::Error::new(e).context("Frame loop failed"));
                break;
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Shutdown: drain the GPU, then drop the renderer before the window
    // ─────────────────────────────────────────────────────────────────────────
    if let Some(mut frame_loop) = frames.take() {
        if let Err(e) = frame_loop.finish() {
            log::error!("Failed to drain device on shutdown: {}", e);
        }
    }

    result
}

/// Create the device and renderer for `window` and wrap them in a frame loop
fn init_vulkan(
    config: &Config,
    window: &Window,
    resize: ResizeSignal,
) -> Result<FrameLoop<Renderer>> {
    let enable_validation = config.debug.validation_layers && cfg!(debug_assertions);

    let device = VulkanDevice::new(
        &config.window.title,
        enable_validation,
        window.raw_display_handle(),
        window.raw_window_handle(),
    )
    .context("Failed to create Vulkan device")?;

    let size = window.inner_size();
    let drawable = vk::Extent2D {
        width: size.width,
        height: size.height,
    };
    let renderer = Renderer::new(device, config, drawable)?;

    // The chain was just built at the current size
    resize.take();

    Ok(FrameLoop::new(
        renderer,
        resize,
        config.graphics.repair_slot_policy,
    ))
}

// =============================================================================
// WINDOW SHELL
// =============================================================================

/// Owns the window and turns winit events into loop state
struct Shell {
    attributes: WindowAttributes,
    window: Option<Arc<Window>>,
    resize: ResizeSignal,
    exit_requested: bool,
    error: Option<anyhow::Error>,
}

impl Shell {
    fn new(config: &Config, resize: ResizeSignal) -> Self {
        let attributes = WindowAttributes::default()
            .with_title(&config.window.title)
            .with_inner_size(winit::dpi::PhysicalSize::new(
                config.window.width,
                config.window.height,
            ))
            .with_resizable(config.window.resizable);

        Self {
            attributes,
            window: None,
            resize,
            exit_requested: false,
            error: None,
        }
    }
}

impl ApplicationHandler for Shell {
    /// Called when the application is ready to create windows.
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        match event_loop.create_window(self.attributes.clone()) {
            Ok(window) => self.window = Some(Arc::new(window)),
            Err(e) => {
                log::error!("Failed to create window: {}", e);
                self.error = Some(anyhow::Error::new(e).context("Failed to create window"));
                self.exit_requested = true;
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested, shutting down...");
                self.exit_requested = true;
                event_loop.exit();
            }

            WindowEvent::Resized(size) => {
                log::debug!("Window resized to {}x{}", size.width, size.height);
                self.resize.notify();
            }

            WindowEvent::KeyboardInput { event, .. } => {
                use winit::keyboard::{KeyCode, PhysicalKey};

                if event.state.is_pressed()
                    && event.physical_key == PhysicalKey::Code(KeyCode::Escape)
                {
                    log::info!("ESC pressed, exiting...");
                    self.exit_requested = true;
                    event_loop.exit();
                }
            }

            _ => {}
        }
    }
}

/// The frame loop's view of the window: size queries, and a blocking pump
/// used while the window is minimized
struct WinitWindow<'a> {
    event_loop: &'a mut EventLoop<()>,
    shell: &'a mut Shell,
}

impl WindowSystem for WinitWindow<'_> {
    fn drawable_size(&self) -> vk::Extent2D {
        let Some(window) = &self.shell.window else {
            return vk::Extent2D::default();
        };
        // Some platforms keep reporting the restored size while minimized
        if window.is_minimized() == Some(true) {
            return vk::Extent2D::default();
        }
        let size = window.inner_size();
        vk::Extent2D {
            width: size.width,
            height: size.height,
        }
    }

    fn wait_events(&mut self) -> bool {
        if self.shell.exit_requested {
            return false;
        }
        if let PumpStatus::Exit(_) = self
            .event_loop
            .pump_app_events(Some(MINIMIZED_POLL), &mut *self.shell)
        {
            self.shell.exit_requested = true;
        }
        !self.shell.exit_requested
    }
}

// =============================================================================
// FPS TRACKING
// =============================================================================

struct FpsCounter {
    frame_count: u32,
    last_frame_time: Instant,
    last_fps_update: Instant,
}

impl FpsCounter {
    fn new() -> Self {
        let now = Instant::now();
        Self {
            frame_count: 0,
            last_frame_time: now,
            last_fps_update: now,
        }
    }

    /// Count a presented frame; refresh the title once a second
    fn tick(&mut self, window: &Window, title: &str) {
        let now = Instant::now();
        let frame_time = now.duration_since(self.last_frame_time).as_secs_f32();
        self.last_frame_time = now;
        self.frame_count += 1;

        let elapsed = now.duration_since(self.last_fps_update).as_secs_f32();
        if elapsed >= 1.0 {
            let fps = self.frame_count as f32 / elapsed;
            window.set_title(&format!(
                "{} - {:.0} FPS ({:.2}ms)",
                title,
                fps,
                frame_time * 1000.0
            ));

            self.frame_count = 0;
            self.last_fps_update = now;
        }
    }
}
