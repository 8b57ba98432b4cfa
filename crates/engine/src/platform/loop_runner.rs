use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use pixels::Error as PixelsError;
use thiserror::Error;
use tracing::{info, warn};
use winit::dpi::LogicalSize;
use winit::error::{EventLoopError, OsError};
use winit::event::{ElementState, Event, MouseButton, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::WindowBuilder;

use crate::app::scheduler::{compute_cap_sleep, normalize_render_fps_cap, target_frame_duration};
use crate::app::{key_codes, Engine, MetricsAccumulator};

use super::renderer::FrameTarget;

/// Platform-side knobs for [`run_engine`]. Engine behavior itself is
/// configured on the [`Engine`] before it is handed over.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub window_title: String,
    /// Cadence of the periodic `loop_metrics` log line.
    pub metrics_log_interval: Duration,
    /// Frame pacing used because the windowing backend drives redraws as
    /// fast as it can rather than supplying a vsync-paced frame callback.
    /// `None` disables the cap.
    pub render_fps_cap: Option<u32>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            window_title: "scene2d".to_string(),
            metrics_log_interval: Duration::from_secs(1),
            render_fps_cap: Some(60),
        }
    }
}

#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("failed to create event loop: {0}")]
    CreateEventLoop(#[source] EventLoopError),
    #[error("failed to create application window: {0}")]
    CreateWindow(#[source] OsError),
    #[error("failed to initialize frame surface: {0}")]
    CreateSurface(#[source] PixelsError),
    #[error("event loop failed: {0}")]
    EventLoopRun(#[source] EventLoopError),
}

/// Drive the engine from a winit window until the window closes.
///
/// Fixed-rate activities do not start before the surface exists: the first
/// redraw only establishes the scheduler baseline. Each redraw then runs the
/// owed simulation/key-poll/hold ticks to completion and renders one frame;
/// no two ticks ever overlap.
pub fn run_engine(mut engine: Engine, config: RunConfig) -> Result<(), PlatformError> {
    let engine_config = engine.config();
    let event_loop = EventLoop::new().map_err(PlatformError::CreateEventLoop)?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title(config.window_title.clone())
            .with_inner_size(LogicalSize::new(
                engine_config.width as f64,
                engine_config.height as f64,
            ))
            .build(&event_loop)
            .map_err(PlatformError::CreateWindow)?,
    );
    let mut frame_target = FrameTarget::new(
        Arc::clone(&window),
        engine_config.width,
        engine_config.height,
    )
    .map_err(PlatformError::CreateSurface)?;

    event_loop.set_control_flow(ControlFlow::Poll);

    let render_fps_cap = normalize_render_fps_cap(config.render_fps_cap);
    let render_frame_target = target_frame_duration(render_fps_cap);
    info!(
        width = engine_config.width,
        height = engine_config.height,
        sim_interval_ms = engine_config.timers.sim_interval_ms,
        key_poll_interval_ms = engine_config.timers.key_poll_interval_ms,
        mouse_hold_interval_ms = engine_config.timers.mouse_hold_interval_ms,
        render_fps_cap = render_fps_cap.unwrap_or(0),
        "loop_config"
    );

    let mut cursor = (0.0f32, 0.0f32);
    let mut last_frame_instant = Instant::now();
    let mut last_present_instant = Instant::now();
    let mut metrics = MetricsAccumulator::new(config.metrics_log_interval);

    event_loop
        .run(move |event, window_target| match event {
            Event::WindowEvent { window_id, event } if window_id == window.id() => match event {
                WindowEvent::CloseRequested => {
                    info!(reason = "window_close", "shutdown_requested");
                    window_target.exit();
                }
                WindowEvent::Resized(new_size) => {
                    if let Err(error) = frame_target.resize_surface(new_size.width, new_size.height)
                    {
                        warn!(error = %error, "surface_resize_failed");
                        window_target.exit();
                    }
                }
                WindowEvent::KeyboardInput { event, .. } => {
                    if let Some(code) = engine_key_code(event.physical_key) {
                        match event.state {
                            ElementState::Pressed => engine.key_down(code),
                            ElementState::Released => engine.key_up(code),
                        }
                    }
                }
                WindowEvent::CursorMoved { position, .. } => {
                    cursor = frame_target.cursor_to_surface(position);
                    engine.pointer_moved(cursor.0, cursor.1);
                }
                WindowEvent::MouseInput {
                    state,
                    button: MouseButton::Left,
                    ..
                } => match state {
                    ElementState::Pressed => engine.pointer_down(cursor.0, cursor.1),
                    ElementState::Released => engine.pointer_up(cursor.0, cursor.1),
                },
                WindowEvent::RedrawRequested => {
                    let now = Instant::now();
                    let raw_frame_dt = now.saturating_duration_since(last_frame_instant);
                    last_frame_instant = now;

                    let plan = engine.advance(now);
                    metrics.record_ticks(plan.sim_ticks);

                    // Single pacing sleep point, as the backend redraws at
                    // full speed rather than per repaint.
                    let elapsed_since_last_present =
                        Instant::now().saturating_duration_since(last_present_instant);
                    let cap_sleep =
                        compute_cap_sleep(elapsed_since_last_present, render_frame_target);
                    if cap_sleep > Duration::ZERO {
                        thread::sleep(cap_sleep);
                    }

                    if let Err(error) = frame_target.present(&mut engine) {
                        warn!(error = %error, "renderer_draw_failed");
                        window_target.exit();
                    }
                    last_present_instant = Instant::now();
                    metrics.record_frame(raw_frame_dt);

                    if let Some(snapshot) = metrics.maybe_snapshot(now) {
                        info!(
                            fps = snapshot.fps,
                            tps = snapshot.tps,
                            frame_time_ms = snapshot.frame_time_ms,
                            entity_count = engine.entity_count(),
                            "loop_metrics"
                        );
                    }
                }
                _ => {}
            },
            Event::AboutToWait => {
                window.request_redraw();
            }
            Event::LoopExiting => {
                info!("shutdown");
            }
            _ => {}
        })
        .map_err(PlatformError::EventLoopRun)
}

/// Translate a physical key into the engine's numeric key-code scheme.
fn engine_key_code(key: PhysicalKey) -> Option<u32> {
    let code = match key {
        PhysicalKey::Code(KeyCode::Backspace) => key_codes::BACKSPACE,
        PhysicalKey::Code(KeyCode::Tab) => key_codes::TAB,
        PhysicalKey::Code(KeyCode::Enter) => key_codes::ENTER,
        PhysicalKey::Code(KeyCode::ShiftLeft) | PhysicalKey::Code(KeyCode::ShiftRight) => {
            key_codes::SHIFT
        }
        PhysicalKey::Code(KeyCode::ControlLeft) | PhysicalKey::Code(KeyCode::ControlRight) => {
            key_codes::CTRL
        }
        PhysicalKey::Code(KeyCode::Escape) => key_codes::ESCAPE,
        PhysicalKey::Code(KeyCode::Space) => key_codes::SPACE,
        PhysicalKey::Code(KeyCode::ArrowLeft) => key_codes::LEFT,
        PhysicalKey::Code(KeyCode::ArrowUp) => key_codes::UP,
        PhysicalKey::Code(KeyCode::ArrowRight) => key_codes::RIGHT,
        PhysicalKey::Code(KeyCode::ArrowDown) => key_codes::DOWN,
        PhysicalKey::Code(KeyCode::KeyA) => key_codes::KEY_A,
        PhysicalKey::Code(KeyCode::KeyD) => key_codes::KEY_D,
        PhysicalKey::Code(KeyCode::KeyS) => key_codes::KEY_S,
        PhysicalKey::Code(KeyCode::KeyW) => key_codes::KEY_W,
        _ => return None,
    };
    Some(code)
}
