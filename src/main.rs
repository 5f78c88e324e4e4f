use anyhow::Result;
use log::error;
use pixels::{Pixels, SurfaceTexture};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::time::{Duration, Instant};
use swirl::{
    drag_velocity, overlay_text, paint_density, random_splat, Fluid, FluidParams, Settings,
    Visuals, GLYPH_HEIGHT, LINE_SPACING,
};
use winit::{
    dpi::LogicalSize,
    event::{ElementState, Event, MouseButton, VirtualKeyCode, WindowEvent},
    event_loop::{ControlFlow, EventLoop},
    window::WindowBuilder,
};

#[derive(Clone, Copy, Debug, PartialEq)]
enum Tunable {
    Diffusion,
    Viscosity,
    Vorticity,
    BloomIntensity,
    BloomThreshold,
    SunraysWeight,
}

impl Tunable {
    fn label(self) -> &'static str {
        match self {
            Tunable::Diffusion => "DIFFUSION",
            Tunable::Viscosity => "VISCOSITY",
            Tunable::Vorticity => "VORTICITY",
            Tunable::BloomIntensity => "BLOOM INT",
            Tunable::BloomThreshold => "BLOOM CUT",
            Tunable::SunraysWeight => "RAYS",
        }
    }

    fn from_key(key: VirtualKeyCode) -> Option<Self> {
        match key {
            VirtualKeyCode::Key1 => Some(Tunable::Diffusion),
            VirtualKeyCode::Key2 => Some(Tunable::Viscosity),
            VirtualKeyCode::Key3 => Some(Tunable::Vorticity),
            VirtualKeyCode::Key4 => Some(Tunable::BloomIntensity),
            VirtualKeyCode::Key5 => Some(Tunable::BloomThreshold),
            VirtualKeyCode::Key6 => Some(Tunable::SunraysWeight),
            _ => None,
        }
    }

    fn value(self, settings: &Settings) -> f32 {
        match self {
            Tunable::Diffusion => settings.diffusion,
            Tunable::Viscosity => settings.viscosity,
            Tunable::Vorticity => settings.vorticity,
            Tunable::BloomIntensity => settings.bloom_intensity,
            Tunable::BloomThreshold => settings.bloom_threshold,
            Tunable::SunraysWeight => settings.sunrays_weight,
        }
    }

    fn adjust(self, settings: &mut Settings, up: bool) {
        match self {
            Tunable::Diffusion => {
                let factor = if up { 1.5 } else { 1.0 / 1.5 };
                settings.diffusion = (settings.diffusion * factor).clamp(1e-7, 1e-3);
            }
            Tunable::Viscosity => {
                let factor = if up { 1.5 } else { 1.0 / 1.5 };
                settings.viscosity = (settings.viscosity * factor).clamp(1e-9, 1e-5);
            }
            Tunable::Vorticity => {
                let step = if up { 0.25 } else { -0.25 };
                settings.vorticity = (settings.vorticity + step).clamp(0.0, 5.0);
            }
            Tunable::BloomIntensity => {
                let step = if up { 0.1 } else { -0.1 };
                settings.bloom_intensity = (settings.bloom_intensity + step).clamp(0.1, 1.5);
            }
            Tunable::BloomThreshold => {
                let step = if up { 0.05 } else { -0.05 };
                settings.bloom_threshold = (settings.bloom_threshold + step).clamp(0.1, 1.0);
            }
            Tunable::SunraysWeight => {
                let step = if up { 0.05 } else { -0.05 };
                settings.sunrays_weight = (settings.sunrays_weight + step).clamp(0.0, 1.0);
            }
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
struct PointerState {
    cursor: (f32, f32),
    previous: (f32, f32),
    left_held: bool,
    right_held: bool,
}

fn cell_under_cursor(cursor: (f32, f32), window: (u32, u32), side: usize) -> (i32, i32) {
    let w = window.0.max(1) as f32;
    let h = window.1.max(1) as f32;
    let x = (cursor.0 / w * side as f32) as i32;
    let y = (cursor.1 / h * side as f32) as i32;
    (x, y)
}

fn toggle_line(settings: &Settings) -> String {
    let mut flags = Vec::new();
    if settings.colorful {
        flags.push("COLOR");
    }
    if settings.bloom {
        flags.push("BLOOM");
    }
    if settings.sunrays {
        flags.push("RAYS");
    }
    if settings.random_splats {
        flags.push("SPLATS");
    }
    flags.join(" ")
}

fn format_value(value: f32) -> String {
    if value != 0.0 && value.abs() < 0.01 {
        format!("{value:.1E}")
    } else {
        format!("{value:.2}")
    }
}

fn draw_hud(
    frame: &mut [u8],
    size: (usize, usize),
    settings: &Settings,
    tunable: Tunable,
    fps: f32,
) {
    let line_height = GLYPH_HEIGHT + LINE_SPACING;
    let lines = [
        format!("{} {}", tunable.label(), format_value(tunable.value(settings))),
        format!("FPS {fps:.0}"),
        toggle_line(settings),
    ];
    let mut y = 6;
    for line in lines {
        overlay_text(frame, size.0, size.1, 6, y, &line, [240, 240, 240]);
        y += line_height;
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let mut settings = Settings::load_or_default();
    let event_loop = EventLoop::new();
    let window = WindowBuilder::new()
        .with_title("swirl")
        .with_inner_size(LogicalSize::new(
            settings.screen_width as f64,
            settings.screen_height as f64,
        ))
        .build(&event_loop)?;
    let window_size = window.inner_size();
    let surface_texture = SurfaceTexture::new(window_size.width, window_size.height, &window);
    let mut pixels = Pixels::new(
        settings.screen_width as u32,
        settings.screen_height as u32,
        surface_texture,
    )?;
    let mut fluid = Fluid::new(
        settings.sim_resolution,
        FluidParams::new(settings.dt, settings.diffusion, settings.viscosity),
    );
    let mut visuals = Visuals::new(settings.screen_width, settings.screen_height, &settings);
    let mut rng = StdRng::from_entropy();
    let mut pointer = PointerState::default();
    let mut tunable = Tunable::Vorticity;
    let started = Instant::now();
    let frame_budget = Duration::from_secs_f32(1.0 / settings.fps.max(1) as f32);
    let mut last_frame = Instant::now();
    let mut fps = settings.fps as f32;
    let mut frame_count: u64 = 0;

    event_loop.run(move |event, _, control_flow| {
        *control_flow = ControlFlow::Poll;
        match event {
            Event::WindowEvent {
                event: WindowEvent::CloseRequested,
                ..
            } => *control_flow = ControlFlow::Exit,
            Event::WindowEvent {
                event: WindowEvent::Resized(size),
                ..
            } => {
                if let Err(err) = pixels.resize_surface(size.width, size.height) {
                    error!("surface resize failed: {err}");
                    *control_flow = ControlFlow::Exit;
                }
            }
            Event::WindowEvent {
                event: WindowEvent::CursorMoved { position, .. },
                ..
            } => {
                pointer.cursor = (position.x as f32, position.y as f32);
            }
            Event::WindowEvent {
                event: WindowEvent::MouseInput { state, button, .. },
                ..
            } => {
                let held = state == ElementState::Pressed;
                match button {
                    MouseButton::Left => pointer.left_held = held,
                    MouseButton::Right => pointer.right_held = held,
                    _ => {}
                }
            }
            Event::WindowEvent {
                event: WindowEvent::KeyboardInput { input, .. },
                ..
            } => {
                if input.state == ElementState::Pressed {
                    if let Some(key) = input.virtual_keycode {
                        if let Some(selected) = Tunable::from_key(key) {
                            tunable = selected;
                        }
                        match key {
                            VirtualKeyCode::Up => tunable.adjust(&mut settings, true),
                            VirtualKeyCode::Down => tunable.adjust(&mut settings, false),
                            VirtualKeyCode::C => settings.colorful = !settings.colorful,
                            VirtualKeyCode::B => settings.bloom = !settings.bloom,
                            VirtualKeyCode::S => settings.sunrays = !settings.sunrays,
                            VirtualKeyCode::R => settings.random_splats = !settings.random_splats,
                            VirtualKeyCode::Escape => *control_flow = ControlFlow::Exit,
                            _ => {}
                        }
                    }
                }
            }
            Event::MainEventsCleared => {
                let size = window.inner_size();
                if pointer.left_held || pointer.right_held {
                    let cell = cell_under_cursor(
                        pointer.cursor,
                        (size.width, size.height),
                        fluid.size(),
                    );
                    if pointer.left_held {
                        paint_density(&mut fluid, cell);
                    }
                    if pointer.right_held {
                        let delta = (
                            pointer.cursor.0 - pointer.previous.0,
                            pointer.cursor.1 - pointer.previous.1,
                        );
                        drag_velocity(&mut fluid, cell, delta);
                    }
                }
                pointer.previous = pointer.cursor;
                if settings.random_splats
                    && frame_count % settings.splat_frequency.max(1) as u64 == 0
                {
                    random_splat(&mut fluid, &mut rng);
                }
                fluid.params_mut().diffusion = settings.diffusion;
                fluid.params_mut().viscosity = settings.viscosity;
                fluid.step(settings.vorticity);
                frame_count += 1;
                window.request_redraw();
            }
            Event::RedrawRequested(_) => {
                visuals.render(
                    fluid.density(),
                    started.elapsed().as_secs_f32(),
                    &settings,
                    pixels.frame_mut(),
                );
                draw_hud(
                    pixels.frame_mut(),
                    (settings.screen_width, settings.screen_height),
                    &settings,
                    tunable,
                    fps,
                );
                if let Err(err) = pixels.render() {
                    error!("render failed: {err}");
                    *control_flow = ControlFlow::Exit;
                    return;
                }
                let elapsed = last_frame.elapsed();
                if elapsed < frame_budget {
                    std::thread::sleep(frame_budget - elapsed);
                }
                let frame_time = last_frame.elapsed().as_secs_f32().max(1e-6);
                fps = fps * 0.9 + 0.1 / frame_time;
                last_frame = Instant::now();
            }
            _ => {}
        }
    });
}
