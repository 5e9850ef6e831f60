//! FRAME console binary.
//!
//! Assembles a source file and runs it in a winit window with a pixels
//! framebuffer, or in headless mode for screenshots and batch runs.

use std::path::PathBuf;
use std::process;
use std::time::Instant;

use emu_frame::{capture, keyboard_map, BufferSurface, Frame, FrameConfig, RunState, DISPLAY_SIZE};
use pixels::{Pixels, SurfaceTexture};
use winit::application::ApplicationHandler;
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowAttributes, WindowId};

/// Default window scale factor (64×64 pixels are tiny).
const DEFAULT_SCALE: u32 = 8;

// ---------------------------------------------------------------------------
// CLI argument parsing
// ---------------------------------------------------------------------------

struct CliArgs {
    source: Option<PathBuf>,
    headless: bool,
    ticks: u32,
    scale: u32,
    screenshot: Option<PathBuf>,
}

fn parse_args() -> CliArgs {
    let args: Vec<String> = std::env::args().collect();
    let mut cli = CliArgs {
        source: None,
        headless: false,
        ticks: 600,
        scale: DEFAULT_SCALE,
        screenshot: None,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--headless" => {
                cli.headless = true;
            }
            "--ticks" => {
                i += 1;
                if let Some(s) = args.get(i) {
                    cli.ticks = s.parse().unwrap_or(600);
                }
            }
            "--scale" => {
                i += 1;
                if let Some(s) = args.get(i) {
                    cli.scale = s.parse().unwrap_or(DEFAULT_SCALE).max(1);
                }
            }
            "--screenshot" => {
                i += 1;
                cli.screenshot = args.get(i).map(PathBuf::from);
            }
            "--help" | "-h" => {
                eprintln!("Usage: emu-frame <program.asm> [OPTIONS]");
                eprintln!();
                eprintln!("Options:");
                eprintln!("  --headless           Run without a window");
                eprintln!("  --ticks <n>          Scheduler ticks in headless mode [default: 600]");
                eprintln!("  --scale <n>          Window scale factor [default: {DEFAULT_SCALE}]");
                eprintln!("  --screenshot <file>  Save a PNG screenshot (headless)");
                process::exit(0);
            }
            other if !other.starts_with('-') => {
                cli.source = Some(PathBuf::from(other));
            }
            other => {
                eprintln!("Unknown argument: {other}");
                process::exit(1);
            }
        }
        i += 1;
    }

    cli
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

fn make_frame(cli: &CliArgs) -> Frame<BufferSurface> {
    let mut frame = match Frame::new(FrameConfig::default(), BufferSurface::new()) {
        Ok(frame) => frame,
        Err(e) => {
            eprintln!("Fatal: {e}");
            process::exit(1);
        }
    };

    let Some(ref path) = cli.source else {
        eprintln!("Usage: emu-frame <program.asm> [OPTIONS]");
        process::exit(1);
    };
    let source = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Failed to read {}: {e}", path.display());
            process::exit(1);
        }
    };
    let program = match frame.assembler().assemble(&source) {
        Ok(program) => program,
        Err(e) => {
            eprintln!("{}: {e}", path.display());
            process::exit(1);
        }
    };
    log::info!(
        "assembled {} ({} instructions, entry {:#06x})",
        path.display(),
        program.listing.len(),
        program.start
    );

    frame.load_program(&program);
    frame.run();
    frame
}

// ---------------------------------------------------------------------------
// Headless mode
// ---------------------------------------------------------------------------

fn run_headless(cli: &CliArgs) {
    let mut frame = make_frame(cli);

    for _ in 0..cli.ticks {
        if frame.state() == RunState::Stopped {
            break;
        }
        frame.run_batch();
    }

    if let Some(error) = frame.last_error() {
        eprintln!("Stopped: {error}");
        process::exit(1);
    }

    if let Some(ref path) = cli.screenshot {
        if let Err(e) = capture::save_screenshot(&frame, path, cli.scale) {
            eprintln!("Screenshot error: {e}");
            process::exit(1);
        }
        eprintln!("Screenshot saved to {}", path.display());
    }

    eprintln!("{} cycles executed", frame.cycles());
}

// ---------------------------------------------------------------------------
// Windowed mode (winit + pixels)
// ---------------------------------------------------------------------------

struct App {
    frame: Frame<BufferSurface>,
    window: Option<&'static Window>,
    pixels: Option<Pixels<'static>>,
    last_tick: Instant,
    scale: u32,
}

impl App {
    fn new(frame: Frame<BufferSurface>, scale: u32) -> Self {
        Self {
            frame,
            window: None,
            pixels: None,
            last_tick: Instant::now(),
            scale,
        }
    }

    fn handle_key(&mut self, keycode: KeyCode, pressed: bool) {
        if let Some(button) = keyboard_map::map_keycode(keycode) {
            if pressed {
                self.frame.press_button(button);
            } else {
                self.frame.release_button(button);
            }
        }
    }

    fn update_pixels(&mut self) {
        let Some(pixels) = self.pixels.as_mut() else {
            return;
        };

        // The machine blits into its BufferSurface; expand 0/1 bytes to RGBA.
        let source = self.frame.surface().pixels();
        let target = pixels.frame_mut();
        for (i, &on) in source.iter().enumerate() {
            let value = if on != 0 { 0xFF } else { 0x00 };
            let offset = i * 4;
            target[offset] = value;
            target[offset + 1] = value;
            target[offset + 2] = value;
            target[offset + 3] = 0xFF;
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return; // Already created
        }

        let side = DISPLAY_SIZE * self.scale;
        let window_size = winit::dpi::LogicalSize::new(side, side);
        let attrs = WindowAttributes::default()
            .with_title("FRAME")
            .with_inner_size(window_size)
            .with_resizable(false);

        match event_loop.create_window(attrs) {
            Ok(window) => {
                // Leak the window to get a 'static reference. This is
                // intentional: it lives for the whole process and the OS
                // reclaims it on exit.
                let window: &'static Window = Box::leak(Box::new(window));
                let inner = window.inner_size();
                let surface = SurfaceTexture::new(inner.width, inner.height, window);
                match Pixels::new(DISPLAY_SIZE, DISPLAY_SIZE, surface) {
                    Ok(pixels) => {
                        self.pixels = Some(pixels);
                    }
                    Err(e) => {
                        eprintln!("Failed to create pixels: {e}");
                        event_loop.exit();
                        return;
                    }
                }
                self.window = Some(window);
            }
            Err(e) => {
                eprintln!("Failed to create window: {e}");
                event_loop.exit();
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(keycode) = event.physical_key {
                    if keycode == KeyCode::Escape && event.state == ElementState::Pressed {
                        event_loop.exit();
                        return;
                    }
                    self.handle_key(keycode, event.state == ElementState::Pressed);
                }
            }
            WindowEvent::RedrawRequested => {
                // Throttle batches to the configured tick interval.
                let now = Instant::now();
                if now.duration_since(self.last_tick) >= self.frame.config().tick_interval {
                    self.frame.run_batch();
                    self.update_pixels();
                    self.last_tick = now;
                }

                if let Some(pixels) = self.pixels.as_ref() {
                    if let Err(e) = pixels.render() {
                        eprintln!("Render error: {e}");
                        event_loop.exit();
                    }
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = self.window {
            window.request_redraw();
        }
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() {
    env_logger::init();
    let cli = parse_args();

    if cli.headless {
        run_headless(&cli);
        return;
    }

    let frame = make_frame(&cli);
    let mut app = App::new(frame, cli.scale);

    let event_loop = match EventLoop::new() {
        Ok(el) => el,
        Err(e) => {
            eprintln!("Failed to create event loop: {e}");
            process::exit(1);
        }
    };

    if let Err(e) = event_loop.run_app(&mut app) {
        eprintln!("Event loop error: {e}");
        process::exit(1);
    }
}
