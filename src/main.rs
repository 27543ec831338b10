use std::any::Any;
use std::env;
use std::fmt;
use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use glam::Vec2;
use log::info;
use pollster::block_on;
use winit::dpi::LogicalSize;
use winit::event::{
    ElementState, Event, KeyboardInput, ModifiersState, MouseButton as WinitMouseButton,
    MouseScrollDelta, WindowEvent,
};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::platform::run_return::EventLoopExtRunReturn;
use winit::window::WindowBuilder;

use scene_lab::{
    Application, InputEvent, KeyCode, LightKind, Modifiers, MouseButton, NamedKey,
    RecordingDevice, Response, SceneRenderer, SceneState, Variant, WgpuDevice,
};

/// Pixels reported per wheel notch by line-based devices.
const PIXELS_PER_LINE: f32 = 100.0;

const USAGE: &str = "Usage: scene-lab [--variant basic|multi-light|explorer] [--scene FILE.xml] \
                     [--assets DIR] [--set PATH=VALUE]... [--summary-only]";

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("Error: {err:?}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = CliOptions::parse(env::args().skip(1))?;
    let mut config = options.variant.config();
    if let Some(path) = &options.scene {
        let xml = fs::read_to_string(path)
            .with_context(|| format!("failed to read scene {}", path.display()))?;
        config
            .apply_xml(&xml)
            .with_context(|| format!("failed to parse scene {}", path.display()))?;
    }
    let mut app = Application::new(&config)?;
    app.apply_settings(&options.settings)?;

    let scene = app.scene();
    println!(
        "Loaded {} scene with {} objects ({} lights)",
        options.variant,
        scene.objects.len(),
        scene.lights.len()
    );
    for object in &scene.objects {
        println!(" - {} ({})", object.name, object.shape);
    }

    if options.summary_only {
        return run_headless(&app);
    }
    match run_interactive(&mut app, options.assets.clone()) {
        Ok(()) => Ok(()),
        Err(err) if err.downcast_ref::<WindowInitError>().is_some() => {
            eprintln!(
                "{err}. Falling back to --summary-only mode (set DISPLAY or install X11 libs to enable rendering)."
            );
            run_headless(&app)
        }
        Err(err) => Err(err),
    }
}

fn run_headless(app: &Application) -> Result<()> {
    let mut renderer = SceneRenderer::new(RecordingDevice::new())?;
    let stats = renderer.render(app.scene())?;
    println!(
        "Rendered frame: {} draws, {} lights, {} shading",
        stats.draws,
        stats.lights,
        stats.shading.name()
    );
    print_final_state(app.scene());
    Ok(())
}

fn run_interactive(app: &mut Application, assets: PathBuf) -> Result<()> {
    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(|_| {}));
    let event_loop = panic::catch_unwind(AssertUnwindSafe(EventLoop::new));
    panic::set_hook(default_hook);
    let mut event_loop =
        event_loop.map_err(|panic| WindowInitError::from_panic("event loop", panic))?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title("Scene Lab")
            .with_inner_size(LogicalSize::new(1280.0, 720.0))
            .build(&event_loop)
            .map_err(|err| WindowInitError::from_error("window", err))?,
    );

    let size = window.inner_size();
    let device = block_on(WgpuDevice::new(Arc::clone(&window), assets))?;
    let renderer = SceneRenderer::new(device)?;
    app.handle(InputEvent::Resize {
        width: size.width,
        height: size.height,
    });
    info!("window ready ({}x{})", size.width, size.height);

    let mut state = WindowState {
        app,
        renderer,
        cursor: Vec2::ZERO,
        modifiers: Modifiers::NONE,
        last_error: None,
    };
    event_loop.run_return(|event, _, control_flow| {
        *control_flow = ControlFlow::Poll;
        if let Err(err) = state.process_event(&event, control_flow) {
            state.last_error = Some(err);
            control_flow.set_exit();
        }
    });

    print_final_state(state.app.scene());
    match state.last_error {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

struct WindowState<'a> {
    app: &'a mut Application,
    renderer: SceneRenderer<WgpuDevice>,
    cursor: Vec2,
    modifiers: Modifiers,
    last_error: Option<anyhow::Error>,
}

impl WindowState<'_> {
    fn process_event(&mut self, event: &Event<()>, control_flow: &mut ControlFlow) -> Result<()> {
        let window_id = self.renderer.device().window_id();
        match event {
            Event::WindowEvent { event, window_id: id } if *id == window_id => {
                let input = match event {
                    WindowEvent::CloseRequested => {
                        control_flow.set_exit();
                        None
                    }
                    WindowEvent::Resized(size) => {
                        self.renderer.device_mut().resize(*size);
                        Some(InputEvent::Resize {
                            width: size.width,
                            height: size.height,
                        })
                    }
                    WindowEvent::ScaleFactorChanged { new_inner_size, .. } => {
                        self.renderer.device_mut().resize(**new_inner_size);
                        Some(InputEvent::Resize {
                            width: new_inner_size.width,
                            height: new_inner_size.height,
                        })
                    }
                    WindowEvent::ModifiersChanged(state) => {
                        self.modifiers = map_modifiers(*state);
                        None
                    }
                    WindowEvent::KeyboardInput { input, .. } => key_event(input),
                    WindowEvent::MouseInput { state, button, .. } => {
                        let button = map_mouse_button(*button);
                        Some(match state {
                            ElementState::Pressed => InputEvent::PointerDown {
                                button,
                                position: self.cursor,
                            },
                            ElementState::Released => InputEvent::PointerUp { button },
                        })
                    }
                    WindowEvent::CursorMoved { position, .. } => {
                        self.cursor = Vec2::new(position.x as f32, position.y as f32);
                        Some(InputEvent::PointerMove {
                            position: self.cursor,
                        })
                    }
                    WindowEvent::MouseWheel { delta, .. } => {
                        let delta = match delta {
                            MouseScrollDelta::LineDelta(_, y) => -y * PIXELS_PER_LINE,
                            MouseScrollDelta::PixelDelta(position) => -position.y as f32,
                        };
                        Some(InputEvent::Wheel {
                            delta,
                            modifiers: self.modifiers,
                        })
                    }
                    _ => None,
                };
                if let Some(input) = input {
                    if self.app.handle(input) == Response::Quit {
                        control_flow.set_exit();
                    }
                }
            }
            Event::RedrawRequested(id) if *id == window_id => {
                self.renderer
                    .render(self.app.scene())
                    .context("frame aborted")?;
                if let Err(err) = self.renderer.device_mut().present() {
                    match err {
                        wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated => {
                            let device = self.renderer.device_mut();
                            let size = device.window().inner_size();
                            device.resize(size);
                        }
                        wgpu::SurfaceError::OutOfMemory => {
                            return Err(anyhow!("GPU is out of memory"));
                        }
                        wgpu::SurfaceError::Timeout => {
                            info!("Surface timeout; retrying next frame");
                        }
                    }
                }
            }
            Event::MainEventsCleared => {
                self.renderer.device().window().request_redraw();
            }
            _ => {}
        }
        Ok(())
    }
}

fn key_event(input: &KeyboardInput) -> Option<InputEvent> {
    if input.state != ElementState::Pressed {
        return None;
    }
    let key = input.virtual_keycode.and_then(map_keycode)?;
    Some(InputEvent::KeyDown { key })
}

#[derive(Debug)]
struct WindowInitError {
    message: String,
}

impl WindowInitError {
    fn from_panic(stage: &str, panic: Box<dyn Any + Send>) -> Self {
        Self {
            message: format!("failed to initialize {stage}: {}", panic_message(panic)),
        }
    }

    fn from_error(stage: &str, err: impl fmt::Display) -> Self {
        Self {
            message: format!("failed to initialize {stage}: {err}"),
        }
    }
}

impl fmt::Display for WindowInitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for WindowInitError {}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    match panic.downcast::<String>() {
        Ok(msg) => *msg,
        Err(panic) => match panic.downcast::<&'static str>() {
            Ok(msg) => (*msg).to_string(),
            Err(_) => "unknown panic".into(),
        },
    }
}

fn print_final_state(scene: &SceneState) {
    let camera = &scene.camera;
    println!(
        "Camera eye=({:.2}, {:.2}, {:.2}) at=({:.2}, {:.2}, {:.2}) fovy={:.2} near={:.2} far={:.2}",
        camera.eye.x,
        camera.eye.y,
        camera.eye.z,
        camera.at.x,
        camera.at.y,
        camera.at.z,
        camera.fovy,
        camera.near,
        camera.far
    );
    for (slot, light) in scene.lights.iter().enumerate() {
        let kind = match light.kind() {
            LightKind::Directional => "directional",
            LightKind::Point => "point",
            LightKind::Spot => "spot",
        };
        let state = if light.turned_on { "on" } else { "off" };
        println!("Light {slot}: {kind}, {state}");
    }
    let material = scene.material.get();
    println!(
        "Material Kd=({:.2}, {:.2}, {:.2}) shininess={:.2}",
        material.kd.x, material.kd.y, material.kd.z, material.shininess
    );
}

fn map_modifiers(state: ModifiersState) -> Modifiers {
    Modifiers {
        shift: state.shift(),
        ctrl: state.ctrl(),
        alt: state.alt(),
        meta: state.logo(),
    }
}

fn map_mouse_button(button: WinitMouseButton) -> MouseButton {
    let index = match button {
        WinitMouseButton::Left => 0,
        WinitMouseButton::Right => 1,
        WinitMouseButton::Middle => 2,
        WinitMouseButton::Other(value) => value.min(u16::from(u8::MAX)) as u8,
    };
    MouseButton::new(index)
}

fn map_keycode(code: winit::event::VirtualKeyCode) -> Option<KeyCode> {
    use winit::event::VirtualKeyCode as Key;
    Some(match code {
        Key::Escape => KeyCode::Named(NamedKey::Escape),
        Key::Key1 | Key::Numpad1 => KeyCode::Digit(1),
        Key::Key2 | Key::Numpad2 => KeyCode::Digit(2),
        Key::Key3 | Key::Numpad3 => KeyCode::Digit(3),
        Key::Key4 | Key::Numpad4 => KeyCode::Digit(4),
        Key::Key5 | Key::Numpad5 => KeyCode::Digit(5),
        Key::Key6 | Key::Numpad6 => KeyCode::Digit(6),
        Key::Key7 | Key::Numpad7 => KeyCode::Digit(7),
        Key::Key8 | Key::Numpad8 => KeyCode::Digit(8),
        Key::Key9 | Key::Numpad9 => KeyCode::Digit(9),
        Key::A => KeyCode::Character('A'),
        Key::C => KeyCode::Character('C'),
        Key::D => KeyCode::Character('D'),
        Key::F => KeyCode::Character('F'),
        Key::G => KeyCode::Character('G'),
        Key::N => KeyCode::Character('N'),
        Key::R => KeyCode::Character('R'),
        Key::S => KeyCode::Character('S'),
        Key::W => KeyCode::Character('W'),
        Key::Z => KeyCode::Character('Z'),
        _ => return None,
    })
}

#[derive(Debug, PartialEq)]
struct CliOptions {
    variant: Variant,
    scene: Option<PathBuf>,
    assets: PathBuf,
    settings: Vec<String>,
    summary_only: bool,
}

impl CliOptions {
    fn parse(args: impl IntoIterator<Item = String>) -> Result<Self> {
        let mut options = Self {
            variant: Variant::MultiLight,
            scene: None,
            assets: PathBuf::from("assets"),
            settings: Vec::new(),
            summary_only: false,
        };
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            let mut value = |flag: &str| {
                args.next()
                    .ok_or_else(|| anyhow!("{flag} expects a value\n{USAGE}"))
            };
            match arg.as_str() {
                "--variant" => options.variant = value("--variant")?.parse()?,
                "--scene" => options.scene = Some(PathBuf::from(value("--scene")?)),
                "--assets" => options.assets = PathBuf::from(value("--assets")?),
                "--set" => options.settings.push(value("--set")?),
                "--summary-only" => options.summary_only = true,
                "--help" | "-h" => return Err(anyhow!(USAGE)),
                other => return Err(anyhow!("Unknown argument: {other}\n{USAGE}")),
            }
        }
        Ok(options)
    }
}
