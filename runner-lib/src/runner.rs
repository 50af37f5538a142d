//! Generic runner for emulated machines.
//!
//! Provides the main window, input handling, and run loop for any Machine.
//!
//! Machine control keys, handled here rather than forwarded:
//! Space resets, P toggles pause, T single-steps while paused, and
//! Escape or M quits.

use crate::audio::AudioOutput;
use emu_core::{FrameStatus, KeyCode, Machine};
use log::{error, info, warn};
use pixels::{Pixels, SurfaceTexture};
use std::collections::HashSet;
use std::sync::Arc;
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::KeyCode as WinitKeyCode;
use winit::keyboard::PhysicalKey;
use winit::window::{Window, WindowId};

/// Configuration for the runner.
pub struct RunnerConfig {
    /// Window title.
    pub title: String,
    /// Integer scale factor for sharp pixels.
    pub scale: u32,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            title: "Emulator".to_string(),
            scale: 8,
        }
    }
}

/// Run an emulated machine with the given configuration.
pub fn run<M: Machine + 'static>(machine: M, config: RunnerConfig) {
    let event_loop = EventLoop::new().expect("Failed to create event loop");
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut runner = Runner::new(machine, config);
    event_loop.run_app(&mut runner).expect("Event loop error");
}

/// Generic runner that handles the window and main loop for any Machine.
pub struct Runner<M: Machine> {
    machine: M,
    config: RunnerConfig,
    window: Option<Arc<Window>>,
    pixels: Option<Pixels<'static>>,
    audio_output: Option<AudioOutput>,
    audio_samples: Vec<f32>,
    keys_pressed: HashSet<WinitKeyCode>,
}

impl<M: Machine> Runner<M> {
    /// Create a new runner for the given machine.
    pub fn new(machine: M, config: RunnerConfig) -> Self {
        let samples_per_frame = machine.audio_config().samples_per_frame;

        Self {
            machine,
            config,
            window: None,
            pixels: None,
            audio_output: None,
            audio_samples: vec![0.0; samples_per_frame],
            keys_pressed: HashSet::new(),
        }
    }

    fn handle_control_key(&mut self, keycode: WinitKeyCode, event_loop: &ActiveEventLoop) {
        match keycode {
            WinitKeyCode::Escape | WinitKeyCode::KeyM => {
                info!("quit requested");
                event_loop.exit();
            }
            WinitKeyCode::Space => {
                info!("reset");
                if let Err(err) = self.machine.reset() {
                    error!("reset failed: {err}");
                    event_loop.exit();
                }
            }
            WinitKeyCode::KeyP => self.machine.toggle_pause(),
            WinitKeyCode::KeyT => {
                if let Err(err) = self.machine.step_paused() {
                    error!("emulation failed: {err}");
                    event_loop.exit();
                }
            }
            _ => {}
        }
    }
}

impl<M: Machine> ApplicationHandler for Runner<M> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        // Create window on first resume (or when resuming from suspend on mobile)
        if self.window.is_some() {
            return;
        }

        let video_config = self.machine.video_config();
        let scaled_width = video_config.width * self.config.scale;
        let scaled_height = video_config.height * self.config.scale;

        let window = Arc::new(
            event_loop
                .create_window(
                    Window::default_attributes()
                        .with_title(&self.config.title)
                        .with_inner_size(LogicalSize::new(scaled_width, scaled_height)),
                )
                .expect("Failed to create window"),
        );

        let size = window.inner_size();
        let surface = SurfaceTexture::new(size.width, size.height, Arc::clone(&window));
        let pixels = Pixels::new(video_config.width, video_config.height, surface)
            .expect("Failed to create pixels");

        // Initialize audio output
        let audio_config = self.machine.audio_config();
        let audio_output =
            AudioOutput::new(audio_config.sample_rate, audio_config.samples_per_frame);
        if audio_output.is_none() {
            warn!("no audio device available, sound disabled");
        }

        self.window = Some(window);
        // SAFETY: pixels lifetime is tied to window which lives for the program duration
        self.pixels = Some(unsafe { std::mem::transmute(pixels) });
        self.audio_output = audio_output;
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }

            WindowEvent::Resized(size) => {
                if size.width > 0 && size.height > 0 {
                    if let Some(pixels) = &mut self.pixels {
                        pixels.resize_surface(size.width, size.height).ok();
                    }
                }
            }

            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(keycode) = event.physical_key {
                    match event.state {
                        ElementState::Pressed => {
                            if !event.repeat {
                                self.handle_control_key(keycode, event_loop);
                            }

                            // Track pressed keys and notify machine
                            if !self.keys_pressed.contains(&keycode) {
                                self.keys_pressed.insert(keycode);
                                if let Some(key) = convert_keycode(keycode) {
                                    self.machine.key_down(key);
                                }
                            }
                        }
                        ElementState::Released => {
                            self.keys_pressed.remove(&keycode);
                            if let Some(key) = convert_keycode(keycode) {
                                self.machine.key_up(key);
                            }
                        }
                    }
                }
            }

            WindowEvent::RedrawRequested => {
                if let Some(pixels) = &mut self.pixels {
                    if let Err(err) = pixels.render() {
                        error!("surface render failed: {err}");
                        event_loop.exit();
                    }
                }
            }

            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        // Skip if window not yet created
        if self.window.is_none() {
            return;
        }

        // Run one frame; a fatal machine error ends the run, a clean exit
        // request just closes the loop
        match self.machine.run_frame() {
            Ok(FrameStatus::Running | FrameStatus::Paused) => {}
            Ok(FrameStatus::Exited) => {
                event_loop.exit();
                return;
            }
            Err(err) => {
                error!("emulation failed: {err}");
                event_loop.exit();
                return;
            }
        }

        // Generate and output audio; samples past the buffer are dropped
        self.machine.generate_audio(&mut self.audio_samples);
        if let Some(ref mut audio) = self.audio_output {
            audio.push_samples(&self.audio_samples);
        }

        // Render to pixels buffer
        if let Some(pixels) = &mut self.pixels {
            self.machine.render(pixels.frame_mut());
        }

        // Request redraw
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

/// Convert winit KeyCode to our internal KeyCode.
fn convert_keycode(keycode: WinitKeyCode) -> Option<KeyCode> {
    match keycode {
        WinitKeyCode::KeyA => Some(KeyCode::KeyA),
        WinitKeyCode::KeyC => Some(KeyCode::KeyC),
        WinitKeyCode::KeyD => Some(KeyCode::KeyD),
        WinitKeyCode::KeyE => Some(KeyCode::KeyE),
        WinitKeyCode::KeyF => Some(KeyCode::KeyF),
        WinitKeyCode::KeyM => Some(KeyCode::KeyM),
        WinitKeyCode::KeyP => Some(KeyCode::KeyP),
        WinitKeyCode::KeyQ => Some(KeyCode::KeyQ),
        WinitKeyCode::KeyR => Some(KeyCode::KeyR),
        WinitKeyCode::KeyS => Some(KeyCode::KeyS),
        WinitKeyCode::KeyT => Some(KeyCode::KeyT),
        WinitKeyCode::KeyV => Some(KeyCode::KeyV),
        WinitKeyCode::KeyW => Some(KeyCode::KeyW),
        WinitKeyCode::KeyX => Some(KeyCode::KeyX),
        WinitKeyCode::KeyZ => Some(KeyCode::KeyZ),
        WinitKeyCode::Digit1 => Some(KeyCode::Digit1),
        WinitKeyCode::Digit2 => Some(KeyCode::Digit2),
        WinitKeyCode::Digit3 => Some(KeyCode::Digit3),
        WinitKeyCode::Digit4 => Some(KeyCode::Digit4),
        WinitKeyCode::Space => Some(KeyCode::Space),
        WinitKeyCode::Escape => Some(KeyCode::Escape),
        _ => None,
    }
}
