use winit::event::{ElementState, KeyboardInput, MouseButton, VirtualKeyCode, WindowEvent};

use crate::config::LIGHT_X_RANGE;
use crate::tracer::{Light, RenderMode};

/// Amplitude of the animated light sweep along x.
pub const LIGHT_SWEEP: f32 = 10.0;

/// User-facing render parameters, written only from the event loop thread.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewerState {
    pub mode: RenderMode,
    pub light: Light,
    pub animating: bool,
}

impl ViewerState {
    pub fn new(mode: RenderMode, light: Light) -> Self {
        Self {
            mode,
            light,
            animating: false,
        }
    }

    pub fn set_light_x(&mut self, x: f32) {
        self.light.position.x = x.clamp(*LIGHT_X_RANGE.start(), *LIGHT_X_RANGE.end());
    }

    /// Sinusoidal sweep, one radian per second.
    pub fn animate(&mut self, elapsed_seconds: f32) {
        if self.animating {
            self.set_light_x(elapsed_seconds.sin() * LIGHT_SWEEP);
        }
    }

    /// Window title listing every mode with the active one in brackets.
    pub fn title(&self) -> String {
        let modes: Vec<String> = RenderMode::ALL
            .iter()
            .enumerate()
            .map(|(index, mode)| {
                if *mode == self.mode {
                    format!("[{} {}]", index + 1, mode.label())
                } else {
                    format!("{} {}", index + 1, mode.label())
                }
            })
            .collect();
        let animation = if self.animating { "  (animating)" } else { "" };
        format!(
            "sphere tracer | {} | light x {:+.2}{}",
            modes.join("  "),
            self.light.position.x,
            animation
        )
    }
}

/// Keyboard and mouse bindings standing in for the slider, the mode buttons
/// and the animate toggle.
pub struct LightController {
    pub step: f32,
    dragging: bool,
}

impl LightController {
    pub fn new(step: f32) -> Self {
        Self {
            step,
            dragging: false,
        }
    }

    /// Applies `event` to `state`. Returns true when a redraw is needed.
    pub fn process_events(
        &mut self,
        state: &mut ViewerState,
        event: &WindowEvent,
        window_width: u32,
    ) -> bool {
        match event {
            WindowEvent::KeyboardInput {
                input:
                    KeyboardInput {
                        state: ElementState::Pressed,
                        virtual_keycode: Some(keycode),
                        ..
                    },
                ..
            } => self.process_key(state, *keycode),
            WindowEvent::MouseInput {
                state: button_state,
                button: MouseButton::Left,
                ..
            } => {
                self.dragging = *button_state == ElementState::Pressed;
                false
            }
            WindowEvent::CursorMoved { position, .. } if self.dragging && window_width > 0 => {
                let fraction = (position.x as f32 / window_width as f32).clamp(0.0, 1.0);
                let (min, max) = (*LIGHT_X_RANGE.start(), *LIGHT_X_RANGE.end());
                state.animating = false;
                state.set_light_x(min + fraction * (max - min));
                true
            }
            _ => false,
        }
    }

    fn process_key(&self, state: &mut ViewerState, keycode: VirtualKeyCode) -> bool {
        let mode = match keycode {
            VirtualKeyCode::Key1 => Some(RenderMode::Phong),
            VirtualKeyCode::Key2 => Some(RenderMode::PhongReflection),
            VirtualKeyCode::Key3 => Some(RenderMode::PhongShadow),
            VirtualKeyCode::Key4 => Some(RenderMode::PhongShadowReflection),
            _ => None,
        };
        if let Some(mode) = mode {
            tracing::info!(mode = mode.label(), "render mode selected");
            state.mode = mode;
            return true;
        }

        match keycode {
            VirtualKeyCode::Left => {
                state.animating = false;
                state.set_light_x(state.light.position.x - self.step);
                true
            }
            VirtualKeyCode::Right => {
                state.animating = false;
                state.set_light_x(state.light.position.x + self.step);
                true
            }
            VirtualKeyCode::Space => {
                state.animating = !state.animating;
                tracing::info!(animating = state.animating, "light animation toggled");
                true
            }
            _ => false,
        }
    }
}
