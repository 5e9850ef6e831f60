//! Host keyboard → FRAME button mapping.
//!
//! Arrow keys and WASD both drive the direction buttons; Z = A, X = B,
//! Enter = Start, Backspace = Menu.

use winit::keyboard::KeyCode;

use crate::input::Button;

/// Map a host key to a FRAME button.
///
/// Returns `None` for unmapped keys.
#[must_use]
pub fn map_keycode(key: KeyCode) -> Option<Button> {
    match key {
        KeyCode::ArrowLeft | KeyCode::KeyA => Some(Button::Left),
        KeyCode::ArrowDown | KeyCode::KeyS => Some(Button::Down),
        KeyCode::ArrowUp | KeyCode::KeyW => Some(Button::Up),
        KeyCode::ArrowRight | KeyCode::KeyD => Some(Button::Right),
        KeyCode::KeyZ => Some(Button::A),
        KeyCode::KeyX => Some(Button::B),
        KeyCode::Enter => Some(Button::Start),
        KeyCode::Backspace => Some(Button::Menu),
        _ => None,
    }
}
