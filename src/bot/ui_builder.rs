//! UI Builder module for creating keyboards from render instructions

use teloxide::types::{KeyboardButton, KeyboardMarkup};

/// Build a reply keyboard from labeled button rows.
///
/// Reply-keyboard buttons send their label back as a plain text
/// message, which is exactly what the literal matcher in the engine
/// consumes; no callback payloads are involved.
pub fn create_choice_keyboard(button_rows: &[Vec<String>]) -> KeyboardMarkup {
    let rows: Vec<Vec<KeyboardButton>> = button_rows
        .iter()
        .map(|row| row.iter().map(KeyboardButton::new).collect())
        .collect();

    let mut keyboard = KeyboardMarkup::new(rows);
    keyboard.resize_keyboard = true;
    keyboard
}
