//! Bot module for handling Telegram interactions
//!
//! This module is split into several submodules:
//! - `message_handler`: Drives one funnel turn per incoming text message
//! - `ui_builder`: Translates render instructions into Telegram keyboards
//! - `turn_lock`: Per-user mutual exclusion so turns never interleave

pub mod message_handler;
pub mod turn_lock;
pub mod ui_builder;

// Re-export main handler for use in main.rs
pub use message_handler::message_handler;

pub use turn_lock::TurnLockManager;
pub use ui_builder::create_choice_keyboard;
