//! All Telegram-specific functionality

pub mod client;
pub mod renderer;

// Re-export main types for convenience
pub use client::{ChatSender, TelegramClient};
pub use renderer::{compose_summary, render};
