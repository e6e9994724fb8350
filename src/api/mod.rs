//! API Lambda handler and request processing

pub mod callback_handler;
pub mod command_handler;
pub mod handler;
pub mod helpers;
pub mod parsing;
pub mod signature;

// Re-export the main handler for convenience
pub use handler::handler;
