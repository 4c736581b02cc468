//! Event handlers for controller and poller events

pub mod composite;
pub mod console;
pub mod json_log;

// Re-export for convenience
pub use composite::CompositeEventHandler;
pub use console::ConsoleEventHandler;
pub use json_log::JsonLogEventHandler;
