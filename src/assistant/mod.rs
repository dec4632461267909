//! Assistant session and its drivers

pub mod console;
pub mod runtime;
mod session;

pub use runtime::{Command, run};
pub use session::{AssistantEvent, AssistantSession, Notice};
