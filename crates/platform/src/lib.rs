//! Host platform layer for pkgi.
//!
//! This crate provides:
//! - Process execution with event emission and timeouts
//! - The elevated shell (`su -c`) used by the shell install backend
//!
//! Everything above this crate talks to the host through [`ProcessOperations`],
//! so tests can substitute a scripted implementation.

pub mod core;
pub mod implementations;
pub mod process;
pub mod shell;

pub use core::{Platform, PlatformContext};
pub use implementations::host::HostProcessOperations;
pub use process::{CommandOutput, PlatformCommand, ProcessOperations};
pub use shell::ElevatedShell;
