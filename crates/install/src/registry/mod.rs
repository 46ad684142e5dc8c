//! Host collaborators for running without a linked broker
//!
//! [`ShellRegistry`] answers registry reads through the elevated shell and
//! [`UnavailableBroker`] stands in for a broker that is not present, so the
//! privilege selector falls through to the shell.

mod shell;
mod unavailable;

pub use shell::ShellRegistry;
pub use unavailable::UnavailableBroker;
