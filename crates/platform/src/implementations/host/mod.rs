//! Host implementation backed by `tokio::process`

pub mod process;

pub use process::HostProcessOperations;
