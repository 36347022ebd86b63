//! evals library crate: the scenario harness behind the `evals` binary.
//!
//! A run resolves one scenario directory ([`locate`]), loads its declaration
//! ([`descriptor`]), executes setup and validation scripts ([`exec`],
//! [`runner`]), records a transcript ([`transcript`]) and renders the outcome
//! ([`report`]). Integration tests drive the binary; unit tests exercise these
//! modules directly.

pub mod config;
pub mod descriptor;
pub mod error;
pub mod exec;
pub mod format;
pub mod locate;
pub mod report;
pub mod runner;
pub mod telemetry;
pub mod transcript;
