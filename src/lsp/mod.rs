//! LSP Protocol Implementation
//!
//! Document lifecycle, diagnostics publication, completions, code actions
//! and dynamic capability registration.

pub mod actions;
pub mod backend;
pub mod client;
pub mod handlers;
pub mod orchestrator;
pub mod registration;
pub mod server;

pub use backend::Backend;
pub use client::ClientSink;
pub use orchestrator::Orchestrator;
pub use registration::RegistrationManager;
