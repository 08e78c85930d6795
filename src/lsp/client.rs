//! Client Seam
//!
//! Everything the pipeline sends to the editor goes through [`ClientSink`],
//! implemented by the real `tower_lsp::Client` and by a recorder in tests.

use tower_lsp::jsonrpc::Result as LspResult;
use tower_lsp::lsp_types::{self, MessageType, Registration, Unregistration, Url};
use tower_lsp::Client;

#[tower_lsp::async_trait]
pub trait ClientSink: Send + Sync + 'static {
    async fn publish_diagnostics(
        &self,
        uri: Url,
        diagnostics: Vec<lsp_types::Diagnostic>,
        version: Option<i32>,
    );

    async fn show_message(&self, typ: MessageType, message: String);

    async fn log_message(&self, typ: MessageType, message: String);

    /// `Ok` means the client acknowledged with an empty result
    async fn register_capability(&self, registrations: Vec<Registration>) -> LspResult<()>;

    async fn unregister_capability(&self, unregistrations: Vec<Unregistration>) -> LspResult<()>;
}

#[tower_lsp::async_trait]
impl ClientSink for Client {
    async fn publish_diagnostics(
        &self,
        uri: Url,
        diagnostics: Vec<lsp_types::Diagnostic>,
        version: Option<i32>,
    ) {
        Client::publish_diagnostics(self, uri, diagnostics, version).await;
    }

    async fn show_message(&self, typ: MessageType, message: String) {
        Client::show_message(self, typ, message).await;
    }

    async fn log_message(&self, typ: MessageType, message: String) {
        Client::log_message(self, typ, message).await;
    }

    async fn register_capability(&self, registrations: Vec<Registration>) -> LspResult<()> {
        Client::register_capability(self, registrations).await
    }

    async fn unregister_capability(&self, unregistrations: Vec<Unregistration>) -> LspResult<()> {
        Client::unregister_capability(self, unregistrations).await
    }
}
