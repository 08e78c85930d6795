//! Capability Registration Manager
//!
//! Tracks which optional protocol features are dynamically registered with
//! the client, keyed by method, along with the identifier issued for each.

use std::collections::HashMap;

use serde_json::Value;
use thiserror::Error;
use tokio::sync::Mutex;
use tower_lsp::lsp_types::{MessageType, Registration, Unregistration};
use uuid::Uuid;

use crate::lsp::client::ClientSink;

pub const COMPLETION_METHOD: &str = "textDocument/completion";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistrationError {
    #[error("client declined registration of {method}: {reason}")]
    Declined { method: String, reason: String },
    #[error("client declined unregistration of {method}: {reason}")]
    UnregistrationDeclined { method: String, reason: String },
}

/// User-facing name of a capability
fn describe(method: &str) -> &str {
    match method {
        COMPLETION_METHOD => "completions",
        other => other,
    }
}

pub struct RegistrationManager<C: ClientSink> {
    client: C,
    active: Mutex<HashMap<String, String>>,
}

impl<C: ClientSink> RegistrationManager<C> {
    pub fn new(client: C) -> Self {
        Self {
            client,
            active: Mutex::new(HashMap::new()),
        }
    }

    /// Register `method` with the client under a fresh identifier.
    /// Registering an already active method succeeds without a new request.
    pub async fn register(
        &self,
        method: &str,
        options: Option<Value>,
    ) -> Result<String, RegistrationError> {
        let mut active = self.active.lock().await;
        let name = describe(method);

        if let Some(id) = active.get(method) {
            log::debug!("{} already registered as {}", method, id);
            self.info(format!("Successfully registered {} method", name))
                .await;
            return Ok(id.clone());
        }

        let id = Uuid::new_v4().to_string();
        let registration = Registration {
            id: id.clone(),
            method: method.to_string(),
            register_options: options,
        };

        match self.client.register_capability(vec![registration]).await {
            Ok(()) => {
                active.insert(method.to_string(), id.clone());
                self.info(format!("Successfully registered {} method", name))
                    .await;
                Ok(id)
            }
            Err(e) => {
                log::warn!("Registration of {} declined: {}", method, e);
                self.error(format!("Error happened during {} registration.", name))
                    .await;
                Err(RegistrationError::Declined {
                    method: method.to_string(),
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Unregister `method` using the identifier issued at registration.
    /// With nothing registered this is a successful no-op.
    pub async fn unregister(&self, method: &str) -> Result<(), RegistrationError> {
        let mut active = self.active.lock().await;
        let name = describe(method);

        let Some(id) = active.get(method).cloned() else {
            log::debug!("{} is not registered, nothing to unregister", method);
            self.info(format!("Successfully unregistered {} method", name))
                .await;
            return Ok(());
        };

        let unregistration = Unregistration {
            id,
            method: method.to_string(),
        };

        match self.client.unregister_capability(vec![unregistration]).await {
            Ok(()) => {
                active.remove(method);
                self.info(format!("Successfully unregistered {} method", name))
                    .await;
                Ok(())
            }
            Err(e) => {
                log::warn!("Unregistration of {} declined: {}", method, e);
                self.error(format!("Error happened during {} unregistration.", name))
                    .await;
                Err(RegistrationError::UnregistrationDeclined {
                    method: method.to_string(),
                    reason: e.to_string(),
                })
            }
        }
    }

    pub async fn registration_id(&self, method: &str) -> Option<String> {
        self.active.lock().await.get(method).cloned()
    }

    async fn info(&self, message: String) {
        self.client.show_message(MessageType::INFO, message).await;
    }

    async fn error(&self, message: String) {
        self.client.show_message(MessageType::ERROR, message).await;
    }
}
