use serde_json::{json, Value};
use tower_lsp::jsonrpc::{Error as RpcError, ErrorCode, Result as LspResult};
use tower_lsp::lsp_types::*;

use crate::lsp::actions::{code_actions, command_mode};
use crate::lsp::backend::Backend;
use crate::lsp::registration::{RegistrationError, COMPLETION_METHOD};

pub const REGISTER_COMPLETIONS: &str = "registerCompletions";
pub const UNREGISTER_COMPLETIONS: &str = "unregisterCompletions";

/// Trait for handling completion requests
#[tower_lsp::async_trait]
pub trait HandleCompletion {
    async fn handle_completion(
        &self,
        params: CompletionParams,
    ) -> LspResult<Option<CompletionResponse>>;
}

/// Trait for handling code action requests
#[tower_lsp::async_trait]
pub trait HandleCodeAction {
    async fn handle_code_action(
        &self,
        params: CodeActionParams,
    ) -> LspResult<Option<CodeActionResponse>>;
}

/// Trait for handling workspace/executeCommand
#[tower_lsp::async_trait]
pub trait HandleExecuteCommand {
    async fn handle_execute_command(&self, params: ExecuteCommandParams)
        -> LspResult<Option<Value>>;
}

#[tower_lsp::async_trait]
impl HandleCompletion for Backend {
    async fn handle_completion(
        &self,
        _params: CompletionParams,
    ) -> LspResult<Option<CompletionResponse>> {
        // Same list for every position and document
        Ok(Some(CompletionResponse::List(
            self.completions.completion_list(),
        )))
    }
}

#[tower_lsp::async_trait]
impl HandleCodeAction for Backend {
    async fn handle_code_action(
        &self,
        params: CodeActionParams,
    ) -> LspResult<Option<CodeActionResponse>> {
        let uri = params.text_document.uri;
        let published = self.orchestrator.published(&uri).await;

        log::debug!("Code actions requested for {}", uri);
        Ok(Some(code_actions(&uri, &published)))
    }
}

#[tower_lsp::async_trait]
impl HandleExecuteCommand for Backend {
    async fn handle_execute_command(
        &self,
        params: ExecuteCommandParams,
    ) -> LspResult<Option<Value>> {
        match params.command.as_str() {
            REGISTER_COMPLETIONS => {
                let options = json!({ "triggerCharacters": [":"] });
                self.registrations
                    .register(COMPLETION_METHOD, Some(options))
                    .await
                    .map_err(registration_error)?;
                Ok(None)
            }
            UNREGISTER_COMPLETIONS => {
                self.registrations
                    .unregister(COMPLETION_METHOD)
                    .await
                    .map_err(registration_error)?;
                Ok(None)
            }
            command => {
                let mode = command_mode(command).ok_or_else(|| {
                    RpcError::invalid_params(format!("Unknown command: {}", command))
                })?;
                let uri = command_uri(&params.arguments)?;

                self.orchestrator
                    .revalidate(&uri, mode)
                    .await
                    .map_err(|e| RpcError::invalid_params(e.to_string()))?;
                Ok(None)
            }
        }
    }
}

/// The user already saw the failure; the command response carries it too
fn registration_error(error: RegistrationError) -> RpcError {
    RpcError {
        code: ErrorCode::InternalError,
        message: error.to_string().into(),
        data: None,
    }
}

/// The document URI passed as first command argument
fn command_uri(arguments: &[Value]) -> LspResult<Url> {
    let argument = arguments
        .first()
        .ok_or_else(|| RpcError::invalid_params("Missing document URI argument"))?;
    serde_json::from_value(argument.clone())
        .map_err(|e| RpcError::invalid_params(format!("Invalid document URI: {}", e)))
}
