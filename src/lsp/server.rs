use anyhow::Result;
use tokio::io::{stdin, stdout};
use tower_lsp::{LspService, Server};

use crate::lsp::backend::Backend;
use crate::spec::SpecTree;
use crate::Config;

/// Start the LSP server
pub async fn serve() -> Result<()> {
    let config = Config::from_args_and_env()?;

    // RUST_LOG wins over the configured level; stdout carries the protocol
    let _ = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.log_level.as_str()),
    )
    .target(env_logger::Target::Stderr)
    .try_init();

    if let Some(path) = &config.config_file {
        log::info!("Loaded config from {}", path.display());
    }
    log::info!(
        "Validating with '{} {}' ({}s timeout)",
        config.validator,
        config.validator_args.join(" "),
        config.validate_timeout.as_secs()
    );

    let spec = SpecTree::embedded();

    let (service, socket) =
        LspService::build(move |client| Backend::new(client, config.clone(), spec.clone()))
            .finish();

    Server::new(stdin(), stdout(), socket).serve(service).await;

    Ok(())
}
