//! LSP wiring for the Blaze language server.
//!
//! Protocol glue only: document lifecycle, session state, and thin handler
//! bodies that delegate to `bls-ide` and `bls-analysis`.

mod documents;
mod logging;
mod server;
mod session;
pub mod workspace;

use std::sync::OnceLock;

use anyhow::Result;
use tower_lsp_server::Client;
use tower_lsp_server::LspService;
use tower_lsp_server::Server;

pub use crate::server::BlazeLanguageServer;

static CLIENT: OnceLock<Client> = OnceLock::new();

/// Runs the language server over stdio until the client disconnects.
pub async fn serve() -> Result<()> {
    let guard = logging::init_tracing(|message_type, message| {
        if let Some(client) = CLIENT.get() {
            let client = client.clone();
            tokio::spawn(async move {
                client.log_message(message_type, message).await;
            });
        }
    });

    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();

    let (service, socket) = LspService::build(|client| {
        let _ = CLIENT.set(client.clone());
        BlazeLanguageServer::new(client)
    })
    .finish();

    Server::new(stdin, stdout, socket).serve(service).await;

    drop(guard);
    Ok(())
}
