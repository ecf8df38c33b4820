use std::path::PathBuf;
use std::sync::Arc;

use bls_ide::TOKEN_LEGEND;
use tokio::sync::RwLock;
use tower_lsp_server::jsonrpc::Result as LspResult;
use tower_lsp_server::ls_types::CompletionOptions;
use tower_lsp_server::ls_types::CompletionParams;
use tower_lsp_server::ls_types::CompletionResponse;
use tower_lsp_server::ls_types::Diagnostic;
use tower_lsp_server::ls_types::DidChangeConfigurationParams;
use tower_lsp_server::ls_types::DidChangeTextDocumentParams;
use tower_lsp_server::ls_types::DidCloseTextDocumentParams;
use tower_lsp_server::ls_types::DidOpenTextDocumentParams;
use tower_lsp_server::ls_types::ExecuteCommandOptions;
use tower_lsp_server::ls_types::ExecuteCommandParams;
use tower_lsp_server::ls_types::GotoDefinitionParams;
use tower_lsp_server::ls_types::GotoDefinitionResponse;
use tower_lsp_server::ls_types::Hover;
use tower_lsp_server::ls_types::HoverParams;
use tower_lsp_server::ls_types::HoverProviderCapability;
use tower_lsp_server::ls_types::InitializeParams;
use tower_lsp_server::ls_types::InitializeResult;
use tower_lsp_server::ls_types::InitializedParams;
use tower_lsp_server::ls_types::OneOf;
use tower_lsp_server::ls_types::SemanticTokens;
use tower_lsp_server::ls_types::SemanticTokensFullOptions;
use tower_lsp_server::ls_types::SemanticTokensLegend;
use tower_lsp_server::ls_types::SemanticTokensOptions;
use tower_lsp_server::ls_types::SemanticTokensParams;
use tower_lsp_server::ls_types::SemanticTokensResult;
use tower_lsp_server::ls_types::SemanticTokensServerCapabilities;
use tower_lsp_server::ls_types::ServerCapabilities;
use tower_lsp_server::ls_types::ServerInfo;
use tower_lsp_server::ls_types::TextDocumentSyncCapability;
use tower_lsp_server::ls_types::TextDocumentSyncKind;
use tower_lsp_server::ls_types::TextDocumentSyncOptions;
use tower_lsp_server::ls_types::Uri;
use tower_lsp_server::Client;
use tower_lsp_server::LanguageServer;
use tracing::info;
use tracing::warn;

use crate::documents::Language;
use crate::session::Session;
use crate::workspace;

const SERVER_NAME: &str = "Blaze Language Server";
const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");
const VALIDATE_WORKSPACE_COMMAND: &str = "bls.validateWorkspace";

pub struct BlazeLanguageServer {
    client: Client,
    session: Arc<RwLock<Session>>,
}

impl BlazeLanguageServer {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self {
            client,
            session: Arc::new(RwLock::new(Session::default())),
        }
    }

    pub async fn with_session<R>(&self, f: impl FnOnce(&Session) -> R) -> R {
        let session = self.session.read().await;
        f(&session)
    }

    pub async fn with_session_mut<R>(&self, f: impl FnOnce(&mut Session) -> R) -> R {
        let mut session = self.session.write().await;
        f(&mut session)
    }

    /// Re-derives companion analysis and diagnostics for one markup
    /// document, publishing the result.
    async fn refresh_document(&self, uri: &Uri) {
        let outcome = self
            .with_session(|session| {
                let document = session.documents().get(uri.as_str())?;
                if document.language() != Language::Markup {
                    return None;
                }
                let path = uri.to_file_path()?.into_owned();

                bls_analysis::analyze_document(
                    &session.analysis(),
                    &session.resolver(),
                    &path,
                    document.text(),
                );

                let diagnostics =
                    bls_ide::validate(document.text(), document.index(), session.specs());
                Some((diagnostics, document.version()))
            })
            .await;

        if let Some((diagnostics, version)) = outcome {
            self.client
                .publish_diagnostics(uri.clone(), diagnostics, Some(version))
                .await;
        }
    }

    async fn run_workspace_validation(&self) {
        let results = self
            .with_session(|session| {
                session
                    .root()
                    .map(|root| workspace::validate_workspace(root, session.specs()))
            })
            .await;

        let Some(results) = results else {
            info!("No workspace root; skipping workspace validation");
            return;
        };

        info!("Workspace validation found issues in {} file(s)", results.len());
        for (path, diagnostics) in results {
            if let Some(uri) = Uri::from_file_path(&path) {
                self.client.publish_diagnostics(uri, diagnostics, None).await;
            }
        }
    }
}

fn project_root(params: &InitializeParams) -> Option<PathBuf> {
    if let Some(folders) = &params.workspace_folders {
        if let Some(folder) = folders.first() {
            return folder.uri.to_file_path().map(|p| p.into_owned());
        }
    }
    std::env::current_dir().ok()
}

impl LanguageServer for BlazeLanguageServer {
    async fn initialize(&self, params: InitializeParams) -> LspResult<InitializeResult> {
        let root = project_root(&params);

        self.with_session_mut(|session| {
            *session.client_capabilities_mut() = Some(params.capabilities);

            if let Some(root) = &root {
                let settings = bls_conf::Settings::new(root).unwrap_or_else(|error| {
                    warn!("Failed to load settings: {error}; using defaults");
                    bls_conf::Settings::default()
                });
                session.set_settings(settings);
            }
            session.set_root(root);
        })
        .await;

        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Options(
                    TextDocumentSyncOptions {
                        open_close: Some(true),
                        change: Some(TextDocumentSyncKind::INCREMENTAL),
                        ..TextDocumentSyncOptions::default()
                    },
                )),
                completion_provider: Some(CompletionOptions {
                    resolve_provider: Some(false),
                    trigger_characters: Some(
                        ["{", "#", "/", ">", " ", "\""]
                            .map(str::to_string)
                            .to_vec(),
                    ),
                    ..CompletionOptions::default()
                }),
                hover_provider: Some(HoverProviderCapability::Simple(true)),
                definition_provider: Some(OneOf::Left(true)),
                semantic_tokens_provider: Some(
                    SemanticTokensServerCapabilities::SemanticTokensOptions(
                        SemanticTokensOptions {
                            legend: SemanticTokensLegend {
                                token_types: TOKEN_LEGEND.to_vec(),
                                token_modifiers: Vec::new(),
                            },
                            full: Some(SemanticTokensFullOptions::Bool(true)),
                            ..SemanticTokensOptions::default()
                        },
                    ),
                ),
                execute_command_provider: Some(ExecuteCommandOptions {
                    commands: vec![VALIDATE_WORKSPACE_COMMAND.to_string()],
                    ..ExecuteCommandOptions::default()
                }),
                ..ServerCapabilities::default()
            },
            server_info: Some(ServerInfo {
                name: SERVER_NAME.to_string(),
                version: Some(SERVER_VERSION.to_string()),
            }),
            offset_encoding: None,
        })
    }

    async fn initialized(&self, _params: InitializedParams) {
        info!("{SERVER_NAME} initialized");
    }

    async fn shutdown(&self) -> LspResult<()> {
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let uri = params.text_document.uri.clone();
        self.with_session_mut(|session| session.documents_mut().handle_did_open(&params))
            .await;
        self.refresh_document(&uri).await;
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let uri = params.text_document.uri.clone();
        let applied = self
            .with_session_mut(|session| session.documents_mut().handle_did_change(&params))
            .await;
        if let Err(error) = applied {
            warn!("Failed to apply document change: {error}");
            return;
        }
        self.refresh_document(&uri).await;
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let uri = params.text_document.uri.clone();
        self.with_session_mut(|session| session.documents_mut().handle_did_close(&params))
            .await;
        self.client
            .publish_diagnostics(uri, Vec::<Diagnostic>::new(), None)
            .await;
    }

    async fn did_change_configuration(&self, _params: DidChangeConfigurationParams) {
        info!("Configuration change detected; reloading settings");
        self.with_session_mut(|session| {
            let Some(root) = session.root().cloned() else {
                return;
            };
            match bls_conf::Settings::new(&root) {
                Ok(settings) => session.set_settings(settings),
                Err(error) => warn!("Failed to reload settings: {error}"),
            }
        })
        .await;
    }

    async fn completion(&self, params: CompletionParams) -> LspResult<Option<CompletionResponse>> {
        let position_params = params.text_document_position;
        let items = self
            .with_session(|session| {
                let document = session
                    .documents()
                    .get(position_params.text_document.uri.as_str())?;
                let offset = document.index().offset(position_params.position)? as usize;
                let path = position_params.text_document.uri.to_file_path()?;
                let dir = path.parent()?.to_path_buf();
                let base = path.file_stem()?.to_str()?.to_string();

                Some(bls_ide::completion_items(
                    document.text(),
                    offset,
                    &dir,
                    &base,
                    &session.analysis(),
                    session.specs(),
                ))
            })
            .await;

        Ok(items
            .filter(|items| !items.is_empty())
            .map(CompletionResponse::Array))
    }

    async fn hover(&self, params: HoverParams) -> LspResult<Option<Hover>> {
        let position_params = params.text_document_position_params;
        Ok(self
            .with_session(|session| {
                let document = session
                    .documents()
                    .get(position_params.text_document.uri.as_str())?;
                let offset = document.index().offset(position_params.position)? as usize;
                let path = position_params.text_document.uri.to_file_path()?;
                let dir = path.parent()?;
                let base = path.file_stem()?.to_str()?;

                bls_ide::hover(
                    document.text(),
                    offset,
                    dir,
                    base,
                    &session.analysis(),
                    session.specs(),
                )
            })
            .await)
    }

    async fn goto_definition(
        &self,
        params: GotoDefinitionParams,
    ) -> LspResult<Option<GotoDefinitionResponse>> {
        let position_params = params.text_document_position_params;
        Ok(self
            .with_session(|session| {
                let document = session
                    .documents()
                    .get(position_params.text_document.uri.as_str())?;
                let offset = document.index().offset(position_params.position)? as usize;
                let path = position_params.text_document.uri.to_file_path()?;

                bls_ide::definition(
                    document.text(),
                    offset,
                    &path,
                    &session.analysis(),
                    &session.resolver(),
                )
            })
            .await
            .map(GotoDefinitionResponse::Array))
    }

    async fn semantic_tokens_full(
        &self,
        params: SemanticTokensParams,
    ) -> LspResult<Option<SemanticTokensResult>> {
        Ok(self
            .with_session(|session| {
                let document = session.documents().get(params.text_document.uri.as_str())?;
                let data = bls_ide::semantic_tokens(
                    document.text(),
                    document.index(),
                    session.specs(),
                );
                Some(SemanticTokensResult::Tokens(SemanticTokens {
                    result_id: None,
                    data,
                }))
            })
            .await)
    }

    async fn execute_command(
        &self,
        params: ExecuteCommandParams,
    ) -> LspResult<Option<serde_json::Value>> {
        if params.command == VALIDATE_WORKSPACE_COMMAND {
            self.run_workspace_validation().await;
        } else {
            warn!("Unknown command: {}", params.command);
        }
        Ok(None)
    }
}
