use dashmap::DashMap;
use once_cell::sync::OnceCell;
use serde_json::Value;
use std::env;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use crate::commands::ApplicationCommand;
use crate::commands::component::Component;
use crate::discord::api;
use crate::error::{BotError, Result};
use crate::registry::{Registry, RegistrySnapshot};
use crate::response::WebhookResponse;
use crate::router::{Dispatcher, ErrorHook};
use crate::server;
use crate::verify::SignatureVerifier;

fn default_hook() -> ErrorHook {
    Arc::new(|e, _payload| {
        Box::pin(async move {
            eprintln!("[ERROR] handler failed:");
            e.print_tree();
        })
    })
}

/// The application: configuration, the declared catalog, the HTTP client
/// used for synchronization, and the dispatch engine entry point.
///
/// Declaration happens before [`Client::serve`]; after the one-time
/// synchronization the catalog is sealed into an immutable snapshot and
/// requests are served lock-free against it.
pub struct Client {
    application_id: String,
    token: String,
    route: String,
    verifier: SignatureVerifier,
    http: reqwest::Client,
    registry: Registry,
    snapshot: OnceCell<Arc<RegistrySnapshot>>,
    tokens: DashMap<String, String>,
    hook: ErrorHook,
}

impl Client {
    /// Fails when the public key is not a valid hex Ed25519 key.
    pub fn new(
        application_id: impl Into<String>,
        public_key: &str,
        token: impl Into<String>,
    ) -> Result<Self> {
        Ok(Self {
            application_id: application_id.into(),
            token: token.into(),
            route: "/interactions".to_string(),
            verifier: SignatureVerifier::new(public_key)?,
            http: reqwest::Client::new(),
            registry: Registry::new(),
            snapshot: OnceCell::new(),
            tokens: DashMap::new(),
            hook: default_hook(),
        })
    }

    /// Build from `DISCORD_APP_ID`, `DISCORD_PUBLIC_KEY` and
    /// `DISCORD_BOT_TOKEN`.
    pub fn from_env() -> Result<Self> {
        let app_id = env::var("DISCORD_APP_ID")?;
        let public_key = env::var("DISCORD_PUBLIC_KEY")?;
        let token = env::var("DISCORD_BOT_TOKEN")?;
        Self::new(app_id, &public_key, token)
    }

    /// Override the webhook route (default `/interactions`).
    pub fn route(mut self, path: impl Into<String>) -> Self {
        self.route = path.into();
        self
    }

    pub(crate) fn route_path(&self) -> &str {
        &self.route
    }

    pub fn register(&mut self, command: ApplicationCommand) -> Result<()> {
        self.registry.register(command)
    }

    pub fn register_component(&mut self, component: Component) -> Result<()> {
        self.registry.register_component(component)
    }

    /// Install the process-wide handler-failure hook. The default prints
    /// the error tree to stderr.
    pub fn on_error<F, Fut>(&mut self, f: F)
    where
        F: Fn(BotError, Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.hook = Arc::new(move |e, payload| Box::pin(f(e, payload)));
    }

    /// One-time reconciliation with Discord: push every pending command,
    /// record the assigned ids, seal the catalog. A second call is a no-op.
    pub async fn sync_commands(&mut self) -> Result<()> {
        if self.snapshot.get().is_some() {
            eprintln!("[SYNC] command catalog already synchronized, skipping");
            return Ok(());
        }
        api::sync_commands(
            &self.http,
            &self.token,
            &self.application_id,
            &mut self.registry,
        )
        .await?;
        self.seal()
    }

    /// Assign remote ids without calling Discord and seal the catalog.
    /// For local development and tests, where no remote registration can
    /// happen; entries are `(command name, remote id)`.
    pub fn sync_offline(&mut self, assignments: &[(&str, &str)]) -> Result<()> {
        if self.snapshot.get().is_some() {
            eprintln!("[SYNC] command catalog already synchronized, skipping");
            return Ok(());
        }
        for (name, id) in assignments {
            let guild = self
                .registry
                .pending()
                .iter()
                .find(|c| c.name == *name && c.id.is_none())
                .and_then(|c| c.guild_id.clone());
            self.registry.adopt(name, guild.as_deref(), id)?;
        }
        self.seal()
    }

    fn seal(&mut self) -> Result<()> {
        let registry = std::mem::take(&mut self.registry);
        let snapshot = registry.snapshot()?;
        self.snapshot
            .set(Arc::new(snapshot))
            .map_err(|_| {
                BotError::new("registration_failure")
                    .push_str("command catalog already sealed".to_string())
            })?;
        Ok(())
    }

    /// Host-agnostic engine entry: verify the signature, then parse and
    /// dispatch. The body is never inspected before verification passes.
    pub async fn handle_request(
        &self,
        signature: Option<&str>,
        timestamp: Option<&str>,
        body: &[u8],
    ) -> WebhookResponse {
        let (Some(signature), Some(timestamp)) = (signature, timestamp) else {
            return WebhookResponse::text(401, "BadSignature");
        };
        if self.verifier.verify(timestamp, body, signature).is_err() {
            return WebhookResponse::text(401, "BadSignature");
        }

        let Some(snapshot) = self.snapshot.get() else {
            eprintln!("[ERROR] interaction received before command synchronization");
            return WebhookResponse::empty(500);
        };

        let dispatcher = Dispatcher {
            snapshot: snapshot.as_ref(),
            tokens: &self.tokens,
            hook: &self.hook,
        };
        dispatcher.dispatch(body).await
    }

    /// Synchronize once, then serve the webhook route until the process
    /// ends.
    pub async fn serve(mut self, addr: SocketAddr) -> Result<()> {
        self.sync_commands().await?;
        server::serve(Arc::new(self), addr).await
    }

    /// Follow-up message for an interaction answered with a deferral. The
    /// single-use token is looked up from the per-interaction cache.
    pub async fn send_followup(&self, interaction_id: &str, payload: Value) -> Result<Value> {
        let token = self
            .tokens
            .get(interaction_id)
            .map(|t| t.value().clone())
            .ok_or_else(|| {
                BotError::new("unknown_interaction")
                    .push_str(format!("no cached token for interaction '{}'", interaction_id))
            })?;
        api::send_followup(&self.http, &self.token, &self.application_id, &token, &payload).await
    }

    /// Remove a command from Discord by remote id.
    pub async fn delete_command(&self, command_id: &str, guild_id: Option<&str>) -> Result<()> {
        api::delete_command(&self.http, &self.token, &self.application_id, command_id, guild_id)
            .await
    }

    /// Registry lookups performed so far. Zero until the first
    /// authenticated non-ping interaction arrives.
    pub fn registry_lookups(&self) -> usize {
        self.snapshot
            .get()
            .map(|s| s.lookup_count())
            .unwrap_or(0)
    }
}
