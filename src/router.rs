//! Classifies each authenticated interaction and drives it through the
//! registry, the binder and the handler, converting every failure mode
//! into a response the webhook caller can live with. Handler errors stop
//! here: they go to the process-wide hook, never up to the HTTP layer.

use dashmap::DashMap;
use futures_util::future::BoxFuture;
use serde_json::{Value, json};
use std::sync::Arc;

use crate::binder;
use crate::commands::HandlerFuture;
use crate::error::BotError;
use crate::registry::RegistrySnapshot;
use crate::response::{Context, WebhookResponse};
use crate::types::interaction::{
    CommandType, ComponentType, Interaction, InteractionType, OptionType,
};
use crate::types::response::{CallbackType, FLAG_EPHEMERAL, InteractionCallback};

/// Process-wide handler-failure hook. Receives the error and the raw
/// interaction payload.
pub type ErrorHook = Arc<dyn Fn(BotError, Value) -> BoxFuture<'static, ()> + Send + Sync>;

/// Best-effort response when a handler finished (or died) without
/// populating the slot; the webhook must never be left hanging.
enum Fallback {
    DeferredMessage,
    DeferredUpdate,
    EmptySuggestions,
}

impl Fallback {
    fn response(self) -> WebhookResponse {
        match self {
            Fallback::DeferredMessage => {
                WebhookResponse::json(200, json!({ "type": CallbackType::DeferredMessage as u8 }))
            }
            Fallback::DeferredUpdate => {
                WebhookResponse::json(200, json!({ "type": CallbackType::DeferredUpdate as u8 }))
            }
            Fallback::EmptySuggestions => WebhookResponse::json(
                200,
                json!({
                    "type": CallbackType::AutocompleteResult as u8,
                    "data": { "choices": [] }
                }),
            ),
        }
    }
}

pub(crate) struct Dispatcher<'a> {
    pub snapshot: &'a RegistrySnapshot,
    pub tokens: &'a DashMap<String, String>,
    pub hook: &'a ErrorHook,
}

impl Dispatcher<'_> {
    /// Route one verified request body. Never returns an error; every
    /// outcome is a concrete HTTP response.
    pub(crate) async fn dispatch(&self, body: &[u8]) -> WebhookResponse {
        let raw: Value = match serde_json::from_slice(body) {
            Ok(value) => value,
            Err(_) => return WebhookResponse::empty(400),
        };
        let interaction: Interaction = match serde_json::from_value(raw.clone()) {
            Ok(interaction) => interaction,
            Err(_) => return WebhookResponse::empty(400),
        };

        match interaction.kind() {
            InteractionType::Ping => {
                // Liveness probe; no registry interaction
                WebhookResponse::json(
                    200,
                    serde_json::to_value(InteractionCallback::pong()).unwrap_or_default(),
                )
            }
            InteractionType::ApplicationCommand => self.dispatch_command(interaction, raw).await,
            InteractionType::MessageComponent => self.dispatch_component(interaction, raw).await,
            InteractionType::ModalSubmit => self.dispatch_modal(interaction, raw).await,
            InteractionType::Autocomplete => self.dispatch_autocomplete(interaction, raw).await,
            InteractionType::Unknown => {
                WebhookResponse::json(300, json!({ "message": "unhandled interaction type" }))
            }
        }
    }

    async fn dispatch_command(&self, interaction: Interaction, raw: Value) -> WebhookResponse {
        let Some(data) = &interaction.data else {
            return WebhookResponse::empty(400);
        };
        let command = data
            .id
            .as_deref()
            .and_then(|id| self.snapshot.lookup_by_remote_id(id));
        let Some(command) = command else {
            // Declared remotely but unknown locally; tell the user instead
            // of letting the webhook time out
            return ephemeral_notice("Command not implemented.");
        };

        self.remember_token(&interaction);
        let ctx = Context::new(interaction);
        let parsed = ctx.interaction.clone();
        let Some(data) = parsed.data.as_ref() else {
            return WebhookResponse::empty(400);
        };

        // Context-menu targets skip option-tree binding entirely
        if command.command_type != CommandType::Slash {
            let args = match binder::bind_context_target(data) {
                Ok(args) => args,
                Err(e) => return binder_notice(e),
            };
            let Some(invoker) = command.handler.clone() else {
                return not_found("command not found");
            };
            return self
                .finish(ctx.clone(), raw, invoker.invoke(ctx, args), Fallback::DeferredMessage)
                .await;
        }

        // A leading subcommand entry redirects to the subcommand map
        if let Some(first) = data.options.first() {
            if first.kind() == OptionType::SubCommand {
                let Some(invoker) = command.subcommands.get(&first.name).cloned() else {
                    return not_found("command not found");
                };
                let schema = command.subcommand_schema(&first.name);
                let args = match binder::bind_slash_options(
                    schema,
                    &first.options,
                    data.resolved.as_ref(),
                ) {
                    Ok(args) => args,
                    Err(e) => return binder_notice(e),
                };
                return self
                    .finish(ctx.clone(), raw, invoker.invoke(ctx, args), Fallback::DeferredMessage)
                    .await;
            }
        }

        let args =
            match binder::bind_slash_options(&command.options, &data.options, data.resolved.as_ref())
            {
                Ok(args) => args,
                Err(e) => return binder_notice(e),
            };
        let Some(invoker) = command.handler.clone() else {
            return not_found("command not found");
        };
        self.finish(ctx.clone(), raw, invoker.invoke(ctx, args), Fallback::DeferredMessage)
            .await
    }

    async fn dispatch_component(&self, interaction: Interaction, raw: Value) -> WebhookResponse {
        let Some(data) = &interaction.data else {
            return WebhookResponse::empty(400);
        };
        let component = data
            .custom_id
            .as_deref()
            .and_then(|id| self.snapshot.lookup_component(id));
        let Some(component) = component else {
            return not_found("component not found");
        };

        self.remember_token(&interaction);
        let ctx = Context::new(interaction);
        let parsed = ctx.interaction.clone();
        let Some(data) = parsed.data.as_ref() else {
            return WebhookResponse::empty(400);
        };

        let kind = ComponentType::from_u8(data.component_type.unwrap_or(0));
        let args = match kind {
            ComponentType::SelectMenu => binder::bind_select_values(data),
            _ => Default::default(),
        };

        let handler = component.handler.clone();
        self.finish(ctx.clone(), raw, handler(ctx, args), Fallback::DeferredUpdate)
            .await
    }

    async fn dispatch_modal(&self, interaction: Interaction, raw: Value) -> WebhookResponse {
        let Some(data) = &interaction.data else {
            return WebhookResponse::empty(400);
        };
        let component = data
            .custom_id
            .as_deref()
            .and_then(|id| self.snapshot.lookup_component(id));
        let Some(component) = component else {
            return not_found("component not found");
        };

        self.remember_token(&interaction);
        let ctx = Context::new(interaction);
        let parsed = ctx.interaction.clone();
        let Some(data) = parsed.data.as_ref() else {
            return WebhookResponse::empty(400);
        };

        let args = match binder::bind_modal_fields(&component.fields, data) {
            Ok(args) => args,
            Err(e) => return binder_notice(e),
        };

        let handler = component.handler.clone();
        self.finish(ctx.clone(), raw, handler(ctx, args), Fallback::DeferredMessage)
            .await
    }

    async fn dispatch_autocomplete(&self, interaction: Interaction, raw: Value) -> WebhookResponse {
        let Some(data) = &interaction.data else {
            return WebhookResponse::empty(400);
        };
        let command = data
            .id
            .as_deref()
            .and_then(|id| self.snapshot.lookup_by_remote_id(id));
        let Some(command) = command else {
            return not_found("command not found");
        };

        // Only the focused option matters; every other value is ignored
        let Some((name, partial)) = binder::focused_option(&data.options) else {
            return Fallback::EmptySuggestions.response();
        };
        let Some(autocomplete) = command.autocomplete.clone() else {
            return Fallback::EmptySuggestions.response();
        };

        let ctx = Context::new(interaction);
        self.finish(
            ctx.clone(),
            raw,
            autocomplete(ctx, name, partial),
            Fallback::EmptySuggestions,
        )
        .await
    }

    /// Await the handler, feed any failure to the global hook, and hand the
    /// webhook whatever the handler populated, or the fallback.
    async fn finish(
        &self,
        ctx: Context,
        raw: Value,
        invoked: HandlerFuture,
        fallback: Fallback,
    ) -> WebhookResponse {
        if let Err(e) = invoked.await {
            let error = BotError::new("handler_error").push_any(e);
            (self.hook)(error, raw).await;
        }
        match ctx.responder.take() {
            Some(reply) => WebhookResponse::from_reply(reply),
            None => fallback.response(),
        }
    }

    /// Keep the single-use response token addressable by interaction id so
    /// follow-ups can find it after the webhook response is gone. A retried
    /// delivery overwrites its own entry.
    fn remember_token(&self, interaction: &Interaction) {
        if !interaction.token.is_empty() {
            self.tokens
                .insert(interaction.id.clone(), interaction.token.clone());
        }
    }
}

/// 404-equivalent for an unknown id or identifier.
fn not_found(what: &'static str) -> WebhookResponse {
    WebhookResponse::json(404, json!({ "error": what }))
}

/// User-visible ephemeral notice, delivered as a normal reply.
fn ephemeral_notice(message: &str) -> WebhookResponse {
    let callback = InteractionCallback::new(
        CallbackType::ChannelMessage,
        Some(json!({ "content": message, "flags": FLAG_EPHEMERAL })),
    );
    WebhookResponse::json(200, serde_json::to_value(&callback).unwrap_or_default())
}

/// Binder failures are user-visible and non-fatal.
fn binder_notice(e: BotError) -> WebhookResponse {
    ephemeral_notice(&format!("⚠️ Could not bind arguments ({})", e.key))
}
