//! Discord HTTP-interactions toolkit: declare slash commands, context-menu
//! commands, message components and modals; verify each signed webhook,
//! synchronize the catalog with Discord once at startup, and route every
//! interaction to its handler with typed, bound arguments.

mod binder;
mod client;
mod commands;
mod discord;
mod error;
mod registry;
mod response;
mod router;
mod server;
mod types;
mod verify;

pub use binder::{ArgValue, Arguments};
pub use client::Client;
pub use commands::component::{Component, ComponentKind, ModalField};
pub use commands::{
    ApplicationCommand, Cog, CommandOption, HandlerFuture, InteractionHandler, OptionChoice,
};
pub use error::{BotError, Result};
pub use registry::{Registry, RegistrySnapshot};
pub use response::{Context, File, ReplyPayload, Responder, WebhookResponse};
pub use router::ErrorHook;
pub use types::interaction::{
    ActionRow, CommandType, ComponentType, Interaction, InteractionData, InteractionOption,
    InteractionType, OptionType, ResolvedData, SubmittedField,
};
pub use types::response::{CallbackType, Choice, InteractionCallback};
pub use verify::SignatureVerifier;
