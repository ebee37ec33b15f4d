pub mod component;

use futures_util::future::BoxFuture;
use serde_json::{Value, json};
use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use crate::binder::Arguments;
use crate::error::Result;
use crate::response::Context;
use crate::types::interaction::{CommandType, OptionType};

pub type HandlerFuture = BoxFuture<'static, Result<()>>;

pub(crate) type CommandFn = Arc<dyn Fn(Context, Arguments) -> HandlerFuture + Send + Sync>;
pub(crate) type CogFn =
    Arc<dyn Fn(Arc<dyn Cog>, Context, Arguments) -> HandlerFuture + Send + Sync>;
pub(crate) type AutocompleteFn =
    Arc<dyn Fn(Context, String, Value) -> HandlerFuture + Send + Sync>;

/// Grouping object for related commands. Grouped handlers receive their cog
/// ahead of the interaction context; `as_any` allows downcasting to the
/// concrete type inside the handler.
pub trait Cog: Send + Sync + 'static {
    fn name(&self) -> &'static str;
    fn as_any(&self) -> &dyn Any;
}

/// Object-style command handler, for callers that prefer a type over a
/// closure. Registered through [`ApplicationCommand::attach`].
#[async_trait::async_trait]
pub trait InteractionHandler: Send + Sync + 'static {
    async fn handle(&self, ctx: Context, args: Arguments) -> Result<()>;
}

/// How a handler is invoked. The variant is fixed at attach time, so
/// dispatch never inspects call signatures: grouped handlers get their cog
/// as the leading argument through the one `invoke` path.
#[derive(Clone)]
pub(crate) enum Invoker {
    Standalone(CommandFn),
    Grouped(Arc<dyn Cog>, CogFn),
}

impl Invoker {
    pub(crate) fn invoke(&self, ctx: Context, args: Arguments) -> HandlerFuture {
        match self {
            Invoker::Standalone(f) => f(ctx, args),
            Invoker::Grouped(cog, f) => f(cog.clone(), ctx, args),
        }
    }
}

/// Declared choice of an option's value set.
#[derive(Debug, Clone)]
pub struct OptionChoice {
    pub name: String,
    pub value: Value,
}

/// One node of a command's option tree. Subcommand nodes carry their own
/// nested options; leaf nodes may carry choices and a local default used
/// when the platform omits an optional value.
#[derive(Debug, Clone)]
pub struct CommandOption {
    pub name: String,
    pub description: String,
    pub option_type: OptionType,
    pub required: bool,
    pub choices: Vec<OptionChoice>,
    pub options: Vec<CommandOption>,
    pub default: Option<Value>,
    pub autocomplete: bool,
}

impl CommandOption {
    pub fn new(name: impl Into<String>, description: impl Into<String>, kind: OptionType) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            option_type: kind,
            required: false,
            choices: Vec::new(),
            options: Vec::new(),
            default: None,
            autocomplete: false,
        }
    }

    pub fn string(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, description, OptionType::String)
    }

    pub fn integer(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, description, OptionType::Integer)
    }

    pub fn boolean(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, description, OptionType::Boolean)
    }

    pub fn number(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, description, OptionType::Number)
    }

    pub fn user(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, description, OptionType::User)
    }

    pub fn channel(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, description, OptionType::Channel)
    }

    pub fn role(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, description, OptionType::Role)
    }

    pub fn mentionable(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, description, OptionType::Mentionable)
    }

    pub fn attachment(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, description, OptionType::Attachment)
    }

    pub fn subcommand(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, description, OptionType::SubCommand)
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn choice(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.choices.push(OptionChoice {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    /// Nested option, for subcommand nodes.
    pub fn option(mut self, option: CommandOption) -> Self {
        self.options.push(option);
        self
    }

    /// Local fallback bound when the platform omits this optional value.
    /// Not part of the registration schema.
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn autocomplete(mut self) -> Self {
        self.autocomplete = true;
        self
    }

    fn to_json(&self) -> Value {
        let mut body = json!({
            "name": self.name,
            "description": self.description,
            "type": self.option_type as u8,
        });
        if self.required {
            body["required"] = json!(true);
        }
        if self.autocomplete {
            body["autocomplete"] = json!(true);
        }
        if !self.choices.is_empty() {
            body["choices"] = Value::Array(
                self.choices
                    .iter()
                    .map(|c| json!({ "name": c.name, "value": c.value }))
                    .collect(),
            );
        }
        if !self.options.is_empty() {
            body["options"] =
                Value::Array(self.options.iter().map(CommandOption::to_json).collect());
        }
        body
    }
}

/// A declared application command: identity, option tree and the attached
/// execution concerns. Declared before synchronization; the remote id is
/// filled in by the synchronizer and the command is immutable afterwards.
pub struct ApplicationCommand {
    pub name: String,
    pub description: String,
    pub command_type: CommandType,
    pub options: Vec<CommandOption>,
    pub permissions: Option<u64>,
    pub dm_access: bool,
    pub guild_id: Option<String>,
    /// Remote-assigned id, present only after synchronization.
    pub id: Option<String>,
    pub(crate) handler: Option<Invoker>,
    pub(crate) subcommands: HashMap<String, Invoker>,
    pub(crate) autocomplete: Option<AutocompleteFn>,
}

impl ApplicationCommand {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            command_type: CommandType::Slash,
            options: Vec::new(),
            permissions: None,
            dm_access: true,
            guild_id: None,
            id: None,
            handler: None,
            subcommands: HashMap::new(),
            autocomplete: None,
        }
    }

    /// User context-menu command (right-click on a user).
    pub fn user(name: impl Into<String>) -> Self {
        let mut cmd = Self::new(name, "");
        cmd.command_type = CommandType::User;
        cmd
    }

    /// Message context-menu command (right-click on a message).
    pub fn message(name: impl Into<String>) -> Self {
        let mut cmd = Self::new(name, "");
        cmd.command_type = CommandType::Message;
        cmd
    }

    pub fn option(mut self, option: CommandOption) -> Self {
        self.options.push(option);
        self
    }

    /// `default_member_permissions` bitset for the remote schema.
    pub fn permissions(mut self, bits: u64) -> Self {
        self.permissions = Some(bits);
        self
    }

    pub fn dm_access(mut self, allow: bool) -> Self {
        self.dm_access = allow;
        self
    }

    /// Scope registration to one guild instead of globally.
    pub fn guild(mut self, guild_id: impl Into<String>) -> Self {
        self.guild_id = Some(guild_id.into());
        self
    }

    /// Attach the primary handler. Second phase of declaration; the command
    /// can be built and inspected without any execution concern attached.
    pub fn attach_handler<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Context, Arguments) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.handler = Some(Invoker::Standalone(Arc::new(move |ctx, args| {
            Box::pin(f(ctx, args))
        })));
        self
    }

    /// Attach an object-style handler.
    pub fn attach(mut self, handler: Arc<dyn InteractionHandler>) -> Self {
        self.handler = Some(Invoker::Standalone(Arc::new(move |ctx, args| {
            let handler = handler.clone();
            Box::pin(async move { handler.handle(ctx, args).await })
        })));
        self
    }

    /// Attach the primary handler with its owning cog. The cog arrives as
    /// the handler's leading argument.
    pub fn attach_cog_handler<F, Fut>(mut self, cog: Arc<dyn Cog>, f: F) -> Self
    where
        F: Fn(Arc<dyn Cog>, Context, Arguments) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.handler = Some(Invoker::Grouped(
            cog,
            Arc::new(move |cog, ctx, args| Box::pin(f(cog, ctx, args))),
        ));
        self
    }

    /// Attach a handler for a subcommand declared in the option tree.
    pub fn subcommand_handler<F, Fut>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Context, Arguments) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.subcommands.insert(
            name.into(),
            Invoker::Standalone(Arc::new(move |ctx, args| Box::pin(f(ctx, args)))),
        );
        self
    }

    pub fn cog_subcommand_handler<F, Fut>(
        mut self,
        name: impl Into<String>,
        cog: Arc<dyn Cog>,
        f: F,
    ) -> Self
    where
        F: Fn(Arc<dyn Cog>, Context, Arguments) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.subcommands.insert(
            name.into(),
            Invoker::Grouped(
                cog,
                Arc::new(move |cog, ctx, args| Box::pin(f(cog, ctx, args))),
            ),
        );
        self
    }

    /// Attach the autocomplete handler, invoked with the focused option's
    /// name and partial value.
    pub fn attach_autocomplete<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Context, String, Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.autocomplete = Some(Arc::new(move |ctx, name, partial| {
            Box::pin(f(ctx, name, partial))
        }));
        self
    }

    /// Declared option schema of a named subcommand, from the option tree.
    pub(crate) fn subcommand_schema(&self, name: &str) -> &[CommandOption] {
        self.options
            .iter()
            .find(|o| o.option_type.is_subcommand() && o.name == name)
            .map(|o| o.options.as_slice())
            .unwrap_or(&[])
    }

    pub(crate) fn has_flat_options(&self) -> bool {
        self.options
            .iter()
            .any(|o| !o.option_type.is_subcommand())
    }

    pub(crate) fn has_subcommands(&self) -> bool {
        !self.subcommands.is_empty()
            || self.options.iter().any(|o| o.option_type.is_subcommand())
    }

    /// The JSON schema submitted to the command-registration endpoint.
    /// https://discord.com/developers/docs/interactions/application-commands#create-global-application-command
    pub fn registration_json(&self) -> Value {
        let mut body = json!({
            "name": self.name,
            "description": self.description,
            "type": self.command_type as u8,
            "dm_permission": self.dm_access,
        });
        if !self.options.is_empty() {
            body["options"] =
                Value::Array(self.options.iter().map(CommandOption::to_json).collect());
        }
        if let Some(bits) = self.permissions {
            // Discord takes the permission bitset as a decimal string
            body["default_member_permissions"] = json!(bits.to_string());
        }
        body
    }
}

impl std::fmt::Debug for ApplicationCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApplicationCommand")
            .field("name", &self.name)
            .field("command_type", &self.command_type)
            .field("guild_id", &self.guild_id)
            .field("id", &self.id)
            .field("options", &self.options.len())
            .field("subcommands", &self.subcommands.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_json_carries_option_tree() {
        let cmd = ApplicationCommand::new("settings", "Server settings")
            .option(
                CommandOption::string("theme", "Colour theme")
                    .required()
                    .choice("Dark", "dark")
                    .choice("Light", "light"),
            )
            .option(CommandOption::integer("limit", "Result cap"))
            .permissions(1 << 5)
            .dm_access(false);

        let body = cmd.registration_json();
        assert_eq!(body["name"], "settings");
        assert_eq!(body["type"], 1);
        assert_eq!(body["dm_permission"], false);
        assert_eq!(body["default_member_permissions"], "32");
        assert_eq!(body["options"][0]["name"], "theme");
        assert_eq!(body["options"][0]["required"], true);
        assert_eq!(body["options"][0]["choices"][1]["value"], "light");
        assert_eq!(body["options"][1]["type"], 4);
        assert!(body["options"][1].get("required").is_none());
    }

    #[test]
    fn subcommand_schema_comes_from_option_tree() {
        let cmd = ApplicationCommand::new("mod", "Moderation")
            .option(
                CommandOption::subcommand("kick", "Kick a member")
                    .option(CommandOption::user("target", "Who").required()),
            )
            .subcommand_handler("kick", |_ctx, _args| async { Ok(()) });

        let schema = cmd.subcommand_schema("kick");
        assert_eq!(schema.len(), 1);
        assert_eq!(schema[0].name, "target");
        assert!(cmd.subcommand_schema("ban").is_empty());
        assert!(cmd.has_subcommands());
        assert!(!cmd.has_flat_options());
    }

    #[test]
    fn context_menu_commands_have_no_description() {
        let body = ApplicationCommand::user("Report").registration_json();
        assert_eq!(body["type"], 2);
        assert_eq!(body["description"], "");
        assert!(body.get("options").is_none());
    }
}
