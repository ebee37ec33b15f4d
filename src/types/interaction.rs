use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

// Interaction kinds
// https://discord.com/developers/docs/interactions/receiving-and-responding#interaction-object-interaction-type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionType {
    Ping = 1,
    ApplicationCommand = 2,
    MessageComponent = 3,
    Autocomplete = 4,
    ModalSubmit = 5,
    Unknown = 0,
}

impl InteractionType {
    pub fn from_u8(t: u8) -> Self {
        match t {
            1 => Self::Ping,
            2 => Self::ApplicationCommand,
            3 => Self::MessageComponent,
            4 => Self::Autocomplete,
            5 => Self::ModalSubmit,
            _ => Self::Unknown,
        }
    }
}

// Application command kinds: slash commands plus the two context-menu targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandType {
    Slash = 1,
    User = 2,
    Message = 3,
}

impl CommandType {
    pub fn from_u8(t: u8) -> Self {
        match t {
            2 => Self::User,
            3 => Self::Message,
            _ => Self::Slash,
        }
    }
}

// Command option kinds
// https://discord.com/developers/docs/interactions/application-commands#application-command-object-application-command-option-type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionType {
    SubCommand = 1,
    SubCommandGroup = 2,
    String = 3,
    Integer = 4,
    Boolean = 5,
    User = 6,
    Channel = 7,
    Role = 8,
    Mentionable = 9,
    Number = 10,
    Attachment = 11,
    Unknown = 0,
}

impl OptionType {
    pub fn from_u8(t: u8) -> Self {
        match t {
            1 => Self::SubCommand,
            2 => Self::SubCommandGroup,
            3 => Self::String,
            4 => Self::Integer,
            5 => Self::Boolean,
            6 => Self::User,
            7 => Self::Channel,
            8 => Self::Role,
            9 => Self::Mentionable,
            10 => Self::Number,
            11 => Self::Attachment,
            _ => Self::Unknown,
        }
    }

    pub fn is_subcommand(self) -> bool {
        matches!(self, Self::SubCommand | Self::SubCommandGroup)
    }

    pub fn is_reference(self) -> bool {
        matches!(
            self,
            Self::User | Self::Channel | Self::Role | Self::Mentionable | Self::Attachment
        )
    }
}

// Message component kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentType {
    ActionRow = 1,
    Button = 2,
    SelectMenu = 3,
    TextInput = 4,
    Unknown = 0,
}

impl ComponentType {
    pub fn from_u8(t: u8) -> Self {
        match t {
            1 => Self::ActionRow,
            2 => Self::Button,
            3 => Self::SelectMenu,
            4 => Self::TextInput,
            _ => Self::Unknown,
        }
    }
}

// Inbound interaction payload
// https://discord.com/developers/docs/interactions/receiving-and-responding#interaction-object
#[derive(Debug, Deserialize)]
pub struct Interaction {
    #[serde(default)]
    pub id: String,
    pub application_id: Option<String>,
    #[serde(rename = "type")]
    pub interaction_type: u8,
    pub data: Option<InteractionData>,
    #[serde(default)]
    pub token: String,
    pub guild_id: Option<String>,
    pub channel_id: Option<String>,
    pub member: Option<Value>,
    pub user: Option<Value>,
}

impl Interaction {
    pub fn kind(&self) -> InteractionType {
        InteractionType::from_u8(self.interaction_type)
    }

    /// The invoking user object, from the guild member in guilds or
    /// directly from the payload in DMs.
    pub fn invoking_user(&self) -> Option<&Value> {
        self.member
            .as_ref()
            .and_then(|m| m.get("user"))
            .or(self.user.as_ref())
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct InteractionData {
    pub id: Option<String>,
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub command_type: Option<u8>,
    #[serde(default)]
    pub options: Vec<InteractionOption>,
    pub custom_id: Option<String>,
    pub component_type: Option<u8>,
    #[serde(default)]
    pub values: Vec<String>,
    #[serde(default)]
    pub components: Vec<ActionRow>,
    pub target_id: Option<String>,
    pub resolved: Option<ResolvedData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InteractionOption {
    pub name: String,
    #[serde(rename = "type")]
    pub option_type: u8,
    pub value: Option<Value>,
    #[serde(default)]
    pub options: Vec<InteractionOption>,
    #[serde(default)]
    pub focused: bool,
}

impl InteractionOption {
    pub fn kind(&self) -> OptionType {
        OptionType::from_u8(self.option_type)
    }
}

/// Entity side-table shipped with the interaction. Values are kept as raw
/// JSON; this library does not wrap platform entities.
#[derive(Debug, Default, Deserialize)]
pub struct ResolvedData {
    #[serde(default)]
    pub users: HashMap<String, Value>,
    #[serde(default)]
    pub members: HashMap<String, Value>,
    #[serde(default)]
    pub roles: HashMap<String, Value>,
    #[serde(default)]
    pub channels: HashMap<String, Value>,
    #[serde(default)]
    pub attachments: HashMap<String, Value>,
    #[serde(default)]
    pub messages: HashMap<String, Value>,
}

// Modal submissions arrive as action rows of text inputs
#[derive(Debug, Deserialize)]
pub struct ActionRow {
    #[serde(rename = "type")]
    pub row_type: u8,
    #[serde(default)]
    pub components: Vec<SubmittedField>,
}

#[derive(Debug, Deserialize)]
pub struct SubmittedField {
    pub custom_id: String,
    #[serde(rename = "type")]
    pub component_type: u8,
    pub value: Option<String>,
}
