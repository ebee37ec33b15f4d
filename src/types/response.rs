use serde::{Deserialize, Serialize};
use serde_json::Value;

// Interaction callback kinds
// https://discord.com/developers/docs/interactions/receiving-and-responding#interaction-response-object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackType {
    Pong = 1,
    ChannelMessage = 4,
    DeferredMessage = 5,
    DeferredUpdate = 6,
    UpdateMessage = 7,
    AutocompleteResult = 8,
    Modal = 9,
}

// Message flags
pub const FLAG_EPHEMERAL: u64 = 1 << 6;
pub const FLAG_SUPPRESS_EMBEDS: u64 = 1 << 2;

/// Outbound interaction callback: `type` plus a type-dependent `data` body.
#[derive(Debug, Clone, Serialize)]
pub struct InteractionCallback {
    #[serde(rename = "type")]
    pub callback_type: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl InteractionCallback {
    pub fn new(callback_type: CallbackType, data: Option<Value>) -> Self {
        Self {
            callback_type: callback_type as u8,
            data,
        }
    }

    /// Fixed liveness reply for ping interactions.
    pub fn pong() -> Self {
        Self::new(CallbackType::Pong, None)
    }
}

/// Autocomplete suggestion entry.
#[derive(Debug, Clone, Serialize)]
pub struct Choice {
    pub name: String,
    pub value: Value,
}

impl Choice {
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

// Discord API error response
#[derive(Debug, Deserialize)]
pub struct DiscordErrorResponse {
    pub message: String,
    #[serde(default)]
    pub code: Option<i32>,
    #[serde(default)]
    pub retry_after: Option<f64>,
    #[serde(default)]
    pub global: Option<bool>,
    #[serde(default)]
    pub errors: Option<Value>,
}

impl std::fmt::Display for DiscordErrorResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code.unwrap_or(0), self.message)?;

        if let Some(retry) = self.retry_after {
            write!(f, " (retry after {:.3}s)", retry)?;
        }

        if let Some(global) = self.global {
            if global {
                write!(f, " [GLOBAL]")?;
            }
        }

        if let Some(errors) = &self.errors {
            write!(
                f,
                "\nDetails: {}",
                serde_json::to_string_pretty(errors).unwrap_or_default()
            )?;
        }

        Ok(())
    }
}
