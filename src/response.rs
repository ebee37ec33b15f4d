//! The at-most-one-response contract and the wire shapes a handler's reply
//! can take: plain JSON, JSON with binary file parts, or a bare deferral.

use bytes::Bytes;
use once_cell::sync::OnceCell;
use serde_json::{Value, json};
use std::sync::Arc;
use uuid::Uuid;

use crate::types::interaction::Interaction;
use crate::types::response::{
    CallbackType, Choice, FLAG_EPHEMERAL, FLAG_SUPPRESS_EMBEDS, InteractionCallback,
};

/// Binary attachment going out with a reply.
#[derive(Debug, Clone)]
pub struct File {
    pub name: String,
    pub bytes: Bytes,
    pub description: Option<String>,
}

impl File {
    pub fn new(name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
            description: None,
        }
    }

    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }
}

/// Message reply under construction. Mirrors the platform's message fields;
/// embeds and component rows are taken as raw JSON since presentation
/// formatting is not this library's concern.
#[derive(Debug, Clone, Default)]
pub struct ReplyPayload {
    pub content: Option<String>,
    pub embeds: Vec<Value>,
    pub components: Vec<Value>,
    pub files: Vec<File>,
    pub tts: bool,
    pub ephemeral: bool,
    pub suppress_embeds: bool,
}

impl ReplyPayload {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }

    pub fn embed(mut self, embed: Value) -> Self {
        self.embeds.push(embed);
        self
    }

    pub fn component_row(mut self, row: Value) -> Self {
        self.components.push(row);
        self
    }

    pub fn file(mut self, file: File) -> Self {
        self.files.push(file);
        self
    }

    pub fn tts(mut self) -> Self {
        self.tts = true;
        self
    }

    /// Visible only to the invoking user.
    pub fn ephemeral(mut self) -> Self {
        self.ephemeral = true;
        self
    }

    pub fn suppress_embeds(mut self) -> Self {
        self.suppress_embeds = true;
        self
    }

    /// Message body for the callback `data` field, with attachment metadata
    /// entries for any files riding along.
    fn into_data(self) -> (Value, Vec<File>) {
        let mut payload = json!({});
        let mut flags: u64 = 0;
        if self.ephemeral {
            flags |= FLAG_EPHEMERAL;
        }
        if self.suppress_embeds {
            flags |= FLAG_SUPPRESS_EMBEDS;
        }
        if let Some(content) = self.content {
            payload["content"] = json!(content);
        }
        if self.tts {
            payload["tts"] = json!(true);
        }
        if !self.embeds.is_empty() {
            payload["embeds"] = Value::Array(self.embeds);
        }
        if !self.components.is_empty() {
            payload["components"] = Value::Array(self.components);
        }
        if !self.files.is_empty() {
            payload["attachments"] = Value::Array(
                self.files
                    .iter()
                    .enumerate()
                    .map(|(i, f)| {
                        json!({
                            "id": i,
                            "filename": f.name,
                            "description": f.description,
                        })
                    })
                    .collect(),
            );
        }
        if flags != 0 {
            payload["flags"] = json!(flags);
        }
        (payload, self.files)
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Reply {
    pub callback: InteractionCallback,
    pub files: Vec<File>,
}

/// Per-interaction response slot. Whichever call populates it first wins;
/// everything after is a no-op the router can observe through
/// [`Responder::is_populated`].
#[derive(Clone, Default)]
pub struct Responder {
    slot: Arc<OnceCell<Reply>>,
}

impl Responder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn set(&self, callback_type: CallbackType, data: Option<Value>, files: Vec<File>) -> bool {
        self.slot
            .set(Reply {
                callback: InteractionCallback::new(callback_type, data),
                files,
            })
            .is_ok()
    }

    /// Send a message reply. Returns whether this call populated the slot.
    pub fn reply(&self, payload: ReplyPayload) -> bool {
        let (data, files) = payload.into_data();
        self.set(CallbackType::ChannelMessage, Some(data), files)
    }

    /// Acknowledge now, answer later over the follow-up endpoint.
    pub fn defer(&self, ephemeral: bool) -> bool {
        let data = ephemeral.then(|| json!({ "flags": FLAG_EPHEMERAL }));
        self.set(CallbackType::DeferredMessage, data, Vec::new())
    }

    /// Acknowledge a component activation without changing the message.
    pub fn defer_update(&self) -> bool {
        self.set(CallbackType::DeferredUpdate, None, Vec::new())
    }

    /// Edit the message the activated component sits on.
    pub fn update_message(&self, payload: ReplyPayload) -> bool {
        let (data, files) = payload.into_data();
        self.set(CallbackType::UpdateMessage, Some(data), files)
    }

    /// Answer an autocomplete request with suggestions.
    pub fn suggest(&self, choices: Vec<Choice>) -> bool {
        self.set(
            CallbackType::AutocompleteResult,
            Some(json!({ "choices": choices })),
            Vec::new(),
        )
    }

    /// Open a modal. `payload` is the platform's modal JSON.
    pub fn modal(&self, payload: Value) -> bool {
        self.set(CallbackType::Modal, Some(payload), Vec::new())
    }

    pub fn is_populated(&self) -> bool {
        self.slot.get().is_some()
    }

    pub(crate) fn take(&self) -> Option<Reply> {
        self.slot.get().cloned()
    }
}

/// What a handler receives: the parsed interaction plus the reply surface.
#[derive(Clone)]
pub struct Context {
    pub interaction: Arc<Interaction>,
    pub responder: Responder,
}

impl Context {
    pub(crate) fn new(interaction: Interaction) -> Self {
        Self {
            interaction: Arc::new(interaction),
            responder: Responder::new(),
        }
    }

    pub fn reply(&self, payload: ReplyPayload) -> bool {
        self.responder.reply(payload)
    }

    pub fn reply_text(&self, content: impl Into<String>) -> bool {
        self.responder.reply(ReplyPayload::text(content))
    }

    pub fn defer(&self, ephemeral: bool) -> bool {
        self.responder.defer(ephemeral)
    }

    pub fn suggest(&self, choices: Vec<Choice>) -> bool {
        self.responder.suggest(choices)
    }
}

pub(crate) enum WebhookBody {
    Json(Value),
    Multipart { boundary: String, body: Bytes },
    Text(&'static str),
    Empty,
}

/// The one HTTP response produced per inbound webhook call.
pub struct WebhookResponse {
    pub status: u16,
    pub(crate) body: WebhookBody,
}

impl WebhookResponse {
    pub(crate) fn json(status: u16, value: Value) -> Self {
        Self {
            status,
            body: WebhookBody::Json(value),
        }
    }

    pub(crate) fn text(status: u16, text: &'static str) -> Self {
        Self {
            status,
            body: WebhookBody::Text(text),
        }
    }

    pub(crate) fn empty(status: u16) -> Self {
        Self {
            status,
            body: WebhookBody::Empty,
        }
    }

    /// Package a populated reply: plain JSON when there are no files,
    /// multipart with `payload_json` and `files[i]` parts otherwise.
    pub(crate) fn from_reply(reply: Reply) -> Self {
        let callback = serde_json::to_value(&reply.callback).unwrap_or_else(|_| json!({}));
        if reply.files.is_empty() {
            return Self::json(200, callback);
        }

        let boundary = format!("raft{}", Uuid::new_v4().simple());
        let mut body: Vec<u8> = Vec::new();

        body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
        body.extend_from_slice(
            b"Content-Disposition: form-data; name=\"payload_json\"\r\nContent-Type: application/json\r\n\r\n",
        );
        body.extend_from_slice(callback.to_string().as_bytes());
        body.extend_from_slice(b"\r\n");

        for (i, file) in reply.files.iter().enumerate() {
            body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
            body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"files[{}]\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
                    i, file.name
                )
                .as_bytes(),
            );
            body.extend_from_slice(&file.bytes);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{}--\r\n", boundary).as_bytes());

        Self {
            status: 200,
            body: WebhookBody::Multipart {
                boundary,
                body: Bytes::from(body),
            },
        }
    }

    pub fn content_type(&self) -> Option<String> {
        match &self.body {
            WebhookBody::Json(_) => Some("application/json".to_string()),
            WebhookBody::Multipart { boundary, .. } => {
                Some(format!("multipart/form-data; boundary={}", boundary))
            }
            WebhookBody::Text(_) => Some("text/plain; charset=utf-8".to_string()),
            WebhookBody::Empty => None,
        }
    }

    pub fn body_bytes(&self) -> Bytes {
        match &self.body {
            WebhookBody::Json(value) => Bytes::from(value.to_string()),
            WebhookBody::Multipart { body, .. } => body.clone(),
            WebhookBody::Text(text) => Bytes::from_static(text.as_bytes()),
            WebhookBody::Empty => Bytes::new(),
        }
    }

    /// The callback JSON, when the body is JSON. Test and logging aid.
    pub fn as_json(&self) -> Option<&Value> {
        match &self.body {
            WebhookBody::Json(value) => Some(value),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_reply_wins() {
        let responder = Responder::new();
        assert!(responder.reply(ReplyPayload::text("first")));
        assert!(!responder.reply(ReplyPayload::text("second")));
        assert!(!responder.defer(false));

        let reply = responder.take().unwrap();
        assert_eq!(reply.callback.callback_type, CallbackType::ChannelMessage as u8);
        assert_eq!(reply.callback.data.as_ref().unwrap()["content"], "first");
    }

    #[test]
    fn ephemeral_sets_flag_bit() {
        let responder = Responder::new();
        responder.reply(ReplyPayload::text("shh").ephemeral());
        let reply = responder.take().unwrap();
        assert_eq!(
            reply.callback.data.as_ref().unwrap()["flags"],
            FLAG_EPHEMERAL
        );
    }

    #[test]
    fn defer_carries_no_message_body() {
        let responder = Responder::new();
        responder.defer(false);
        let reply = responder.take().unwrap();
        assert_eq!(reply.callback.callback_type, CallbackType::DeferredMessage as u8);
        assert!(reply.callback.data.is_none());
    }

    #[test]
    fn multipart_envelope_shape() {
        let responder = Responder::new();
        responder.reply(
            ReplyPayload::text("map attached")
                .file(File::new("map.png", &b"\x89PNG"[..]).description("the map")),
        );
        let response = WebhookResponse::from_reply(responder.take().unwrap());

        let ct = response.content_type().unwrap();
        assert!(ct.starts_with("multipart/form-data; boundary="));

        let body = response.body_bytes();
        let text = String::from_utf8_lossy(&body);
        assert!(text.contains("name=\"payload_json\""));
        assert!(text.contains("name=\"files[0]\"; filename=\"map.png\""));
        assert!(text.contains("\"attachments\""));
    }

    #[test]
    fn plain_reply_is_json() {
        let responder = Responder::new();
        responder.reply(ReplyPayload::text("hi"));
        let response = WebhookResponse::from_reply(responder.take().unwrap());
        assert_eq!(response.status, 200);
        assert_eq!(response.as_json().unwrap()["type"], CallbackType::ChannelMessage as u8);
    }
}
