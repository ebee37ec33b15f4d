//! Turns an interaction's raw option tree (or modal/select payload) into
//! the arguments a registered handler declared. Pure with respect to the
//! registry: reads declared shape, produces values, mutates nothing.

use serde_json::Value;
use std::collections::HashMap;

use crate::commands::CommandOption;
use crate::error::{BotError, Result};
use crate::types::interaction::{
    InteractionData, InteractionOption, OptionType, ResolvedData,
};

/// One bound value. Reference types carry the entity looked up from the
/// interaction's resolved side-table, never a bare snowflake.
#[derive(Debug, Clone)]
pub enum ArgValue {
    Str(String),
    Int(i64),
    Bool(bool),
    Num(f64),
    User(Value),
    Channel(Value),
    Role(Value),
    Attachment(Value),
    Message(Value),
    Raw(Value),
}

impl ArgValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ArgValue::Str(s) => Some(s),
            ArgValue::Raw(v) => v.as_str(),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ArgValue::Int(i) => Some(*i),
            ArgValue::Raw(v) => v.as_i64(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ArgValue::Bool(b) => Some(*b),
            ArgValue::Raw(v) => v.as_bool(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ArgValue::Num(n) => Some(*n),
            ArgValue::Int(i) => Some(*i as f64),
            ArgValue::Raw(v) => v.as_f64(),
            _ => None,
        }
    }

    /// The resolved entity for reference-typed values.
    pub fn as_entity(&self) -> Option<&Value> {
        match self {
            ArgValue::User(v)
            | ArgValue::Channel(v)
            | ArgValue::Role(v)
            | ArgValue::Attachment(v)
            | ArgValue::Message(v)
            | ArgValue::Raw(v) => Some(v),
            _ => None,
        }
    }
}

/// Ordered argument list plus keyword map, matching what the target handler
/// declared. Slash options land in the keyword map; context-menu targets
/// and select values land positionally.
#[derive(Debug, Clone, Default)]
pub struct Arguments {
    positional: Vec<ArgValue>,
    named: HashMap<String, ArgValue>,
}

impl Arguments {
    pub fn get(&self, name: &str) -> Option<&ArgValue> {
        self.named.get(name)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.named.get(name).and_then(ArgValue::as_str)
    }

    pub fn get_i64(&self, name: &str) -> Option<i64> {
        self.named.get(name).and_then(ArgValue::as_i64)
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.named.get(name).and_then(ArgValue::as_bool)
    }

    pub fn get_f64(&self, name: &str) -> Option<f64> {
        self.named.get(name).and_then(ArgValue::as_f64)
    }

    pub fn get_entity(&self, name: &str) -> Option<&Value> {
        self.named.get(name).and_then(ArgValue::as_entity)
    }

    pub fn first(&self) -> Option<&ArgValue> {
        self.positional.first()
    }

    pub fn positional(&self) -> &[ArgValue] {
        &self.positional
    }

    /// Selected values of a select-menu activation, in payload order.
    pub fn values(&self) -> Vec<&str> {
        self.positional.iter().filter_map(ArgValue::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.positional.len() + self.named.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.named.is_empty()
    }
}

/// Bind a flat option list against its declared schema. Required options
/// must be supplied; optional ones fall back to the declared default or
/// stay unbound; reference types resolve through the side-table.
pub fn bind_slash_options(
    schema: &[CommandOption],
    supplied: &[InteractionOption],
    resolved: Option<&ResolvedData>,
) -> Result<Arguments> {
    let mut args = Arguments::default();

    for declared in schema {
        if declared.option_type.is_subcommand() {
            continue;
        }
        let found = supplied.iter().find(|o| o.name == declared.name);
        match found {
            Some(option) => {
                let value = bind_option_value(declared, option, resolved)?;
                args.named.insert(declared.name.clone(), value);
            }
            None => {
                if let Some(default) = &declared.default {
                    args.named
                        .insert(declared.name.clone(), ArgValue::Raw(default.clone()));
                } else if declared.required {
                    return Err(BotError::new("missing_field").push_str(format!(
                        "required option '{}' was not supplied",
                        declared.name
                    )));
                }
            }
        }
    }

    Ok(args)
}

fn bind_option_value(
    declared: &CommandOption,
    option: &InteractionOption,
    resolved: Option<&ResolvedData>,
) -> Result<ArgValue> {
    let raw = option.value.as_ref().ok_or_else(|| {
        BotError::new("missing_field")
            .push_str(format!("option '{}' carries no value", declared.name))
    })?;

    let mismatch = |expected: &str| {
        BotError::new("missing_field").push_str(format!(
            "option '{}' is not a {}: {}",
            declared.name, expected, raw
        ))
    };

    match declared.option_type {
        OptionType::String => raw
            .as_str()
            .map(|s| ArgValue::Str(s.to_string()))
            .ok_or_else(|| mismatch("string")),
        OptionType::Integer => raw.as_i64().map(ArgValue::Int).ok_or_else(|| mismatch("integer")),
        OptionType::Boolean => raw.as_bool().map(ArgValue::Bool).ok_or_else(|| mismatch("boolean")),
        OptionType::Number => raw.as_f64().map(ArgValue::Num).ok_or_else(|| mismatch("number")),
        OptionType::User => {
            let id = raw.as_str().ok_or_else(|| mismatch("snowflake"))?;
            resolve_user(id, resolved)
                .map(ArgValue::User)
                .ok_or_else(|| unresolved(declared, id, "user"))
        }
        OptionType::Channel => {
            let id = raw.as_str().ok_or_else(|| mismatch("snowflake"))?;
            resolved
                .and_then(|r| r.channels.get(id).cloned())
                .map(ArgValue::Channel)
                .ok_or_else(|| unresolved(declared, id, "channel"))
        }
        OptionType::Role => {
            let id = raw.as_str().ok_or_else(|| mismatch("snowflake"))?;
            resolved
                .and_then(|r| r.roles.get(id).cloned())
                .map(ArgValue::Role)
                .ok_or_else(|| unresolved(declared, id, "role"))
        }
        OptionType::Mentionable => {
            // Either a user or a role; the side-table decides which
            let id = raw.as_str().ok_or_else(|| mismatch("snowflake"))?;
            resolve_user(id, resolved)
                .map(ArgValue::User)
                .or_else(|| {
                    resolved
                        .and_then(|r| r.roles.get(id).cloned())
                        .map(ArgValue::Role)
                })
                .ok_or_else(|| unresolved(declared, id, "mentionable"))
        }
        OptionType::Attachment => {
            let id = raw.as_str().ok_or_else(|| mismatch("snowflake"))?;
            resolved
                .and_then(|r| r.attachments.get(id).cloned())
                .map(ArgValue::Attachment)
                .ok_or_else(|| unresolved(declared, id, "attachment"))
        }
        _ => Ok(ArgValue::Raw(raw.clone())),
    }
}

fn unresolved(declared: &CommandOption, id: &str, entity: &str) -> BotError {
    BotError::new("unresolved_reference").push_str(format!(
        "option '{}': {} '{}' missing from resolved entities",
        declared.name, entity, id
    ))
}

/// A resolved user, with the guild member record folded in when present.
fn resolve_user(id: &str, resolved: Option<&ResolvedData>) -> Option<Value> {
    let resolved = resolved?;
    let user = resolved.users.get(id)?;
    match resolved.members.get(id) {
        Some(member) => {
            // Member objects in the side-table omit the inner user
            let mut merged = member.clone();
            if let Some(obj) = merged.as_object_mut() {
                obj.insert("user".to_string(), user.clone());
            }
            Some(merged)
        }
        None => Some(user.clone()),
    }
}

/// Bind the single target entity of a context-menu invocation. Exactly one
/// positional argument is produced.
pub fn bind_context_target(data: &InteractionData) -> Result<Arguments> {
    let target_id = data.target_id.as_deref().ok_or_else(|| {
        BotError::new("unresolved_reference").push_str("context command without target_id".into())
    })?;
    let resolved = data.resolved.as_ref();

    let target = resolved
        .and_then(|r| r.messages.get(target_id).cloned())
        .map(ArgValue::Message)
        .or_else(|| resolve_user(target_id, resolved).map(ArgValue::User))
        .ok_or_else(|| {
            BotError::new("unresolved_reference").push_str(format!(
                "target '{}' missing from resolved entities",
                target_id
            ))
        })?;

    Ok(Arguments {
        positional: vec![target],
        named: HashMap::new(),
    })
}

/// The selected value set of a select-menu activation.
pub fn bind_select_values(data: &InteractionData) -> Arguments {
    Arguments {
        positional: data
            .values
            .iter()
            .map(|v| ArgValue::Str(v.clone()))
            .collect(),
        named: HashMap::new(),
    }
}

/// Bind a modal submission against the declared field list. Every declared
/// field's custom id must appear exactly once among the submitted inputs.
pub fn bind_modal_fields(
    fields: &[crate::commands::component::ModalField],
    data: &InteractionData,
) -> Result<Arguments> {
    let mut args = Arguments::default();

    for field in fields {
        let mut matches = data
            .components
            .iter()
            .flat_map(|row| row.components.iter())
            .filter(|c| c.custom_id == field.custom_id);

        match (matches.next(), matches.next()) {
            (Some(_), Some(_)) => {
                return Err(BotError::new("duplicate_field").push_str(format!(
                    "field '{}' submitted more than once",
                    field.custom_id
                )));
            }
            (Some(input), None) => {
                args.named.insert(
                    field.custom_id.clone(),
                    ArgValue::Str(input.value.clone().unwrap_or_default()),
                );
            }
            (None, _) => {
                if field.required {
                    return Err(BotError::new("missing_field").push_str(format!(
                        "required field '{}' missing from submission",
                        field.custom_id
                    )));
                }
            }
        }
    }

    Ok(args)
}

/// Name and partial value of the currently-focused option of an
/// autocomplete request. Other option values are ignored. Descends into
/// subcommand levels, since the focused option may sit below one.
pub fn focused_option(options: &[InteractionOption]) -> Option<(String, Value)> {
    for option in options {
        if option.focused {
            let partial = option.value.clone().unwrap_or(Value::String(String::new()));
            return Some((option.name.clone(), partial));
        }
        if let Some(found) = focused_option(&option.options) {
            return Some(found);
        }
    }
    None
}
