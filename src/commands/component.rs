use std::future::Future;
use std::sync::Arc;
use strum::AsRefStr;
use uuid::Uuid;

use crate::binder::Arguments;
use crate::commands::CommandFn;
use crate::error::Result;
use crate::response::Context;

#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum ComponentKind {
    Button,
    SelectMenu,
    Modal,
}

/// Declared text input of a modal. Each submitted modal must carry every
/// required field's custom id exactly once.
#[derive(Debug, Clone)]
pub struct ModalField {
    pub custom_id: String,
    pub required: bool,
}

/// A registered UI component: button, select menu or modal, keyed by its
/// custom id. Looked up per interaction, never mutated after declaration.
pub struct Component {
    pub kind: ComponentKind,
    pub custom_id: String,
    pub fields: Vec<ModalField>,
    pub(crate) handler: CommandFn,
}

impl Component {
    fn make<F, Fut>(kind: ComponentKind, f: F) -> Self
    where
        F: Fn(Context, Arguments) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        Self {
            kind,
            custom_id: Uuid::new_v4().to_string(),
            fields: Vec::new(),
            handler: Arc::new(move |ctx, args| Box::pin(f(ctx, args))),
        }
    }

    /// Button activation handler; invoked with no extra arguments.
    pub fn button<F, Fut>(f: F) -> Self
    where
        F: Fn(Context, Arguments) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        Self::make(ComponentKind::Button, f)
    }

    /// Select menu handler; invoked with the selected value set.
    pub fn select_menu<F, Fut>(f: F) -> Self
    where
        F: Fn(Context, Arguments) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        Self::make(ComponentKind::SelectMenu, f)
    }

    /// Modal submission handler; invoked with the declared fields bound.
    pub fn modal<F, Fut>(f: F) -> Self
    where
        F: Fn(Context, Arguments) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        Self::make(ComponentKind::Modal, f)
    }

    /// Replace the generated custom id with a caller-chosen one.
    pub fn custom_id(mut self, id: impl Into<String>) -> Self {
        self.custom_id = id.into();
        self
    }

    /// Declare a modal field.
    pub fn field(mut self, custom_id: impl Into<String>, required: bool) -> Self {
        self.fields.push(ModalField {
            custom_id: custom_id.into(),
            required,
        });
        self
    }
}

impl std::fmt::Debug for Component {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Component")
            .field("kind", &self.kind.as_ref())
            .field("custom_id", &self.custom_id)
            .field("fields", &self.fields.len())
            .finish()
    }
}
