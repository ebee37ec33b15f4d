use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::commands::ApplicationCommand;
use crate::commands::component::Component;
use crate::error::{BotError, Result};

/// Declaration-time catalog. Commands land on the pending list until the
/// synchronizer assigns remote ids; components are keyed immediately.
/// No handler is ever invoked from here.
#[derive(Default)]
pub struct Registry {
    pending: Vec<ApplicationCommand>,
    components: HashMap<String, Arc<Component>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, command: ApplicationCommand) -> Result<()> {
        if command.has_flat_options() && command.has_subcommands() {
            return Err(BotError::new("duplicate_declaration").push_str(format!(
                "command '{}' declares both flat options and subcommands",
                command.name
            )));
        }
        if command.handler.is_none() && command.subcommands.is_empty() {
            return Err(BotError::new("registration_failure").push_str(format!(
                "command '{}' has no handler attached",
                command.name
            )));
        }
        if self
            .pending
            .iter()
            .any(|c| c.name == command.name && c.guild_id == command.guild_id)
        {
            return Err(BotError::new("duplicate_declaration")
                .push_str(format!("command '{}' already declared", command.name)));
        }
        self.pending.push(command);
        Ok(())
    }

    pub fn register_component(&mut self, component: Component) -> Result<()> {
        if self.components.contains_key(&component.custom_id) {
            return Err(BotError::new("duplicate_declaration").push_str(format!(
                "component '{}' already declared",
                component.custom_id
            )));
        }
        self.components
            .insert(component.custom_id.clone(), Arc::new(component));
        Ok(())
    }

    pub fn pending(&self) -> &[ApplicationCommand] {
        &self.pending
    }

    /// Record the remote-assigned id on a pending command. Called by the
    /// synchronizer for each accepted schema.
    pub fn adopt(&mut self, name: &str, guild_id: Option<&str>, remote_id: &str) -> Result<()> {
        let command = self
            .pending
            .iter_mut()
            .find(|c| c.name == name && c.guild_id.as_deref() == guild_id)
            .ok_or_else(|| {
                BotError::new("registration_failure")
                    .push_str(format!("no pending command named '{}'", name))
            })?;
        command.id = Some(remote_id.to_string());
        Ok(())
    }

    /// Consume the catalog into the read-only lookup tables the router
    /// serves from. Fails if any command is still missing its remote id;
    /// a partially-synced catalog must not serve traffic.
    pub fn snapshot(self) -> Result<RegistrySnapshot> {
        let mut commands = HashMap::with_capacity(self.pending.len());
        for command in self.pending {
            let id = command.id.clone().ok_or_else(|| {
                BotError::new("registration_failure").push_str(format!(
                    "command '{}' was never assigned a remote id",
                    command.name
                ))
            })?;
            commands.insert(id, Arc::new(command));
        }
        Ok(RegistrySnapshot {
            commands,
            components: self.components,
            lookups: AtomicUsize::new(0),
        })
    }
}

/// Immutable lookup tables, built once after synchronization and shared by
/// reference with every request task. The lookup counter exists so the
/// no-lookup-before-authentication property stays observable.
#[derive(Debug)]
pub struct RegistrySnapshot {
    commands: HashMap<String, Arc<ApplicationCommand>>,
    components: HashMap<String, Arc<Component>>,
    lookups: AtomicUsize,
}

impl RegistrySnapshot {
    pub fn lookup_by_remote_id(&self, id: &str) -> Option<Arc<ApplicationCommand>> {
        self.lookups.fetch_add(1, Ordering::Relaxed);
        self.commands.get(id).cloned()
    }

    pub fn lookup_component(&self, custom_id: &str) -> Option<Arc<Component>> {
        self.lookups.fetch_add(1, Ordering::Relaxed);
        self.components.get(custom_id).cloned()
    }

    pub fn command_count(&self) -> usize {
        self.commands.len()
    }

    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::Relaxed)
    }
}
