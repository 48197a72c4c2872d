//! Command registry: maps invocation names to their handlers.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, warn};
use serenity::all::{CommandInteraction, Context, CreateCommand};

use crate::dispatcher::BotState;
use crate::error::Result;

/// A loadable interaction handler.
///
/// `on_autocomplete` and `on_context_menu` are optional capabilities: the
/// defaults do nothing, so a handler only implements the surfaces it serves.
#[async_trait]
pub trait InteractionHandler: Send + Sync {
    /// Invocation names this handler answers to.
    fn names(&self) -> &'static [&'static str];

    /// Whether the handler's commands are restricted to guilds.
    fn guild_only(&self) -> bool {
        false
    }

    /// Declarative command schemas, one per invocation name.
    fn commands(&self) -> Vec<CreateCommand>;

    /// Handle a slash-command invocation.
    async fn on_command(
        &self,
        ctx: &Context,
        interaction: &CommandInteraction,
        state: &BotState,
    ) -> Result<()>;

    /// Handle an autocomplete request.
    async fn on_autocomplete(
        &self,
        _ctx: &Context,
        _interaction: &CommandInteraction,
        _state: &BotState,
    ) -> Result<()> {
        Ok(())
    }

    /// Handle a context-menu invocation.
    async fn on_context_menu(
        &self,
        _ctx: &Context,
        _interaction: &CommandInteraction,
        _state: &BotState,
    ) -> Result<()> {
        Ok(())
    }
}

pub type HandlerFactory = fn() -> Result<Arc<dyn InteractionHandler>>;

/// The registration table. Adding a handler means adding a factory here.
#[must_use]
pub fn builtin_handlers() -> Vec<HandlerFactory> {
    vec![
        || Ok(Arc::new(crate::chat::ChatHandler::new())),
        || Ok(Arc::new(crate::ping::PingHandler::new())),
    ]
}

pub struct Registry {
    by_name: HashMap<String, Arc<dyn InteractionHandler>>,
    handlers: Vec<Arc<dyn InteractionHandler>>,
}

impl Registry {
    /// Build the registry from the builtin handler table.
    #[must_use]
    pub fn load() -> Self {
        Self::from_factories(&builtin_handlers())
    }

    /// Run every factory, skipping (with a warning) any that fails.
    #[must_use]
    pub fn from_factories(factories: &[HandlerFactory]) -> Self {
        let mut registry = Self {
            by_name: HashMap::new(),
            handlers: Vec::new(),
        };
        for factory in factories {
            match factory() {
                Ok(handler) => registry.register(handler),
                Err(e) => warn!("Skipping handler that failed to load: {e}"),
            }
        }
        registry
    }

    fn register(&mut self, handler: Arc<dyn InteractionHandler>) {
        for name in handler.names() {
            if self
                .by_name
                .insert((*name).to_string(), Arc::clone(&handler))
                .is_some()
            {
                warn!("Invocation name {name} registered twice, last registration wins");
            }
            debug!("Loaded interaction {name}");
        }
        self.handlers.push(handler);
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<dyn InteractionHandler>> {
        self.by_name.get(name)
    }

    /// Distinct handlers in registration order.
    #[must_use]
    pub fn handlers(&self) -> &[Arc<dyn InteractionHandler>] {
        &self.handlers
    }

    /// Schemas for handlers available everywhere.
    #[must_use]
    pub fn global_commands(&self) -> Vec<CreateCommand> {
        self.handlers
            .iter()
            .filter(|handler| !handler.guild_only())
            .flat_map(|handler| handler.commands())
            .collect()
    }

    /// Schemas for every handler, used for guild-scoped registration.
    #[must_use]
    pub fn guild_commands(&self) -> Vec<CreateCommand> {
        self.handlers
            .iter()
            .flat_map(|handler| handler.commands())
            .collect()
    }

    /// Number of registered invocation names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BotError;

    struct Stub {
        names: &'static [&'static str],
        guild_only: bool,
    }

    #[async_trait]
    impl InteractionHandler for Stub {
        fn names(&self) -> &'static [&'static str] {
            self.names
        }

        fn guild_only(&self) -> bool {
            self.guild_only
        }

        fn commands(&self) -> Vec<CreateCommand> {
            self.names
                .iter()
                .map(|name| CreateCommand::new(*name).description("stub"))
                .collect()
        }

        async fn on_command(
            &self,
            _ctx: &Context,
            _interaction: &CommandInteraction,
            _state: &BotState,
        ) -> Result<()> {
            Ok(())
        }
    }

    fn alpha() -> Result<Arc<dyn InteractionHandler>> {
        Ok(Arc::new(Stub {
            names: &["alpha", "alpha2"],
            guild_only: false,
        }))
    }

    fn beta_guild_only() -> Result<Arc<dyn InteractionHandler>> {
        Ok(Arc::new(Stub {
            names: &["beta"],
            guild_only: true,
        }))
    }

    fn alpha_duplicate() -> Result<Arc<dyn InteractionHandler>> {
        Ok(Arc::new(Stub {
            names: &["alpha"],
            guild_only: true,
        }))
    }

    fn broken() -> Result<Arc<dyn InteractionHandler>> {
        Err(BotError::Config("does not satisfy the contract".to_string()))
    }

    #[test]
    fn registers_every_declared_name() {
        let registry = Registry::from_factories(&[alpha, beta_guild_only]);
        assert!(registry.get("alpha").is_some());
        assert!(registry.get("alpha2").is_some());
        assert!(registry.get("beta").is_some());
        assert!(registry.get("unknown").is_none());
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn failing_factory_is_skipped_not_fatal() {
        let registry = Registry::from_factories(&[broken, alpha]);
        assert_eq!(registry.handlers().len(), 1);
        assert!(registry.get("alpha").is_some());
    }

    #[test]
    fn duplicate_name_keeps_the_last_registration() {
        let registry = Registry::from_factories(&[alpha, alpha_duplicate]);
        let handler = registry.get("alpha").expect("name must stay registered");
        assert!(handler.guild_only(), "later registration must win");
    }

    #[test]
    fn guild_only_handlers_stay_out_of_the_global_set() {
        let registry = Registry::from_factories(&[alpha, beta_guild_only]);
        assert_eq!(registry.global_commands().len(), 2);
        assert_eq!(registry.guild_commands().len(), 3);
    }

    #[test]
    fn builtin_table_loads_cleanly() {
        let registry = Registry::load();
        assert!(registry.get("gpt").is_some());
        assert!(registry.get("senko").is_some());
        assert!(registry.get("ping").is_some());
    }
}
