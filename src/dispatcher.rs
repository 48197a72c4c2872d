//! Routes inbound interactions to their handlers with per-invocation error
//! isolation.

use std::sync::{Arc, OnceLock};

use log::{debug, error, warn};
use serenity::all::{
    CommandInteraction, CommandType, Context, CreateInteractionResponse,
    CreateInteractionResponseFollowup, CreateInteractionResponseMessage, Interaction,
};
use serenity::gateway::ShardManager;

use crate::chat::{ActiveReplyTracker, ConversationStore};
use crate::config::Config;
use crate::openai::CompletionClient;
use crate::registry::Registry;

const COMMAND_ERROR_REPLY: &str = "An error occurred executing this command.";
const CONTEXT_MENU_ERROR_REPLY: &str = "An error occurred executing this interaction.";

/// Shared state handed to every handler invocation.
///
/// Session state lives here, owned by the dispatcher — never in globals.
/// Overlapping invocations for the same session key still race on the store
/// (snapshot, then commit); that last-write-wins outcome is intentional.
pub struct BotState {
    pub config: Config,
    pub completions: CompletionClient,
    pub conversations: ConversationStore,
    pub active_replies: ActiveReplyTracker,
    shard_manager: OnceLock<Arc<ShardManager>>,
}

impl BotState {
    #[must_use]
    pub fn new(config: Config) -> Self {
        let completions = CompletionClient::new(config.open_ai_key.clone());
        Self {
            config,
            completions,
            conversations: ConversationStore::new(),
            active_replies: ActiveReplyTracker::new(),
            shard_manager: OnceLock::new(),
        }
    }

    /// Late-bound gateway handle, set once the client has been built.
    pub fn set_shard_manager(&self, manager: Arc<ShardManager>) {
        let _ = self.shard_manager.set(manager);
    }

    #[must_use]
    pub fn shard_manager(&self) -> Option<&Arc<ShardManager>> {
        self.shard_manager.get()
    }
}

pub struct Dispatcher {
    registry: Registry,
    state: Arc<BotState>,
}

impl Dispatcher {
    #[must_use]
    pub fn new(registry: Registry, state: Arc<BotState>) -> Self {
        Self { registry, state }
    }

    #[must_use]
    pub fn state(&self) -> &Arc<BotState> {
        &self.state
    }

    /// Route one inbound interaction. Never lets a handler error escape.
    pub async fn handle(&self, ctx: &Context, interaction: &Interaction) {
        match interaction {
            Interaction::Command(command) => match command.data.kind {
                CommandType::ChatInput => self.dispatch_command(ctx, command).await,
                CommandType::User | CommandType::Message => {
                    self.dispatch_context_menu(ctx, command).await;
                }
                _ => debug!("Ignoring command interaction of kind {:?}", command.data.kind),
            },
            Interaction::Autocomplete(autocomplete) => {
                self.dispatch_autocomplete(ctx, autocomplete).await;
            }
            // Component clicks belong to the per-message collectors attached
            // when the reply was produced.
            _ => {}
        }
    }

    async fn dispatch_command(&self, ctx: &Context, command: &CommandInteraction) {
        let Some(handler) = self.registry.get(&command.data.name) else {
            error!("Interaction {} not found", command.data.name);
            return;
        };

        if let Err(e) = handler.on_command(ctx, command, &self.state).await {
            error!("Command /{} failed: {e}", command.data.name);
            notify_failure(ctx, command, COMMAND_ERROR_REPLY).await;
        }
    }

    async fn dispatch_context_menu(&self, ctx: &Context, command: &CommandInteraction) {
        let Some(handler) = self.registry.get(&command.data.name) else {
            error!("Interaction {} not found", command.data.name);
            return;
        };

        if let Err(e) = handler.on_context_menu(ctx, command, &self.state).await {
            error!("Context menu {} failed: {e}", command.data.name);
            notify_failure(ctx, command, CONTEXT_MENU_ERROR_REPLY).await;
        }
    }

    async fn dispatch_autocomplete(&self, ctx: &Context, command: &CommandInteraction) {
        let Some(handler) = self.registry.get(&command.data.name) else {
            error!("Interaction {} not found", command.data.name);
            return;
        };

        // Autocomplete has no reply surface for errors; log and move on.
        if let Err(e) = handler.on_autocomplete(ctx, command, &self.state).await {
            error!("Autocomplete for {} failed: {e}", command.data.name);
        }
    }
}

/// Best-effort user notification after a handler error: an initial response
/// when the interaction is unacknowledged, otherwise a follow-up.
async fn notify_failure(ctx: &Context, command: &CommandInteraction, text: &str) {
    let reply = CreateInteractionResponseMessage::new()
        .content(text)
        .ephemeral(true);
    if command
        .create_response(&ctx.http, CreateInteractionResponse::Message(reply))
        .await
        .is_err()
    {
        // Already replied or deferred; fall back to a follow-up.
        let followup = CreateInteractionResponseFollowup::new()
            .content(text)
            .ephemeral(true);
        if let Err(e) = command.create_followup(&ctx.http, followup).await {
            warn!("Failed to notify user of command failure: {e}");
        }
    }
}
