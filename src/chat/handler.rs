//! The /gpt and /senko slash commands.

use std::time::Duration;

use async_trait::async_trait;
use log::{debug, error, info, warn};
use serenity::all::{
    CommandInteraction, CommandOptionType, Context, CreateCommand, CreateCommandOption,
    CreateInteractionResponse, CreateInteractionResponseFollowup,
    CreateInteractionResponseMessage, EditInteractionResponse, EditMessage, Message,
    ResolvedValue,
};

use crate::dispatcher::BotState;
use crate::error::{BotError, Result};
use crate::openai::ChatMessage;
use crate::registry::InteractionHandler;
use crate::types::Flavor;

use super::active::{self, ActiveReply, CLEAR_BUTTON_ID};
use super::chunk::{MESSAGE_LIMIT, split_message};
use super::store::SessionKey;

const DEFAULT_SYSTEM_PROMPT: &str = "You are an assistant.";

const SENKO_SYSTEM_PROMPT: &str = "You are Senko, inspired by the caring and nurturing fox \
    spirit from \"Sewayaki Kitsune no Senko-san\", is designed to provide users with a \
    comforting and supportive interaction. She responds with empathy and support, always \
    prioritizing the user's emotional well-being. Her language is polite and filled with \
    respectful terms, using a soft and warm tone to make users feel valued and cared for. \
    Senko offers helpful suggestions and tips, drawing from her domestic skills portrayed in \
    the anime, such as relaxation techniques and simple recipes. She incorporates Japanese \
    cultural references and expressions, adding authenticity and charm to her interactions. \
    The chatbot includes playful emojis and sounds aligned with her fox spirit theme to \
    enhance user engagement. She handles inquiries with patience and reassurance, maintaining \
    a calm demeanor to ensure users feel at ease during their interaction. Senko aims to be a \
    digital caretaker, bringing joy and relief to users' daily lives through thoughtful and \
    nurturing interactions.";

/// How long the clear button stays clickable.
const COLLECTOR_WINDOW: Duration = Duration::from_secs(180);
/// How long the "Memory Cleared" state stays visible before the components
/// are stripped.
const CLEARED_GRACE: Duration = Duration::from_secs(5);

pub struct ChatHandler;

impl ChatHandler {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Default for ChatHandler {
    fn default() -> Self {
        Self::new()
    }
}

async fn chat(
    ctx: &Context,
    interaction: &CommandInteraction,
    state: &BotState,
    flavor: Flavor,
    default_system_prompt: &str,
    default_temperature: f64,
) -> Result<()> {
    let mut query = None;
    let mut system_prompt = default_system_prompt.to_string();
    let mut temperature = default_temperature;

    for option in interaction.data.options() {
        match (option.name, option.value) {
            ("query", ResolvedValue::String(value)) => query = Some(value.to_string()),
            ("systemprompt", ResolvedValue::String(value)) => {
                system_prompt = value.to_string();
            }
            ("creativity", ResolvedValue::Number(value)) => temperature = value,
            _ => {}
        }
    }
    let query = query.ok_or(BotError::MissingOption("query"))?;

    let key = SessionKey::new(interaction.channel_id, interaction.user.id);
    info!(
        "/{} ({flavor}) from {} in channel {}",
        interaction.data.name, interaction.user.name, interaction.channel_id
    );

    interaction.defer(&ctx.http).await?;

    let mut history = state
        .conversations
        .get_or_create(&key, flavor, &system_prompt)
        .await;
    history.push(ChatMessage::user(query));

    let reply = match state.completions.complete(&history, temperature).await {
        Ok(reply) => reply,
        Err(e) => {
            error!("Completion request failed: {e}");
            // Nothing is committed, so the user turn that triggered the
            // failed call never enters the history.
            let apology = EditInteractionResponse::new().content(e.user_message());
            if let Err(edit_err) = interaction.edit_response(&ctx.http, apology).await {
                warn!("Failed to deliver completion failure notice: {edit_err}");
            }
            return Ok(());
        }
    };

    let content = reply.content.clone();
    history.push(reply);
    state.conversations.commit(&key, history, flavor).await;
    state.conversations.touch(&key).await;

    let final_message = send_chunks(ctx, interaction, &content).await?;

    let new_reply = ActiveReply {
        channel_id: final_message.channel_id,
        message_id: final_message.id,
    };
    if let Some(previous) = state.active_replies.replace(&key, new_reply).await {
        // The previous widget may already be deleted or expired.
        let strip = EditMessage::new().components(Vec::new());
        if let Err(e) = previous
            .channel_id
            .edit_message(&ctx.http, previous.message_id, strip)
            .await
        {
            debug!("Failed to strip previous active reply: {e}");
        }
    }

    await_clear_click(ctx, interaction, state, key, &final_message).await;
    Ok(())
}

/// Deliver the completion text, chunked; the last message sent carries the
/// clear button.
async fn send_chunks(
    ctx: &Context,
    interaction: &CommandInteraction,
    content: &str,
) -> Result<Message> {
    let mut chunks = split_message(content, MESSAGE_LIMIT);
    let row = active::clear_button_row();

    if chunks.len() <= 1 {
        let only = chunks.pop().unwrap_or_default();
        let edit = EditInteractionResponse::new()
            .content(only)
            .components(vec![row]);
        return Ok(interaction.edit_response(&ctx.http, edit).await?);
    }

    let first = chunks.remove(0);
    let edit = EditInteractionResponse::new()
        .content(first)
        .components(Vec::new());
    let mut last_message = interaction.edit_response(&ctx.http, edit).await?;

    let count = chunks.len();
    for (index, chunk) in chunks.into_iter().enumerate() {
        let mut followup = CreateInteractionResponseFollowup::new().content(chunk);
        if index + 1 == count {
            followup = followup.components(vec![row.clone()]);
        }
        last_message = interaction.create_followup(&ctx.http, followup).await?;
    }
    Ok(last_message)
}

/// Wait for a clear-button click on `message`, or for the collector window
/// to lapse. Timeout is the normal outcome, not an error.
async fn await_clear_click(
    ctx: &Context,
    interaction: &CommandInteraction,
    state: &BotState,
    key: SessionKey,
    message: &Message,
) {
    let click = message
        .await_component_interaction(&ctx.shard)
        .author_id(interaction.user.id)
        .timeout(COLLECTOR_WINDOW)
        .await;

    match click {
        Some(click) if click.data.custom_id == CLEAR_BUTTON_ID => {
            debug!("Clearing conversation memory for session {key}");
            state.conversations.clear(&key).await;

            let cleared = CreateInteractionResponseMessage::new()
                .components(vec![active::cleared_button_row()]);
            if let Err(e) = click
                .create_response(&ctx.http, CreateInteractionResponse::UpdateMessage(cleared))
                .await
            {
                warn!("Failed to acknowledge clear click: {e}");
            }

            tokio::time::sleep(CLEARED_GRACE).await;
            strip_components(ctx, message).await;
            state.active_replies.remove_if(&key, message.id).await;
        }
        _ => {
            strip_components(ctx, message).await;
            state.active_replies.remove_if(&key, message.id).await;
        }
    }
}

async fn strip_components(ctx: &Context, message: &Message) {
    let edit = EditMessage::new().components(Vec::new());
    if let Err(e) = message
        .channel_id
        .edit_message(&ctx.http, message.id, edit)
        .await
    {
        debug!("Failed to strip reply components: {e}");
    }
}

#[async_trait]
impl InteractionHandler for ChatHandler {
    fn names(&self) -> &'static [&'static str] {
        &["gpt", "senko"]
    }

    fn commands(&self) -> Vec<CreateCommand> {
        vec![
            CreateCommand::new("gpt")
                .description("Submits a query to OpenAI using the latest gpt-4-turbo model.")
                .add_option(
                    CreateCommandOption::new(
                        CommandOptionType::String,
                        "query",
                        "The query to send",
                    )
                    .required(true),
                )
                .add_option(
                    CreateCommandOption::new(
                        CommandOptionType::String,
                        "systemprompt",
                        "The system prompt to use",
                    )
                    .required(false),
                )
                .add_option(
                    CreateCommandOption::new(
                        CommandOptionType::Number,
                        "creativity",
                        "Initializes the temperature of the system prompt",
                    )
                    .add_number_choice("Schizo", 1.5)
                    .add_number_choice("Normal", 1.0)
                    .add_number_choice("Strict", 0.5)
                    .required(false),
                ),
            CreateCommand::new("senko")
                .description("Asks a question to Senko-flavored gpt-4-turbo.")
                .add_option(
                    CreateCommandOption::new(
                        CommandOptionType::String,
                        "query",
                        "The query to send",
                    )
                    .required(true),
                ),
        ]
    }

    async fn on_command(
        &self,
        ctx: &Context,
        interaction: &CommandInteraction,
        state: &BotState,
    ) -> Result<()> {
        match interaction.data.name.as_str() {
            "senko" => {
                chat(ctx, interaction, state, Flavor::Senko, SENKO_SYSTEM_PROMPT, 1.2).await
            }
            _ => {
                chat(
                    ctx,
                    interaction,
                    state,
                    Flavor::None,
                    DEFAULT_SYSTEM_PROMPT,
                    1.0,
                )
                .await
            }
        }
    }
}
