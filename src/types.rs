//! Common types used throughout the senko bot.

use serde::{Deserialize, Serialize};
use strum::Display;

/// Role of a message in the conversation.
///
/// Maps to OpenAI API message roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// Message from the human user
    User,
    /// Message from the AI assistant
    Assistant,
    /// System prompt or instructions
    System,
}

/// Persona variant of a conversation.
///
/// Requesting a different flavor than the one a session was created with
/// starts the conversation over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Flavor {
    None,
    Senko,
}
