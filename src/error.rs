use reqwest::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BotError {
    #[error("Serenity error: {0}")]
    Serenity(Box<serenity::Error>),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("OpenAI API error ({status}): {message}")]
    CompletionApi {
        status: StatusCode,
        message: String,
    },

    #[error("OpenAI response error: {0}")]
    CompletionResponse(String),

    #[error("HTTP request error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Missing required option: {0}")]
    MissingOption(&'static str),
}

impl From<serenity::Error> for BotError {
    fn from(err: serenity::Error) -> Self {
        BotError::Serenity(Box::new(err))
    }
}

impl BotError {
    /// Returns a user-friendly error message suitable for displaying in Discord
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            // Transport failures and API-reported errors read the same to the
            // user; the distinction only matters in the logs.
            BotError::CompletionApi { .. }
            | BotError::CompletionResponse(_)
            | BotError::Reqwest(_) => "Sorry - the OpenAI API request failed.".to_string(),
            BotError::Serenity(_)
            | BotError::Config(_)
            | BotError::Json(_)
            | BotError::MissingOption(_) => {
                "An error occurred executing this command.".to_string()
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, BotError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completion_errors_share_one_apology() {
        let api = BotError::CompletionApi {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: "upstream exploded".to_string(),
        };
        let response = BotError::CompletionResponse("no choices in response".to_string());
        assert_eq!(api.user_message(), "Sorry - the OpenAI API request failed.");
        assert_eq!(api.user_message(), response.user_message());
    }

    #[test]
    fn api_error_display_includes_status_and_detail() {
        let err = BotError::CompletionApi {
            status: StatusCode::TOO_MANY_REQUESTS,
            message: "rate limited".to_string(),
        };
        let rendered = err.to_string();
        assert!(rendered.contains("429"));
        assert!(rendered.contains("rate limited"));
    }
}
