//! The /ping status command: gateway latency plus cached upstream status
//! feeds.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use log::warn;
use serde::Deserialize;
use serenity::all::{
    CommandInteraction, Context, CreateCommand, CreateInteractionResponse,
    CreateInteractionResponseMessage,
};
use tokio::sync::Mutex;

use crate::dispatcher::BotState;
use crate::error::Result;
use crate::registry::InteractionHandler;

const DISCORD_STATUS_URL: &str =
    "https://discordstatus.com/metrics-display/5k2rt9f7pmny/day.json";
const OPENAI_STATUS_URL: &str = "https://status.openai.com/api/v2/status.json";

/// The status feeds are polled at most once per minute.
const REFRESH_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
struct DiscordDayMetrics {
    summary: MetricSummary,
}

#[derive(Debug, Deserialize)]
struct MetricSummary {
    mean: f64,
}

#[derive(Debug, Deserialize)]
struct OpenAiStatusPage {
    status: OpenAiStatus,
}

#[derive(Debug, Deserialize)]
struct OpenAiStatus {
    description: String,
}

#[derive(Debug, Default)]
struct StatusCache {
    fetched_at: Option<Instant>,
    discord_ping_ms: Option<f64>,
    openai_status: String,
}

pub struct PingHandler {
    http: reqwest::Client,
    cache: Mutex<StatusCache>,
}

impl PingHandler {
    #[must_use]
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
            cache: Mutex::new(StatusCache::default()),
        }
    }
}

impl Default for PingHandler {
    fn default() -> Self {
        Self::new()
    }
}

async fn gateway_latency(state: &BotState) -> Option<f64> {
    let manager = state.shard_manager()?;
    let runners = manager.runners.lock().await;
    let latency = runners.values().find_map(|runner| runner.latency)?;
    Some(latency.as_secs_f64() * 1000.0)
}

async fn reply(ctx: &Context, interaction: &CommandInteraction, text: String) -> Result<()> {
    let message = CreateInteractionResponseMessage::new().content(text);
    interaction
        .create_response(&ctx.http, CreateInteractionResponse::Message(message))
        .await?;
    Ok(())
}

#[async_trait]
impl InteractionHandler for PingHandler {
    fn names(&self) -> &'static [&'static str] {
        &["ping"]
    }

    fn commands(&self) -> Vec<CreateCommand> {
        vec![
            CreateCommand::new("ping")
                .description("Gets the ping of the client, Discord's API, and OpenAI's API"),
        ]
    }

    async fn on_command(
        &self,
        ctx: &Context,
        interaction: &CommandInteraction,
        state: &BotState,
    ) -> Result<()> {
        let client_ping = gateway_latency(state).await;

        let mut cache = self.cache.lock().await;
        let stale = cache
            .fetched_at
            .is_none_or(|at| at.elapsed() > REFRESH_INTERVAL);

        if stale {
            let (discord, openai) = tokio::join!(
                self.http.get(DISCORD_STATUS_URL).send(),
                self.http.get(OPENAI_STATUS_URL).send()
            );
            let (Ok(discord), Ok(openai)) = (discord, openai) else {
                drop(cache);
                let text = format!(
                    "Failed to fetch one or more API statuses.\n\n\
                     Dataset: [Discord](<{DISCORD_STATUS_URL}>), [OpenAI](<{OPENAI_STATUS_URL}>)"
                );
                return reply(ctx, interaction, text).await;
            };

            cache.fetched_at = Some(Instant::now());
            if discord.status().is_success() {
                match discord.json::<DiscordDayMetrics>().await {
                    Ok(metrics) => cache.discord_ping_ms = Some(metrics.summary.mean),
                    Err(e) => warn!("Failed to parse Discord status metrics: {e}"),
                }
            }
            if openai.status().is_success() {
                match openai.json::<OpenAiStatusPage>().await {
                    Ok(page) => cache.openai_status = page.status.description,
                    Err(e) => warn!("Failed to parse OpenAI status page: {e}"),
                }
            }
        }

        let client_text = client_ping
            .map_or_else(|| "N/A (retry in a minute)".to_string(), |ms| format!("{ms:.0}ms"));
        let discord_text = cache
            .discord_ping_ms
            .map_or_else(|| "N/A (failed)".to_string(), |ms| format!("{ms:.0}ms"));
        let text = format!(
            "Client WebSocket ping: `{client_text}`\n\
             Discord API ping: `{discord_text}`\n\
             OpenAI status: `{}`",
            cache.openai_status
        );
        drop(cache);

        reply(ctx, interaction, text).await
    }
}
