//! Pushes the declarative command schemas to Discord's registration
//! endpoints. Used by the `deploy` binary.

use log::info;
use serenity::all::{ApplicationId, Command, GuildId};
use serenity::http::Http;

use crate::config::Config;
use crate::error::Result;
use crate::registry::Registry;

/// PUT the full schema set globally and to every configured guild.
///
/// With `clear`, existing registrations are removed first by uploading an
/// empty set to each endpoint.
pub async fn sync_commands(config: &Config, registry: &Registry, clear: bool) -> Result<()> {
    let http = Http::new(&config.token);
    http.set_application_id(ApplicationId::new(config.client_id));

    info!("Refreshing application interactions...");

    if clear {
        Command::set_global_commands(&http, Vec::new()).await?;
        for guild_id in &config.guild_ids {
            GuildId::new(*guild_id)
                .set_commands(&http, Vec::new())
                .await?;
        }
        info!("Cleared existing application interactions");
    }

    Command::set_global_commands(&http, registry.global_commands()).await?;
    for guild_id in &config.guild_ids {
        GuildId::new(*guild_id)
            .set_commands(&http, registry.guild_commands())
            .await?;
    }

    info!("Finished refreshing application interactions");
    Ok(())
}
