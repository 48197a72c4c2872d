//! Standalone utility that syncs the declarative command schemas to
//! Discord. Pass `--clear` to wipe existing registrations first.

use senko::config::Config;
use senko::error::Result;
use senko::registry::Registry;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("deploy=info,senko=info"),
    )
    .init();

    let config = Config::load()?;
    let registry = Registry::load();

    let clear = std::env::args().any(|arg| arg == "--clear");

    senko::sync::sync_commands(&config, &registry, clear).await
}
