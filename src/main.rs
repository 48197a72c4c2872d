#[tokio::main]
async fn main() -> senko::error::Result<()> {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("senko=info,serenity=warn"),
    )
    .init();
    log::info!("Starting senko Discord bot");

    match senko::run().await {
        Ok(()) => {
            log::info!("Bot shut down successfully");
            Ok(())
        }
        Err(e) => {
            log::error!("Bot encountered an error: {e}");
            Err(e)
        }
    }
}
