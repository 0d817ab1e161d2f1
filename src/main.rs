mod config;
mod context;
mod event;
mod handler;
mod helper;
mod ledger;
mod logging;
mod plugin;

use crate::ledger::{Clock, Ledger};
use serenity::{all::GatewayIntents, Client};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = crate::config::Config::load().await?;
    let token = cfg.general.discord_token.clone();
    let data_dir = cfg.data_dir()?;
    let ledger = Ledger::open(&data_dir, cfg.allow_list(), Clock::System).await?;
    log_internal!("Ledger stores in `{}`", data_dir.to_string_lossy());
    let handler = handler::Handler::new(cfg, ledger);

    // Things we want discord to tell us about.  Member events drive the archive.
    let intents = GatewayIntents::GUILDS | GatewayIntents::GUILD_MEMBERS;

    Client::builder(&token, intents)
        .event_handler(handler)
        .await?
        .start()
        .await
        .map_err(Into::into)
}
