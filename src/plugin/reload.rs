use crate::{
    config::Config,
    context::Context,
    event::{Event, EventHandled},
    helper::CommandHelper,
    log_internal,
    logging::PrintColor,
    plugin::{ready, Plugin},
};
use anyhow::Result;
use serenity::all::CreateCommand;

pub struct Reload;

#[serenity::async_trait]
impl Plugin for Reload {
    fn name(&self) -> &'static str {
        "dkp_reload"
    }

    async fn usage(&self, _ctx: &Context) -> Option<String> {
        Some(format!("/{} - reload config (bot owner only)", self.name()))
    }

    fn commands(&self, _cfg: &Config) -> Vec<CreateCommand> {
        vec![CreateCommand::new(self.name()).description("Reload the bot configuration.")]
    }

    async fn handle(&self, ctx: &Context, event: &Event) -> Result<EventHandled> {
        let Some(command) = event.is_slash_cmd() else {
            return Ok(EventHandled::No);
        };
        if command.data.name != self.name() {
            return Ok(EventHandled::No);
        }

        if !command.is_from_owner(ctx).await {
            command
                .reply_ephemeral(ctx, "You do not have permission to use this command.")
                .await?;
            return Ok(EventHandled::Yes);
        }

        let allow_list = {
            let mut cfg = ctx.cfg.write().await;
            cfg.reload().await?;
            cfg.allow_list()
        };
        ctx.ledger.set_allow_list(allow_list).await;

        // Clan and event choices come from the configuration.
        let registered = ready::register_commands(ctx).await?;
        log_internal!(
            "{} reloaded the configuration; {} slash command(s) registered",
            command.user.color(),
            registered
        );

        command
            .reply_ephemeral(ctx, "Configuration reloaded successfully")
            .await?;
        Ok(EventHandled::Yes)
    }
}
