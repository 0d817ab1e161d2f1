use crate::{
    context::Context,
    event::{Event, EventHandled},
    helper::CommandHelper,
    plugin::Plugin,
};
use anyhow::Result;

/// Only answer commands in the configured guild and, if any are configured, command channels.
pub struct Restrict;

#[serenity::async_trait]
impl Plugin for Restrict {
    fn name(&self) -> &'static str {
        "restrict"
    }

    async fn usage(&self, _ctx: &Context) -> Option<String> {
        None
    }

    async fn handle(&self, ctx: &Context, event: &Event) -> Result<EventHandled> {
        let Some(command) = event.is_slash_cmd() else {
            return Ok(EventHandled::No);
        };

        let (guild_id, channels) = {
            let cfg = ctx.cfg.read().await;
            (cfg.guild_id(), cfg.command_channels())
        };

        if command.guild_id != Some(guild_id) {
            command
                .reply_ephemeral(ctx, "This command is not available in this guild.")
                .await?;
            return Ok(EventHandled::Yes);
        }

        if !channels.is_empty() && !channels.contains(&command.channel_id) {
            let allowed = channels
                .iter()
                .map(|channel| format!("<#{}>", channel))
                .collect::<Vec<_>>()
                .join(", ");
            command
                .reply_ephemeral(
                    ctx,
                    &format!("This command can only be used in {}.", allowed),
                )
                .await?;
            return Ok(EventHandled::Yes);
        }

        Ok(EventHandled::No)
    }
}
