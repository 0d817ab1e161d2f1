use crate::{
    config::Config,
    context::Context,
    event::{Event, EventHandled},
    helper::CommandHelper,
    plugin::Plugin,
};
use anyhow::Result;
use serenity::all::CreateCommand;

pub struct Help;

#[serenity::async_trait]
impl Plugin for Help {
    fn name(&self) -> &'static str {
        "dkp_help"
    }

    async fn usage(&self, _ctx: &Context) -> Option<String> {
        Some(format!("/{} - show this help message", self.name()))
    }

    fn commands(&self, _cfg: &Config) -> Vec<CreateCommand> {
        vec![CreateCommand::new(self.name()).description("List the DKP bot's commands.")]
    }

    async fn handle(&self, ctx: &Context, event: &Event) -> Result<EventHandled> {
        let Some(command) = event.is_slash_cmd() else {
            return Ok(EventHandled::No);
        };
        if command.data.name != self.name() {
            return Ok(EventHandled::No);
        }

        let mut reply = String::new();
        reply.push_str("```\n");
        reply.push_str("Commands:\n");
        for plugin in crate::plugin::plugins() {
            if let Some(usage) = plugin.usage(ctx).await {
                reply.push_str(&usage);
                reply.push('\n');
            }
        }
        reply.push_str("```\n");

        command.reply_ephemeral(ctx, &reply).await?;
        Ok(EventHandled::Yes)
    }
}
