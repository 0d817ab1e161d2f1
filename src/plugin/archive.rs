use crate::{
    config::Config,
    context::Context,
    event::{Event, EventHandled},
    helper::{mention, CommandHelper},
    plugin::{reject, require_officer, Plugin},
};
use anyhow::Result;
use serenity::all::CreateCommand;

/// Lists the balances of members who no longer hold the tracked role
pub struct Archive;

#[serenity::async_trait]
impl Plugin for Archive {
    fn name(&self) -> &'static str {
        "dkp_archive"
    }

    async fn usage(&self, _ctx: &Context) -> Option<String> {
        Some(format!(
            "/{} - list DKP kept for members who left (officer)",
            self.name()
        ))
    }

    fn commands(&self, _cfg: &Config) -> Vec<CreateCommand> {
        vec![CreateCommand::new(self.name())
            .description("Show the DKP archived for members who left the guild.")]
    }

    async fn handle(&self, ctx: &Context, event: &Event) -> Result<EventHandled> {
        let Some(command) = event.is_slash_cmd() else {
            return Ok(EventHandled::No);
        };
        if command.data.name != self.name() {
            return Ok(EventHandled::No);
        }

        if !require_officer(ctx, command).await? {
            return Ok(EventHandled::Yes);
        }

        let archived = match ctx.ledger.archive_list().await {
            Ok(archived) => archived,
            Err(err) => return reject(ctx, command, err).await,
        };

        let mut response = String::from("**Archived DKP:**\n");
        if archived.is_empty() {
            response.push_str("The archive is empty.");
        }
        let max_entries = ctx.cfg.read().await.leaderboard.max_entries;
        for standing in archived.iter().take(max_entries) {
            response.push_str(&format!("{}: {}\n", mention(&standing.key), standing.points));
        }
        if archived.len() > max_entries {
            response.push_str(&format!("…and {} more", archived.len() - max_entries));
        }

        command.reply_ephemeral(ctx, &response).await?;
        Ok(EventHandled::Yes)
    }
}
