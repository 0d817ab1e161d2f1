use crate::{
    context::Context,
    event::{Event, EventHandled},
    log_error, log_internal,
    plugin::{membership, Plugin},
};
use anyhow::Result;

/// Registers slash commands and reconciles the ledger with the guild's members once the
/// connection to Discord is ready.
pub struct Ready;

#[serenity::async_trait]
impl Plugin for Ready {
    fn name(&self) -> &'static str {
        "ready"
    }

    async fn usage(&self, _ctx: &Context) -> Option<String> {
        None
    }

    async fn handle(&self, ctx: &Context, event: &Event) -> Result<EventHandled> {
        let Event::Ready(_) = event else {
            return Ok(EventHandled::No);
        };

        let registered = register_commands(ctx).await?;
        log_internal!("Registered {} slash command(s)", registered);

        match membership::reconcile_members(ctx).await? {
            Some(summary) => log_internal!(
                "Reconciled members: {} new, {} restored from archive, {} unchanged",
                summary.created,
                summary.restored,
                summary.unchanged,
            ),
            None => log_error!("Tracked role not found; skipped member reconciliation"),
        }

        Ok(EventHandled::Yes)
    }
}

/// Replace the guild's slash commands with those of every plugin.  Returns how many were
/// registered.
pub async fn register_commands(ctx: &Context<'_>) -> Result<usize> {
    let (guild_id, commands) = {
        let cfg = ctx.cfg.read().await;
        let commands: Vec<_> = crate::plugin::plugins()
            .iter()
            .flat_map(|plugin| plugin.commands(&cfg))
            .collect();
        (cfg.guild_id(), commands)
    };

    let registered = guild_id.set_commands(ctx.http, commands).await?;
    Ok(registered.len())
}
