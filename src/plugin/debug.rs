use crate::{
    context::Context,
    event::{Event, EventHandled},
    log_event,
    logging::*,
    plugin::Plugin,
};
use anyhow::Result;
use serenity::all::{CommandInteraction, ResolvedValue};

/// Prints debug information about event to stdout
pub struct Debug;

#[serenity::async_trait]
impl Plugin for Debug {
    fn name(&self) -> &'static str {
        "debug"
    }

    async fn usage(&self, _ctx: &Context) -> Option<String> {
        None
    }

    async fn handle(&self, ctx: &Context, event: &Event) -> Result<EventHandled> {
        if !ctx.cfg.read().await.general.log_commands {
            return Ok(EventHandled::No);
        }

        match event {
            Event::Ready(ready) => {
                log_event!(
                    "Connected to {} server(s) as {}",
                    ready.guilds.len(),
                    ready.user.color(),
                );
            }
            Event::Command(command) => {
                log_event!(
                    "{}{}{}{}{}{} /{}{}",
                    command.guild_id.color(ctx.http).await,
                    Glue.color(),
                    command.channel_id.color(ctx.http).await,
                    Glue.color(),
                    command.user.color(),
                    Glue.color(),
                    command.data.name,
                    format_options(command),
                );
            }
            Event::MemberUpdate {
                guild_id,
                user,
                old_roles,
                roles,
            } => match old_roles {
                Some(old_roles) if old_roles == roles => {
                    // Nickname, avatar, etc.  Not currently debug logging this
                }
                Some(old_roles) => log_event!(
                    "{} roles changed in \"{}\" ({} -> {} roles)",
                    user.color(),
                    Some(*guild_id).color(ctx.http).await,
                    old_roles.len(),
                    roles.len(),
                ),
                None => log_event!(
                    "{} updated in \"{}\" (uncached, {} roles)",
                    user.color(),
                    Some(*guild_id).color(ctx.http).await,
                    roles.len(),
                ),
            },
            Event::MemberRemoval { guild_id, user } => {
                log_event!(
                    "{} left \"{}\"",
                    user.color(),
                    Some(*guild_id).color(ctx.http).await,
                );
            }
        }

        Ok(EventHandled::No)
    }
}

fn format_options(command: &CommandInteraction) -> String {
    command
        .data
        .options()
        .iter()
        .map(|option| {
            let value = match &option.value {
                ResolvedValue::Integer(value) => value.to_string(),
                ResolvedValue::String(value) => value.to_string(),
                ResolvedValue::User(user, _) => user.name.clone(),
                _ => "?".to_owned(),
            };
            format!(" {}={}", option.name, value)
        })
        .collect()
}
