//! The Serenity crate we're using for the Discord API is designed around callbacks to handle
//! events.  However, this does not mesh well with our plugin framework here.  To resolve this,
//! the handler translates the callbacks into a distinct Event enum.

use crate::{context::Context, helper::CommandHelper, log_error};
use serenity::all::{CommandInteraction, GuildId, Ready, RoleId, User};

/// A Discord event
pub enum Event {
    Ready(Ready),
    /// A slash command invocation
    Command(CommandInteraction),
    /// A guild member's roles (or other details) changed
    MemberUpdate {
        guild_id: GuildId,
        user: User,
        /// Roles before the update, if the member was cached
        old_roles: Option<Vec<RoleId>>,
        roles: Vec<RoleId>,
    },
    /// A member left or was removed from a guild
    MemberRemoval { guild_id: GuildId, user: User },
}

impl Event {
    // When an event occurs, iterate over all the plugins to see if any can/should handle it.
    pub async fn handle(self, ctx: Context<'_>) {
        for plugin in crate::plugin::plugins() {
            match plugin.handle(&ctx, &self).await {
                Ok(EventHandled::Yes) => return,
                Ok(EventHandled::No) => continue,
                Err(err) => {
                    log_error!("Error in plugin {}: {:#}", plugin.name(), err);

                    // Don't leave the user waiting on "the application did not respond".  This
                    // fails if the plugin already replied, which is fine.
                    if let Event::Command(command) = &self {
                        let _ = command
                            .reply_ephemeral(&ctx, "Something went wrong, please try again later.")
                            .await;
                    }
                    return;
                }
            }
        }
    }

    /// The slash command invocation, if this event is one
    pub fn is_slash_cmd(&self) -> Option<&CommandInteraction> {
        match self {
            Event::Command(command) => Some(command),
            _ => None,
        }
    }
}

pub enum EventHandled {
    Yes,
    No,
}
