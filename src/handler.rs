use crate::{config::Config, context::Context, event::Event, ledger::Ledger};
use serenity::all::{GuildId, GuildMemberUpdateEvent, Interaction, Member, Ready, User};
use tokio::sync::RwLock;

/// Discord event handler
pub struct Handler {
    cfg: RwLock<Config>,
    ledger: Ledger,
}

impl<'a> Handler {
    pub fn new(cfg: Config, ledger: Ledger) -> Self {
        Self {
            cfg: RwLock::new(cfg),
            ledger,
        }
    }

    fn ctx(&'a self, discord_ctx: &'a serenity::all::Context) -> Context<'a> {
        Context {
            cfg: &self.cfg,
            ledger: &self.ledger,
            cache: &discord_ctx.cache,
            http: &discord_ctx.http,
            cache_http: discord_ctx,
        }
    }
}

#[serenity::async_trait]
impl serenity::all::EventHandler for Handler {
    async fn ready(&self, discord_ctx: serenity::all::Context, ready: Ready) {
        Event::Ready(ready).handle(self.ctx(&discord_ctx)).await;
    }

    async fn interaction_create(&self, discord_ctx: serenity::all::Context, interaction: Interaction) {
        // Components and modals are not used.
        if let Interaction::Command(command) = interaction {
            Event::Command(command).handle(self.ctx(&discord_ctx)).await;
        }
    }

    async fn guild_member_update(
        &self,
        discord_ctx: serenity::all::Context,
        old_if_available: Option<Member>,
        _new: Option<Member>,
        event: GuildMemberUpdateEvent,
    ) {
        Event::MemberUpdate {
            guild_id: event.guild_id,
            user: event.user,
            old_roles: old_if_available.map(|member| member.roles),
            roles: event.roles,
        }
        .handle(self.ctx(&discord_ctx))
        .await;
    }

    async fn guild_member_removal(
        &self,
        discord_ctx: serenity::all::Context,
        guild_id: GuildId,
        user: User,
        _member_data_if_available: Option<Member>,
    ) {
        Event::MemberRemoval { guild_id, user }
            .handle(self.ctx(&discord_ctx))
            .await;
    }
}
