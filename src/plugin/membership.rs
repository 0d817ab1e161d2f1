//! Keeps the ledger in step with who holds the tracked role.  Members who lose the role (or
//! leave the guild) have their balance archived; members who gain it get it back.

use crate::{
    config::Config,
    context::Context,
    event::{Event, EventHandled},
    helper::{find_role, CommandHelper},
    ledger::{Joined, Left, MemberId, Reconciled},
    log_internal,
    logging::{Points, PrintColor},
    plugin::{require_officer, Plugin},
};
use anyhow::Result;
use serenity::all::{CreateCommand, GuildId, RoleId, User, UserId};

/// Discord's maximum page size for listing guild members
const MEMBER_PAGE_SIZE: u64 = 1000;

pub struct Membership;

#[serenity::async_trait]
impl Plugin for Membership {
    fn name(&self) -> &'static str {
        "dkp_init"
    }

    async fn usage(&self, _ctx: &Context) -> Option<String> {
        Some(format!(
            "/{} - make sure every member with the tracked role has a DKP entry (officer)",
            self.name()
        ))
    }

    fn commands(&self, _cfg: &Config) -> Vec<CreateCommand> {
        vec![CreateCommand::new(self.name())
            .description("Initialize DKP entries for every member with the tracked role.")]
    }

    async fn handle(&self, ctx: &Context, event: &Event) -> Result<EventHandled> {
        match event {
            Event::MemberUpdate {
                guild_id,
                user,
                old_roles,
                roles,
            } => {
                let Some(role_id) = tracked_role_in(ctx, *guild_id).await? else {
                    return Ok(EventHandled::No);
                };

                let has = roles.contains(&role_id);
                let had = old_roles.as_ref().map(|roles| roles.contains(&role_id));
                if user.bot || had == Some(has) {
                    return Ok(EventHandled::Yes);
                }

                // Without the old roles, the current ones decide.  Both transitions are no-ops
                // when repeated.
                if has {
                    joined(ctx, user).await?;
                } else {
                    left(ctx, user).await?;
                }
                Ok(EventHandled::Yes)
            }
            Event::MemberRemoval { guild_id, user } => {
                if *guild_id != ctx.cfg.read().await.guild_id() || user.bot {
                    return Ok(EventHandled::No);
                }
                left(ctx, user).await?;
                Ok(EventHandled::Yes)
            }
            Event::Command(command) if command.data.name == self.name() => {
                if !require_officer(ctx, command).await? {
                    return Ok(EventHandled::Yes);
                }

                let Some(summary) = reconcile_members(ctx).await? else {
                    let role = ctx.cfg.read().await.general.tracked_role.clone();
                    command
                        .reply_ephemeral(
                            ctx,
                            &format!("The tracked role `{}` does not exist.", role),
                        )
                        .await?;
                    return Ok(EventHandled::Yes);
                };

                log_internal!(
                    "{} initialized the leaderboard: {} new, {} restored, {} unchanged",
                    command.user.color(),
                    summary.created,
                    summary.restored,
                    summary.unchanged,
                );
                command
                    .reply_ephemeral(
                        ctx,
                        &format!(
                            "Leaderboard initialized: {} new member(s), {} restored from the archive, {} already tracked.",
                            summary.created, summary.restored, summary.unchanged
                        ),
                    )
                    .await?;
                Ok(EventHandled::Yes)
            }
            _ => Ok(EventHandled::No),
        }
    }
}

/// The tracked role's id, if `guild_id` is the configured guild and the role exists there.
async fn tracked_role_in(ctx: &Context<'_>, guild_id: GuildId) -> Result<Option<RoleId>> {
    let (configured, name) = {
        let cfg = ctx.cfg.read().await;
        (cfg.guild_id(), cfg.general.tracked_role.clone())
    };
    if guild_id != configured {
        return Ok(None);
    }

    find_role(ctx, guild_id, &name).await
}

async fn joined(ctx: &Context<'_>, user: &User) -> Result<()> {
    match ctx.ledger.member_joined(&MemberId::from(user.id)).await? {
        Joined::Created => log_internal!("{} joined; starting at 0 DKP", user.color()),
        Joined::Restored(balance) => log_internal!(
            "{} returned; restored {} DKP from the archive",
            user.color(),
            Points(balance).color()
        ),
        Joined::AlreadyActive(_) => {}
    }
    Ok(())
}

async fn left(ctx: &Context<'_>, user: &User) -> Result<()> {
    match ctx.ledger.member_left(&MemberId::from(user.id)).await? {
        Left::Archived(balance) => {
            log_internal!(
                "{} left; archived {} DKP",
                user.color(),
                Points(balance).color()
            )
        }
        Left::NotActive => {}
    }
    Ok(())
}

/// Give every current holder of the tracked role a ledger entry.  `None` if the role doesn't
/// exist in the configured guild.
pub async fn reconcile_members(ctx: &Context<'_>) -> Result<Option<Reconciled>> {
    let guild_id = ctx.cfg.read().await.guild_id();
    let Some(role_id) = tracked_role_in(ctx, guild_id).await? else {
        return Ok(None);
    };

    let mut holders = Vec::new();
    let mut after: Option<UserId> = None;
    loop {
        let page = guild_id
            .members(ctx.http, Some(MEMBER_PAGE_SIZE), after)
            .await?;

        holders.extend(
            page.iter()
                .filter(|member| !member.user.bot && member.roles.contains(&role_id))
                .map(|member| MemberId::from(member.user.id)),
        );

        after = page.last().map(|member| member.user.id);
        if (page.len() as u64) < MEMBER_PAGE_SIZE {
            break;
        }
    }

    Ok(Some(ctx.ledger.reconcile(&holders).await?))
}
