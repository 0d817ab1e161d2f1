//! Miscellaneous convenience methods

use crate::{context::Context, ledger::MemberId};
use anyhow::Result;
use serenity::all::{
    CommandInteraction, CreateInteractionResponse, CreateInteractionResponseMessage, GuildId,
    ResolvedOption, ResolvedValue, RoleId, User, UserId,
};

impl From<UserId> for MemberId {
    fn from(id: UserId) -> Self {
        MemberId::new(id.to_string())
    }
}

/// Discord markup that pings the member
pub fn mention(member: &MemberId) -> String {
    format!("<@{}>", member)
}

/// Look up a role by its display name, preferring the cache.
pub async fn find_role(ctx: &Context<'_>, guild_id: GuildId, name: &str) -> Result<Option<RoleId>> {
    // The cache reference must not be held across an await.
    let cached = ctx.cache.guild(guild_id).and_then(|guild| {
        guild
            .roles
            .values()
            .find(|role| role.name == name)
            .map(|role| role.id)
    });
    if cached.is_some() {
        return Ok(cached);
    }

    let roles = guild_id.roles(ctx.http).await?;
    Ok(roles
        .values()
        .find(|role| role.name == name)
        .map(|role| role.id))
}

#[serenity::async_trait]
pub trait CommandHelper {
    async fn reply(&self, ctx: &Context, content: &str) -> Result<()>;
    /// Reply visible only to the invoking user
    async fn reply_ephemeral(&self, ctx: &Context, content: &str) -> Result<()>;
    async fn is_from_officer(&self, ctx: &Context) -> Result<bool>;
    async fn is_from_owner(&self, ctx: &Context) -> bool;
    fn user_option(&self, name: &str) -> Option<&User>;
    fn integer_option(&self, name: &str) -> Option<i64>;
    fn string_option(&self, name: &str) -> Option<&str>;
}

#[serenity::async_trait]
impl CommandHelper for CommandInteraction {
    async fn reply(&self, ctx: &Context, content: &str) -> Result<()> {
        let message = CreateInteractionResponseMessage::new().content(content);
        self.create_response(ctx.cache_http, CreateInteractionResponse::Message(message))
            .await?;
        Ok(())
    }

    async fn reply_ephemeral(&self, ctx: &Context, content: &str) -> Result<()> {
        let message = CreateInteractionResponseMessage::new()
            .content(content)
            .ephemeral(true);
        self.create_response(ctx.cache_http, CreateInteractionResponse::Message(message))
            .await?;
        Ok(())
    }

    async fn is_from_officer(&self, ctx: &Context) -> Result<bool> {
        let (Some(guild_id), Some(member)) = (self.guild_id, &self.member) else {
            return Ok(false);
        };

        let officer_role = ctx.cfg.read().await.general.officer_role.clone();
        let Some(role_id) = find_role(ctx, guild_id, &officer_role).await? else {
            return Ok(false);
        };

        Ok(member.roles.contains(&role_id))
    }

    async fn is_from_owner(&self, ctx: &Context) -> bool {
        ctx.cfg
            .read()
            .await
            .general
            .bot_owners
            .contains(&self.user.name)
    }

    fn user_option(&self, name: &str) -> Option<&User> {
        find_option(self, name).and_then(|option| match option.value {
            ResolvedValue::User(user, _) => Some(user),
            _ => None,
        })
    }

    fn integer_option(&self, name: &str) -> Option<i64> {
        find_option(self, name).and_then(|option| match option.value {
            ResolvedValue::Integer(value) => Some(value),
            _ => None,
        })
    }

    fn string_option(&self, name: &str) -> Option<&str> {
        find_option(self, name).and_then(|option| match option.value {
            ResolvedValue::String(value) => Some(value),
            _ => None,
        })
    }
}

fn find_option<'a>(command: &'a CommandInteraction, name: &str) -> Option<ResolvedOption<'a>> {
    command
        .data
        .options()
        .into_iter()
        .find(|option| option.name == name)
}
