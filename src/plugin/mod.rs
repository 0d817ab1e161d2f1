use crate::{
    config::Config,
    context::Context,
    event::{Event, EventHandled},
    helper::{mention, CommandHelper},
    ledger::LedgerError,
};
use anyhow::Result;
use serenity::all::{CommandInteraction, CommandOptionType, CreateCommand, CreateCommandOption};

mod alliance;
mod archive;
mod debug;
mod dkp;
mod help;
mod membership;
mod ready;
mod reload;
mod restrict;
mod transfer;

#[serenity::async_trait]
pub trait Plugin: Sync + Send {
    /// Plugin name.  Used for debug
    fn name(&self) -> &'static str;
    /// Help message line(s).  None if no help message
    async fn usage(&self, ctx: &Context) -> Option<String>;
    /// Slash commands to register with Discord
    fn commands(&self, _cfg: &Config) -> Vec<CreateCommand> {
        Vec::new()
    }
    /// Potentially handle event.  Returns:
    /// - Ok(EventHandled::Yes) if the event has been handled and no other plugin should attempt to
    /// handle it
    /// - Ok(EventHandled::No) if another plugin should attempt to handle the event
    /// - Err if an error occurred
    async fn handle(&self, ctx: &Context, event: &Event) -> Result<EventHandled>;
}

/// Ordered list of available plugins
pub fn plugins() -> Vec<Box<dyn Plugin>> {
    vec![
        // Core bot operations
        Box::new(debug::Debug),
        Box::new(ready::Ready),
        // Slash commands below here only run in the configured guild and channels
        Box::new(restrict::Restrict),
        Box::new(membership::Membership),
        Box::new(help::Help),
        Box::new(reload::Reload),
        // Ledger
        Box::new(dkp::Dkp),
        Box::new(transfer::Transfer),
        Box::new(archive::Archive),
        Box::new(alliance::Alliance),
    ]
}

/// Tell the user why the ledger refused their request.  Storage failures are not the user's
/// doing and are passed up instead.
pub async fn reject(
    ctx: &Context<'_>,
    command: &CommandInteraction,
    err: LedgerError,
) -> Result<EventHandled> {
    let reason = match &err {
        LedgerError::InvalidAmount(amount) if *amount < 0 => {
            "Amount must be a non-negative integer.".to_owned()
        }
        LedgerError::InvalidAmount(0) => "Amount must be greater than zero.".to_owned(),
        LedgerError::InvalidAmount(amount) => format!("`{}` is too large.", amount),
        LedgerError::InsufficientFunds { balance, requested } => format!(
            "Not enough DKP: tried to take {} but only {} available.",
            requested, balance
        ),
        LedgerError::UnknownIdentity(_) => "I couldn't find that member.".to_owned(),
        LedgerError::InvalidSelection { kind, value } => {
            format!("`{}` is not a configured {}.", value, kind)
        }
        LedgerError::Archived { member, balance } => format!(
            "{} is archived with {} DKP; they need the tracked role back first.",
            mention(member),
            balance
        ),
        LedgerError::SelfReferenceDenied => "You can't transfer DKP to yourself.".to_owned(),
        LedgerError::Storage(_) => return Err(err.into()),
    };

    command.reply_ephemeral(ctx, &reason).await?;
    Ok(EventHandled::Yes)
}

/// Reply with a permission error unless the caller holds the officer role.  Returns whether the
/// command may proceed.
pub async fn require_officer(ctx: &Context<'_>, command: &CommandInteraction) -> Result<bool> {
    if command.is_from_officer(ctx).await? {
        return Ok(true);
    }

    command
        .reply_ephemeral(ctx, "You do not have permission to use this command.")
        .await?;
    Ok(false)
}

pub fn member_option(name: &str, description: &str) -> CreateCommandOption {
    CreateCommandOption::new(CommandOptionType::User, name, description)
}

pub fn amount_option(description: &str, min: u64) -> CreateCommandOption {
    CreateCommandOption::new(CommandOptionType::Integer, "amount", description)
        .required(true)
        .min_int_value(min)
}
