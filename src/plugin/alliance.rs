use crate::{
    config::Config,
    context::Context,
    event::{Event, EventHandled},
    helper::CommandHelper,
    ledger::{AllianceKey, LedgerError, Standing},
    log_internal,
    logging::{Points, PrintColor},
    plugin::{amount_option, reject, require_officer, Plugin},
};
use anyhow::Result;
use serenity::all::{CommandInteraction, CommandOptionType, CreateCommand, CreateCommandOption};

/// Discord's limit on choices per option
const MAX_CHOICES: usize = 25;

/// Points for allied clans, optionally per event type
pub struct Alliance;

#[serenity::async_trait]
impl Plugin for Alliance {
    fn name(&self) -> &'static str {
        "alliance"
    }

    async fn usage(&self, _ctx: &Context) -> Option<String> {
        Some(
            "/alliance_add <clan> <amount> [event] - award points to a clan (officer)\n\
             /alliance_remove <clan> <amount> [event] - take points from a clan (officer)\n\
             /alliance_show <clan> [event] - show a clan's points\n\
             /alliance_leaderboard [event] - rank all clans"
                .to_owned(),
        )
    }

    fn commands(&self, cfg: &Config) -> Vec<CreateCommand> {
        let clan = || {
            cfg.alliance
                .clans
                .iter()
                .take(MAX_CHOICES)
                .fold(
                    CreateCommandOption::new(CommandOptionType::String, "clan", "The clan.")
                        .required(true),
                    |option, clan| option.add_string_choice(clan, clan),
                )
        };
        let event = || {
            cfg.alliance.event_types.iter().take(MAX_CHOICES).fold(
                CreateCommandOption::new(
                    CommandOptionType::String,
                    "event",
                    "The event type (optional).",
                ),
                |option, event_type| option.add_string_choice(event_type, event_type),
            )
        };

        vec![
            CreateCommand::new("alliance_add")
                .description("Add points to an allied clan.")
                .add_option(clan())
                .add_option(amount_option("The amount of points to add.", 0))
                .add_option(event()),
            CreateCommand::new("alliance_remove")
                .description("Remove points from an allied clan.")
                .add_option(clan())
                .add_option(amount_option("The amount of points to remove.", 0))
                .add_option(event()),
            CreateCommand::new("alliance_show")
                .description("Show an allied clan's points.")
                .add_option(clan())
                .add_option(event()),
            CreateCommand::new("alliance_leaderboard")
                .description("Rank the allied clans.")
                .add_option(event()),
        ]
    }

    async fn handle(&self, ctx: &Context, event: &Event) -> Result<EventHandled> {
        let Some(command) = event.is_slash_cmd() else {
            return Ok(EventHandled::No);
        };

        match command.data.name.as_str() {
            "alliance_add" => change(ctx, command, true).await,
            "alliance_remove" => change(ctx, command, false).await,
            "alliance_show" => show(ctx, command).await,
            "alliance_leaderboard" => leaderboard(ctx, command).await,
            _ => Ok(EventHandled::No),
        }
    }
}

fn key(command: &CommandInteraction) -> Option<AllianceKey> {
    let clan = command.string_option("clan")?;
    Some(AllianceKey {
        clan: clan.to_owned(),
        event_type: command.string_option("event").map(str::to_owned),
    })
}

async fn change(ctx: &Context<'_>, command: &CommandInteraction, add: bool) -> Result<EventHandled> {
    if !require_officer(ctx, command).await? {
        return Ok(EventHandled::Yes);
    }

    let (Some(key), Some(amount)) = (key(command), command.integer_option("amount")) else {
        command
            .reply_ephemeral(ctx, "Both `clan` and `amount` are required.")
            .await?;
        return Ok(EventHandled::Yes);
    };

    let result = if add {
        ctx.ledger.alliance_credit(&key, amount).await
    } else {
        ctx.ledger.alliance_debit(&key, amount).await
    };
    let balance = match result {
        Ok(balance) => balance,
        Err(LedgerError::InsufficientFunds { balance, .. }) => {
            command
                .reply_ephemeral(
                    ctx,
                    &format!(
                        "You can't remove more points than {} has. Current points: {}",
                        key, balance
                    ),
                )
                .await?;
            return Ok(EventHandled::Yes);
        }
        Err(err) => return reject(ctx, command, err).await,
    };

    log_internal!(
        "{} {} {} points for {}. New points: {}",
        command.user.color(),
        if add { "added" } else { "removed" },
        Points(amount).color(),
        key.color(),
        Points(balance).color()
    );

    let replied = if add {
        format!("Added {} points to", amount)
    } else {
        format!("Removed {} points from", amount)
    };
    command
        .reply(
            ctx,
            &format!("{} {}. Current points: {}", replied, key, balance),
        )
        .await?;
    Ok(EventHandled::Yes)
}

async fn show(ctx: &Context<'_>, command: &CommandInteraction) -> Result<EventHandled> {
    let Some(key) = key(command) else {
        command.reply_ephemeral(ctx, "`clan` is required.").await?;
        return Ok(EventHandled::Yes);
    };

    let balance = match ctx.ledger.alliance_query(&key).await {
        Ok(balance) => balance,
        Err(err) => return reject(ctx, command, err).await,
    };

    command
        .reply(ctx, &format!("{} current points: {}", key, balance))
        .await?;
    Ok(EventHandled::Yes)
}

async fn leaderboard(ctx: &Context<'_>, command: &CommandInteraction) -> Result<EventHandled> {
    let event_type = command.string_option("event");

    let standings = match ctx.ledger.alliance_standings(event_type).await {
        Ok(standings) => standings,
        Err(err) => return reject(ctx, command, err).await,
    };

    let max_entries = ctx.cfg.read().await.leaderboard.max_entries;

    command
        .reply(ctx, &render_standings(event_type, &standings, max_entries))
        .await?;
    Ok(EventHandled::Yes)
}

fn render_standings(
    event_type: Option<&str>,
    standings: &[Standing<String>],
    max_entries: usize,
) -> String {
    let mut response = match event_type {
        Some(event_type) => format!("**Alliance Leaderboard ({}):**\n", event_type),
        None => "**Alliance Leaderboard:**\n".to_owned(),
    };

    if standings.is_empty() {
        response.push_str("No clans are configured.");
        return response;
    }

    let lines: Vec<String> = standings
        .iter()
        .take(max_entries)
        .enumerate()
        .map(|(i, standing)| format!("{}. {}: {}", i + 1, standing.key, standing.points))
        .collect();
    response.push_str(&lines.join("\n"));

    if standings.len() > max_entries {
        response.push_str(&format!("\n…and {} more", standings.len() - max_entries));
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standings_render_per_event() {
        let standings = vec![
            Standing {
                key: "Ravens".to_owned(),
                points: 9,
            },
            Standing {
                key: "Wolves".to_owned(),
                points: 0,
            },
        ];

        assert_eq!(
            render_standings(Some("Siege"), &standings, 10),
            "**Alliance Leaderboard (Siege):**\n1. Ravens: 9\n2. Wolves: 0"
        );
        assert_eq!(
            render_standings(None, &[], 10),
            "**Alliance Leaderboard:**\nNo clans are configured."
        );
    }

    #[test]
    fn standings_are_capped() {
        let standings: Vec<_> = ["Ravens", "Wolves", "Bears"]
            .into_iter()
            .map(|clan| Standing {
                key: clan.to_owned(),
                points: 1,
            })
            .collect();

        assert_eq!(
            render_standings(None, &standings, 2),
            "**Alliance Leaderboard:**\n1. Ravens: 1\n2. Wolves: 1\n…and 1 more"
        );
    }
}
