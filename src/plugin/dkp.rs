use crate::{
    config::Config,
    context::Context,
    event::{Event, EventHandled},
    helper::{mention, CommandHelper},
    ledger::{Holding, LedgerError, MemberId, Scope, Standing},
    log_internal,
    logging::{Points, PrintColor},
    plugin::{amount_option, member_option, reject, require_officer, Plugin},
};
use anyhow::Result;
use serenity::all::{CommandInteraction, CommandOptionType, CreateCommand, CreateCommandOption};

/// Award, correct, cancel, show and rank member DKP
pub struct Dkp;

#[derive(Clone, Copy)]
enum Change {
    /// Award; counts towards monthly history
    Add,
    /// Correction; history untouched
    Remove,
    /// Undo an award, including its history
    Cancel,
}

#[serenity::async_trait]
impl Plugin for Dkp {
    fn name(&self) -> &'static str {
        "dkp"
    }

    async fn usage(&self, _ctx: &Context) -> Option<String> {
        Some(
            "/dkp_add <member> <amount> - award DKP (officer)\n\
             /dkp_remove <member> <amount> - correct DKP down, monthly history untouched (officer)\n\
             /dkp_cancel <member> <amount> - undo an award, including monthly history (officer)\n\
             /dkp_show [member] - show current DKP, yours if no member given\n\
             /dkp_leaderboard [time_frame] - overall, month or last_month standings (officer)"
                .to_owned(),
        )
    }

    fn commands(&self, _cfg: &Config) -> Vec<CreateCommand> {
        let adjust = |name: &str, description: &str, member: &str, amount: &str| {
            CreateCommand::new(name)
                .description(description)
                .add_option(member_option("member", member).required(true))
                .add_option(amount_option(amount, 0))
        };

        vec![
            adjust(
                "dkp_add",
                "Add DKP to a guild member.",
                "The member to add DKP to.",
                "The amount of DKP to add.",
            ),
            adjust(
                "dkp_remove",
                "Remove DKP from a guild member.",
                "The member to remove DKP from.",
                "The amount of DKP to remove.",
            ),
            adjust(
                "dkp_cancel",
                "Cancel DKP previously added to a guild member.",
                "The member to cancel DKP for.",
                "The amount of DKP to cancel.",
            ),
            CreateCommand::new("dkp_show")
                .description("Show the current DKP of a guild member.")
                .add_option(member_option(
                    "member",
                    "The member whose DKP to view (optional).",
                )),
            CreateCommand::new("dkp_leaderboard")
                .description("Show the DKP leaderboard.")
                .add_option(
                    CreateCommandOption::new(
                        CommandOptionType::String,
                        "time_frame",
                        "Time frame for the leaderboard (default: overall).",
                    )
                    .add_string_choice("overall", "overall")
                    .add_string_choice("month", "month")
                    .add_string_choice("last month", "last_month"),
                ),
        ]
    }

    async fn handle(&self, ctx: &Context, event: &Event) -> Result<EventHandled> {
        let Some(command) = event.is_slash_cmd() else {
            return Ok(EventHandled::No);
        };

        match command.data.name.as_str() {
            "dkp_add" => change(ctx, command, Change::Add).await,
            "dkp_remove" => change(ctx, command, Change::Remove).await,
            "dkp_cancel" => change(ctx, command, Change::Cancel).await,
            "dkp_show" => show(ctx, command).await,
            "dkp_leaderboard" => leaderboard(ctx, command).await,
            _ => Ok(EventHandled::No),
        }
    }
}

async fn change(
    ctx: &Context<'_>,
    command: &CommandInteraction,
    change: Change,
) -> Result<EventHandled> {
    if !require_officer(ctx, command).await? {
        return Ok(EventHandled::Yes);
    }

    let (Some(user), Some(amount)) = (
        command.user_option("member"),
        command.integer_option("amount"),
    ) else {
        command
            .reply_ephemeral(ctx, "Both `member` and `amount` are required.")
            .await?;
        return Ok(EventHandled::Yes);
    };

    let member = MemberId::from(user.id);
    let result = match change {
        Change::Add => ctx.ledger.credit(&member, amount).await,
        Change::Remove => ctx.ledger.debit(&member, amount).await,
        Change::Cancel => ctx.ledger.cancel(&member, amount).await,
    };

    let balance = match result {
        Ok(balance) => balance,
        Err(LedgerError::InsufficientFunds { balance, .. }) => {
            command
                .reply_ephemeral(
                    ctx,
                    &format!(
                        "You can't remove more DKP than {} has. Current DKP: {}",
                        mention(&member),
                        balance
                    ),
                )
                .await?;
            return Ok(EventHandled::Yes);
        }
        Err(err) => return reject(ctx, command, err).await,
    };

    let (logged, replied) = match change {
        Change::Add => ("added", format!("Added {} DKP to", amount)),
        Change::Remove => ("removed", format!("Removed {} DKP from", amount)),
        Change::Cancel => ("canceled", format!("Canceled {} DKP from", amount)),
    };

    log_internal!(
        "{} {} {} DKP for {}. New DKP: {}",
        command.user.color(),
        logged,
        Points(amount).color(),
        user.color(),
        Points(balance).color()
    );

    command
        .reply(
            ctx,
            &format!("{} {}. Current DKP: {}", replied, mention(&member), balance),
        )
        .await?;
    Ok(EventHandled::Yes)
}

async fn show(ctx: &Context<'_>, command: &CommandInteraction) -> Result<EventHandled> {
    let target = command.user_option("member");
    let member = MemberId::from(target.map_or(command.user.id, |user| user.id));

    let holding = match ctx.ledger.lookup(&member).await {
        Ok(holding) => holding,
        Err(err) => return reject(ctx, command, err).await,
    };

    let whose = match target {
        Some(_) => format!("{}'s", mention(&member)),
        None => "your".to_owned(),
    };

    command
        .reply(
            ctx,
            &format!(
                "{}, {}",
                mention(&MemberId::from(command.user.id)),
                describe_holding(&whose, holding)
            ),
        )
        .await?;
    Ok(EventHandled::Yes)
}

async fn leaderboard(ctx: &Context<'_>, command: &CommandInteraction) -> Result<EventHandled> {
    if !require_officer(ctx, command).await? {
        return Ok(EventHandled::Yes);
    }

    let scope = match command.string_option("time_frame") {
        None => Scope::Overall,
        Some(time_frame) => match time_frame.parse::<Scope>() {
            Ok(scope) => scope,
            Err(()) => {
                command
                    .reply_ephemeral(
                        ctx,
                        &format!(
                            "Unknown time frame `{}`; use overall, month or last_month.",
                            time_frame
                        ),
                    )
                    .await?;
                return Ok(EventHandled::Yes);
            }
        },
    };

    let standings = match ctx.ledger.leaderboard(scope).await {
        Ok(standings) => standings,
        Err(err) => return reject(ctx, command, err).await,
    };

    let current = ctx.ledger.current_month();
    let period = match scope {
        Scope::Overall => None,
        Scope::CurrentMonth => Some(current.to_string()),
        Scope::LastMonth => current.previous().map(|month| month.to_string()),
    };
    let max_entries = ctx.cfg.read().await.leaderboard.max_entries;

    command
        .reply(
            ctx,
            &render_leaderboard(scope.title(), period.as_deref(), &standings, max_entries),
        )
        .await?;
    Ok(EventHandled::Yes)
}

fn describe_holding(whose: &str, holding: Holding) -> String {
    match holding {
        Holding::Active(balance) => format!("{} current DKP is: {}", whose, balance),
        Holding::Unknown => format!("{} current DKP is: 0", whose),
        Holding::Archived(balance) => format!(
            "{} DKP is archived: {}. It comes back with the tracked role.",
            whose, balance
        ),
    }
}

fn render_leaderboard(
    title: &str,
    period: Option<&str>,
    standings: &[Standing],
    max_entries: usize,
) -> String {
    let mut response = match period {
        Some(period) => format!("**{} DKP Leaderboard ({}):**\n", title, period),
        None => format!("**{} DKP Leaderboard:**\n", title),
    };

    if standings.is_empty() {
        response.push_str("No DKP recorded yet.");
        return response;
    }

    let lines: Vec<String> = standings
        .iter()
        .take(max_entries)
        .enumerate()
        .map(|(i, standing)| format!("{}. {}: {}", i + 1, mention(&standing.key), standing.points))
        .collect();
    response.push_str(&lines.join("\n"));

    if standings.len() > max_entries {
        response.push_str(&format!("\n…and {} more", standings.len() - max_entries));
    }

    response
}
