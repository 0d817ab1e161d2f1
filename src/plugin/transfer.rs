use crate::{
    config::Config,
    context::Context,
    event::{Event, EventHandled},
    helper::{mention, CommandHelper},
    ledger::{LedgerError, MemberId},
    log_internal,
    logging::{Points, PrintColor},
    plugin::{amount_option, member_option, reject, Plugin},
};
use anyhow::Result;
use serenity::all::CreateCommand;

/// Members sending their own DKP to each other
pub struct Transfer;

#[serenity::async_trait]
impl Plugin for Transfer {
    fn name(&self) -> &'static str {
        "dkp_transfer"
    }

    async fn usage(&self, _ctx: &Context) -> Option<String> {
        Some(format!(
            "/{} <receiver> <amount> - give some of your DKP to another member",
            self.name()
        ))
    }

    fn commands(&self, _cfg: &Config) -> Vec<CreateCommand> {
        vec![CreateCommand::new(self.name())
            .description("Transfer some of your DKP to another member.")
            .add_option(member_option("receiver", "The member to receive the DKP.").required(true))
            .add_option(amount_option("The amount of DKP to transfer.", 1))]
    }

    async fn handle(&self, ctx: &Context, event: &Event) -> Result<EventHandled> {
        let Some(command) = event.is_slash_cmd() else {
            return Ok(EventHandled::No);
        };
        if command.data.name != self.name() {
            return Ok(EventHandled::No);
        }

        let sender = MemberId::from(command.user.id);
        let Some(receiver_user) = command.user_option("receiver") else {
            return reject(ctx, command, LedgerError::UnknownIdentity("receiver".to_owned())).await;
        };
        let receiver = MemberId::from(receiver_user.id);
        let amount = command.integer_option("amount").unwrap_or(0);

        let moved = match ctx.ledger.transfer(&sender, &receiver, amount).await {
            Ok(moved) => moved,
            Err(LedgerError::InsufficientFunds { balance, .. }) => {
                command
                    .reply_ephemeral(
                        ctx,
                        &format!("You only have {} DKP to transfer.", balance),
                    )
                    .await?;
                return Ok(EventHandled::Yes);
            }
            Err(err) => return reject(ctx, command, err).await,
        };

        log_internal!(
            "{} transferred {} DKP to {}. New DKP: {} / {}",
            command.user.color(),
            Points(amount).color(),
            receiver_user.color(),
            Points(moved.sender_balance).color(),
            Points(moved.receiver_balance).color(),
        );

        command
            .reply(
                ctx,
                &format!(
                    "{} transferred {} DKP to {}. Their DKP: {}, yours: {}",
                    mention(&sender),
                    amount,
                    mention(&receiver),
                    moved.receiver_balance,
                    moved.sender_balance,
                ),
            )
            .await?;
        Ok(EventHandled::Yes)
    }
}
