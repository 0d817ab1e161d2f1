//! Colored terminal log lines.  Each line starts with a marker: `*` for something Discord told
//! us, `+` for a change the bot made to the ledger, `!` for a failure.

use crate::ledger::{AllianceKey, MemberId};
use serenity::all::{ChannelId, CurrentUser, GuildId, Http, User};
use std::io::IsTerminal;
use std::sync::{Arc, LazyLock};

static STDOUT_IS_TERMINAL: LazyLock<bool> = LazyLock::new(|| std::io::stdout().is_terminal());

#[derive(Debug, Clone, Copy)]
pub enum Color {
    Reset,
    Event,
    Internal,
    Error,
    Member,
    Clan,
    Points,
    Channel,
    Guild,
    Glue,
}

impl Color {
    fn code(self) -> &'static str {
        match self {
            Color::Reset => "\x1b[0m",
            Color::Event => "\x1b[33m",
            Color::Internal => "\x1b[35m",
            Color::Error => "\x1b[31m",
            Color::Member => "\x1b[32m",
            Color::Clan => "\x1b[38;5;208m",
            Color::Points => "\x1b[1m",
            Color::Channel => "\x1b[36m",
            Color::Guild => "\x1b[38;5;33m",
            Color::Glue => "\x1b[90m",
        }
    }

    /// `text` wrapped in this color, or bare when stdout isn't a terminal.
    pub fn paint(self, text: impl std::fmt::Display) -> String {
        if *STDOUT_IS_TERMINAL {
            format!("{}{}{}", self.code(), text, Color::Reset.code())
        } else {
            text.to_string()
        }
    }
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        if *STDOUT_IS_TERMINAL {
            f.write_str(self.code())
        } else {
            Ok(())
        }
    }
}

/// Something happened on Discord
#[macro_export]
macro_rules! log_event {
    ($fmtstr:expr $(, $($args:tt)*)?) => {
        println!(
            concat!("{}*{} ", $fmtstr),
            $crate::logging::Color::Event,
            $crate::logging::Color::Reset
            $(, $($args)*)?
        )
    };
}

/// The bot changed something, usually a balance
#[macro_export]
macro_rules! log_internal {
    ($fmtstr:expr $(, $($args:tt)*)?) => {
        println!(
            concat!("{}+{} ", $fmtstr),
            $crate::logging::Color::Internal,
            $crate::logging::Color::Reset
            $(, $($args)*)?
        )
    };
}

#[macro_export]
macro_rules! log_error {
    ($fmtstr:expr $(, $($args:tt)*)?) => {
        eprintln!(
            concat!("{}!{} ", $fmtstr),
            $crate::logging::Color::Error,
            $crate::logging::Color::Reset
            $(, $($args)*)?
        )
    };
}

pub trait PrintColor {
    fn color(&self) -> String;
}

/// For things whose display name needs a round trip to Discord
#[serenity::async_trait]
pub trait AsyncPrintColor {
    async fn color(&self, http: &Arc<Http>) -> String;
}

/// Field separator
pub struct Glue;

impl PrintColor for Glue {
    fn color(&self) -> String {
        Color::Glue.paint(':')
    }
}

/// A point amount or balance
pub struct Points<T>(pub T);

impl<T: std::fmt::Display> PrintColor for Points<T> {
    fn color(&self) -> String {
        Color::Points.paint(&self.0)
    }
}

impl PrintColor for CurrentUser {
    fn color(&self) -> String {
        Color::Member.paint(&self.name)
    }
}

impl PrintColor for User {
    fn color(&self) -> String {
        Color::Member.paint(&self.name)
    }
}

/// Members we only know by id, e.g. archive entries
impl PrintColor for MemberId {
    fn color(&self) -> String {
        Color::Member.paint(self)
    }
}

impl PrintColor for AllianceKey {
    fn color(&self) -> String {
        Color::Clan.paint(self)
    }
}

#[serenity::async_trait]
impl AsyncPrintColor for ChannelId {
    async fn color(&self, http: &Arc<Http>) -> String {
        match self.name(http).await {
            Ok(name) => Color::Channel.paint(format!("#{}", name)),
            Err(_) => Color::Channel.paint("<unknown-channel>"),
        }
    }
}

#[serenity::async_trait]
impl AsyncPrintColor for Option<GuildId> {
    async fn color(&self, http: &Arc<Http>) -> String {
        let Some(guild_id) = self else {
            return Color::Guild.paint("<direct-message>");
        };

        match guild_id.to_partial_guild(http).await {
            Ok(guild) => Color::Guild.paint(guild.name),
            Err(_) => Color::Guild.paint(guild_id),
        }
    }
}
