use crate::ledger::AllowList;
use anyhow::{anyhow, Result};
use serenity::all::{ChannelId, GuildId};
use std::path::{Path, PathBuf};
use tokio::io::AsyncReadExt;

const CONFIG_PATH_REL_HOME: &str = ".config/dkpbot/config.toml";
const DATA_DIR_REL_HOME: &str = ".config/dkpbot/data";
/// Overrides the configuration location, e.g. when running several bots on one host.
const CONFIG_PATH_ENV: &str = "DKPBOT_CONFIG";

/// Bot configuration
#[derive(serde::Serialize, serde::Deserialize)]
pub struct Config {
    pub general: General,
    #[serde(default)]
    pub storage: Storage,
    #[serde(default)]
    pub leaderboard: Leaderboard,
    #[serde(default)]
    pub alliance: Alliance,
}

#[derive(serde::Serialize, serde::Deserialize)]
pub struct General {
    pub discord_token: String,
    /// The only guild commands are answered in
    pub guild_id: u64,
    /// Global usernames allowed to reload the configuration
    #[serde(default)]
    pub bot_owners: Vec<String>,
    /// Role name required to change balances
    pub officer_role: String,
    /// Role name whose holders have a live balance
    pub tracked_role: String,
    /// Channels commands are accepted in.  Empty means any channel.
    #[serde(default)]
    pub command_channels: Vec<u64>,
    #[serde(default = "default_true")]
    pub log_commands: bool,
}

#[derive(Default, serde::Serialize, serde::Deserialize)]
pub struct Storage {
    pub data_dir: Option<PathBuf>,
}

#[derive(serde::Serialize, serde::Deserialize)]
pub struct Leaderboard {
    pub max_entries: usize,
}

#[derive(Default, serde::Serialize, serde::Deserialize)]
pub struct Alliance {
    #[serde(default)]
    pub clans: Vec<String>,
    #[serde(default)]
    pub event_types: Vec<String>,
}

impl Default for Leaderboard {
    fn default() -> Self {
        Self { max_entries: 25 }
    }
}

fn default_true() -> bool {
    true
}

impl Config {
    fn config_path() -> Result<PathBuf> {
        if let Some(path) = std::env::var_os(CONFIG_PATH_ENV) {
            return Ok(PathBuf::from(path));
        }

        dirs::home_dir()
            .map(|p| p.join(CONFIG_PATH_REL_HOME))
            .ok_or(anyhow!("Could not find home directory"))
    }

    pub async fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?).await
    }

    pub async fn load_from(path: &Path) -> Result<Self> {
        let mut file = tokio::fs::File::open(path).await.map_err(|e| {
            anyhow!(
                "Could not open configuration at `{}`: {}",
                path.to_string_lossy(),
                e
            )
        })?;

        let mut contents = String::new();
        file.read_to_string(&mut contents).await.map_err(|e| {
            anyhow!(
                "Could not read configuration at `{}`: {}",
                path.to_string_lossy(),
                e
            )
        })?;

        Self::parse(&contents).map_err(|e| {
            anyhow!(
                "Could not parse configuration at `{}`: {}",
                path.to_string_lossy(),
                e
            )
        })
    }

    pub fn parse(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;

        // Discord ids are never zero, and serenity panics on constructing one.
        if config.general.guild_id == 0 || config.general.command_channels.contains(&0) {
            return Err(anyhow!("Discord ids in `general` must be non-zero"));
        }

        if config.leaderboard.max_entries == 0 {
            return Err(anyhow!("`leaderboard.max_entries` must be at least 1"));
        }

        Ok(config)
    }

    pub async fn reload(&mut self) -> Result<()> {
        let new = Self::load().await?;
        *self = new;
        Ok(())
    }

    pub fn data_dir(&self) -> Result<PathBuf> {
        match &self.storage.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => dirs::home_dir()
                .map(|p| p.join(DATA_DIR_REL_HOME))
                .ok_or(anyhow!("Could not find home directory")),
        }
    }

    pub fn guild_id(&self) -> GuildId {
        GuildId::new(self.general.guild_id)
    }

    pub fn command_channels(&self) -> Vec<ChannelId> {
        self.general
            .command_channels
            .iter()
            .map(|id| ChannelId::new(*id))
            .collect()
    }

    pub fn allow_list(&self) -> AllowList {
        AllowList {
            clans: self.alliance.clans.clone(),
            event_types: self.alliance.event_types.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        [general]
        discord_token = "token"
        guild_id = 1234
        officer_role = "Officer"
        tracked_role = "Member"
    "#;

    #[test]
    fn minimal_config_uses_defaults() {
        let cfg = Config::parse(MINIMAL).unwrap();
        assert_eq!(cfg.guild_id(), GuildId::new(1234));
        assert!(cfg.command_channels().is_empty());
        assert!(cfg.general.log_commands);
        assert_eq!(cfg.leaderboard.max_entries, 25);
        assert!(cfg.allow_list().clans.is_empty());
        assert!(cfg.storage.data_dir.is_none());
    }

    #[test]
    fn full_config() {
        let cfg = Config::parse(
            r#"
            [general]
            discord_token = "token"
            guild_id = 1234
            bot_owners = ["owner"]
            officer_role = "Officer"
            tracked_role = "Member"
            command_channels = [55, 66]
            log_commands = false

            [storage]
            data_dir = "/tmp/dkp"

            [leaderboard]
            max_entries = 10

            [alliance]
            clans = ["Wolves"]
            event_types = ["Siege", "Boss"]
            "#,
        )
        .unwrap();

        assert_eq!(
            cfg.command_channels(),
            [ChannelId::new(55), ChannelId::new(66)]
        );
        assert_eq!(cfg.data_dir().unwrap(), PathBuf::from("/tmp/dkp"));
        assert_eq!(cfg.allow_list().event_types, ["Siege", "Boss"]);
        assert_eq!(cfg.leaderboard.max_entries, 10);
    }

    #[test]
    fn zero_guild_rejected() {
        let contents = MINIMAL.replace("1234", "0");
        assert!(Config::parse(&contents).is_err());
    }

    #[test]
    fn empty_leaderboard_rejected() {
        let contents = format!("{}\n[leaderboard]\nmax_entries = 0\n", MINIMAL);
        assert!(Config::parse(&contents).is_err());
    }
}
