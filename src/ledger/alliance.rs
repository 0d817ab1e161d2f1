//! Clan point economy.
//!
//! One schema covers both the clan-only ledger and the per-event ledger: a clan's own balance
//! lives in `balance`, and each event type it has points for gets an entry in `events`.

use super::error::{LedgerError, Result, SelectionKind};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

pub type AllianceDoc = IndexMap<String, ClanRecord>;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AllianceKey {
    pub clan: String,
    pub event_type: Option<String>,
}

impl AllianceKey {
    pub fn clan(clan: impl Into<String>) -> Self {
        Self {
            clan: clan.into(),
            event_type: None,
        }
    }

    pub fn event(clan: impl Into<String>, event_type: impl Into<String>) -> Self {
        Self {
            clan: clan.into(),
            event_type: Some(event_type.into()),
        }
    }
}

impl std::fmt::Display for AllianceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match &self.event_type {
            Some(event_type) => write!(f, "{} ({})", self.clan, event_type),
            None => write!(f, "{}", self.clan),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClanRecord {
    #[serde(default)]
    pub balance: u64,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub events: IndexMap<String, u64>,
}

impl ClanRecord {
    pub fn get(&self, event_type: Option<&str>) -> u64 {
        match event_type {
            Some(event_type) => self.events.get(event_type).copied().unwrap_or(0),
            None => self.balance,
        }
    }

    pub fn set(&mut self, event_type: Option<&str>, value: u64) {
        match event_type {
            Some(event_type) => {
                self.events.insert(event_type.to_owned(), value);
            }
            None => self.balance = value,
        }
    }
}

/// Clans and event types operations may name.
#[derive(Debug, Clone, Default)]
pub struct AllowList {
    pub clans: Vec<String>,
    pub event_types: Vec<String>,
}

impl AllowList {
    pub fn validate(&self, key: &AllianceKey) -> Result<()> {
        if !self.clans.contains(&key.clan) {
            return Err(LedgerError::InvalidSelection {
                kind: SelectionKind::Clan,
                value: key.clan.clone(),
            });
        }

        match &key.event_type {
            Some(event_type) if !self.event_types.contains(event_type) => {
                Err(LedgerError::InvalidSelection {
                    kind: SelectionKind::EventType,
                    value: event_type.clone(),
                })
            }
            _ => Ok(()),
        }
    }

    pub fn validate_event_type(&self, event_type: &str) -> Result<()> {
        if self.event_types.iter().any(|e| e == event_type) {
            Ok(())
        } else {
            Err(LedgerError::InvalidSelection {
                kind: SelectionKind::EventType,
                value: event_type.to_owned(),
            })
        }
    }
}
