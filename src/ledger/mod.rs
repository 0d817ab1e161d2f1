//! Point ledger for guild members and allied clans.
//!
//! Four JSON documents back the ledger: live balances, per-month history, the archive of
//! departed members, and the alliance ledger.  Every operation loads the documents it needs,
//! validates, mutates and saves while holding their locks.  Lock order is always
//! balances → history → archive; the alliance store is independent.
//!
//! A member is in at most one of balances and archive.  Only the lifecycle operations move
//! them between the two; every other mutation refuses archived members.
//!
//! Each file is replaced atomically, but an operation touching several files saves them one
//! after another.  The file holding the points is saved last, so a failed save never loses
//! a balance; at worst a history trace is ahead of it.

pub mod alliance;
pub mod error;
pub mod leaderboard;
pub mod month;
pub mod store;

pub use alliance::{AllianceKey, AllowList};
pub use error::{LedgerError, Result};
pub use leaderboard::{Scope, Standing};
pub use month::{Clock, MonthKey};

use alliance::AllianceDoc;
use indexmap::IndexMap;
use leaderboard::{points, rank};
use serde::{Deserialize, Serialize};
use std::path::Path;
use store::StoreFile;
use tokio::sync::RwLock;

const BALANCES_FILE: &str = "dkp_data.json";
const HISTORY_FILE: &str = "leaderboard_data.json";
const ARCHIVE_FILE: &str = "archive_data.json";
const ALLIANCE_FILE: &str = "alliance_data.json";

/// Stable platform-assigned member identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemberId(String);

impl MemberId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for MemberId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

type Balances = IndexMap<MemberId, u64>;
type History = IndexMap<MemberId, IndexMap<MonthKey, i64>>;

/// Result of a member gaining the tracked role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Joined {
    /// First appearance; balance starts at zero.
    Created,
    /// Archived balance moved back into the ledger.
    Restored(u64),
    /// Already active; nothing changed.
    AlreadyActive(u64),
}

/// Result of a member losing the tracked role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Left {
    /// Balance moved into the archive.
    Archived(u64),
    /// The member had no live balance.
    NotActive,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Reconciled {
    pub created: usize,
    pub restored: usize,
    pub unchanged: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transfer {
    pub sender_balance: u64,
    pub receiver_balance: u64,
}

/// Where a member's points currently live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Holding {
    Active(u64),
    Archived(u64),
    Unknown,
}

#[derive(Default)]
struct Dirty {
    balances: bool,
    history: bool,
    archive: bool,
}

pub struct Ledger {
    balances: StoreFile<Balances>,
    history: StoreFile<History>,
    archive: StoreFile<Balances>,
    alliance: StoreFile<AllianceDoc>,
    allow_list: RwLock<AllowList>,
    clock: Clock,
}

impl Ledger {
    /// Open the stores under `dir`, creating empty documents for any that are missing.
    pub async fn open(dir: &Path, allow_list: AllowList, clock: Clock) -> Result<Self> {
        let ledger = Self {
            balances: StoreFile::new(dir.join(BALANCES_FILE)),
            history: StoreFile::new(dir.join(HISTORY_FILE)),
            archive: StoreFile::new(dir.join(ARCHIVE_FILE)),
            alliance: StoreFile::new(dir.join(ALLIANCE_FILE)),
            allow_list: RwLock::new(allow_list),
            clock,
        };

        ledger.balances.ensure_exists().await?;
        ledger.history.ensure_exists().await?;
        ledger.archive.ensure_exists().await?;
        ledger.alliance.ensure_exists().await?;

        Ok(ledger)
    }

    pub async fn set_allow_list(&self, allow_list: AllowList) {
        *self.allow_list.write().await = allow_list;
    }

    pub fn current_month(&self) -> MonthKey {
        self.clock.current_month()
    }

    //
    // Member ledger
    //

    /// Award points.  Also counted towards this month's history.
    pub async fn credit(&self, member: &MemberId, amount: i64) -> Result<u64> {
        let amount = non_negative(amount)?;
        let month = self.current_month();

        let mut balances = self.balances.lock().await?;
        let mut history = self.history.lock().await?;
        let archive = self.archive.lock().await?;
        ensure_active(&archive, member)?;

        let balance = balances
            .get(member)
            .copied()
            .unwrap_or(0)
            .checked_add(amount)
            .ok_or(LedgerError::InvalidAmount(points(amount)))?;
        let delta = checked_delta(&history, member, &month, points(amount))?;

        balances.insert(member.clone(), balance);
        set_delta(&mut history, member, month, delta);

        history.save().await?;
        balances.save().await?;
        Ok(balance)
    }

    /// Correct a balance downwards without touching history.
    pub async fn debit(&self, member: &MemberId, amount: i64) -> Result<u64> {
        let amount = non_negative(amount)?;

        let mut balances = self.balances.lock().await?;
        let archive = self.archive.lock().await?;
        ensure_active(&archive, member)?;
        let balance = withdraw(&balances, member, amount)?;

        balances.insert(member.clone(), balance);
        balances.save().await?;
        Ok(balance)
    }

    /// Reverse an award, including its trace in this month's history.
    pub async fn cancel(&self, member: &MemberId, amount: i64) -> Result<u64> {
        let amount = non_negative(amount)?;
        let month = self.current_month();

        let mut balances = self.balances.lock().await?;
        let mut history = self.history.lock().await?;
        let archive = self.archive.lock().await?;
        ensure_active(&archive, member)?;

        let balance = withdraw(&balances, member, amount)?;
        let delta = checked_delta(&history, member, &month, -points(amount))?;

        balances.insert(member.clone(), balance);
        set_delta(&mut history, member, month, delta);

        history.save().await?;
        balances.save().await?;
        Ok(balance)
    }

    /// Current balance, zero for identities never seen.
    pub async fn query(&self, member: &MemberId) -> Result<u64> {
        let balances = self.balances.lock().await?;
        Ok(balances.get(member).copied().unwrap_or(0))
    }

    /// Like [`Ledger::query`], but tells archived members apart from unknown ones.
    pub async fn lookup(&self, member: &MemberId) -> Result<Holding> {
        let balances = self.balances.lock().await?;
        if let Some(&balance) = balances.get(member) {
            return Ok(Holding::Active(balance));
        }

        let archive = self.archive.lock().await?;
        Ok(match archive.get(member) {
            Some(&balance) => Holding::Archived(balance),
            None => Holding::Unknown,
        })
    }

    pub async fn leaderboard(&self, scope: Scope) -> Result<Vec<Standing>> {
        match scope {
            Scope::Overall => {
                let balances = self.balances.lock().await?;
                Ok(rank(
                    balances
                        .iter()
                        .map(|(member, balance)| (member.clone(), points(*balance))),
                ))
            }
            Scope::CurrentMonth => Ok(rank(self.month_slice(&self.current_month()).await?)),
            Scope::LastMonth => {
                let current = self.current_month();
                let previous = current.previous().unwrap_or(current);
                Ok(rank(self.month_slice(&previous).await?))
            }
        }
    }

    //
    // Monthly history
    //

    /// Add `delta` to a member's figure for `month`.  Returns the new figure.
    pub async fn post_delta(&self, member: &MemberId, month: MonthKey, delta: i64) -> Result<i64> {
        let mut history = self.history.lock().await?;
        let archive = self.archive.lock().await?;
        ensure_active(&archive, member)?;

        let value = checked_delta(&history, member, &month, delta)?;
        set_delta(&mut history, member, month, value);
        history.save().await?;
        Ok(value)
    }

    /// Every member with history, with their figure for `month` (zero if none).
    pub async fn month_slice(&self, month: &MonthKey) -> Result<Vec<(MemberId, i64)>> {
        let history = self.history.lock().await?;
        Ok(history
            .iter()
            .map(|(member, months)| (member.clone(), months.get(month).copied().unwrap_or(0)))
            .collect())
    }

    //
    // Membership lifecycle
    //

    pub async fn archive_list(&self) -> Result<Vec<Standing>> {
        let archive = self.archive.lock().await?;
        Ok(rank(
            archive
                .iter()
                .map(|(member, balance)| (member.clone(), points(*balance))),
        ))
    }

    pub async fn member_joined(&self, member: &MemberId) -> Result<Joined> {
        let month = self.current_month();

        let mut balances = self.balances.lock().await?;
        let mut history = self.history.lock().await?;
        let mut archive = self.archive.lock().await?;

        let mut dirty = Dirty::default();
        let joined = join(
            &mut balances,
            &mut history,
            &mut archive,
            member,
            &month,
            &mut dirty,
        )?;

        if dirty.balances {
            balances.save().await?;
        }
        if dirty.history {
            history.save().await?;
        }
        if dirty.archive {
            archive.save().await?;
        }
        Ok(joined)
    }

    /// Move a departing member's balance to the archive.  Their monthly history is dropped.
    pub async fn member_left(&self, member: &MemberId) -> Result<Left> {
        let mut balances = self.balances.lock().await?;
        let mut history = self.history.lock().await?;
        let mut archive = self.archive.lock().await?;

        let Some(&balance) = balances.get(member) else {
            if history.shift_remove(member).is_some() {
                history.save().await?;
            }
            return Ok(Left::NotActive);
        };

        // A stale archive entry can only exist if the files were edited by hand.  Keep both.
        let archived = archive
            .get(member)
            .copied()
            .unwrap_or(0)
            .checked_add(balance)
            .ok_or(LedgerError::InvalidAmount(points(balance)))?;

        balances.shift_remove(member);
        history.shift_remove(member);
        archive.insert(member.clone(), archived);

        archive.save().await?;
        history.save().await?;
        balances.save().await?;
        Ok(Left::Archived(balance))
    }

    /// Apply [`Ledger::member_joined`] to every current role holder.  Running it again with the
    /// same holders changes nothing.
    pub async fn reconcile(&self, holders: &[MemberId]) -> Result<Reconciled> {
        let month = self.current_month();

        let mut balances = self.balances.lock().await?;
        let mut history = self.history.lock().await?;
        let mut archive = self.archive.lock().await?;

        let mut dirty = Dirty::default();
        let mut summary = Reconciled::default();
        for member in holders {
            match join(
                &mut balances,
                &mut history,
                &mut archive,
                member,
                &month,
                &mut dirty,
            )? {
                Joined::Created => summary.created += 1,
                Joined::Restored(_) => summary.restored += 1,
                Joined::AlreadyActive(_) => summary.unchanged += 1,
            }
        }

        if dirty.balances {
            balances.save().await?;
        }
        if dirty.history {
            history.save().await?;
        }
        if dirty.archive {
            archive.save().await?;
        }
        Ok(summary)
    }

    //
    // Peer transfer
    //

    pub async fn transfer(
        &self,
        sender: &MemberId,
        receiver: &MemberId,
        amount: i64,
    ) -> Result<Transfer> {
        if sender.as_str().is_empty() {
            return Err(LedgerError::UnknownIdentity(sender.to_string()));
        }
        if receiver.as_str().is_empty() {
            return Err(LedgerError::UnknownIdentity(receiver.to_string()));
        }

        // Both sides are applied under one lock and one save.
        let mut balances = self.balances.lock().await?;
        let archive = self.archive.lock().await?;
        ensure_active(&archive, sender)?;
        ensure_active(&archive, receiver)?;

        if sender == receiver {
            return Err(LedgerError::SelfReferenceDenied);
        }
        if amount <= 0 {
            return Err(LedgerError::InvalidAmount(amount));
        }
        let amount = amount.unsigned_abs();

        let sender_balance = withdraw(&balances, sender, amount)?;
        let receiver_balance = balances
            .get(receiver)
            .copied()
            .unwrap_or(0)
            .checked_add(amount)
            .ok_or(LedgerError::InvalidAmount(points(amount)))?;

        balances.insert(sender.clone(), sender_balance);
        balances.insert(receiver.clone(), receiver_balance);
        balances.save().await?;

        Ok(Transfer {
            sender_balance,
            receiver_balance,
        })
    }

    //
    // Alliance ledger
    //

    pub async fn alliance_credit(&self, key: &AllianceKey, amount: i64) -> Result<u64> {
        self.allow_list.read().await.validate(key)?;
        let amount = non_negative(amount)?;

        let mut alliance = self.alliance.lock().await?;
        let balance = alliance
            .get(&key.clan)
            .map(|clan| clan.get(key.event_type.as_deref()))
            .unwrap_or(0)
            .checked_add(amount)
            .ok_or(LedgerError::InvalidAmount(points(amount)))?;

        alliance
            .entry(key.clan.clone())
            .or_default()
            .set(key.event_type.as_deref(), balance);
        alliance.save().await?;
        Ok(balance)
    }

    pub async fn alliance_debit(&self, key: &AllianceKey, amount: i64) -> Result<u64> {
        self.allow_list.read().await.validate(key)?;
        let amount = non_negative(amount)?;

        let mut alliance = self.alliance.lock().await?;
        let current = alliance
            .get(&key.clan)
            .map(|clan| clan.get(key.event_type.as_deref()))
            .unwrap_or(0);
        if current < amount {
            return Err(LedgerError::InsufficientFunds {
                balance: current,
                requested: amount,
            });
        }

        let balance = current - amount;
        alliance
            .entry(key.clan.clone())
            .or_default()
            .set(key.event_type.as_deref(), balance);
        alliance.save().await?;
        Ok(balance)
    }

    pub async fn alliance_query(&self, key: &AllianceKey) -> Result<u64> {
        self.allow_list.read().await.validate(key)?;

        let alliance = self.alliance.lock().await?;
        Ok(alliance
            .get(&key.clan)
            .map(|clan| clan.get(key.event_type.as_deref()))
            .unwrap_or(0))
    }

    /// Every configured clan ranked by its balance, or by its balance for one event type.
    pub async fn alliance_standings(&self, event_type: Option<&str>) -> Result<Vec<Standing<String>>> {
        let allow_list = self.allow_list.read().await;
        if let Some(event_type) = event_type {
            allow_list.validate_event_type(event_type)?;
        }

        let alliance = self.alliance.lock().await?;
        Ok(rank(allow_list.clans.iter().map(|clan| {
            let balance = alliance
                .get(clan)
                .map(|record| record.get(event_type))
                .unwrap_or(0);
            (clan.clone(), points(balance))
        })))
    }
}

fn non_negative(amount: i64) -> Result<u64> {
    u64::try_from(amount).map_err(|_| LedgerError::InvalidAmount(amount))
}

fn ensure_active(archive: &Balances, member: &MemberId) -> Result<()> {
    match archive.get(member) {
        Some(&balance) => Err(LedgerError::Archived {
            member: member.clone(),
            balance,
        }),
        None => Ok(()),
    }
}

/// Balance after taking `amount` from `member`, or why that is not possible.
fn withdraw(balances: &Balances, member: &MemberId, amount: u64) -> Result<u64> {
    let balance = balances.get(member).copied().unwrap_or(0);
    if balance < amount {
        return Err(LedgerError::InsufficientFunds {
            balance,
            requested: amount,
        });
    }
    Ok(balance - amount)
}

fn checked_delta(history: &History, member: &MemberId, month: &MonthKey, delta: i64) -> Result<i64> {
    history
        .get(member)
        .and_then(|months| months.get(month))
        .copied()
        .unwrap_or(0)
        .checked_add(delta)
        .ok_or(LedgerError::InvalidAmount(delta))
}

fn set_delta(history: &mut History, member: &MemberId, month: MonthKey, value: i64) {
    history
        .entry(member.clone())
        .or_default()
        .insert(month, value);
}

fn join(
    balances: &mut Balances,
    history: &mut History,
    archive: &mut Balances,
    member: &MemberId,
    month: &MonthKey,
    dirty: &mut Dirty,
) -> Result<Joined> {
    let live = balances.get(member).copied();
    let archived = archive.get(member).copied();

    let joined = match (live, archived) {
        (Some(balance), None) => Joined::AlreadyActive(balance),
        (None, None) => {
            balances.insert(member.clone(), 0);
            dirty.balances = true;
            Joined::Created
        }
        (live, Some(archived)) => {
            // Both only exist together in hand-edited files.  Keep both amounts.
            let balance = live
                .unwrap_or(0)
                .checked_add(archived)
                .ok_or(LedgerError::InvalidAmount(points(archived)))?;
            archive.shift_remove(member);
            balances.insert(member.clone(), balance);
            dirty.balances = true;
            dirty.archive = true;
            Joined::Restored(balance)
        }
    };

    let months = history.entry(member.clone()).or_default();
    if !months.contains_key(month) {
        months.insert(month.clone(), 0);
        dirty.history = true;
    }

    Ok(joined)
}

#[cfg(test)]
mod tests {
    use super::error::SelectionKind;
    use super::*;
    use chrono::NaiveDate;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn clock(year: i32, month: u32) -> Clock {
        Clock::Fixed(NaiveDate::from_ymd_opt(year, month, 15).unwrap())
    }

    fn allow() -> AllowList {
        AllowList {
            clans: vec!["Wolves".into(), "Ravens".into()],
            event_types: vec!["Siege".into(), "Boss".into()],
        }
    }

    async fn ledger_at(dir: &TempDir, clock: Clock) -> Ledger {
        Ledger::open(dir.path(), allow(), clock).await.unwrap()
    }

    async fn ledger(dir: &TempDir) -> Ledger {
        ledger_at(dir, clock(2025, 3)).await
    }

    fn id(s: &str) -> MemberId {
        MemberId::new(s)
    }

    async fn monthly(ledger: &Ledger, member: &str) -> i64 {
        ledger
            .month_slice(&ledger.current_month())
            .await
            .unwrap()
            .into_iter()
            .find(|(m, _)| m.as_str() == member)
            .map(|(_, delta)| delta)
            .unwrap_or(0)
    }

    #[tokio::test]
    async fn open_creates_empty_documents() {
        let dir = tempfile::tempdir().unwrap();
        ledger(&dir).await;

        for file in [BALANCES_FILE, HISTORY_FILE, ARCHIVE_FILE, ALLIANCE_FILE] {
            let contents = std::fs::read_to_string(dir.path().join(file)).unwrap();
            assert_eq!(contents, "{}", "{}", file);
        }
    }

    #[tokio::test]
    async fn credit_adds_to_balance_and_month() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ledger(&dir).await;

        assert_eq!(ledger.credit(&id("u1"), 40).await.unwrap(), 40);
        assert_eq!(ledger.credit(&id("u1"), 2).await.unwrap(), 42);
        assert_eq!(ledger.query(&id("u1")).await.unwrap(), 42);
        assert_eq!(monthly(&ledger, "u1").await, 42);
    }

    #[tokio::test]
    async fn negative_amounts_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ledger(&dir).await;

        assert!(matches!(
            ledger.credit(&id("u1"), -1).await,
            Err(LedgerError::InvalidAmount(-1))
        ));
        assert!(matches!(
            ledger.debit(&id("u1"), -1).await,
            Err(LedgerError::InvalidAmount(-1))
        ));
        assert!(matches!(
            ledger.cancel(&id("u1"), -1).await,
            Err(LedgerError::InvalidAmount(-1))
        ));
        assert_eq!(ledger.query(&id("u1")).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn overdraw_is_rejected_without_change() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ledger(&dir).await;
        ledger.credit(&id("u1"), 10).await.unwrap();

        let err = ledger.debit(&id("u1"), 11).await.unwrap_err();
        assert!(matches!(
            err,
            LedgerError::InsufficientFunds {
                balance: 10,
                requested: 11
            }
        ));
        assert!(matches!(
            ledger.cancel(&id("u1"), 11).await,
            Err(LedgerError::InsufficientFunds { .. })
        ));

        assert_eq!(ledger.query(&id("u1")).await.unwrap(), 10);
        assert_eq!(monthly(&ledger, "u1").await, 10);
    }

    #[tokio::test]
    async fn debit_leaves_history_cancel_reverts_it() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ledger(&dir).await;
        ledger.credit(&id("u1"), 50).await.unwrap();

        assert_eq!(ledger.debit(&id("u1"), 5).await.unwrap(), 45);
        assert_eq!(monthly(&ledger, "u1").await, 50);

        assert_eq!(ledger.cancel(&id("u1"), 5).await.unwrap(), 40);
        assert_eq!(monthly(&ledger, "u1").await, 45);
    }

    #[tokio::test]
    async fn award_remove_cancel_scenario() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ledger(&dir).await;
        let u1 = id("u1");

        ledger.credit(&u1, 100).await.unwrap();
        assert_eq!(ledger.debit(&u1, 30).await.unwrap(), 70);
        assert_eq!(ledger.cancel(&u1, 20).await.unwrap(), 50);
        assert_eq!(monthly(&ledger, "u1").await, 80);

        assert!(matches!(
            ledger.debit(&u1, 999).await,
            Err(LedgerError::InsufficientFunds { .. })
        ));
        assert_eq!(ledger.query(&u1).await.unwrap(), 50);
    }

    #[tokio::test]
    async fn state_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let ledger = ledger(&dir).await;
            ledger.credit(&id("u1"), 12).await.unwrap();
        }

        let ledger = ledger(&dir).await;
        assert_eq!(ledger.query(&id("u1")).await.unwrap(), 12);
        assert_eq!(monthly(&ledger, "u1").await, 12);
    }

    #[tokio::test]
    async fn overall_leaderboard_breaks_ties_by_first_seen() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ledger(&dir).await;
        ledger.credit(&id("x"), 50).await.unwrap();
        ledger.credit(&id("y"), 75).await.unwrap();
        ledger.credit(&id("z"), 75).await.unwrap();

        let board = ledger.leaderboard(Scope::Overall).await.unwrap();
        let order: Vec<&str> = board.iter().map(|s| s.key.as_str()).collect();
        assert_eq!(order, ["y", "z", "x"]);
    }

    #[tokio::test]
    async fn monthly_leaderboards_use_history() {
        let dir = tempfile::tempdir().unwrap();
        {
            let february = ledger_at(&dir, clock(2025, 2)).await;
            february.credit(&id("a"), 30).await.unwrap();
            february.credit(&id("b"), 10).await.unwrap();
        }

        let march = ledger(&dir).await;
        march.credit(&id("b"), 5).await.unwrap();
        march.debit(&id("a"), 30).await.unwrap();

        let current = march.leaderboard(Scope::CurrentMonth).await.unwrap();
        assert_eq!(
            current,
            vec![
                Standing {
                    key: id("b"),
                    points: 5
                },
                Standing {
                    key: id("a"),
                    points: 0
                },
            ]
        );

        let last = march.leaderboard(Scope::LastMonth).await.unwrap();
        let order: Vec<(&str, i64)> = last.iter().map(|s| (s.key.as_str(), s.points)).collect();
        assert_eq!(order, [("a", 30), ("b", 10)]);
    }

    #[tokio::test]
    async fn last_month_rolls_year_boundary() {
        let dir = tempfile::tempdir().unwrap();
        let december = ledger_at(&dir, clock(2024, 12)).await;
        december.credit(&id("a"), 9).await.unwrap();

        let january = ledger_at(&dir, clock(2025, 1)).await;
        let last = january.leaderboard(Scope::LastMonth).await.unwrap();
        assert_eq!(last[0].points, 9);
    }

    #[tokio::test]
    async fn post_delta_targets_given_month() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ledger(&dir).await;
        let january = MonthKey::new(2025, 1);

        assert_eq!(ledger.post_delta(&id("a"), january.clone(), 4).await.unwrap(), 4);
        assert_eq!(ledger.post_delta(&id("a"), january.clone(), -6).await.unwrap(), -2);
        assert_eq!(
            ledger.month_slice(&january).await.unwrap(),
            vec![(id("a"), -2)]
        );
        assert_eq!(ledger.query(&id("a")).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn archive_round_trip_restores_balance_and_drops_history() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ledger(&dir).await;
        let x = id("x");
        ledger.credit(&x, 64).await.unwrap();

        assert_eq!(ledger.member_left(&x).await.unwrap(), Left::Archived(64));
        assert_eq!(ledger.query(&x).await.unwrap(), 0);
        assert!(ledger
            .month_slice(&ledger.current_month())
            .await
            .unwrap()
            .is_empty());
        let archived = ledger.archive_list().await.unwrap();
        assert_eq!(archived, vec![Standing { key: x.clone(), points: 64 }]);

        assert_eq!(ledger.member_joined(&x).await.unwrap(), Joined::Restored(64));
        assert_eq!(ledger.query(&x).await.unwrap(), 64);
        assert_eq!(monthly(&ledger, "x").await, 0);
        assert!(ledger.archive_list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn archived_members_stay_out_of_the_ledger() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ledger(&dir).await;
        let (x, y) = (id("x"), id("y"));
        ledger.credit(&x, 64).await.unwrap();
        ledger.credit(&y, 10).await.unwrap();
        ledger.member_left(&x).await.unwrap();

        fn archived<T>(result: Result<T>) -> bool {
            matches!(
                result,
                Err(LedgerError::Archived { member, balance: 64 }) if member.as_str() == "x"
            )
        }
        assert!(archived(ledger.credit(&x, 5).await));
        assert!(archived(ledger.debit(&x, 0).await));
        assert!(archived(ledger.cancel(&x, 0).await));
        assert!(archived(
            ledger.post_delta(&x, ledger.current_month(), 5).await
        ));
        assert!(archived(ledger.transfer(&y, &x, 3).await));
        assert!(archived(ledger.transfer(&x, &y, 3).await));

        assert_eq!(ledger.lookup(&x).await.unwrap(), Holding::Archived(64));
        assert_eq!(ledger.lookup(&y).await.unwrap(), Holding::Active(10));
        assert_eq!(ledger.lookup(&id("z")).await.unwrap(), Holding::Unknown);
        assert_eq!(
            ledger.leaderboard(Scope::Overall).await.unwrap(),
            vec![Standing { key: y.clone(), points: 10 }]
        );
        assert_eq!(monthly(&ledger, "x").await, 0);
        assert_eq!(
            ledger.archive_list().await.unwrap(),
            vec![Standing { key: x.clone(), points: 64 }]
        );

        // Back with the role, the same operations apply to the restored balance.
        ledger.member_joined(&x).await.unwrap();
        assert_eq!(ledger.credit(&x, 5).await.unwrap(), 69);
        assert!(ledger.archive_list().await.unwrap().is_empty());
    }

    /// Saving a temp file onto a directory fails, which breaks the next balances save.
    fn block_balances_save(dir: &TempDir) {
        std::fs::create_dir(dir.path().join(BALANCES_FILE).with_extension("json.new")).unwrap();
    }

    #[tokio::test]
    async fn failed_credit_keeps_balance() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ledger(&dir).await;
        ledger.credit(&id("a"), 10).await.unwrap();
        block_balances_save(&dir);

        assert!(matches!(
            ledger.credit(&id("a"), 5).await,
            Err(LedgerError::Storage(_))
        ));
        assert_eq!(ledger.query(&id("a")).await.unwrap(), 10);
    }

    #[tokio::test]
    async fn failed_leave_keeps_archived_balance() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ledger(&dir).await;
        ledger.credit(&id("a"), 10).await.unwrap();
        block_balances_save(&dir);

        assert!(matches!(
            ledger.member_left(&id("a")).await,
            Err(LedgerError::Storage(_))
        ));
        assert_eq!(ledger.query(&id("a")).await.unwrap(), 10);
        assert_eq!(
            ledger.archive_list().await.unwrap(),
            vec![Standing { key: id("a"), points: 10 }]
        );
    }

    #[tokio::test]
    async fn leaving_without_balance_archives_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ledger(&dir).await;

        assert_eq!(ledger.member_left(&id("ghost")).await.unwrap(), Left::NotActive);
        assert!(ledger.archive_list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn joining_twice_is_harmless() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ledger(&dir).await;

        assert_eq!(ledger.member_joined(&id("n")).await.unwrap(), Joined::Created);
        ledger.credit(&id("n"), 3).await.unwrap();
        assert_eq!(
            ledger.member_joined(&id("n")).await.unwrap(),
            Joined::AlreadyActive(3)
        );
        assert_eq!(monthly(&ledger, "n").await, 3);
    }

    #[tokio::test]
    async fn reconcile_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ledger(&dir).await;
        ledger.credit(&id("a"), 20).await.unwrap();
        ledger.credit(&id("b"), 7).await.unwrap();
        ledger.member_left(&id("b")).await.unwrap();

        let holders = [id("a"), id("b"), id("c")];
        let first = ledger.reconcile(&holders).await.unwrap();
        assert_eq!(
            first,
            Reconciled {
                created: 1,
                restored: 1,
                unchanged: 1
            }
        );

        let before = ledger.leaderboard(Scope::Overall).await.unwrap();
        let second = ledger.reconcile(&holders).await.unwrap();
        assert_eq!(second.unchanged, 3);
        assert_eq!(ledger.leaderboard(Scope::Overall).await.unwrap(), before);
        assert_eq!(ledger.query(&id("b")).await.unwrap(), 7);
    }

    #[tokio::test]
    async fn transfer_conserves_points() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ledger(&dir).await;
        ledger.credit(&id("a"), 30).await.unwrap();
        ledger.credit(&id("b"), 5).await.unwrap();

        let moved = ledger.transfer(&id("a"), &id("b"), 12).await.unwrap();
        assert_eq!(
            moved,
            Transfer {
                sender_balance: 18,
                receiver_balance: 17
            }
        );
        assert_eq!(
            ledger.query(&id("a")).await.unwrap() + ledger.query(&id("b")).await.unwrap(),
            35
        );
        assert_eq!(monthly(&ledger, "a").await, 30);
    }

    #[tokio::test]
    async fn transfer_checks_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ledger(&dir).await;
        ledger.credit(&id("a"), 1).await.unwrap();

        assert!(matches!(
            ledger.transfer(&id(""), &id("a"), 0).await,
            Err(LedgerError::UnknownIdentity(_))
        ));
        assert!(matches!(
            ledger.transfer(&id("a"), &id("a"), 0).await,
            Err(LedgerError::SelfReferenceDenied)
        ));
        assert!(matches!(
            ledger.transfer(&id("a"), &id("b"), 0).await,
            Err(LedgerError::InvalidAmount(0))
        ));
        assert!(matches!(
            ledger.transfer(&id("a"), &id("b"), 2).await,
            Err(LedgerError::InsufficientFunds { .. })
        ));
        assert_eq!(ledger.query(&id("a")).await.unwrap(), 1);
        assert_eq!(ledger.query(&id("b")).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn concurrent_transfers_never_lose_points() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = Arc::new(ledger(&dir).await);
        ledger.credit(&id("a"), 100).await.unwrap();
        ledger.credit(&id("b"), 100).await.unwrap();

        let mut tasks = Vec::new();
        for i in 0..20 {
            let ledger = ledger.clone();
            tasks.push(tokio::spawn(async move {
                let (from, to) = if i % 2 == 0 { ("a", "b") } else { ("b", "a") };
                ledger.transfer(&id(from), &id(to), 3).await
            }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(ledger.query(&id("a")).await.unwrap(), 100);
        assert_eq!(ledger.query(&id("b")).await.unwrap(), 100);
    }

    #[tokio::test]
    async fn alliance_clan_and_event_balances_are_separate() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ledger(&dir).await;
        let wolves = AllianceKey::clan("Wolves");
        let wolves_siege = AllianceKey::event("Wolves", "Siege");

        assert_eq!(ledger.alliance_credit(&wolves, 10).await.unwrap(), 10);
        assert_eq!(ledger.alliance_credit(&wolves_siege, 4).await.unwrap(), 4);
        assert_eq!(ledger.alliance_debit(&wolves, 3).await.unwrap(), 7);
        assert_eq!(ledger.alliance_query(&wolves).await.unwrap(), 7);
        assert_eq!(ledger.alliance_query(&wolves_siege).await.unwrap(), 4);

        assert!(matches!(
            ledger.alliance_debit(&wolves_siege, 5).await,
            Err(LedgerError::InsufficientFunds { .. })
        ));
    }

    #[tokio::test]
    async fn alliance_rejects_unlisted_values_without_storing() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ledger(&dir).await;

        assert!(matches!(
            ledger.alliance_credit(&AllianceKey::clan("Bears"), 1).await,
            Err(LedgerError::InvalidSelection {
                kind: SelectionKind::Clan,
                ..
            })
        ));
        assert!(matches!(
            ledger
                .alliance_credit(&AllianceKey::event("Ravens", "Picnic"), 1)
                .await,
            Err(LedgerError::InvalidSelection {
                kind: SelectionKind::EventType,
                ..
            })
        ));

        let contents = std::fs::read_to_string(dir.path().join(ALLIANCE_FILE)).unwrap();
        assert_eq!(contents, "{}");
    }

    #[tokio::test]
    async fn alliance_standings_follow_allow_list() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ledger(&dir).await;
        ledger
            .alliance_credit(&AllianceKey::event("Ravens", "Boss"), 2)
            .await
            .unwrap();

        let boss = ledger.alliance_standings(Some("Boss")).await.unwrap();
        let order: Vec<(&str, i64)> = boss.iter().map(|s| (s.key.as_str(), s.points)).collect();
        assert_eq!(order, [("Ravens", 2), ("Wolves", 0)]);

        ledger
            .set_allow_list(AllowList {
                clans: vec!["Wolves".into()],
                event_types: vec![],
            })
            .await;
        assert_eq!(ledger.alliance_standings(None).await.unwrap().len(), 1);
        assert!(ledger.alliance_standings(Some("Boss")).await.is_err());
    }
}
