use super::MemberId;
use std::str::FromStr;

/// Which figures a leaderboard is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Current balances from the ledger.
    Overall,
    /// Points accrued this calendar month.
    CurrentMonth,
    /// Points accrued last calendar month.
    LastMonth,
}

impl Scope {
    pub fn title(&self) -> &'static str {
        match self {
            Scope::Overall => "Overall",
            Scope::CurrentMonth => "Monthly",
            Scope::LastMonth => "Last Month",
        }
    }
}

impl FromStr for Scope {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "overall" => Ok(Scope::Overall),
            "month" | "current_month" => Ok(Scope::CurrentMonth),
            "last_month" | "previous_month" => Ok(Scope::LastMonth),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Standing<K = MemberId> {
    pub key: K,
    pub points: i64,
}

/// Sort descending by points.  The sort is stable, so ties keep the order the entries were
/// given in, which for every store is first-seen order.
pub fn rank<K, I>(entries: I) -> Vec<Standing<K>>
where
    I: IntoIterator<Item = (K, i64)>,
{
    let mut standings: Vec<Standing<K>> = entries
        .into_iter()
        .map(|(key, points)| Standing { key, points })
        .collect();
    standings.sort_by(|a, b| b.points.cmp(&a.points));
    standings
}

pub(crate) fn points(balance: u64) -> i64 {
    i64::try_from(balance).unwrap_or(i64::MAX)
}
