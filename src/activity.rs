// Raffle Settlement - Participants and live activity
use std::collections::{HashMap, HashSet};

use solana_program::pubkey::Pubkey;

use crate::{error::StoreError, state::Entry, store::RaffleStore};

/// Entries shown in the live feed per poll
pub const LIVE_ACTIVITY_LIMIT: usize = 10;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Participant {
    pub wallet: Pubkey,
    pub tickets: u64,
}

/// Sum entries per wallet, most tickets first
pub fn leaderboard(entries: &[Entry]) -> Vec<Participant> {
    let mut order: Vec<Pubkey> = Vec::new();
    let mut totals: HashMap<Pubkey, u64> = HashMap::new();
    for entry in entries {
        let total = totals.entry(entry.wallet).or_insert_with(|| {
            order.push(entry.wallet);
            0
        });
        *total = total.saturating_add(entry.quantity);
    }

    let mut participants: Vec<Participant> = order
        .into_iter()
        .map(|wallet| Participant {
            tickets: totals[&wallet],
            wallet,
        })
        .collect();
    participants.sort_by(|a, b| b.tickets.cmp(&a.tickets));
    participants
}

/// Distinct wallets that entered
///
/// Counts wallets, not entry rows: a wallet buying twice is one participant.
pub fn participant_count(entries: &[Entry]) -> u64 {
    entries
        .iter()
        .map(|e| e.wallet)
        .collect::<HashSet<_>>()
        .len() as u64
}

pub async fn fetch_participants<S: RaffleStore>(
    store: &S,
    raffle_id: &str,
) -> Result<Vec<Participant>, StoreError> {
    let entries = store.entries_for_raffle(raffle_id).await?;
    Ok(leaderboard(&entries))
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActivityItem {
    pub wallet: Pubkey,
    pub quantity: u64,
    pub raffle_name: String,
}

impl ActivityItem {
    fn key(&self) -> String {
        format!("{}-{}-{}", self.wallet, self.raffle_name, self.quantity)
    }
}

pub async fn fetch_live_activity<S: RaffleStore>(
    store: &S,
) -> Result<Vec<ActivityItem>, StoreError> {
    Ok(store
        .recent_entries(LIVE_ACTIVITY_LIMIT)
        .await?
        .into_iter()
        .map(|e| ActivityItem {
            wallet: e.wallet,
            quantity: e.quantity,
            raffle_name: e.raffle_name.unwrap_or_else(|| "a raffle".to_string()),
        })
        .collect())
}

/// Session-scoped feed that only surfaces items it has not shown yet
#[derive(Debug, Default)]
pub struct LiveActivityFeed {
    shown: HashSet<String>,
}

impl LiveActivityFeed {
    /// Return the items of `batch` not shown earlier this session
    pub fn ingest(&mut self, batch: Vec<ActivityItem>) -> Vec<ActivityItem> {
        batch
            .into_iter()
            .filter(|item| self.shown.insert(item.key()))
            .collect()
    }
}
