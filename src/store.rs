// Raffle Settlement - Remote store
use solana_program::{clock::UnixTimestamp, pubkey::Pubkey};

use crate::{
    error::StoreError,
    state::{Entry, NewRaffle, Raffle, RaffleId},
};

/// Entry joined with the name of its raffle
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecentEntry {
    pub wallet: Pubkey,
    pub quantity: u64,
    pub raffle_name: Option<String>,
}

/// Remote relational store holding `raffles` and `entries`
///
/// `tickets_sold` and `winner` are shared between every client and are only
/// ever changed through `increment_ticket_sold` and `pick_raffle_winner`,
/// both of which the store executes atomically.
#[allow(async_fn_in_trait)]
pub trait RaffleStore {
    /// All raffles, newest first
    async fn list_raffles(&self) -> Result<Vec<Raffle>, StoreError>;

    /// Ids of raffles still marked active whose end time is before `now`
    async fn list_expired_active(&self, now: UnixTimestamp) -> Result<Vec<RaffleId>, StoreError>;

    async fn get_raffle(&self, id: &str) -> Result<Option<Raffle>, StoreError>;

    async fn insert_raffle(&self, raffle: NewRaffle) -> Result<Raffle, StoreError>;

    /// Server-side draw; returns the winner, or `None` when nobody entered
    async fn pick_raffle_winner(&self, id: &str) -> Result<Option<Pubkey>, StoreError>;

    /// Atomic `tickets_sold += delta`
    async fn increment_ticket_sold(&self, id: &str, delta: u64) -> Result<(), StoreError>;

    async fn insert_entry(&self, entry: Entry) -> Result<(), StoreError>;

    async fn entries_for_raffle(&self, id: &str) -> Result<Vec<Entry>, StoreError>;

    async fn entries_for_wallet(&self, wallet: &Pubkey) -> Result<Vec<Entry>, StoreError>;

    /// Latest entries across all raffles, newest first
    async fn recent_entries(&self, limit: usize) -> Result<Vec<RecentEntry>, StoreError>;

    async fn update_floor_price(&self, id: &str, floor_price: f64) -> Result<(), StoreError>;

    /// Whether `record_purchase` is backed by a real transaction
    fn supports_transactional_settlement(&self) -> bool {
        false
    }

    /// Increment `tickets_sold` and append `entry` in one transaction
    async fn record_purchase(&self, _entry: Entry) -> Result<(), StoreError> {
        Err(StoreError::Unsupported)
    }
}
