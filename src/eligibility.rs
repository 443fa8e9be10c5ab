// Raffle Settlement - Purchase eligibility
//
// Advisory only: concurrent buyers may still race between this check and
// settlement. The store's atomic increment is the authority.
use std::collections::HashMap;

use solana_program::pubkey::Pubkey;

use crate::{
    error::{EligibilityError, StoreError},
    state::{Entry, Raffle, RaffleId},
    store::RaffleStore,
};

/// Check remaining supply first, then the buyer's per-wallet cap
pub fn check_eligibility(
    raffle: &Raffle,
    quantity: u64,
    buyer_prior_tickets: u64,
) -> Result<(), EligibilityError> {
    let remaining = raffle.remaining_tickets();
    if quantity > remaining {
        return Err(EligibilityError::SupplyExceeded { remaining });
    }

    let limit = raffle.wallet_limit();
    if buyer_prior_tickets.saturating_add(quantity) > limit {
        return Err(EligibilityError::WalletLimitExceeded {
            limit,
            already_bought: buyer_prior_tickets,
            requested: quantity,
        });
    }

    Ok(())
}

/// Locally cached ticket counts of the connected wallet, per raffle
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WalletTickets {
    counts: HashMap<RaffleId, u64>,
}

impl WalletTickets {
    /// Rebuild the cache from the wallet's recorded entries
    pub fn from_entries(entries: &[Entry]) -> Self {
        let mut tickets = Self::default();
        for entry in entries {
            tickets.record(&entry.raffle_id, entry.quantity);
        }
        tickets
    }

    pub fn prior(&self, raffle_id: &str) -> u64 {
        self.counts.get(raffle_id).copied().unwrap_or(0)
    }

    pub fn record(&mut self, raffle_id: &str, quantity: u64) {
        let count = self.counts.entry(raffle_id.to_string()).or_insert(0);
        *count = count.saturating_add(quantity);
    }
}

/// Reload the wallet's counts from the store
pub async fn load_wallet_tickets<S: RaffleStore>(
    store: &S,
    wallet: &Pubkey,
) -> Result<WalletTickets, StoreError> {
    let entries = store.entries_for_wallet(wallet).await?;
    Ok(WalletTickets::from_entries(&entries))
}
