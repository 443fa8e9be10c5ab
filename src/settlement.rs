// Raffle Settlement - Post-payment bookkeeping
use solana_program::{clock::UnixTimestamp, pubkey::Pubkey};
use tracing::{error, info, warn};

use crate::{
    error::{EngineError, StoreError},
    state::{Entry, Raffle},
    store::RaffleStore,
};

/// What the store accepted after a confirmed payment
#[derive(Debug, Default)]
pub struct SettlementReport {
    /// Counter and entry were written in one transaction
    pub transactional: bool,
    pub sold_incremented: bool,
    pub entry_recorded: bool,
    /// Logged failures; never turned into a purchase failure
    pub failures: Vec<EngineError>,
}

impl SettlementReport {
    pub fn is_complete(&self) -> bool {
        self.sold_incremented && self.entry_recorded
    }
}

/// Records confirmed purchases in the store
pub struct SettlementRecorder<'a, S> {
    store: &'a S,
}

impl<'a, S: RaffleStore> SettlementRecorder<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Increment `tickets_sold` and append the entry
    ///
    /// The entry is only appended once the store accepted the increment; a
    /// refused increment leaves a paid purchase to refund. Payment has
    /// already moved, so every failure here is logged and reported, never
    /// returned.
    pub async fn record(
        &self,
        raffle_id: &str,
        buyer: &Pubkey,
        quantity: u64,
        now: UnixTimestamp,
    ) -> SettlementReport {
        let entry = Entry {
            raffle_id: raffle_id.to_string(),
            wallet: *buyer,
            quantity,
            created_at: now,
        };
        let mut report = SettlementReport::default();

        if self.store.supports_transactional_settlement() {
            match self.store.record_purchase(entry.clone()).await {
                Ok(()) => {
                    info!(
                        "Recorded {} ticket(s) for {} on raffle {} in one transaction",
                        quantity, buyer, raffle_id
                    );
                    report.transactional = true;
                    report.sold_incremented = true;
                    report.entry_recorded = true;
                    return report;
                }
                Err(StoreError::Unsupported) => {}
                Err(e) => {
                    error!(
                        "Store refused {} ticket(s) for {} on raffle {} after payment, refund needed: {}",
                        quantity, buyer, raffle_id, e
                    );
                    report.transactional = true;
                    report.failures.push(EngineError::Bookkeeping(e));
                    return report;
                }
            }
        }

        if let Err(e) = self.store.increment_ticket_sold(raffle_id, quantity).await {
            error!(
                "Store refused {} ticket(s) for {} on raffle {} after payment, refund needed: {}",
                quantity, buyer, raffle_id, e
            );
            report.failures.push(EngineError::Bookkeeping(e));
            return report;
        }
        report.sold_incremented = true;

        match self.store.insert_entry(entry).await {
            Ok(()) => report.entry_recorded = true,
            Err(e) => {
                error!(
                    "Failed to record entry of {} for raffle {}, but payment was sent: {}",
                    buyer, raffle_id, e
                );
                report.failures.push(EngineError::Bookkeeping(e));
            }
        }

        report
    }
}

/// Raffle whose sold counter disagrees with its entries
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SoldMismatch {
    pub raffle_id: String,
    pub tickets_sold: u64,
    pub entry_total: u64,
}

/// Compare one raffle's counter with the sum of its entry quantities
pub async fn reconcile_raffle<S: RaffleStore>(
    store: &S,
    raffle: &Raffle,
) -> Result<Option<SoldMismatch>, StoreError> {
    let entry_total = store
        .entries_for_raffle(&raffle.id)
        .await?
        .iter()
        .fold(0u64, |acc, e| acc.saturating_add(e.quantity));

    if entry_total == raffle.tickets_sold {
        return Ok(None);
    }
    warn!(
        "Raffle {} sold {} ticket(s) but entries total {}",
        raffle.id, raffle.tickets_sold, entry_total
    );
    Ok(Some(SoldMismatch {
        raffle_id: raffle.id.clone(),
        tickets_sold: raffle.tickets_sold,
        entry_total,
    }))
}

/// Scan every raffle for counter/entry mismatches
pub async fn reconcile_all<S: RaffleStore>(store: &S) -> Result<Vec<SoldMismatch>, StoreError> {
    let mut mismatches = Vec::new();
    for raffle in store.list_raffles().await? {
        if let Some(mismatch) = reconcile_raffle(store, &raffle).await? {
            mismatches.push(mismatch);
        }
    }
    info!("Reconciliation found {} mismatched raffle(s)", mismatches.len());
    Ok(mismatches)
}
