// Raffle Settlement - Seen outcome log
//
// Wallet-scoped record of raffle outcomes already celebrated, so reloads do
// not replay confetti or alerts. Past `capacity` ids, a wallet's log is
// pruned down to the raffles that are still listed; listed ids are never
// dropped.
use std::{collections::BTreeMap, fs, io, path::Path};

use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::pubkey::Pubkey;
use tracing::debug;

use crate::state::{Raffle, RaffleId};

#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct SeenOutcomeStore {
    capacity: u32,
    wallets: BTreeMap<[u8; 32], Vec<RaffleId>>,
}

impl SeenOutcomeStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.clamp(1, u32::MAX as usize) as u32,
            wallets: BTreeMap::new(),
        }
    }

    pub fn has_seen(&self, wallet: &Pubkey, raffle_id: &str) -> bool {
        self.wallets
            .get(&wallet.to_bytes())
            .map_or(false, |ids| ids.iter().any(|id| id == raffle_id))
    }

    pub fn mark_seen(&mut self, wallet: &Pubkey, raffle_id: &str) {
        let ids = self.wallets.entry(wallet.to_bytes()).or_default();
        if ids.iter().any(|id| id == raffle_id) {
            return;
        }
        ids.push(raffle_id.to_string());
    }

    /// Once over capacity, drop ids whose raffles are no longer listed
    pub fn prune_unlisted(&mut self, wallet: &Pubkey, listed: &[Raffle]) {
        let capacity = self.capacity as usize;
        let Some(ids) = self.wallets.get_mut(&wallet.to_bytes()) else {
            return;
        };
        if ids.len() <= capacity {
            return;
        }
        let before = ids.len();
        ids.retain(|id| listed.iter().any(|r| &r.id == id));
        debug!(
            "Pruned {} unlisted outcome(s) for {}",
            before - ids.len(),
            wallet
        );
    }

    pub fn seen_count(&self, wallet: &Pubkey) -> usize {
        self.wallets.get(&wallet.to_bytes()).map_or(0, Vec::len)
    }

    pub fn to_bytes(&self) -> io::Result<Vec<u8>> {
        borsh::to_vec(self)
    }

    pub fn from_bytes(data: &[u8]) -> io::Result<Self> {
        borsh::from_slice(data)
    }

    /// Load from `path`; a missing file yields an empty store
    pub fn load(path: &Path, capacity: usize) -> io::Result<Self> {
        match fs::read(path) {
            Ok(data) => {
                let mut store = Self::from_bytes(&data)?;
                store.capacity = capacity.clamp(1, u32::MAX as usize) as u32;
                Ok(store)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("No seen-outcome log at {}, starting empty", path.display());
                Ok(Self::new(capacity))
            }
            Err(e) => Err(e),
        }
    }

    pub fn save(&self, path: &Path) -> io::Result<()> {
        fs::write(path, self.to_bytes()?)
    }
}

/// Client-side event raised by a refresh
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Celebration {
    /// The connected wallet won
    PersonalWin {
        raffle_id: RaffleId,
        name: String,
        image: Option<String>,
    },
    /// Someone else won a raffle
    CommunityWinner { raffle_id: RaffleId, name: String },
}

/// Pick at most one celebration for `wallet` and mark it seen
///
/// A personal win always takes priority over a community announcement.
pub fn select_celebration(
    raffles: &[Raffle],
    wallet: &Pubkey,
    seen: &mut SeenOutcomeStore,
) -> Option<Celebration> {
    seen.prune_unlisted(wallet, raffles);

    let personal = raffles
        .iter()
        .find(|r| r.winner.as_ref() == Some(wallet) && !seen.has_seen(wallet, &r.id));
    if let Some(raffle) = personal {
        seen.mark_seen(wallet, &raffle.id);
        return Some(Celebration::PersonalWin {
            raffle_id: raffle.id.clone(),
            name: raffle.name.clone(),
            image: raffle.image.clone(),
        });
    }

    let community = raffles.iter().find(|r| {
        matches!(r.winner.as_ref(), Some(w) if w != wallet) && !seen.has_seen(wallet, &r.id)
    })?;
    seen.mark_seen(wallet, &community.id);
    Some(Celebration::CommunityWinner {
        raffle_id: community.id.clone(),
        name: community.name.clone(),
    })
}
