// Raffle Settlement - Lifecycle controller
//
// Active -> ExpiredPendingDraw is derived from the clock on every read.
// ExpiredPendingDraw -> Ended happens when the store's draw procedure
// records a winner.
use std::collections::{HashMap, HashSet};

use solana_program::{clock::UnixTimestamp, pubkey::Pubkey};
use tracing::{debug, info, warn};

use crate::{
    activity::participant_count,
    draw_scheduler::{draw_expired, request_draw, DrawOutcome},
    error::{EngineError, ValidationError},
    notification::{dispatch, NotificationSink, OutboundEvent},
    seen_outcomes::{select_celebration, Celebration, SeenOutcomeStore},
    state::{Raffle, RafflePhase, RaffleId},
    store::RaffleStore,
};

/// Orders offered for the active bucket
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortOrder {
    /// Creation time, newest first
    #[default]
    Newest,
    /// End time, soonest first
    EndingSoon,
    PriceLowToHigh,
    PriceHighToLow,
}

impl TryFrom<&str> for SortOrder {
    type Error = &'static str;

    fn try_from(val: &str) -> Result<Self, Self::Error> {
        match val {
            "newest" => Ok(SortOrder::Newest),
            "ending" => Ok(SortOrder::EndingSoon),
            "price-low" => Ok(SortOrder::PriceLowToHigh),
            "price-high" => Ok(SortOrder::PriceHighToLow),
            _ => Err("Invalid sort order"),
        }
    }
}

/// Stable sort; ties keep the store's order
pub fn sort_active(raffles: &mut [Raffle], order: SortOrder) {
    match order {
        SortOrder::Newest => raffles.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        SortOrder::EndingSoon => raffles.sort_by(|a, b| a.end_time.cmp(&b.end_time)),
        SortOrder::PriceLowToHigh => {
            raffles.sort_by(|a, b| a.ticket_price.total_cmp(&b.ticket_price))
        }
        SortOrder::PriceHighToLow => {
            raffles.sort_by(|a, b| b.ticket_price.total_cmp(&a.ticket_price))
        }
    }
}

/// Raffles split into buckets after one refresh
#[derive(Debug, Default)]
pub struct RaffleListing {
    /// Phase `Active`
    pub active: Vec<Raffle>,
    /// Expired or ended
    pub past: Vec<Raffle>,
    /// Draws requested during this refresh
    pub draws: Vec<DrawOutcome>,
    /// At most one event for the connected wallet
    pub celebration: Option<Celebration>,
    /// Raffles whose `RaffleEnded` event was emitted by this refresh
    pub announced: Vec<RaffleId>,
}

/// Split raffles into the active and past buckets
pub fn partition(raffles: Vec<Raffle>, now: UnixTimestamp) -> (Vec<Raffle>, Vec<Raffle>) {
    raffles
        .into_iter()
        .partition(|r| r.phase(now) == RafflePhase::Active)
}

/// Raffles the wallet created, plus past raffles it won
#[derive(Debug, Default, PartialEq)]
pub struct MyRaffles {
    pub active: Vec<Raffle>,
    pub past: Vec<Raffle>,
}

pub fn my_raffles(raffles: &[Raffle], wallet: &Pubkey, now: UnixTimestamp) -> MyRaffles {
    let mut mine = MyRaffles::default();
    for raffle in raffles {
        let created = raffle.creator == *wallet;
        match raffle.phase(now) {
            RafflePhase::Active if created => mine.active.push(raffle.clone()),
            RafflePhase::Active => {}
            _ if created || raffle.winner.as_ref() == Some(wallet) => {
                mine.past.push(raffle.clone())
            }
            _ => {}
        }
    }
    mine
}

/// Per-instance lifecycle state carried between refreshes
#[derive(Debug, Default)]
pub struct LifecycleController {
    /// Whether each raffle had a winner in the previous listing
    previous: HashMap<RaffleId, bool>,
    /// Raffles this instance already announced
    announced: HashSet<RaffleId>,
}

impl LifecycleController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raffles announced by this instance that are still listed
    pub fn announced_count(&self) -> usize {
        self.announced.len()
    }

    /// Draw expired raffles, reload the listing and bucket it
    ///
    /// A failing draw is logged and retried on the next refresh; only a
    /// failure to list raffles is returned.
    pub async fn refresh<S, N>(
        &mut self,
        store: &S,
        sink: &N,
        seen: &mut SeenOutcomeStore,
        wallet: Option<&Pubkey>,
        now: UnixTimestamp,
    ) -> Result<RaffleListing, EngineError>
    where
        S: RaffleStore,
        N: NotificationSink,
    {
        let draws = match draw_expired(store, now).await {
            Ok(draws) => draws,
            Err(e) => {
                warn!("Expired raffle query failed, skipping draws this refresh: {}", e);
                Vec::new()
            }
        };
        let drawn_now: HashSet<&str> = draws
            .iter()
            .filter(|d| d.winner().is_some())
            .map(|d| d.raffle_id.as_str())
            .collect();

        let raffles = store.list_raffles().await?;

        let mut announced = Vec::new();
        for raffle in raffles.iter().filter(|r| r.winner.is_some()) {
            if self.announced.contains(&raffle.id) {
                continue;
            }
            let newly_ended = drawn_now.contains(raffle.id.as_str())
                || self.previous.get(&raffle.id) == Some(&false);
            if !newly_ended {
                continue;
            }
            let participants = match store.entries_for_raffle(&raffle.id).await {
                Ok(entries) => Some(participant_count(&entries)),
                Err(e) => {
                    debug!("Participant count unavailable for {}: {}", raffle.id, e);
                    None
                }
            };
            if let Some(event) = OutboundEvent::ended(raffle, participants) {
                dispatch(sink, &event).await;
                self.announced.insert(raffle.id.clone());
                announced.push(raffle.id.clone());
            }
        }

        self.previous = raffles
            .iter()
            .map(|r| (r.id.clone(), r.winner.is_some()))
            .collect();
        let previous = &self.previous;
        self.announced.retain(|id| previous.contains_key(id));

        let celebration = wallet.and_then(|w| select_celebration(&raffles, w, seen));
        let (active, past) = partition(raffles, now);
        debug!(
            "Refresh: {} active, {} past, {} draw(s)",
            active.len(),
            past.len(),
            draws.len()
        );

        Ok(RaffleListing {
            active,
            past,
            draws,
            celebration,
            announced,
        })
    }
}

/// Creator-requested draw of a sold-out raffle before its end time
pub async fn request_early_draw<S: RaffleStore>(
    store: &S,
    raffle: &Raffle,
    caller: &Pubkey,
    now: UnixTimestamp,
) -> Result<Option<Pubkey>, EngineError> {
    if raffle.creator != *caller
        || !raffle.is_sold_out()
        || raffle.phase(now) == RafflePhase::Ended
    {
        warn!("Early draw of raffle {} refused for {}", raffle.id, caller);
        return Err(ValidationError::EarlyDrawNotAllowed.into());
    }

    info!("Creator {} requested an early draw of {}", caller, raffle.id);
    request_draw(store, &raffle.id).await.result
}
