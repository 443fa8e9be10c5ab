// Raffle Settlement - Winner draws
//
// The draw procedure lives in the store and is assumed idempotent: drawing
// an already-decided raffle returns the existing winner. Duplicate requests
// from concurrent refreshes are therefore wasteful but safe.
use solana_program::{clock::UnixTimestamp, pubkey::Pubkey};
use tracing::{error, info, warn};

use crate::{
    activity::participant_count,
    error::{EngineError, StoreError},
    notification::{dispatch, NotificationSink, OutboundEvent},
    state::RaffleId,
    store::RaffleStore,
};

/// Result of one draw request
#[derive(Debug)]
pub struct DrawOutcome {
    pub raffle_id: RaffleId,
    /// Winner, `None` when nobody entered
    pub result: Result<Option<Pubkey>, EngineError>,
}

impl DrawOutcome {
    pub fn winner(&self) -> Option<&Pubkey> {
        self.result.as_ref().ok().and_then(Option::as_ref)
    }
}

/// Request a draw for one raffle
pub async fn request_draw<S: RaffleStore>(store: &S, raffle_id: &str) -> DrawOutcome {
    let result = match store.pick_raffle_winner(raffle_id).await {
        Ok(Some(winner)) => {
            info!("Raffle {} drawn, winner {}", raffle_id, winner);
            Ok(Some(winner))
        }
        Ok(None) => {
            info!("Raffle {} drawn without participants", raffle_id);
            Ok(None)
        }
        Err(source) => {
            error!("Winner draw failed for raffle {}: {}", raffle_id, source);
            Err(EngineError::Lifecycle {
                raffle_id: raffle_id.to_string(),
                source,
            })
        }
    };
    DrawOutcome {
        raffle_id: raffle_id.to_string(),
        result,
    }
}

/// Draw every raffle still marked active whose end time has passed
///
/// A failing draw is reported in its outcome and retried on the next pass.
pub async fn draw_expired<S: RaffleStore>(
    store: &S,
    now: UnixTimestamp,
) -> Result<Vec<DrawOutcome>, StoreError> {
    let expired = store.list_expired_active(now).await?;
    if !expired.is_empty() {
        info!("Found {} expired raffle(s) awaiting a draw", expired.len());
    }

    let mut outcomes = Vec::with_capacity(expired.len());
    for raffle_id in expired {
        outcomes.push(request_draw(store, &raffle_id).await);
    }
    Ok(outcomes)
}

/// Summary of one scheduled pass
#[derive(Debug, Default)]
pub struct DrawReport {
    pub outcomes: Vec<DrawOutcome>,
    /// Raffles whose `RaffleEnded` event reached the sink
    pub notified: Vec<RaffleId>,
}

impl DrawReport {
    pub fn drawn(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.drawn()
    }
}

/// Server-side periodic job announcing every winner it draws
pub struct DrawScheduler<'a, S, N> {
    store: &'a S,
    sink: &'a N,
}

impl<'a, S: RaffleStore, N: NotificationSink> DrawScheduler<'a, S, N> {
    pub fn new(store: &'a S, sink: &'a N) -> Self {
        Self { store, sink }
    }

    pub async fn run_once(&self, now: UnixTimestamp) -> Result<DrawReport, EngineError> {
        let outcomes = draw_expired(self.store, now).await?;
        let mut report = DrawReport::default();

        for outcome in &outcomes {
            if outcome.winner().is_none() {
                continue;
            }
            let raffle = match self.store.get_raffle(&outcome.raffle_id).await {
                Ok(Some(raffle)) => raffle,
                Ok(None) => {
                    warn!("Drawn raffle {} vanished from the store", outcome.raffle_id);
                    continue;
                }
                Err(e) => {
                    warn!("Could not load drawn raffle {}: {}", outcome.raffle_id, e);
                    continue;
                }
            };
            let participants = match self.store.entries_for_raffle(&raffle.id).await {
                Ok(entries) => Some(participant_count(&entries)),
                Err(e) => {
                    warn!("Could not count participants of {}: {}", raffle.id, e);
                    None
                }
            };
            if let Some(event) = OutboundEvent::ended(&raffle, participants) {
                if dispatch(self.sink, &event).await {
                    report.notified.push(raffle.id.clone());
                }
            }
        }

        report.outcomes = outcomes;
        info!(
            "Draw pass finished: {} drawn, {} failed, {} announced",
            report.drawn(),
            report.failed(),
            report.notified.len()
        );
        Ok(report)
    }
}
