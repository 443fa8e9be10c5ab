// Raffle Settlement - Outbound notifications
use serde::Serialize;
use serde_json::{json, Value};
use solana_program::clock::UnixTimestamp;
use tracing::{info, warn};

use crate::{
    error::SinkError,
    state::{Raffle, RaffleId},
    utils::short_address,
};

/// Embed accent colours, pink/cyan/green/yellow/orange
pub const EMBED_COLORS: [u32; 5] = [0xFFC0F5, 0x00E3FA, 0x5CFCA9, 0xFFD55F, 0xFF9161];

/// Event delivered to the outbound sink
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum OutboundEvent {
    RaffleCreated {
        raffle_id: RaffleId,
        name: String,
        image: Option<String>,
        ticket_price: f64,
        currency: String,
        ticket_supply: u64,
        end_time: UnixTimestamp,
        creator: String,
    },
    RaffleEnded {
        raffle_id: RaffleId,
        name: String,
        image: Option<String>,
        winner: String,
        /// Distinct entering wallets, not entry rows
        participants: Option<u64>,
        tickets_sold: u64,
        ticket_supply: u64,
        prize_description: String,
    },
}

impl OutboundEvent {
    pub fn created(raffle: &Raffle) -> Self {
        Self::RaffleCreated {
            raffle_id: raffle.id.clone(),
            name: raffle.name.clone(),
            image: raffle.image.clone(),
            ticket_price: raffle.ticket_price,
            currency: raffle.currency.symbol().to_string(),
            ticket_supply: raffle.ticket_supply,
            end_time: raffle.end_time,
            creator: raffle.creator.to_string(),
        }
    }

    /// `None` while the raffle has no winner
    pub fn ended(raffle: &Raffle, participants: Option<u64>) -> Option<Self> {
        let winner = raffle.winner?;
        Some(Self::RaffleEnded {
            raffle_id: raffle.id.clone(),
            name: raffle.name.clone(),
            image: raffle.image.clone(),
            winner: winner.to_string(),
            participants,
            tickets_sold: raffle.tickets_sold,
            ticket_supply: raffle.ticket_supply,
            prize_description: raffle.prize_description(),
        })
    }

    pub fn raffle_id(&self) -> &str {
        match self {
            Self::RaffleCreated { raffle_id, .. } | Self::RaffleEnded { raffle_id, .. } => {
                raffle_id
            }
        }
    }

    /// Chat-webhook embed body for this event
    pub fn embed(&self, site_url: &str) -> Value {
        let embed = match self {
            Self::RaffleCreated {
                name,
                image,
                ticket_price,
                currency,
                ticket_supply,
                end_time,
                creator,
                ..
            } => json!({
                "title": format!("🎟️ NEW RAFFLE: {}", name),
                "url": site_url,
                "color": EMBED_COLORS[1],
                "thumbnail": { "url": image },
                "fields": [
                    { "name": "💰 Ticket Price", "value": format!("{} {}", ticket_price, currency), "inline": true },
                    { "name": "🎫 Supply", "value": ticket_supply.to_string(), "inline": true },
                    { "name": "⏰ Ends", "value": format!("<t:{}:R>", end_time), "inline": true },
                    { "name": "👤 Creator", "value": short_address(creator, 8), "inline": false },
                ],
            }),
            Self::RaffleEnded {
                name,
                image,
                winner,
                participants,
                tickets_sold,
                ticket_supply,
                prize_description,
                ..
            } => json!({
                "title": format!("🏁 RAFFLE ENDED: {}", name),
                "url": site_url,
                "color": EMBED_COLORS[2],
                "thumbnail": { "url": image },
                "fields": [
                    {
                        "name": "👑 Winner",
                        "value": format!("[{}](https://solscan.io/account/{})", short_address(winner, 8), winner),
                        "inline": false,
                    },
                    { "name": "👥 Participants", "value": participants.unwrap_or(0).to_string(), "inline": true },
                    { "name": "🎫 Tickets Sold", "value": format!("{}/{}", tickets_sold, ticket_supply), "inline": true },
                    { "name": "🎁 Prize Info", "value": prize_description, "inline": false },
                ],
            }),
        };
        json!({ "embeds": [embed] })
    }
}

/// Fire-and-forget delivery target, e.g. a chat webhook
#[allow(async_fn_in_trait)]
pub trait NotificationSink {
    async fn deliver(&self, event: &OutboundEvent) -> Result<(), SinkError>;
}

/// Deliver `event`, logging failure; never blocks the triggering operation's outcome
pub async fn dispatch<N: NotificationSink>(sink: &N, event: &OutboundEvent) -> bool {
    match sink.deliver(event).await {
        Ok(()) => {
            info!("Delivered notification for raffle {}", event.raffle_id());
            true
        }
        Err(e) => {
            warn!(
                "Notification for raffle {} was not delivered: {}",
                event.raffle_id(),
                e
            );
            false
        }
    }
}

