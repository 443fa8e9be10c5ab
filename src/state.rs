// Raffle Settlement - State
use solana_program::{clock::UnixTimestamp, pubkey::Pubkey};

/// Opaque raffle identifier assigned by the store
pub type RaffleId = String;

/// Native currency symbol
pub const NATIVE_SYMBOL: &str = "SOL";

/// Status of a raffle as recorded in the store
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RaffleStatus {
    /// Raffle is open or awaiting its draw
    Active,
    /// Winner has been drawn
    Ended,
}

impl TryFrom<&str> for RaffleStatus {
    type Error = &'static str;

    fn try_from(val: &str) -> Result<Self, Self::Error> {
        match val {
            "active" => Ok(RaffleStatus::Active),
            "ended" => Ok(RaffleStatus::Ended),
            _ => Err("Invalid raffle status"),
        }
    }
}

impl From<RaffleStatus> for &'static str {
    fn from(status: RaffleStatus) -> Self {
        match status {
            RaffleStatus::Active => "active",
            RaffleStatus::Ended => "ended",
        }
    }
}

/// Lifecycle phase derived from status, winner and the clock
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RafflePhase {
    /// Open for purchases
    Active,
    /// Time is up but no winner has been drawn yet
    ExpiredPendingDraw,
    /// Winner drawn
    Ended,
}

/// Currency tickets are paid in
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Currency {
    /// Lamports
    Native,
    /// SPL token identified by its mint
    Token { mint: Pubkey, symbol: String },
}

impl Currency {
    pub fn symbol(&self) -> &str {
        match self {
            Currency::Native => NATIVE_SYMBOL,
            Currency::Token { symbol, .. } => symbol,
        }
    }

    pub fn mint(&self) -> Option<&Pubkey> {
        match self {
            Currency::Native => None,
            Currency::Token { mint, .. } => Some(mint),
        }
    }
}

/// Fungible prize attached to a raffle
#[derive(Clone, Debug, PartialEq)]
pub struct TokenPrize {
    pub mint: Pubkey,
    pub symbol: String,
    pub amount: f64,
}

/// Raffle row
#[derive(Clone, Debug, PartialEq)]
pub struct Raffle {
    pub id: RaffleId,
    pub name: String,
    pub image: Option<String>,
    /// Price per ticket in whole currency units
    pub ticket_price: f64,
    pub currency: Currency,
    pub ticket_supply: u64,
    /// Never decreases and never exceeds `ticket_supply`
    pub tickets_sold: u64,
    pub limit_per_wallet: u64,
    pub created_at: UnixTimestamp,
    pub end_time: UnixTimestamp,
    pub creator: Pubkey,
    pub winner: Option<Pubkey>,
    /// Updated out of band by the floor-price job
    pub floor_price: Option<f64>,
    pub status: RaffleStatus,
    pub prize_mint: Option<Pubkey>,
    pub token_prize: Option<TokenPrize>,
}

impl Raffle {
    /// Check if the raffle end time has passed
    pub fn has_ended(&self, current_time: UnixTimestamp) -> bool {
        current_time >= self.end_time
    }

    pub fn phase(&self, current_time: UnixTimestamp) -> RafflePhase {
        if self.winner.is_some() || self.status == RaffleStatus::Ended {
            RafflePhase::Ended
        } else if self.has_ended(current_time) {
            RafflePhase::ExpiredPendingDraw
        } else {
            RafflePhase::Active
        }
    }

    pub fn remaining_tickets(&self) -> u64 {
        self.ticket_supply.saturating_sub(self.tickets_sold)
    }

    pub fn is_sold_out(&self) -> bool {
        self.tickets_sold >= self.ticket_supply
    }

    /// Wallet cap, treating an unset limit as one ticket
    pub fn wallet_limit(&self) -> u64 {
        self.limit_per_wallet.max(1)
    }

    pub fn is_token_only(&self) -> bool {
        self.prize_mint.is_none() && self.token_prize.is_some()
    }

    /// Bullet list describing the prize
    pub fn prize_description(&self) -> String {
        let mut description = format!("• {}", self.name);
        if let Some(prize) = &self.token_prize {
            description.push_str(&format!("\n• {} {}", prize.amount, prize.symbol));
        }
        description
    }
}

/// Raffle row as inserted by the creation flow
#[derive(Clone, Debug, PartialEq)]
pub struct NewRaffle {
    pub name: String,
    pub image: Option<String>,
    pub ticket_price: f64,
    pub currency: Currency,
    pub ticket_supply: u64,
    pub limit_per_wallet: u64,
    pub end_time: UnixTimestamp,
    pub creator: Pubkey,
    pub prize_mint: Option<Pubkey>,
    pub token_prize: Option<TokenPrize>,
}

/// Append-only ticket purchase record
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Entry {
    pub raffle_id: RaffleId,
    pub wallet: Pubkey,
    pub quantity: u64,
    pub created_at: UnixTimestamp,
}

/// Priced purchase, alive for one purchase attempt
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingPurchase {
    pub quantity: u64,
    /// Ticket price in smallest currency units
    pub unit_price: u64,
    pub currency: Currency,
    /// Precision used for checked token transfers
    pub decimals: u8,
    pub commission_per_ticket: u64,
    pub creator_per_ticket: u64,
    pub commission_total: u64,
    pub creator_total: u64,
    pub creator: Pubkey,
}

impl PendingPurchase {
    pub fn total(&self) -> u64 {
        self.commission_total + self.creator_total
    }
}
