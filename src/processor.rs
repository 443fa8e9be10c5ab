// Raffle Settlement - Processor
//
// Drives the user-facing flows. Each step of a purchase runs strictly after
// the previous one: eligibility, build, sign, confirm, settle.
use std::str::FromStr;

use solana_program::{clock::UnixTimestamp, pubkey::Pubkey};
use solana_sdk::{commitment_config::CommitmentLevel, signature::Signature};
use tracing::info;

use crate::{
    asset_classifier::Collectible,
    chain::{ChainReader, WalletSigner},
    config::EngineConfig,
    eligibility::{check_eligibility, WalletTickets},
    error::{EngineError, ValidationError},
    notification::{dispatch, NotificationSink, OutboundEvent},
    payment_instruction::{build_purchase, creation_fee_instruction},
    settlement::{SettlementRecorder, SettlementReport},
    state::{Currency, NewRaffle, PendingPurchase, Raffle, RafflePhase, TokenPrize},
    store::RaffleStore,
};

/// Outcome of a paid purchase
///
/// Returned whenever the payment confirmed, even if bookkeeping failed;
/// `settlement` says what the store accepted.
#[derive(Debug)]
pub struct PurchaseReceipt {
    pub signature: Signature,
    pub pending: PendingPurchase,
    pub settlement: SettlementReport,
}

/// Raffle as entered in the creation form
#[derive(Clone, Debug, PartialEq)]
pub struct RaffleDraft {
    /// Collectible put up as the prize
    pub prize: Option<Collectible>,
    /// Fungible prize, alone or alongside the collectible
    pub token_prize: Option<TokenPrize>,
    pub ticket_price: f64,
    pub currency: Currency,
    pub ticket_supply: u64,
    pub limit_per_wallet: u64,
    pub end_time: UnixTimestamp,
    /// Collections whose holders alone may enter; non-empty raises the fee
    pub holder_collections: Vec<String>,
    pub terms_accepted: bool,
}

impl RaffleDraft {
    pub fn is_holder_only(&self) -> bool {
        !self.holder_collections.is_empty()
    }

    /// Collectible name, or "<amount> <symbol>" for a token-only prize
    pub fn display_name(&self) -> Option<String> {
        match (&self.prize, &self.token_prize) {
            (Some(collectible), _) => Some(collectible.name.clone()),
            (None, Some(token)) => Some(format!("{} {}", token.amount, token.symbol)),
            (None, None) => None,
        }
    }

    fn prize_mint(&self, collectible: &Collectible) -> Result<Pubkey, ValidationError> {
        Pubkey::from_str(&collectible.mint)
            .map_err(|_| ValidationError::InvalidPrizeMint(collectible.mint.clone()))
    }

    pub fn validate(
        &self,
        config: &EngineConfig,
        creator: &Pubkey,
        now: UnixTimestamp,
    ) -> Result<(), ValidationError> {
        if !self.terms_accepted {
            return Err(ValidationError::TermsNotAccepted);
        }
        if !config.is_authorized_creator(creator) {
            return Err(ValidationError::UnauthorizedCreator(*creator));
        }
        if self.prize.is_none() && self.token_prize.is_none() {
            return Err(ValidationError::MissingPrize);
        }
        if let Some(collectible) = &self.prize {
            self.prize_mint(collectible)?;
        }
        if let Some(token) = &self.token_prize {
            if !(token.amount > 0.0) {
                return Err(ValidationError::InvalidTokenAmount);
            }
        }
        if !(self.ticket_price > 0.0) || !self.ticket_price.is_finite() {
            return Err(ValidationError::InvalidPrice);
        }
        if self.ticket_supply < config.min_ticket_supply {
            return Err(ValidationError::SupplyTooLow {
                minimum: config.min_ticket_supply,
            });
        }
        if self.limit_per_wallet == 0 {
            return Err(ValidationError::InvalidWalletLimit);
        }
        if self.end_time <= now {
            return Err(ValidationError::EndTimeInPast);
        }
        Ok(())
    }
}

pub struct Processor<'a, C, W, S, N> {
    config: &'a EngineConfig,
    chain: &'a C,
    wallet: &'a W,
    store: &'a S,
    sink: &'a N,
}

impl<'a, C, W, S, N> Processor<'a, C, W, S, N>
where
    C: ChainReader,
    W: WalletSigner,
    S: RaffleStore,
    N: NotificationSink,
{
    pub fn new(
        config: &'a EngineConfig,
        chain: &'a C,
        wallet: &'a W,
        store: &'a S,
        sink: &'a N,
    ) -> Self {
        Self {
            config,
            chain,
            wallet,
            store,
            sink,
        }
    }

    /// Buy `quantity` tickets of `raffle` with the connected wallet
    ///
    /// Fails without side effects up to and including confirmation. Once the
    /// payment is confirmed the purchase succeeds, whatever the store does.
    pub async fn purchase_tickets(
        &self,
        raffle: &Raffle,
        quantity: u64,
        tickets: &mut WalletTickets,
        now: UnixTimestamp,
    ) -> Result<PurchaseReceipt, EngineError> {
        if quantity == 0 {
            return Err(ValidationError::InvalidQuantity.into());
        }
        if raffle.phase(now) != RafflePhase::Active {
            return Err(ValidationError::RaffleNotActive.into());
        }
        check_eligibility(raffle, quantity, tickets.prior(&raffle.id))?;

        let buyer = self.wallet.pubkey();
        let built = build_purchase(self.chain, self.config, raffle, quantity, &buyer).await?;
        info!(
            "Requesting signature for {} ticket(s) of raffle {} ({} instruction(s))",
            quantity,
            raffle.id,
            built.instructions.len()
        );

        let signature = self.wallet.send_transaction(&built.instructions).await?;
        self.wallet
            .confirm(&signature, CommitmentLevel::Processed)
            .await?;
        info!("Payment {} confirmed for raffle {}", signature, raffle.id);

        let settlement = SettlementRecorder::new(self.store)
            .record(&raffle.id, &buyer, quantity, now)
            .await;
        tickets.record(&raffle.id, quantity);

        Ok(PurchaseReceipt {
            signature,
            pending: built.pending,
            settlement,
        })
    }

    /// Pay the creation fee, insert the raffle and announce it
    pub async fn create_raffle(
        &self,
        draft: RaffleDraft,
        now: UnixTimestamp,
    ) -> Result<Raffle, EngineError> {
        let creator = self.wallet.pubkey();
        draft.validate(self.config, &creator, now)?;
        let name = draft.display_name().ok_or(ValidationError::MissingPrize)?;

        let fee = creation_fee_instruction(self.config, &creator, draft.is_holder_only());
        let signature = self.wallet.send_transaction(&[fee]).await?;
        self.wallet
            .confirm(&signature, CommitmentLevel::Processed)
            .await?;
        info!("Creation fee {} confirmed for {}", signature, creator);

        let prize_mint = match &draft.prize {
            Some(collectible) => Some(draft.prize_mint(collectible)?),
            None => None,
        };
        let image = draft
            .prize
            .as_ref()
            .and_then(|collectible| collectible.image.clone());
        let raffle = self
            .store
            .insert_raffle(NewRaffle {
                name,
                image,
                ticket_price: draft.ticket_price,
                currency: draft.currency,
                ticket_supply: draft.ticket_supply,
                limit_per_wallet: draft.limit_per_wallet,
                end_time: draft.end_time,
                creator,
                prize_mint,
                token_prize: draft.token_prize,
            })
            .await?;
        info!("Raffle {} created by {}", raffle.id, creator);

        dispatch(self.sink, &OutboundEvent::created(&raffle)).await;
        Ok(raffle)
    }
}
