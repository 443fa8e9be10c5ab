// Raffle Settlement - Ticket payment instructions
use solana_program::{instruction::Instruction, pubkey::Pubkey, system_instruction};
use spl_associated_token_account::{
    get_associated_token_address_with_program_id, instruction::create_associated_token_account,
};
use tracing::{debug, info, warn};

use crate::{
    chain::{account_exists, fetch_mint_info, ChainReader, MintInfo},
    config::EngineConfig,
    error::{EngineError, ValidationError},
    state::{Currency, PendingPurchase, Raffle},
    utils::{split_ticket_price, to_smallest_units, unit_scale},
};

/// Priced purchase together with the ordered instructions that pay for it
#[derive(Clone, Debug, PartialEq)]
pub struct BuiltPurchase {
    pub pending: PendingPurchase,
    pub instructions: Vec<Instruction>,
}

/// Price `quantity` tickets of `raffle` in smallest units of a currency with `scale`
///
/// Commission is floored per ticket and only then multiplied, so each ticket
/// carries the same split and totals never exceed `quantity * unit_price`.
pub fn price_purchase(
    raffle: &Raffle,
    quantity: u64,
    scale: u64,
    decimals: u8,
    commission_basis_points: u16,
) -> Result<PendingPurchase, ValidationError> {
    if quantity == 0 {
        return Err(ValidationError::InvalidQuantity);
    }
    let unit_price =
        to_smallest_units(raffle.ticket_price, scale).ok_or(ValidationError::InvalidPrice)?;
    let (commission_per_ticket, creator_per_ticket) =
        split_ticket_price(unit_price, commission_basis_points);

    let commission_total = commission_per_ticket
        .checked_mul(quantity)
        .ok_or(ValidationError::AmountOverflow)?;
    let creator_total = creator_per_ticket
        .checked_mul(quantity)
        .ok_or(ValidationError::AmountOverflow)?;
    commission_total
        .checked_add(creator_total)
        .ok_or(ValidationError::AmountOverflow)?;

    Ok(PendingPurchase {
        quantity,
        unit_price,
        currency: raffle.currency.clone(),
        decimals,
        commission_per_ticket,
        creator_per_ticket,
        commission_total,
        creator_total,
        creator: raffle.creator,
    })
}

/// `[commission -> treasury (if > 0), remainder -> creator]` in lamports
pub fn native_payment_instructions(
    buyer: &Pubkey,
    treasury: &Pubkey,
    purchase: &PendingPurchase,
) -> Vec<Instruction> {
    let mut instructions = Vec::with_capacity(2);
    if purchase.commission_total > 0 {
        instructions.push(system_instruction::transfer(
            buyer,
            treasury,
            purchase.commission_total,
        ));
    }
    instructions.push(system_instruction::transfer(
        buyer,
        &purchase.creator,
        purchase.creator_total,
    ));
    instructions
}

/// Associated token accounts involved in a token payment
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PaymentAccounts {
    pub buyer: Pubkey,
    pub treasury: Pubkey,
    pub creator: Pubkey,
    pub treasury_exists: bool,
    pub creator_exists: bool,
}

impl PaymentAccounts {
    /// Derive the three associated accounts under the mint's owning program
    pub fn derive(
        buyer: &Pubkey,
        treasury: &Pubkey,
        creator: &Pubkey,
        mint: &Pubkey,
        token_program: &Pubkey,
    ) -> Self {
        Self {
            buyer: get_associated_token_address_with_program_id(buyer, mint, token_program),
            treasury: get_associated_token_address_with_program_id(treasury, mint, token_program),
            creator: get_associated_token_address_with_program_id(creator, mint, token_program),
            treasury_exists: true,
            creator_exists: true,
        }
    }
}

/// Account creations funded by the buyer, then checked transfers
pub fn token_payment_instructions(
    buyer: &Pubkey,
    treasury: &Pubkey,
    mint: &Pubkey,
    mint_info: &MintInfo,
    accounts: &PaymentAccounts,
    purchase: &PendingPurchase,
) -> Result<Vec<Instruction>, EngineError> {
    let token_program = &mint_info.token_program;
    let mut instructions = Vec::with_capacity(4);

    if !accounts.treasury_exists {
        debug!("Creating treasury token account {}", accounts.treasury);
        instructions.push(create_associated_token_account(
            buyer,
            treasury,
            mint,
            token_program,
        ));
    }
    // Creator and treasury can be the same wallet
    if !accounts.creator_exists && accounts.creator != accounts.treasury {
        debug!("Creating creator token account {}", accounts.creator);
        instructions.push(create_associated_token_account(
            buyer,
            &purchase.creator,
            mint,
            token_program,
        ));
    }

    if purchase.commission_total > 0 {
        instructions.push(spl_token_2022::instruction::transfer_checked(
            token_program,
            &accounts.buyer,
            mint,
            &accounts.treasury,
            buyer,
            &[],
            purchase.commission_total,
            mint_info.decimals,
        )?);
    }
    instructions.push(spl_token_2022::instruction::transfer_checked(
        token_program,
        &accounts.buyer,
        mint,
        &accounts.creator,
        buyer,
        &[],
        purchase.creator_total,
        mint_info.decimals,
    )?);

    Ok(instructions)
}

/// Price a purchase and build the instruction sequence paying for it
///
/// Only reads the chain (mint info and account existence); nothing is
/// submitted.
pub async fn build_purchase<C: ChainReader>(
    chain: &C,
    config: &EngineConfig,
    raffle: &Raffle,
    quantity: u64,
    buyer: &Pubkey,
) -> Result<BuiltPurchase, EngineError> {
    let treasury = &config.treasury;

    match &raffle.currency {
        Currency::Native => {
            let pending = price_purchase(
                raffle,
                quantity,
                config.native_unit_scale,
                0,
                config.commission_basis_points,
            )?;
            info!(
                "Native purchase of {} ticket(s): commission {} / creator {} lamports",
                quantity, pending.commission_total, pending.creator_total
            );
            let instructions = native_payment_instructions(buyer, treasury, &pending);
            Ok(BuiltPurchase {
                pending,
                instructions,
            })
        }
        Currency::Token { mint, symbol } => {
            let mint_info = match fetch_mint_info(chain, mint).await {
                Ok(info) => info,
                Err(e) => {
                    warn!(
                        "Mint lookup for {} failed ({}), assuming {} decimals under the legacy token program",
                        mint, e, config.fallback_token_decimals
                    );
                    MintInfo {
                        token_program: spl_token::id(),
                        decimals: config.fallback_token_decimals,
                    }
                }
            };
            let scale = unit_scale(mint_info.decimals).ok_or(ValidationError::InvalidPrice)?;
            let pending = price_purchase(
                raffle,
                quantity,
                scale,
                mint_info.decimals,
                config.commission_basis_points,
            )?;

            let mut accounts = PaymentAccounts::derive(
                buyer,
                treasury,
                &raffle.creator,
                mint,
                &mint_info.token_program,
            );
            if !account_exists(chain, &accounts.buyer).await? {
                warn!("Buyer {} has no {} token account", buyer, symbol);
                return Err(EngineError::InsufficientFunds {
                    symbol: symbol.clone(),
                });
            }
            accounts.treasury_exists = account_exists(chain, &accounts.treasury).await?;
            accounts.creator_exists = accounts.creator == accounts.buyer
                || account_exists(chain, &accounts.creator).await?;

            info!(
                "{} purchase of {} ticket(s): commission {} / creator {} (decimals {})",
                symbol,
                quantity,
                pending.commission_total,
                pending.creator_total,
                mint_info.decimals
            );
            let instructions =
                token_payment_instructions(buyer, treasury, mint, &mint_info, &accounts, &pending)?;
            Ok(BuiltPurchase {
                pending,
                instructions,
            })
        }
    }
}

/// Placeholder creation-fee transfer standing in for prize escrow
pub fn creation_fee_instruction(
    config: &EngineConfig,
    creator: &Pubkey,
    holder_only: bool,
) -> Instruction {
    let mut fee = config.creation_fee_lamports;
    if holder_only {
        fee = fee.saturating_add(config.holder_only_fee_lamports);
    }
    system_instruction::transfer(creator, &config.treasury, fee)
}
