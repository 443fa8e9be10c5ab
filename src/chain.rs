// Raffle Settlement - Chain access
//
// Read-only RPC lookups and the wallet signer. Both are external; the engine
// only depends on these traits.
use solana_program::{instruction::Instruction, program_pack::Pack, pubkey::Pubkey};
use solana_sdk::{account::Account, commitment_config::CommitmentLevel, signature::Signature};
use spl_token_2022::{
    extension::StateWithExtensions,
    state::{Account as TokenAccount, AccountState, Mint},
};
use tracing::debug;

use crate::error::{ChainError, WalletError};

/// Read-only blockchain RPC
#[allow(async_fn_in_trait)]
pub trait ChainReader {
    /// Fetch an account, `None` when it does not exist
    async fn get_account(&self, address: &Pubkey) -> Result<Option<Account>, ChainError>;

    /// Every token account held by `owner` under `token_program`
    async fn token_accounts_by_owner(
        &self,
        owner: &Pubkey,
        token_program: &Pubkey,
    ) -> Result<Vec<(Pubkey, Account)>, ChainError>;
}

/// Wallet that signs and submits transactions for the connected user
#[allow(async_fn_in_trait)]
pub trait WalletSigner {
    /// Connected wallet address; pays for every instruction it signs
    fn pubkey(&self) -> Pubkey;

    /// Prompt the user to sign and submit `instructions` as one transaction
    async fn send_transaction(&self, instructions: &[Instruction])
        -> Result<Signature, WalletError>;

    /// Wait until `signature` reaches `commitment`
    async fn confirm(
        &self,
        signature: &Signature,
        commitment: CommitmentLevel,
    ) -> Result<(), ChainError>;
}

/// Both token programs a mint or token account may live under
pub fn token_program_ids() -> [Pubkey; 2] {
    [spl_token::id(), spl_token_2022::id()]
}

pub fn is_token_program(program_id: &Pubkey) -> bool {
    token_program_ids().contains(program_id)
}

/// Owning program and precision of a mint
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MintInfo {
    pub token_program: Pubkey,
    pub decimals: u8,
}

/// Read a mint under whichever token program actually owns it
pub async fn fetch_mint_info<C: ChainReader>(
    chain: &C,
    mint: &Pubkey,
) -> Result<MintInfo, ChainError> {
    let account = chain
        .get_account(mint)
        .await?
        .ok_or(ChainError::AccountNotFound(*mint))?;

    if !is_token_program(&account.owner) {
        return Err(ChainError::NotTokenProgramOwned(*mint));
    }

    let state = StateWithExtensions::<Mint>::unpack(&account.data)
        .map_err(|_| ChainError::InvalidAccountData(*mint))?;

    debug!(
        "Mint {} owned by {} with {} decimals",
        mint, account.owner, state.base.decimals
    );
    Ok(MintInfo {
        token_program: account.owner,
        decimals: state.base.decimals,
    })
}

pub async fn account_exists<C: ChainReader>(
    chain: &C,
    address: &Pubkey,
) -> Result<bool, ChainError> {
    Ok(chain.get_account(address).await?.is_some())
}

/// Decoded token account balance
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TokenHolding {
    pub address: Pubkey,
    pub mint: Pubkey,
    pub amount: u64,
    pub frozen: bool,
}

pub fn parse_token_account(address: &Pubkey, account: &Account) -> Result<TokenHolding, ChainError> {
    if !is_token_program(&account.owner) || account.data.len() < TokenAccount::LEN {
        return Err(ChainError::InvalidAccountData(*address));
    }
    let state = StateWithExtensions::<TokenAccount>::unpack(&account.data)
        .map_err(|_| ChainError::InvalidAccountData(*address))?;

    Ok(TokenHolding {
        address: *address,
        mint: state.base.mint,
        amount: state.base.amount,
        frozen: state.base.state == AccountState::Frozen,
    })
}
