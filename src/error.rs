// Raffle Settlement - Errors
use solana_program::{program_error::ProgramError, pubkey::Pubkey};
use thiserror::Error;

/// Bad input shape, surfaced immediately and never retried
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Quantity below one ticket
    #[error("Ticket quantity must be at least 1")]
    InvalidQuantity,

    /// Price is negative, NaN or not representable in smallest units
    #[error("Please enter a valid ticket price")]
    InvalidPrice,

    /// Supply below the configured minimum
    #[error("Minimum ticket supply is {minimum}")]
    SupplyTooLow { minimum: u64 },

    /// Wallet limit of zero
    #[error("Ticket limit per wallet must be at least 1")]
    InvalidWalletLimit,

    /// Neither a collectible nor a token prize was selected
    #[error("Please select at least one prize (NFT or Tokens)")]
    MissingPrize,

    /// Selected collectible carries an unparsable mint address
    #[error("Invalid prize mint {0}")]
    InvalidPrizeMint(String),

    /// Token prize with a non-positive amount
    #[error("Please enter a valid token amount")]
    InvalidTokenAmount,

    /// End time not after creation time
    #[error("Please select an end date in the future")]
    EndTimeInPast,

    /// Creator did not accept the terms
    #[error("You must agree to the Terms & Conditions to create a raffle")]
    TermsNotAccepted,

    /// Creator is not on the configured allowlist
    #[error("Wallet {0} is not authorized to create raffles")]
    UnauthorizedCreator(Pubkey),

    /// Raffle has expired or already has a winner
    #[error("Raffle is no longer accepting purchases")]
    RaffleNotActive,

    /// Early draw requested by someone other than the creator or before sell-out
    #[error("Only the creator of a sold-out raffle can request an early draw")]
    EarlyDrawNotAllowed,

    /// Totals overflow the smallest-unit range
    #[error("Purchase amount overflows")]
    AmountOverflow,
}

/// Purchase rejected by the eligibility guard
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EligibilityError {
    /// Requested more tickets than remain
    #[error("Not enough tickets left! Only {remaining} remaining.")]
    SupplyExceeded { remaining: u64 },

    /// Purchase would push the wallet past its cap
    #[error("{}", wallet_limit_message(.limit, .already_bought))]
    WalletLimitExceeded {
        limit: u64,
        already_bought: u64,
        requested: u64,
    },
}

impl EligibilityError {
    /// True when the wallet cannot buy a single further ticket
    pub fn already_at_limit(&self) -> bool {
        match self {
            Self::WalletLimitExceeded {
                limit,
                already_bought,
                ..
            } => already_bought >= limit,
            Self::SupplyExceeded { .. } => false,
        }
    }

    /// Number of tickets the request goes over the cap by
    pub fn excess(&self) -> u64 {
        match self {
            Self::WalletLimitExceeded {
                limit,
                already_bought,
                requested,
            } => already_bought.saturating_add(*requested).saturating_sub(*limit),
            Self::SupplyExceeded { .. } => 0,
        }
    }
}

fn wallet_limit_message(limit: &u64, already_bought: &u64) -> String {
    if already_bought >= limit {
        format!(
            "You have already reached the limit of {} ticket(s) for this raffle.",
            limit
        )
    } else {
        format!(
            "You can only buy {} more ticket(s). Your limit is {}.",
            limit - already_bought,
            limit
        )
    }
}

/// Wallet signer failures; the flow aborts before any mutation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WalletError {
    /// User closed or declined the signing prompt
    #[error("Transaction was rejected in the wallet")]
    Rejected,

    /// Signer could not be reached
    #[error("Wallet unavailable: {0}")]
    Unavailable(String),
}

/// Blockchain RPC failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    /// Transaction submission failed
    #[error("Transaction submission failed: {0}")]
    Submission(String),

    /// Transaction was submitted but never confirmed
    #[error("Transaction confirmation failed: {0}")]
    Confirmation(String),

    /// Read request failed
    #[error("RPC request failed: {0}")]
    Rpc(String),

    /// Expected account is missing
    #[error("Account {0} not found")]
    AccountNotFound(Pubkey),

    /// Account exists but is not owned by a token program
    #[error("Account {0} is not owned by a token program")]
    NotTokenProgramOwned(Pubkey),

    /// Account data could not be decoded
    #[error("Account {0} has invalid data")]
    InvalidAccountData(Pubkey),
}

/// Remote relational store failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Request failed at the store
    #[error("Store request failed: {0}")]
    Request(String),

    /// Row does not exist
    #[error("Raffle {0} not found")]
    NotFound(String),

    /// Operation is not offered by this store
    #[error("Operation not supported by the store")]
    Unsupported,
}

/// Asset indexer failures; these trigger the fallback strategy
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IndexerError {
    /// HTTP transport failed
    #[error("Indexer transport failed: {0}")]
    Transport(String),

    /// JSON-RPC error object returned
    #[error("Indexer returned error {code}: {message}")]
    Rpc { code: i64, message: String },

    /// Payload does not match the expected shape
    #[error("Invalid indexer response: {0}")]
    Malformed(String),
}

/// Outbound notification sink failures, logged only
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Notification delivery failed: {0}")]
pub struct SinkError(pub String);

/// Floor-price oracle failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OracleError {
    /// Oracle request failed
    #[error("Floor price request failed: {0}")]
    Request(String),

    /// Mint does not belong to a known collection
    #[error("No collection symbol found for mint {0}")]
    NoCollection(Pubkey),
}

/// Malformed configuration value
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid value {value:?} for {key}")]
pub struct ConfigError {
    pub key: &'static str,
    pub value: String,
}

/// Errors returned by engine operations
#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Eligibility(#[from] EligibilityError),

    #[error(transparent)]
    Wallet(#[from] WalletError),

    #[error(transparent)]
    Chain(#[from] ChainError),

    /// Buyer holds no token account for the payment currency
    #[error("You don't have any {symbol} tokens in your wallet")]
    InsufficientFunds { symbol: String },

    /// Post-payment write failed; never reported as a purchase failure
    #[error("Bookkeeping failed after payment: {0}")]
    Bookkeeping(StoreError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Indexer(#[from] IndexerError),

    /// Winner draw failed; retried on the next refresh
    #[error("Winner draw failed for raffle {raffle_id}: {source}")]
    Lifecycle {
        raffle_id: String,
        source: StoreError,
    },

    #[error(transparent)]
    Oracle(#[from] OracleError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// SPL instruction constructor rejected its inputs
    #[error("Failed to build instruction: {0}")]
    Instruction(#[from] ProgramError),
}
