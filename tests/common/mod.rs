// Raffle Settlement - Test fakes
#![allow(dead_code)]

use std::{
    cell::{Cell, RefCell},
    collections::HashMap,
};

use raffle_settlement::{
    chain::{ChainReader, WalletSigner},
    error::{ChainError, IndexerError, OracleError, SinkError, StoreError, WalletError},
    floor_price::FloorPriceOracle,
    indexer::JsonRpcTransport,
    notification::{NotificationSink, OutboundEvent},
    state::{Currency, Entry, NewRaffle, Raffle, RaffleId, RaffleStatus},
    store::{RaffleStore, RecentEntry},
};
use serde_json::{json, Value};
use solana_program::{
    clock::UnixTimestamp, instruction::Instruction, program_option::COption, program_pack::Pack,
    pubkey::Pubkey,
};
use solana_program_test::BanksClient;
use solana_sdk::{
    account::Account,
    commitment_config::CommitmentLevel,
    signature::{Keypair, Signature, Signer},
    transaction::Transaction,
};
use spl_token::state::{Account as TokenAccount, AccountState, Mint};
use tokio::sync::Mutex;

pub const NOW: UnixTimestamp = 1_700_000_000;

/// Native raffle open for an hour, 10 tickets, 5 per wallet, 1 SOL each
pub fn raffle(id: &str, creator: Pubkey) -> Raffle {
    Raffle {
        id: id.to_string(),
        name: format!("Prize {}", id),
        image: Some(format!("https://img.example/{}.png", id)),
        ticket_price: 1.0,
        currency: Currency::Native,
        ticket_supply: 10,
        tickets_sold: 0,
        limit_per_wallet: 5,
        created_at: NOW - 600,
        end_time: NOW + 3_600,
        creator,
        winner: None,
        floor_price: None,
        status: RaffleStatus::Active,
        prize_mint: Some(Pubkey::new_unique()),
        token_prize: None,
    }
}

pub fn entry(raffle_id: &str, wallet: Pubkey, quantity: u64) -> Entry {
    Entry {
        raffle_id: raffle_id.to_string(),
        wallet,
        quantity,
        created_at: NOW,
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// In-memory `RaffleStore`; the draw picks the first entrant and is idempotent
#[derive(Default)]
pub struct MemoryStore {
    pub raffles: RefCell<Vec<Raffle>>,
    pub entries: RefCell<Vec<Entry>>,
    pub draw_calls: RefCell<Vec<RaffleId>>,
    pub transactional: bool,
    pub fail_increment: Cell<bool>,
    pub fail_insert_entry: Cell<bool>,
    pub fail_draw: Cell<bool>,
    pub fail_expired_query: Cell<bool>,
    next_id: Cell<u64>,
}

impl MemoryStore {
    pub fn with_raffles(raffles: Vec<Raffle>) -> Self {
        Self {
            raffles: RefCell::new(raffles),
            ..Self::default()
        }
    }

    pub fn transactional(raffles: Vec<Raffle>) -> Self {
        Self {
            transactional: true,
            ..Self::with_raffles(raffles)
        }
    }

    pub fn raffle(&self, id: &str) -> Option<Raffle> {
        self.raffles.borrow().iter().find(|r| r.id == id).cloned()
    }

    pub fn add_entry(&self, entry: Entry) {
        self.entries.borrow_mut().push(entry);
    }

    fn bump_sold(&self, id: &str, delta: u64) -> Result<(), StoreError> {
        let mut raffles = self.raffles.borrow_mut();
        let raffle = raffles
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        if raffle.tickets_sold + delta > raffle.ticket_supply {
            return Err(StoreError::Request("sold out".to_string()));
        }
        raffle.tickets_sold += delta;
        Ok(())
    }
}

impl RaffleStore for MemoryStore {
    async fn list_raffles(&self) -> Result<Vec<Raffle>, StoreError> {
        let mut raffles = self.raffles.borrow().clone();
        raffles.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(raffles)
    }

    async fn list_expired_active(&self, now: UnixTimestamp) -> Result<Vec<RaffleId>, StoreError> {
        if self.fail_expired_query.get() {
            return Err(StoreError::Request("query timed out".to_string()));
        }
        Ok(self
            .raffles
            .borrow()
            .iter()
            .filter(|r| r.status == RaffleStatus::Active && r.end_time <= now)
            .map(|r| r.id.clone())
            .collect())
    }

    async fn get_raffle(&self, id: &str) -> Result<Option<Raffle>, StoreError> {
        Ok(self.raffle(id))
    }

    async fn insert_raffle(&self, raffle: NewRaffle) -> Result<Raffle, StoreError> {
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        let row = Raffle {
            id: format!("raffle-{}", id),
            name: raffle.name,
            image: raffle.image,
            ticket_price: raffle.ticket_price,
            currency: raffle.currency,
            ticket_supply: raffle.ticket_supply,
            tickets_sold: 0,
            limit_per_wallet: raffle.limit_per_wallet,
            created_at: NOW,
            end_time: raffle.end_time,
            creator: raffle.creator,
            winner: None,
            floor_price: None,
            status: RaffleStatus::Active,
            prize_mint: raffle.prize_mint,
            token_prize: raffle.token_prize,
        };
        self.raffles.borrow_mut().push(row.clone());
        Ok(row)
    }

    async fn pick_raffle_winner(&self, id: &str) -> Result<Option<Pubkey>, StoreError> {
        self.draw_calls.borrow_mut().push(id.to_string());
        if self.fail_draw.get() {
            return Err(StoreError::Request("draw procedure failed".to_string()));
        }
        let first_entrant = self
            .entries
            .borrow()
            .iter()
            .find(|e| e.raffle_id == id)
            .map(|e| e.wallet);

        let mut raffles = self.raffles.borrow_mut();
        let raffle = raffles
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        if raffle.status == RaffleStatus::Ended {
            return Ok(raffle.winner);
        }
        raffle.winner = first_entrant;
        raffle.status = RaffleStatus::Ended;
        Ok(raffle.winner)
    }

    async fn increment_ticket_sold(&self, id: &str, delta: u64) -> Result<(), StoreError> {
        if self.fail_increment.get() {
            return Err(StoreError::Request("increment rejected".to_string()));
        }
        self.bump_sold(id, delta)
    }

    async fn insert_entry(&self, entry: Entry) -> Result<(), StoreError> {
        if self.fail_insert_entry.get() {
            return Err(StoreError::Request("insert rejected".to_string()));
        }
        self.add_entry(entry);
        Ok(())
    }

    async fn entries_for_raffle(&self, id: &str) -> Result<Vec<Entry>, StoreError> {
        Ok(self
            .entries
            .borrow()
            .iter()
            .filter(|e| e.raffle_id == id)
            .cloned()
            .collect())
    }

    async fn entries_for_wallet(&self, wallet: &Pubkey) -> Result<Vec<Entry>, StoreError> {
        Ok(self
            .entries
            .borrow()
            .iter()
            .filter(|e| e.wallet == *wallet)
            .cloned()
            .collect())
    }

    async fn recent_entries(&self, limit: usize) -> Result<Vec<RecentEntry>, StoreError> {
        Ok(self
            .entries
            .borrow()
            .iter()
            .rev()
            .take(limit)
            .map(|e| RecentEntry {
                wallet: e.wallet,
                quantity: e.quantity,
                raffle_name: self.raffle(&e.raffle_id).map(|r| r.name),
            })
            .collect())
    }

    async fn update_floor_price(&self, id: &str, floor_price: f64) -> Result<(), StoreError> {
        let mut raffles = self.raffles.borrow_mut();
        let raffle = raffles
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        raffle.floor_price = Some(floor_price);
        Ok(())
    }

    fn supports_transactional_settlement(&self) -> bool {
        self.transactional
    }

    async fn record_purchase(&self, entry: Entry) -> Result<(), StoreError> {
        if !self.transactional {
            return Err(StoreError::Unsupported);
        }
        self.bump_sold(&entry.raffle_id, entry.quantity)?;
        self.add_entry(entry);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Chain
// ---------------------------------------------------------------------------

/// Account map standing in for RPC reads
#[derive(Default)]
pub struct MemoryChain {
    pub accounts: RefCell<HashMap<Pubkey, Account>>,
    pub fail_reads: Cell<bool>,
}

impl MemoryChain {
    pub fn add_mint(&self, mint: &Pubkey, decimals: u8, token_program: &Pubkey) {
        self.accounts
            .borrow_mut()
            .insert(*mint, mint_account(decimals, token_program));
    }

    pub fn add_token_account(
        &self,
        address: &Pubkey,
        owner: &Pubkey,
        mint: &Pubkey,
        amount: u64,
        token_program: &Pubkey,
        frozen: bool,
    ) {
        self.accounts.borrow_mut().insert(
            *address,
            token_account(owner, mint, amount, token_program, frozen),
        );
    }
}

impl ChainReader for MemoryChain {
    async fn get_account(&self, address: &Pubkey) -> Result<Option<Account>, ChainError> {
        if self.fail_reads.get() {
            return Err(ChainError::Rpc("node unreachable".to_string()));
        }
        Ok(self.accounts.borrow().get(address).cloned())
    }

    async fn token_accounts_by_owner(
        &self,
        owner: &Pubkey,
        token_program: &Pubkey,
    ) -> Result<Vec<(Pubkey, Account)>, ChainError> {
        if self.fail_reads.get() {
            return Err(ChainError::Rpc("node unreachable".to_string()));
        }
        Ok(self
            .accounts
            .borrow()
            .iter()
            .filter(|(_, account)| account.owner == *token_program)
            .filter(|(_, account)| {
                TokenAccount::unpack(&account.data).map_or(false, |state| state.owner == *owner)
            })
            .map(|(address, account)| (*address, account.clone()))
            .collect())
    }
}

pub fn mint_account(decimals: u8, token_program: &Pubkey) -> Account {
    let mut data = vec![0; Mint::LEN];
    Mint::pack(
        Mint {
            mint_authority: COption::None,
            supply: 1_000_000_000_000,
            decimals,
            is_initialized: true,
            freeze_authority: COption::None,
        },
        &mut data,
    )
    .unwrap();
    Account {
        lamports: 1_461_600,
        data,
        owner: *token_program,
        executable: false,
        rent_epoch: 0,
    }
}

pub fn token_account(
    owner: &Pubkey,
    mint: &Pubkey,
    amount: u64,
    token_program: &Pubkey,
    frozen: bool,
) -> Account {
    let mut data = vec![0; TokenAccount::LEN];
    TokenAccount::pack(
        TokenAccount {
            mint: *mint,
            owner: *owner,
            amount,
            delegate: COption::None,
            state: if frozen {
                AccountState::Frozen
            } else {
                AccountState::Initialized
            },
            is_native: COption::None,
            delegated_amount: 0,
            close_authority: COption::None,
        },
        &mut data,
    )
    .unwrap();
    Account {
        lamports: 2_039_280,
        data,
        owner: *token_program,
        executable: false,
        rent_epoch: 0,
    }
}

// ---------------------------------------------------------------------------
// Wallet
// ---------------------------------------------------------------------------

/// Signer that records what it was asked to sign
pub struct FakeWallet {
    pub keypair: Keypair,
    pub sent: RefCell<Vec<Vec<Instruction>>>,
    pub reject: Cell<bool>,
    pub fail_confirm: Cell<bool>,
}

impl FakeWallet {
    pub fn new() -> Self {
        Self {
            keypair: Keypair::new(),
            sent: RefCell::new(Vec::new()),
            reject: Cell::new(false),
            fail_confirm: Cell::new(false),
        }
    }
}

impl WalletSigner for FakeWallet {
    fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    async fn send_transaction(&self, instructions: &[Instruction]) -> Result<Signature, WalletError> {
        if self.reject.get() {
            return Err(WalletError::Rejected);
        }
        self.sent.borrow_mut().push(instructions.to_vec());
        Ok(Signature::new_unique())
    }

    async fn confirm(
        &self,
        _signature: &Signature,
        _commitment: CommitmentLevel,
    ) -> Result<(), ChainError> {
        if self.fail_confirm.get() {
            return Err(ChainError::Confirmation("blockhash expired".to_string()));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Banks adapters
// ---------------------------------------------------------------------------

/// `ChainReader` over a `solana-program-test` bank
pub struct BanksChain {
    pub client: Mutex<BanksClient>,
}

impl ChainReader for BanksChain {
    async fn get_account(&self, address: &Pubkey) -> Result<Option<Account>, ChainError> {
        self.client
            .lock()
            .await
            .get_account(*address)
            .await
            .map_err(|e| ChainError::Rpc(e.to_string()))
    }

    async fn token_accounts_by_owner(
        &self,
        _owner: &Pubkey,
        _token_program: &Pubkey,
    ) -> Result<Vec<(Pubkey, Account)>, ChainError> {
        Err(ChainError::Rpc("program-owned account scans are not served by banks".to_string()))
    }
}

/// Wallet that signs with a keypair and processes against a bank
pub struct BanksWallet {
    pub client: Mutex<BanksClient>,
    pub payer: Keypair,
}

impl WalletSigner for BanksWallet {
    fn pubkey(&self) -> Pubkey {
        self.payer.pubkey()
    }

    async fn send_transaction(&self, instructions: &[Instruction]) -> Result<Signature, WalletError> {
        let mut client = self.client.lock().await;
        let blockhash = client
            .get_latest_blockhash()
            .await
            .map_err(|e| WalletError::Unavailable(e.to_string()))?;
        let transaction = Transaction::new_signed_with_payer(
            instructions,
            Some(&self.payer.pubkey()),
            &[&self.payer],
            blockhash,
        );
        let signature = transaction.signatures[0];
        client
            .process_transaction(transaction)
            .await
            .map_err(|e| WalletError::Unavailable(e.to_string()))?;
        Ok(signature)
    }

    /// `process_transaction` already waited for the bank to commit
    async fn confirm(
        &self,
        _signature: &Signature,
        _commitment: CommitmentLevel,
    ) -> Result<(), ChainError> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Sink, indexer transport, oracle
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct RecordingSink {
    pub events: RefCell<Vec<OutboundEvent>>,
    pub fail: Cell<bool>,
}

impl RecordingSink {
    pub fn ended_ids(&self) -> Vec<String> {
        self.events
            .borrow()
            .iter()
            .filter(|e| matches!(e, OutboundEvent::RaffleEnded { .. }))
            .map(|e| e.raffle_id().to_string())
            .collect()
    }
}

impl NotificationSink for RecordingSink {
    async fn deliver(&self, event: &OutboundEvent) -> Result<(), SinkError> {
        if self.fail.get() {
            return Err(SinkError("webhook returned 500".to_string()));
        }
        self.events.borrow_mut().push(event.clone());
        Ok(())
    }
}

/// Serves canned DAS pages keyed by the requested page number
#[derive(Default)]
pub struct FakeTransport {
    pub pages: HashMap<u64, Result<Value, IndexerError>>,
    pub requests: RefCell<Vec<Value>>,
}

impl FakeTransport {
    pub fn with_page(mut self, page: u64, items: Value) -> Self {
        self.pages
            .insert(page, Ok(json!({ "jsonrpc": "2.0", "id": "1", "result": { "items": items } })));
        self
    }

    pub fn with_reply(mut self, page: u64, reply: Result<Value, IndexerError>) -> Self {
        self.pages.insert(page, reply);
        self
    }
}

impl JsonRpcTransport for FakeTransport {
    async fn post(&self, body: &Value) -> Result<Value, IndexerError> {
        self.requests.borrow_mut().push(body.clone());
        let page = body["params"]["page"].as_u64().unwrap_or(1);
        match self.pages.get(&page) {
            Some(reply) => reply.clone(),
            None => Ok(json!({ "jsonrpc": "2.0", "id": "1", "result": { "items": [] } })),
        }
    }
}

pub struct FakeOracle {
    pub symbol: Option<String>,
    pub floor_lamports: Result<u64, OracleError>,
}

impl FloorPriceOracle for FakeOracle {
    async fn collection_symbol(&self, _mint: &Pubkey) -> Result<Option<String>, OracleError> {
        Ok(self.symbol.clone())
    }

    async fn floor_lamports(&self, _symbol: &str) -> Result<u64, OracleError> {
        self.floor_lamports.clone()
    }
}
