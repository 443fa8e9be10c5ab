// Raffle Settlement - Prize asset classification
use std::collections::HashMap;

use solana_program::pubkey::Pubkey;
use tracing::{debug, info, warn};

use crate::{
    chain::{fetch_mint_info, parse_token_account, token_program_ids, ChainReader, MintInfo},
    config::EngineConfig,
    error::{EngineError, IndexerError},
    indexer::{fetch_all_assets, AssetIndexer, IndexedAsset},
    utils::{prefix, ui_amount},
};

pub const UNCATEGORIZED: &str = "Uncategorized";

/// Interface tags the indexer uses for non-fungible, print and collection assets
const COLLECTIBLE_INTERFACES: [&str; 8] = [
    "V1_NFT",
    "V2_NFT",
    "LEGACY_NFT",
    "ProgrammableNFT",
    "V1_PRINT",
    "MplCoreAsset",
    "MplCoreCollection",
    "Custom",
];

const FUNGIBLE_INTERFACES: [&str; 2] = ["FungibleToken", "FungibleAsset"];

#[derive(Clone, Debug, PartialEq)]
pub struct Collectible {
    pub mint: String,
    pub name: String,
    pub image: Option<String>,
    pub collection: String,
    /// Indexer grouping explicitly ties the asset to a collection
    pub verified: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FungibleToken {
    pub mint: String,
    pub symbol: String,
    pub name: String,
    pub image: Option<String>,
    pub decimals: u8,
    pub raw_balance: u64,
    /// `raw_balance / 10^decimals`
    pub amount: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExclusionReason {
    Burnt,
    Deleted,
    Frozen,
    EmptyBalance,
    Unrecognized,
}

/// Outcome of classifying one indexed asset
#[derive(Clone, Debug, PartialEq)]
pub enum AssetClass {
    Collectible(Collectible),
    FungibleToken(FungibleToken),
    Excluded(ExclusionReason),
}

/// Where a catalog came from
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CatalogSource {
    Indexer,
    TokenAccountScan,
}

/// Prize-eligible holdings of one wallet
#[derive(Clone, Debug, PartialEq)]
pub struct PrizeCatalog {
    pub collectibles: Vec<Collectible>,
    pub tokens: Vec<FungibleToken>,
    pub source: CatalogSource,
}

/// Classify a single asset; first matching rule wins
pub fn classify_asset(asset: &IndexedAsset) -> AssetClass {
    if asset.burnt {
        return AssetClass::Excluded(ExclusionReason::Burnt);
    }
    if asset.deleted {
        return AssetClass::Excluded(ExclusionReason::Deleted);
    }
    if asset.is_frozen() {
        return AssetClass::Excluded(ExclusionReason::Frozen);
    }

    let decimals = asset.decimals();
    if decimals == Some(0) {
        return AssetClass::Collectible(to_collectible(asset));
    }

    // A FungibleAsset tag only makes a collectible at precision 0, handled above
    let interface = asset.interface.as_str();
    if COLLECTIBLE_INTERFACES.contains(&interface) {
        return AssetClass::Collectible(to_collectible(asset));
    }

    let non_fungible_standard = asset
        .metadata()
        .and_then(|m| m.token_standard.as_deref())
        .map_or(false, |s| s.to_ascii_lowercase().contains("nonfungible"));
    if non_fungible_standard {
        return AssetClass::Collectible(to_collectible(asset));
    }

    match decimals {
        Some(d) if d > 0 && FUNGIBLE_INTERFACES.contains(&interface) => {
            let raw_balance = asset
                .token_info
                .as_ref()
                .and_then(|t| t.balance)
                .unwrap_or(0);
            let amount = ui_amount(raw_balance, d);
            if amount <= 0.0 {
                return AssetClass::Excluded(ExclusionReason::EmptyBalance);
            }
            AssetClass::FungibleToken(to_token(asset, d, raw_balance, amount))
        }
        _ => AssetClass::Excluded(ExclusionReason::Unrecognized),
    }
}

/// Best-effort collection name for a collectible
pub fn collection_name(asset: &IndexedAsset) -> String {
    let explicit = asset
        .metadata()
        .and_then(|m| m.collection.as_ref())
        .and_then(|c| c.name.clone());
    let group = asset.collection_group();
    let grouped = group
        .and_then(|g| g.collection_metadata.as_ref())
        .and_then(|c| c.name.clone());

    explicit
        .or(grouped)
        .filter(|n| !n.trim().is_empty())
        .or_else(|| {
            group
                .filter(|g| !g.group_value.is_empty())
                .map(|g| format!("{}...", prefix(&g.group_value, 8)))
        })
        .unwrap_or_else(|| UNCATEGORIZED.to_string())
}

fn to_collectible(asset: &IndexedAsset) -> Collectible {
    let name = asset
        .metadata()
        .and_then(|m| m.name.clone())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| prefix(&asset.id, 8).to_string());

    Collectible {
        mint: asset.id.clone(),
        name,
        image: asset.image(),
        collection: collection_name(asset),
        verified: asset.collection_group().is_some(),
    }
}

fn to_token(asset: &IndexedAsset, decimals: u8, raw_balance: u64, amount: f64) -> FungibleToken {
    let metadata = asset.metadata();
    let symbol = metadata
        .and_then(|m| m.symbol.clone())
        .or_else(|| asset.token_info.as_ref().and_then(|t| t.symbol.clone()))
        .unwrap_or_else(|| prefix(&asset.id, 4).to_string());
    let name = metadata
        .and_then(|m| m.name.clone())
        .unwrap_or_else(|| symbol.clone());

    FungibleToken {
        mint: asset.id.clone(),
        symbol,
        name,
        image: asset.image(),
        decimals,
        raw_balance,
        amount,
    }
}

/// Split raw indexer assets into collectible and token catalogs
pub fn classify(assets: &[IndexedAsset]) -> PrizeCatalog {
    let mut collectibles = Vec::new();
    let mut tokens = Vec::new();

    for asset in assets {
        match classify_asset(asset) {
            AssetClass::Collectible(c) => collectibles.push(c),
            AssetClass::FungibleToken(t) => tokens.push(t),
            AssetClass::Excluded(reason) => debug!("Excluded asset {}: {:?}", asset.id, reason),
        }
    }

    PrizeCatalog {
        collectibles,
        tokens,
        source: CatalogSource::Indexer,
    }
}

/// Collectibles sharing a collection name
#[derive(Clone, Debug, PartialEq)]
pub struct CollectionGroup {
    pub name: String,
    /// Image of the first collectible in the group
    pub cover_image: Option<String>,
    pub items: Vec<Collectible>,
}

impl CollectionGroup {
    pub fn count(&self) -> usize {
        self.items.len()
    }
}

/// Group collectibles by collection, largest group first
pub fn group_by_collection(collectibles: &[Collectible]) -> Vec<CollectionGroup> {
    let mut groups: Vec<CollectionGroup> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for collectible in collectibles {
        let key = if collectible.collection.is_empty() {
            UNCATEGORIZED
        } else {
            collectible.collection.as_str()
        };
        match index.get(key) {
            Some(&i) => groups[i].items.push(collectible.clone()),
            None => {
                index.insert(key, groups.len());
                groups.push(CollectionGroup {
                    name: key.to_string(),
                    cover_image: collectible.image.clone(),
                    items: vec![collectible.clone()],
                });
            }
        }
    }

    groups.sort_by(|a, b| b.count().cmp(&a.count()));
    groups
}

/// Prize-picker filter over collectibles
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CollectibleFilter {
    pub verified_only: bool,
    /// Lowercase substrings that hide a collectible by name
    pub blocked_keywords: Vec<String>,
}

impl CollectibleFilter {
    pub fn from_config(config: &EngineConfig, verified_only: bool) -> Self {
        Self {
            verified_only,
            blocked_keywords: config
                .blocked_keywords
                .iter()
                .map(|k| k.to_lowercase())
                .collect(),
        }
    }

    pub fn allows(&self, collectible: &Collectible) -> bool {
        let name = collectible.name.to_lowercase();
        if self.blocked_keywords.iter().any(|k| name.contains(k.as_str())) {
            return false;
        }
        if self.verified_only && (!collectible.verified || collectible.collection == "None") {
            return false;
        }
        true
    }

    pub fn apply(&self, collectibles: &[Collectible]) -> Vec<Collectible> {
        collectibles
            .iter()
            .filter(|c| self.allows(c))
            .cloned()
            .collect()
    }
}

/// Ways of building a catalog, tried in order until one succeeds
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CatalogStrategy {
    Indexer,
    TokenAccountScan,
}

pub const DEFAULT_STRATEGIES: [CatalogStrategy; 2] =
    [CatalogStrategy::Indexer, CatalogStrategy::TokenAccountScan];

/// Build the prize catalog of `owner`, degrading through `strategies`
pub async fn load_prize_catalog<I, C>(
    indexer: &I,
    chain: &C,
    owner: &Pubkey,
    config: &EngineConfig,
    strategies: &[CatalogStrategy],
) -> Result<PrizeCatalog, EngineError>
where
    I: AssetIndexer,
    C: ChainReader,
{
    let mut last_error =
        EngineError::Indexer(IndexerError::Malformed("no catalog strategy configured".into()));

    for strategy in strategies {
        let attempt = match strategy {
            CatalogStrategy::Indexer => fetch_all_assets(
                indexer,
                owner,
                config.indexer_page_limit,
                config.indexer_max_pages,
            )
            .await
            .map(|assets| classify(&assets))
            .map_err(EngineError::from),
            CatalogStrategy::TokenAccountScan => scan_token_accounts(chain, owner).await,
        };

        match attempt {
            Ok(catalog) => {
                info!(
                    "Loaded {} collectibles and {} tokens for {} via {:?}",
                    catalog.collectibles.len(),
                    catalog.tokens.len(),
                    owner,
                    strategy
                );
                return Ok(catalog);
            }
            Err(e) => {
                warn!("Catalog strategy {:?} failed for {}: {}", strategy, owner, e);
                last_error = e;
            }
        }
    }

    Err(last_error)
}

/// Degraded catalog built from raw token accounts under both token programs
pub async fn scan_token_accounts<C: ChainReader>(
    chain: &C,
    owner: &Pubkey,
) -> Result<PrizeCatalog, EngineError> {
    let mut holdings = Vec::new();
    for program in token_program_ids() {
        for (address, account) in chain.token_accounts_by_owner(owner, &program).await? {
            match parse_token_account(&address, &account) {
                Ok(holding) if !holding.frozen => holdings.push(holding),
                Ok(_) => debug!("Skipping frozen token account {}", address),
                Err(e) => debug!("Skipping token account {}: {}", address, e),
            }
        }
    }

    let mut mints: HashMap<Pubkey, Option<MintInfo>> = HashMap::new();
    let mut collectibles = Vec::new();
    let mut tokens = Vec::new();

    for holding in holdings {
        if !mints.contains_key(&holding.mint) {
            let info = fetch_mint_info(chain, &holding.mint).await;
            if let Err(e) = &info {
                debug!("Mint lookup failed for {}: {}", holding.mint, e);
            }
            mints.insert(holding.mint, info.ok());
        }
        let decimals = match mints.get(&holding.mint).copied().flatten() {
            Some(info) => info.decimals,
            None => continue,
        };

        let mint = holding.mint.to_string();
        if decimals == 0 && holding.amount >= 1 {
            collectibles.push(Collectible {
                name: format!("NFT ({}...)", prefix(&mint, 4)),
                mint,
                image: None,
                collection: UNCATEGORIZED.to_string(),
                verified: false,
            });
        } else if decimals > 0 && holding.amount > 0 {
            tokens.push(FungibleToken {
                symbol: prefix(&mint, 4).to_string(),
                name: "Token".to_string(),
                mint,
                image: None,
                decimals,
                raw_balance: holding.amount,
                amount: ui_amount(holding.amount, decimals),
            });
        }
    }

    Ok(PrizeCatalog {
        collectibles,
        tokens,
        source: CatalogSource::TokenAccountScan,
    })
}
