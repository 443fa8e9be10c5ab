// Raffle Settlement - Asset indexer
//
// Schema and paging for the DAS `getAssetsByOwner` JSON-RPC method.
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use solana_program::pubkey::Pubkey;
use tracing::{debug, info};

use crate::error::IndexerError;

pub const GET_ASSETS_BY_OWNER: &str = "getAssetsByOwner";

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexedAsset {
    pub id: String,
    /// Interface tag, e.g. `V1_NFT`, `ProgrammableNFT`, `FungibleToken`
    #[serde(default)]
    pub interface: String,
    #[serde(default)]
    pub content: Option<AssetContent>,
    #[serde(default)]
    pub token_info: Option<TokenInfo>,
    #[serde(default)]
    pub ownership: Option<Ownership>,
    #[serde(default)]
    pub grouping: Vec<Grouping>,
    #[serde(default)]
    pub burnt: bool,
    #[serde(default)]
    pub deleted: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AssetContent {
    #[serde(default)]
    pub metadata: Option<AssetMetadata>,
    #[serde(default)]
    pub links: Option<AssetLinks>,
    #[serde(default)]
    pub files: Vec<AssetFile>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AssetMetadata {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub token_standard: Option<String>,
    #[serde(default)]
    pub collection: Option<CollectionMetadata>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CollectionMetadata {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AssetLinks {
    #[serde(default)]
    pub image: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AssetFile {
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenInfo {
    #[serde(default)]
    pub decimals: Option<u8>,
    #[serde(default)]
    pub balance: Option<u64>,
    #[serde(default)]
    pub symbol: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Ownership {
    #[serde(default)]
    pub frozen: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Grouping {
    pub group_key: String,
    pub group_value: String,
    #[serde(default)]
    pub collection_metadata: Option<CollectionMetadata>,
}

impl IndexedAsset {
    pub fn metadata(&self) -> Option<&AssetMetadata> {
        self.content.as_ref()?.metadata.as_ref()
    }

    pub fn decimals(&self) -> Option<u8> {
        self.token_info.as_ref()?.decimals
    }

    pub fn is_frozen(&self) -> bool {
        self.ownership.as_ref().map_or(false, |o| o.frozen)
    }

    /// Grouping entry that ties the asset to a collection
    pub fn collection_group(&self) -> Option<&Grouping> {
        self.grouping.iter().find(|g| g.group_key == "collection")
    }

    /// Primary image: explicit link, else first file
    pub fn image(&self) -> Option<String> {
        let content = self.content.as_ref()?;
        content
            .links
            .as_ref()
            .and_then(|l| l.image.clone())
            .or_else(|| {
                content
                    .files
                    .first()
                    .and_then(|f| f.uri.clone().or_else(|| f.url.clone()))
            })
    }
}

/// One page of indexer results
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct AssetPage {
    pub items: Vec<IndexedAsset>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

/// Paged access to a wallet's indexed assets
#[allow(async_fn_in_trait)]
pub trait AssetIndexer {
    async fn get_assets_by_owner(
        &self,
        owner: &Pubkey,
        page: u32,
        limit: u32,
    ) -> Result<AssetPage, IndexerError>;
}

/// POSTs a JSON-RPC body and returns the decoded JSON reply
#[allow(async_fn_in_trait)]
pub trait JsonRpcTransport {
    async fn post(&self, body: &Value) -> Result<Value, IndexerError>;
}

/// `AssetIndexer` speaking DAS JSON-RPC over any transport
pub struct DasIndexer<T> {
    transport: T,
}

impl<T: JsonRpcTransport> DasIndexer<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn request_body(owner: &Pubkey, page: u32, limit: u32) -> Value {
        json!({
            "jsonrpc": "2.0",
            "id": "raffle-settlement",
            "method": GET_ASSETS_BY_OWNER,
            "params": {
                "ownerAddress": owner.to_string(),
                "page": page,
                "limit": limit,
                "displayOptions": {
                    "showCollectionMetadata": true,
                    "showFungible": true,
                },
            },
        })
    }
}

/// Decode a DAS reply, rejecting error objects and missing `items`
pub fn parse_asset_page(reply: Value) -> Result<AssetPage, IndexerError> {
    let response: RpcResponse =
        serde_json::from_value(reply).map_err(|e| IndexerError::Malformed(e.to_string()))?;

    if let Some(error) = response.error {
        return Err(IndexerError::Rpc {
            code: error.code,
            message: error.message,
        });
    }

    let result = response
        .result
        .ok_or_else(|| IndexerError::Malformed("missing result".to_string()))?;
    serde_json::from_value(result).map_err(|e| IndexerError::Malformed(e.to_string()))
}

impl<T: JsonRpcTransport> AssetIndexer for DasIndexer<T> {
    async fn get_assets_by_owner(
        &self,
        owner: &Pubkey,
        page: u32,
        limit: u32,
    ) -> Result<AssetPage, IndexerError> {
        let body = Self::request_body(owner, page, limit);
        let reply = self.transport.post(&body).await?;
        parse_asset_page(reply)
    }
}

/// Page through every asset of `owner` until a short page or `max_pages`
pub async fn fetch_all_assets<I: AssetIndexer>(
    indexer: &I,
    owner: &Pubkey,
    limit: u32,
    max_pages: u32,
) -> Result<Vec<IndexedAsset>, IndexerError> {
    let mut assets = Vec::new();
    for page in 1..=max_pages {
        let batch = indexer.get_assets_by_owner(owner, page, limit).await?;
        let count = batch.items.len();
        debug!("Indexer page {} returned {} assets", page, count);
        assets.extend(batch.items);
        if count < limit as usize {
            return Ok(assets);
        }
    }
    info!(
        "Stopped paging assets for {} at the {} page ceiling",
        owner, max_pages
    );
    Ok(assets)
}
