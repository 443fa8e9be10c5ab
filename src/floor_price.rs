// Raffle Settlement - Floor price job
use solana_program::pubkey::Pubkey;
use tracing::info;

use crate::{
    error::{EngineError, OracleError},
    store::RaffleStore,
    utils::lamports_to_sol,
};

/// Marketplace lookup of a collection's floor price
#[allow(async_fn_in_trait)]
pub trait FloorPriceOracle {
    /// Marketplace symbol of the collection `mint` belongs to
    async fn collection_symbol(&self, mint: &Pubkey) -> Result<Option<String>, OracleError>;

    /// Current floor of `symbol` in lamports
    async fn floor_lamports(&self, symbol: &str) -> Result<u64, OracleError>;
}

#[derive(Clone, Debug, PartialEq)]
pub struct FloorQuote {
    pub collection: String,
    /// Floor in whole native units
    pub floor_price: f64,
}

/// Look up the floor of the prize's collection and store it on the raffle
pub async fn refresh_floor_price<O, S>(
    oracle: &O,
    store: &S,
    raffle_id: &str,
    prize_mint: &Pubkey,
) -> Result<FloorQuote, EngineError>
where
    O: FloorPriceOracle,
    S: RaffleStore,
{
    let collection = oracle
        .collection_symbol(prize_mint)
        .await?
        .ok_or(OracleError::NoCollection(*prize_mint))?;
    let floor_price = lamports_to_sol(oracle.floor_lamports(&collection).await?);

    store.update_floor_price(raffle_id, floor_price).await?;
    info!(
        "Raffle {} floor price set to {} from collection {}",
        raffle_id, floor_price, collection
    );
    Ok(FloorQuote {
        collection,
        floor_price,
    })
}
