// Raffle Settlement - Configuration
use solana_program::{native_token::LAMPORTS_PER_SOL, pubkey, pubkey::Pubkey};
use std::str::FromStr;

use crate::error::ConfigError;

/// Platform treasury receiving commissions and creation fees
pub const DEFAULT_TREASURY: Pubkey = pubkey!("2Vvv3raBsA2SKSU4GbURS9nDVWe46zZAqUt3rj4Hb8n2");

/// Engine settings shared by every flow
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Treasury address that receives commission
    pub treasury: Pubkey,
    /// Commission in basis points (475 = 4.75%)
    pub commission_basis_points: u16,
    /// Smallest-unit multiplier of the native currency
    pub native_unit_scale: u64,
    /// Decimals assumed when a payment mint cannot be read
    pub fallback_token_decimals: u8,
    /// Assets requested per indexer page
    pub indexer_page_limit: u32,
    /// Hard ceiling on indexer pages fetched per wallet
    pub indexer_max_pages: u32,
    /// Base raffle creation fee in lamports
    pub creation_fee_lamports: u64,
    /// Extra creation fee in lamports for holder-only raffles
    pub holder_only_fee_lamports: u64,
    /// Smallest ticket supply a raffle may be created with
    pub min_ticket_supply: u64,
    /// Raffle outcomes remembered per wallet before the oldest is evicted
    pub seen_outcome_capacity: usize,
    /// Wallets allowed to create raffles; empty means anyone
    pub authorized_creators: Vec<Pubkey>,
    /// Collectibles whose name contains one of these are hidden from prize selection
    pub blocked_keywords: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            treasury: DEFAULT_TREASURY,
            commission_basis_points: 475,
            native_unit_scale: LAMPORTS_PER_SOL,
            fallback_token_decimals: 6,
            indexer_page_limit: 100,
            indexer_max_pages: 10,
            creation_fee_lamports: 50_000_000,        // 0.05 SOL
            holder_only_fee_lamports: 1_000_000_000, // 1 SOL
            min_ticket_supply: 3,
            seen_outcome_capacity: 256,
            authorized_creators: Vec::new(),
            blocked_keywords: vec![
                "lucky emmy".to_string(),
                "airdrop".to_string(),
                "reward".to_string(),
            ],
        }
    }
}

impl EngineConfig {
    /// Defaults overlaid with `RAFFLE_*` environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overlaid with values from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = lookup("RAFFLE_TREASURY") {
            config.treasury = parse_value("RAFFLE_TREASURY", &value)?;
        }
        if let Some(value) = lookup("RAFFLE_COMMISSION_BPS") {
            let bps: u16 = parse_value("RAFFLE_COMMISSION_BPS", &value)?;
            if bps > 10_000 {
                return Err(ConfigError {
                    key: "RAFFLE_COMMISSION_BPS",
                    value,
                });
            }
            config.commission_basis_points = bps;
        }
        if let Some(value) = lookup("RAFFLE_INDEXER_PAGE_LIMIT") {
            config.indexer_page_limit = parse_value("RAFFLE_INDEXER_PAGE_LIMIT", &value)?;
        }
        if let Some(value) = lookup("RAFFLE_INDEXER_MAX_PAGES") {
            config.indexer_max_pages = parse_value("RAFFLE_INDEXER_MAX_PAGES", &value)?;
        }
        if let Some(value) = lookup("RAFFLE_AUTHORIZED_CREATORS") {
            config.authorized_creators = value
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| parse_value("RAFFLE_AUTHORIZED_CREATORS", s))
                .collect::<Result<_, _>>()?;
        }

        Ok(config)
    }

    /// Whether `wallet` may create raffles
    pub fn is_authorized_creator(&self, wallet: &Pubkey) -> bool {
        self.authorized_creators.is_empty() || self.authorized_creators.contains(wallet)
    }
}

fn parse_value<T: FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError {
        key,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_env_overrides() {
        let creator = Pubkey::new_unique();
        let vars: HashMap<&str, String> = [
            ("RAFFLE_COMMISSION_BPS", "500".to_string()),
            ("RAFFLE_AUTHORIZED_CREATORS", format!(" {} ,", creator)),
        ]
        .into_iter()
        .collect();

        let config = EngineConfig::from_lookup(|key| vars.get(key).cloned()).unwrap();
        assert_eq!(config.commission_basis_points, 500);
        assert_eq!(config.authorized_creators, vec![creator]);
        assert_eq!(config.treasury, DEFAULT_TREASURY);
        assert!(config.is_authorized_creator(&creator));
        assert!(!config.is_authorized_creator(&Pubkey::new_unique()));
    }

    #[test]
    fn test_rejects_bad_values() {
        let err = EngineConfig::from_lookup(|key| {
            (key == "RAFFLE_COMMISSION_BPS").then(|| "12000".to_string())
        })
        .unwrap_err();
        assert_eq!(err.key, "RAFFLE_COMMISSION_BPS");

        let err = EngineConfig::from_lookup(|key| {
            (key == "RAFFLE_TREASURY").then(|| "not-a-key".to_string())
        })
        .unwrap_err();
        assert_eq!(err.key, "RAFFLE_TREASURY");
    }
}
