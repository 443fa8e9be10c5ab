// Raffle Settlement - Utility Functions
use solana_program::native_token::LAMPORTS_PER_SOL;

/// Calculate fee amount based on input amount and basis points, rounding down
pub fn calculate_fee(amount: u64, basis_points: u16) -> u64 {
    // basis_points <= 10_000 keeps the quotient within u64
    ((amount as u128 * basis_points as u128) / 10_000) as u64
}

/// Split one ticket price into (commission, creator share)
pub fn split_ticket_price(unit_price: u64, basis_points: u16) -> (u64, u64) {
    let commission = calculate_fee(unit_price, basis_points.min(10_000));
    (commission, unit_price - commission)
}

/// Smallest-unit multiplier for a currency with `decimals` precision
pub fn unit_scale(decimals: u8) -> Option<u64> {
    10u64.checked_pow(decimals as u32)
}

/// Convert a whole-unit amount to smallest units, rounding to nearest
pub fn to_smallest_units(amount: f64, scale: u64) -> Option<u64> {
    if !amount.is_finite() || amount < 0.0 {
        return None;
    }
    let units = (amount * scale as f64).round();
    // u64::MAX rounds up to 2^64 as f64
    if units >= u64::MAX as f64 {
        return None;
    }
    Some(units as u64)
}

/// Convert a raw token balance to display units
pub fn ui_amount(raw: u64, decimals: u8) -> f64 {
    raw as f64 / 10f64.powi(decimals as i32)
}

/// Convert lamports to SOL (for display purposes)
pub fn lamports_to_sol(lamports: u64) -> f64 {
    lamports as f64 / LAMPORTS_PER_SOL as f64
}

/// First `len` characters of an address or id
pub fn prefix(value: &str, len: usize) -> &str {
    match value.char_indices().nth(len) {
        Some((idx, _)) => &value[..idx],
        None => value,
    }
}

/// Last `len` characters of an address or id
pub fn suffix(value: &str, len: usize) -> &str {
    let count = value.chars().count();
    if count <= len {
        return value;
    }
    match value.char_indices().nth(count - len) {
        Some((idx, _)) => &value[idx..],
        None => value,
    }
}

/// `abcd...wxyz` style shortening used in feeds and webhooks
pub fn short_address(value: &str, len: usize) -> String {
    if value.chars().count() <= len * 2 {
        return value.to_string();
    }
    format!("{}...{}", prefix(value, len), suffix(value, len))
}
