//! WAD Fixed-Point Math
//!
//! 18-decimal fixed-point primitives used for every ratio in the discovery
//! engine. Raw token amounts are first scaled to 18 decimals so that tokens
//! with different decimal counts can be divided against each other.
//!
//! All operations round down and return `None` instead of panicking on
//! overflow or division by zero. Callers treat `None` as "unpriceable".

use alloy::primitives::U256;
use rust_decimal::Decimal;

// ── Constants ────────────────────────────────────────────────────────────────

/// 1.0 in WAD
pub const WAD: U256 = U256::from_limbs([1_000_000_000_000_000_000, 0, 0, 0]);

/// 0.5 in WAD
pub const HALF_WAD: U256 = U256::from_limbs([500_000_000_000_000_000, 0, 0, 0]);

/// Decimal count of the WAD representation
pub const WAD_DECIMALS: u8 = 18;

/// Largest integer power accepted by `pow_wad`
const MAX_POW_STEPS: u64 = 64;

// ── Arithmetic ───────────────────────────────────────────────────────────────

/// a * b / 1e18
pub fn mul_wad(a: U256, b: U256) -> Option<U256> {
    a.checked_mul(b).map(|p| p / WAD)
}

/// a * 1e18 / b
pub fn div_wad(a: U256, b: U256) -> Option<U256> {
    if b.is_zero() {
        return None;
    }
    a.checked_mul(WAD).map(|p| p / b)
}

/// Floor integer square root (Newton's method)
fn isqrt(n: U256) -> U256 {
    if n < U256::from(2) {
        return n;
    }
    let mut x = n;
    let mut y = (n >> 1) + U256::from(1);
    while y < x {
        x = y;
        y = (x + n / x) >> 1;
    }
    x
}

/// sqrt(x) with x and the result in WAD
pub fn sqrt_wad(x: U256) -> Option<U256> {
    x.checked_mul(WAD).map(isqrt)
}

/// x ^ y in WAD.
///
/// Only exponents that are whole multiples of 0.5 are supported: the integer
/// part is applied by repeated multiplication and the half step by an exact
/// integer square root. Any other exponent returns `None`.
pub fn pow_wad(x: U256, y: U256) -> Option<U256> {
    if !(y % HALF_WAD).is_zero() {
        return None;
    }
    let halves = y / HALF_WAD;
    if halves > U256::from(MAX_POW_STEPS * 2) {
        return None;
    }
    let halves: u64 = halves.to();

    let mut result = WAD;
    for _ in 0..halves / 2 {
        result = mul_wad(result, x)?;
    }
    if halves % 2 == 1 {
        result = mul_wad(result, sqrt_wad(x)?)?;
    }
    Some(result)
}

// ── Scaling ──────────────────────────────────────────────────────────────────

/// Scale a raw token amount from its native decimals to 18 decimals.
pub fn scale_to_wad(amount: U256, decimals: u8) -> Option<U256> {
    match decimals.cmp(&WAD_DECIMALS) {
        std::cmp::Ordering::Equal => Some(amount),
        std::cmp::Ordering::Less => {
            let factor = U256::from(10).pow(U256::from(WAD_DECIMALS - decimals));
            amount.checked_mul(factor)
        }
        std::cmp::Ordering::Greater => {
            let factor = U256::from(10).pow(U256::from(decimals - WAD_DECIMALS));
            Some(amount / factor)
        }
    }
}

/// Exact conversion of a decimal (USD value, ratio cap) to WAD.
/// Negative values map to zero.
pub fn decimal_to_wad(value: Decimal) -> U256 {
    if value.is_sign_negative() || value.is_zero() {
        return U256::ZERO;
    }
    let mantissa = U256::from(value.mantissa().unsigned_abs());
    let scale = value.scale();
    let wad_scale = u32::from(WAD_DECIMALS);

    if scale <= wad_scale {
        mantissa * U256::from(10).pow(U256::from(wad_scale - scale))
    } else {
        mantissa / U256::from(10).pow(U256::from(scale - wad_scale))
    }
}

/// Render a WAD value as a decimal-ether string with trailing zeros trimmed
/// ("1", "0.5", "1234.000001").
pub fn format_wad(value: U256) -> String {
    let integer = value / WAD;
    let fraction = value % WAD;
    if fraction.is_zero() {
        return integer.to_string();
    }
    let fraction = format!("{:0>18}", fraction.to_string());
    format!("{}.{}", integer, fraction.trim_end_matches('0'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn wad(n: u64) -> U256 {
        U256::from(n) * WAD
    }

    #[test]
    fn test_mul_div_wad() {
        assert_eq!(mul_wad(wad(2), wad(3)), Some(wad(6)));
        assert_eq!(div_wad(wad(6), wad(3)), Some(wad(2)));
        assert_eq!(div_wad(wad(1), wad(2)), Some(HALF_WAD));
        assert_eq!(div_wad(wad(1), U256::ZERO), None);
        assert_eq!(mul_wad(U256::MAX, wad(2)), None);
    }

    #[test]
    fn test_pow_wad_half_is_sqrt() {
        assert_eq!(pow_wad(wad(4), HALF_WAD), Some(wad(2)));
        assert_eq!(pow_wad(wad(9), HALF_WAD), Some(wad(3)));
        // sqrt(2) = 1.414213562373095048...
        let root_two = pow_wad(wad(2), HALF_WAD).unwrap();
        assert_eq!(root_two, U256::from(1_414_213_562_373_095_048u64));
    }

    #[test]
    fn test_pow_wad_integer_and_mixed_exponents() {
        assert_eq!(pow_wad(wad(3), U256::ZERO), Some(WAD));
        assert_eq!(pow_wad(wad(3), wad(2)), Some(wad(9)));
        // 4 ^ 1.5 = 8
        assert_eq!(pow_wad(wad(4), WAD + HALF_WAD), Some(wad(8)));
    }

    #[test]
    fn test_pow_wad_unsupported_exponent() {
        let third = WAD / U256::from(3);
        assert_eq!(pow_wad(wad(8), third), None);
    }

    #[test]
    fn test_scale_to_wad() {
        // 1 USDC (6 decimals) → 1e18
        assert_eq!(scale_to_wad(U256::from(1_000_000u64), 6), Some(WAD));
        assert_eq!(scale_to_wad(WAD, 18), Some(WAD));
        // 24 decimals scale down
        let raw = U256::from(10).pow(U256::from(24));
        assert_eq!(scale_to_wad(raw, 24), Some(WAD));
    }

    #[test]
    fn test_decimal_to_wad() {
        assert_eq!(decimal_to_wad(dec!(1)), WAD);
        assert_eq!(decimal_to_wad(dec!(1000)), wad(1000));
        assert_eq!(
            decimal_to_wad(dec!(0.999999)),
            U256::from(999_999_000_000_000_000u64)
        );
        assert_eq!(decimal_to_wad(dec!(-5)), U256::ZERO);
    }

    #[test]
    fn test_format_wad() {
        assert_eq!(format_wad(U256::ZERO), "0");
        assert_eq!(format_wad(WAD), "1");
        assert_eq!(format_wad(HALF_WAD), "0.5");
        assert_eq!(format_wad(wad(1_000_000)), "1000000");
        assert_eq!(format_wad(U256::from(1u64)), "0.000000000000000001");
    }
}
