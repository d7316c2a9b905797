use alloy::primitives::U256;

fn precision(decimals: u8) -> U256 {
    U256::from(10).pow(U256::from(decimals))
}

pub fn divide_by_precision_f64(value: U256, precision: u8) -> f64 {
    let ray = self::precision(precision);

    // Perform integer division and get both quotient and remainder
    let quotient = match value.checked_div(ray) {
        Some(q) => q,
        None => return f64::MAX,
    };

    let remainder = match value.checked_rem(ray) {
        Some(r) => r,
        None => return f64::MAX,
    };

    // Try to convert quotient to u128, return MAX if too large
    let quotient_u128 = match u128::try_from(quotient) {
        Ok(q) => q,
        Err(_) => return f64::MAX,
    };

    // Try to convert remainder to u128, return MAX if too large
    let remainder_u128 = match u128::try_from(remainder) {
        Ok(r) => r,
        Err(_) => return f64::MAX,
    };

    let ray_u128 = match u128::try_from(ray) {
        Ok(r) => r,
        Err(_) => return f64::MAX,
    };

    // Convert to f64 and combine
    let quotient_f64 = quotient_u128 as f64;
    let remainder_f64 = (remainder_u128 as f64) / (ray_u128 as f64);

    quotient_f64 + remainder_f64
}

/// Renders a fixed-point integer as a decimal string without losing precision.
///
/// Trailing fractional zeros are dropped but at least one fractional digit is
/// kept, so `1.5e18` with 18 decimals becomes `"1.5"` and `1e18` becomes `"1.0"`.
pub fn format_units(value: U256, decimals: u8) -> String {
    let precision = precision(decimals);
    let integer = value / precision;
    let fraction = value % precision;

    let fraction = format!("{:0>width$}", fraction.to_string(), width = decimals as usize);
    let fraction = fraction.trim_end_matches('0');

    if fraction.is_empty() {
        format!("{}.0", integer)
    } else {
        format!("{}.{}", integer, fraction)
    }
}

/// Moves a fixed-point amount from `from_decimals` to `to_decimals`.
///
/// Precision beyond `to_decimals` is truncated. Returns `None` on overflow.
pub fn rescale_units(amount: U256, from_decimals: u8, to_decimals: u8) -> Option<U256> {
    if to_decimals >= from_decimals {
        amount.checked_mul(precision(to_decimals - from_decimals))
    } else {
        Some(amount / precision(from_decimals - to_decimals))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wad(value: &str) -> U256 {
        U256::from_str_radix(value, 10).unwrap()
    }

    #[test]
    fn test_format_units_trims_fraction() {
        assert_eq!(format_units(wad("1500000000000000000"), 18), "1.5");
        assert_eq!(format_units(wad("1000000000000000000"), 18), "1.0");
        assert_eq!(format_units(U256::ZERO, 18), "0.0");
        assert_eq!(format_units(U256::from(1), 18), "0.000000000000000001");
        assert_eq!(format_units(U256::from(123456789), 6), "123.456789");
    }

    #[test]
    fn test_format_units_handles_max_health_factor() {
        assert_eq!(
            format_units(U256::MAX, 18),
            "115792089237316195423570985008687907853269984665640564039457.584007913129639935"
        );
    }

    #[test]
    fn test_rescale_units_down_truncates() {
        assert_eq!(
            rescale_units(wad("1000000000000000000"), 18, 6),
            Some(U256::from(1_000_000))
        );
        assert_eq!(
            rescale_units(wad("1234567890123456789"), 18, 6),
            Some(U256::from(1_234_567))
        );
    }

    #[test]
    fn test_rescale_units_up_and_overflow() {
        assert_eq!(rescale_units(U256::from(5), 0, 2), Some(U256::from(500)));
        assert_eq!(rescale_units(U256::from(5), 18, 18), Some(U256::from(5)));
        assert_eq!(rescale_units(U256::MAX, 6, 18), None);
    }

    #[test]
    fn test_divide_by_precision_f64() {
        let value = divide_by_precision_f64(wad("1250000000000000000"), 18);
        assert!((value - 1.25).abs() < f64::EPSILON);
        assert_eq!(divide_by_precision_f64(U256::MAX, 18), f64::MAX);
    }
}
