use crate::error::GasdeckError;
use ethers::types::U256;
use ethers::utils::format_units;
use std::time::Duration;

pub const WEI_PER_GWEI: u64 = 1_000_000_000;

/// Base cost of a plain value transfer; custom limits below this are suspect.
pub const INTRINSIC_TX_GAS: u64 = 21_000;

pub fn gwei_to_wei(gwei: u64) -> U256 {
    U256::from(gwei) * U256::from(WEI_PER_GWEI)
}

/// Parse a user-entered decimal gwei amount into wei.
///
/// Rejects empty, non-numeric and negative input, and amounts with more than
/// nine fractional digits, before any big integer is built.
pub fn parse_gwei(input: &str) -> Result<U256, GasdeckError> {
    let malformed = || GasdeckError::InvalidGasPrice {
        input: input.to_string(),
    };
    // `ethers::utils::parse_units` tolerates `_` separators and silently
    // truncates digits past the gwei scale, so the field is checked by hand.
    let (whole, fraction) = match input.trim().split_once('.') {
        Some(parts) => parts,
        None => (input.trim(), ""),
    };
    let digits_only = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
    if whole.is_empty() && fraction.is_empty() {
        return Err(malformed());
    }
    if !digits_only(whole) || !digits_only(fraction) || fraction.len() > 9 {
        return Err(malformed());
    }
    let wei = U256::from_dec_str(whole)
        .map_err(|_| malformed())?
        .checked_mul(U256::from(WEI_PER_GWEI))
        .ok_or_else(malformed)?;
    if fraction.is_empty() {
        return Ok(wei);
    }
    let below_gwei = U256::from_dec_str(fraction).map_err(|_| malformed())?
        * U256::exp10(9 - fraction.len());
    wei.checked_add(below_gwei).ok_or_else(malformed)
}

/// Parse a user-entered gas limit as a non-negative decimal integer.
pub fn parse_gas_limit(input: &str) -> Result<U256, GasdeckError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(GasdeckError::InvalidGasLimit {
            input: input.to_string(),
        });
    }
    U256::from_dec_str(trimmed).map_err(|_| GasdeckError::InvalidGasLimit {
        input: input.to_string(),
    })
}

/// Exact decimal gwei rendering of a wei amount, trailing zeros trimmed.
pub fn format_gwei(wei: U256) -> String {
    format_scaled(wei, "gwei")
}

/// Exact decimal ether rendering of a wei amount, trailing zeros trimmed.
pub fn format_eth(wei: U256) -> String {
    format_scaled(wei, "ether")
}

fn format_scaled(wei: U256, unit: &str) -> String {
    match format_units(wei, unit) {
        Ok(mut rendered) => {
            trim_decimal(&mut rendered);
            if rendered.is_empty() {
                "0".to_string()
            } else {
                rendered
            }
        }
        Err(_) => wei.to_string(),
    }
}

fn trim_decimal(value: &mut String) {
    if value.contains('.') {
        while value.ends_with('0') {
            value.pop();
        }
        if value.ends_with('.') {
            value.pop();
        }
    }
}

/// Presentational fiat rendering of a total fee. Lossy by design; the emitted
/// fee pair never goes through floating point.
pub fn fiat_fee_text(total_wei: U256, conversion_rate: f64, currency: &str) -> String {
    let wei: f64 = total_wei.to_string().parse().unwrap_or_default();
    let native = wei / 1e18;
    format!("{:.2} {}", native * conversion_rate, currency.to_uppercase())
}

/// Human label for an estimated confirmation wait.
pub fn format_wait(wait: Duration) -> String {
    let secs = wait.as_secs_f64();
    if secs < 60.0 {
        return format!("~{}s", secs.round() as u64);
    }
    let mins = secs / 60.0;
    if (mins - mins.round()).abs() < 0.05 {
        format!("~{} min", mins.round() as u64)
    } else {
        format!("~{:.1} min", mins)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_integer_and_fractional_gwei() {
        assert_eq!(parse_gwei("5").unwrap(), U256::from(5_000_000_000u64));
        assert_eq!(parse_gwei("4.5").unwrap(), U256::from(4_500_000_000u64));
        assert_eq!(parse_gwei("0.000000001").unwrap(), U256::from(1u64));
        assert_eq!(parse_gwei(" 10 ").unwrap(), U256::from(10_000_000_000u64));
        assert_eq!(parse_gwei("0").unwrap(), U256::zero());
        // Nine fractional digits is the last exact width.
        assert_eq!(
            parse_gwei("1.234567890").unwrap(),
            U256::from(1_234_567_890u64)
        );
        assert_eq!(parse_gwei(".5").unwrap(), U256::from(500_000_000u64));
        assert_eq!(parse_gwei("5.").unwrap(), U256::from(5_000_000_000u64));
    }

    #[test]
    fn rejects_malformed_gwei() {
        assert!(matches!(
            parse_gwei("abc"),
            Err(GasdeckError::InvalidGasPrice { .. })
        ));
        assert!(parse_gwei("").is_err());
        assert!(parse_gwei("   ").is_err());
        assert!(parse_gwei("-5").is_err());
        assert!(parse_gwei("1.2345678901").is_err(), "ten fractional digits");
        assert!(parse_gwei("5 0").is_err());
        assert!(parse_gwei("2_5").is_err(), "separators are not digits");
        assert!(parse_gwei("1.2.3").is_err());
        assert!(parse_gwei(".").is_err());
        assert!(parse_gwei("1.2_3").is_err());
    }

    #[test]
    fn parses_gas_limit_exactly() {
        assert_eq!(parse_gas_limit("21000").unwrap(), U256::from(21_000u64));
        assert_eq!(parse_gas_limit("0").unwrap(), U256::zero());
        let max = U256::MAX.to_string();
        assert_eq!(parse_gas_limit(&max).unwrap(), U256::MAX);
    }

    #[test]
    fn rejects_malformed_gas_limit() {
        assert!(matches!(
            parse_gas_limit("abc"),
            Err(GasdeckError::InvalidGasLimit { .. })
        ));
        assert!(parse_gas_limit("").is_err());
        assert!(parse_gas_limit("-1").is_err());
        assert!(parse_gas_limit("1.5").is_err());
        assert!(parse_gas_limit("21_000").is_err());
    }

    #[test]
    fn formats_gwei_without_trailing_zeros() {
        assert_eq!(format_gwei(U256::from(5_000_000_000u64)), "5");
        assert_eq!(format_gwei(U256::from(4_500_000_000u64)), "4.5");
        assert_eq!(format_gwei(U256::from(1u64)), "0.000000001");
        assert_eq!(format_gwei(U256::zero()), "0");
    }

    #[test]
    fn formats_eth_without_trailing_zeros() {
        // 5 gwei * 21_000 gas
        assert_eq!(format_eth(U256::from(105_000_000_000_000u64)), "0.000105");
        assert_eq!(format_eth(U256::exp10(18)), "1");
    }

    #[test]
    fn gwei_round_trips_through_display() {
        for wei in [1u64, 100, 4_500_000_000, 10_000_000_000, 123_456_789] {
            let rendered = format_gwei(U256::from(wei));
            assert_eq!(parse_gwei(&rendered).unwrap(), U256::from(wei));
        }
    }

    #[test]
    fn fiat_text_uses_two_decimals_and_upper_currency() {
        let total = U256::from(105_000_000_000_000u64); // 0.000105 ETH
        assert_eq!(fiat_fee_text(total, 2000.0, "usd"), "0.21 USD");
        assert_eq!(fiat_fee_text(U256::zero(), 2000.0, "eur"), "0.00 EUR");
    }

    #[test]
    fn wait_labels() {
        assert_eq!(format_wait(Duration::from_secs(30)), "~30s");
        assert_eq!(format_wait(Duration::from_secs(120)), "~2 min");
        assert_eq!(format_wait(Duration::from_secs(90)), "~1.5 min");
    }
}
