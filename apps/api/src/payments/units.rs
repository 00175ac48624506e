pub const WEI_PER_ETHER: u128 = 1_000_000_000_000_000_000;

/// Formats a wei amount as ether with trailing zeros trimmed but at least one
/// fractional digit: `1000000000000000` is `0.001`, `10^18` is `1.0`.
pub fn format_ether(wei: u128) -> String {
    let whole = wei / WEI_PER_ETHER;
    let fraction = format!("{:018}", wei % WEI_PER_ETHER);
    let fraction = fraction.trim_end_matches('0');
    if fraction.is_empty() {
        format!("{whole}.0")
    } else {
        format!("{whole}.{fraction}")
    }
}

/// Parses a non-negative decimal wei amount. Rejects signs, decimals and
/// anything that overflows `u128`.
pub fn parse_wei(raw: &str) -> Option<u128> {
    let raw = raw.trim();
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_ether() {
        assert_eq!(format_ether(1_000_000_000_000_000), "0.001");
        assert_eq!(format_ether(WEI_PER_ETHER), "1.0");
        assert_eq!(format_ether(0), "0.0");
        assert_eq!(format_ether(1_500_000_000_000_000_000), "1.5");
        assert_eq!(format_ether(1), "0.000000000000000001");
    }

    #[test]
    fn test_parse_wei() {
        assert_eq!(parse_wei("1000000000000000"), Some(1_000_000_000_000_000));
        assert_eq!(parse_wei(" 42 "), Some(42));
        assert_eq!(parse_wei("-1"), None);
        assert_eq!(parse_wei("1.5"), None);
        assert_eq!(parse_wei(""), None);
        assert_eq!(parse_wei("999999999999999999999999999999999999999999"), None);
    }
}
