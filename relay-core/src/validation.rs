//! Domain syntax and payment amount checks
//!
//! Rejection reasons produced here are returned to clients verbatim.

use url::Host;

use crate::config::CurrencyLimit;
use crate::error::{Error, Result};

/// The base token; the only currency allowed in exact exchange data
pub const BASE_CURRENCY: &str = "kin";

/// Quarks per whole unit of the base token
pub const QUARKS_PER_UNIT: u64 = 100_000;

const MAX_DOMAIN_LEN: usize = 253;
const MAX_LABEL_LEN: usize = 63;

/// Validate a domain and return its lowercase ASCII (punycode) form.
///
/// IP addresses, single-label names and labels with characters outside
/// `[a-z0-9-]` after IDNA conversion are rejected.
pub fn validate_domain(domain: &str) -> Result<String> {
    let invalid = || Error::invalid("domain is invalid");

    if domain.is_empty() || domain.len() > MAX_DOMAIN_LEN * 4 {
        return Err(invalid());
    }
    let ascii = match Host::parse(domain).map_err(|_| invalid())? {
        Host::Domain(ascii) => ascii,
        Host::Ipv4(_) | Host::Ipv6(_) => return Err(invalid()),
    };
    let ascii = ascii.trim_end_matches('.').to_string();

    if ascii.len() > MAX_DOMAIN_LEN {
        return Err(invalid());
    }
    let labels: Vec<&str> = ascii.split('.').collect();
    if labels.len() < 2 {
        return Err(invalid());
    }
    for label in &labels {
        let valid = !label.is_empty()
            && label.len() <= MAX_LABEL_LEN
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label
                .bytes()
                .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-');
        if !valid {
            return Err(invalid());
        }
    }
    if labels
        .last()
        .is_some_and(|tld| tld.bytes().all(|b| b.is_ascii_digit()))
    {
        return Err(invalid());
    }

    Ok(ascii)
}

/// Reduce a validated ASCII domain to its base (`a.b.example.com` ->
/// `example.com`), the unit domain ownership is verified for.
#[must_use]
pub fn ascii_base_domain(ascii: &str) -> String {
    let labels: Vec<&str> = ascii.split('.').collect();
    let start = labels.len().saturating_sub(2);
    labels[start..].join(".")
}

/// Check an amount against the configured bounds for its currency.
///
/// NaN never satisfies a bound and is reported as below the minimum.
pub fn check_amount_bounds(currency: &str, amount: f64, limit: CurrencyLimit) -> Result<()> {
    if amount.is_nan() || amount < limit.min {
        return Err(Error::invalid(format!(
            "{currency} currency has a minimum amount of {:.2}",
            limit.min
        )));
    }
    if amount > limit.max {
        return Err(Error::invalid(format!(
            "{currency} currency has a maximum amount of {:.2}",
            limit.max
        )));
    }
    Ok(())
}

/// Whether `quarks` is exactly `native_amount` whole units of the base token.
#[must_use]
pub fn quarks_match(native_amount: f64, quarks: u64) -> bool {
    if !native_amount.is_finite() || native_amount < 0.0 {
        return false;
    }
    let expected = native_amount * QUARKS_PER_UNIT as f64;
    (expected - quarks as f64).abs() < 0.5
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_domain() {
        assert_eq!(validate_domain("getcode.com").unwrap(), "getcode.com");
        assert_eq!(validate_domain("App.GetCode.com").unwrap(), "app.getcode.com");
        assert_eq!(validate_domain("example.com.").unwrap(), "example.com");
        assert_eq!(validate_domain("bücher.example").unwrap(), "xn--bcher-kva.example");
    }

    #[test]
    fn test_validate_domain_rejects() {
        for domain in [
            "",
            "localhost",
            "127.0.0.1",
            "[::1]",
            "-bad.com",
            "bad-.com",
            "exa mple.com",
            "a..com",
            "example.123",
            "under_score.com",
        ] {
            let err = validate_domain(domain).unwrap_err();
            assert_eq!(err.reason(), "domain is invalid", "domain {domain:?}");
        }
    }

    #[test]
    fn test_ascii_base_domain() {
        assert_eq!(ascii_base_domain("a.b.example.com"), "example.com");
        assert_eq!(ascii_base_domain("example.com"), "example.com");
    }

    #[test]
    fn test_amount_bounds_messages() {
        let kin = CurrencyLimit {
            min: 5_000.0,
            max: 100_000.0,
        };
        assert!(check_amount_bounds("kin", 5_000.0, kin).is_ok());
        assert_eq!(
            check_amount_bounds("kin", 4_999.0, kin).unwrap_err().reason(),
            "kin currency has a minimum amount of 5000.00"
        );
        assert_eq!(
            check_amount_bounds("kin", 100_001.0, kin).unwrap_err().reason(),
            "kin currency has a maximum amount of 100000.00"
        );

        let usd = CurrencyLimit { min: 0.05, max: 1.0 };
        assert_eq!(
            check_amount_bounds("usd", 0.04, usd).unwrap_err().reason(),
            "usd currency has a minimum amount of 0.05"
        );
        assert_eq!(
            check_amount_bounds("usd", 1.01, usd).unwrap_err().reason(),
            "usd currency has a maximum amount of 1.00"
        );
    }

    #[test]
    fn test_amount_bounds_non_finite() {
        let usd = CurrencyLimit { min: 0.05, max: 1.0 };
        for amount in [f64::NAN, -f64::NAN, f64::NEG_INFINITY] {
            assert_eq!(
                check_amount_bounds("usd", amount, usd).unwrap_err().reason(),
                "usd currency has a minimum amount of 0.05",
                "amount {amount}"
            );
        }
        assert_eq!(
            check_amount_bounds("usd", f64::INFINITY, usd).unwrap_err().reason(),
            "usd currency has a maximum amount of 1.00"
        );
    }

    #[test]
    fn test_quarks_match() {
        assert!(quarks_match(5_000.0, 500_000_000));
        assert!(quarks_match(12.5, 1_250_000));
        assert!(!quarks_match(5_000.0, 500_000_001));
        assert!(!quarks_match(-1.0, 0));
        assert!(!quarks_match(f64::NAN, 0));
    }
}
