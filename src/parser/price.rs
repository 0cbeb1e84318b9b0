use std::sync::LazyLock;

use regex::Regex;

use super::ParseError;

// Amount, optional all-zero fraction, then the currency annotation the menu appends to every price.
static PRICE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<amount>[0-9]+)(?:[.,](?P<fraction>[0-9]+))?\s*(?:₺|TL|TRY)$").unwrap()
});

/// Parse a rendered menu price such as `"1500,00 ₺"` into whole currency units.
pub fn parse_price(raw: &str) -> Result<u16, ParseError> {
    let text = raw.trim();
    let invalid = || ParseError::InvalidPrice {
        raw: raw.to_string(),
    };

    let caps = PRICE_RE.captures(text).ok_or_else(invalid)?;
    if let Some(fraction) = caps.name("fraction") {
        if fraction.as_str().bytes().any(|b| b != b'0') {
            return Err(invalid());
        }
    }
    caps["amount"].parse::<u16>().map_err(|_| invalid())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_currency_annotation() {
        assert_eq!(parse_price("1500,00 ₺").unwrap(), 1500);
        assert_eq!(parse_price("  900.00 ₺ \n").unwrap(), 900);
        assert_eq!(parse_price("45 TL").unwrap(), 45);
        assert_eq!(parse_price("0,00₺").unwrap(), 0);
    }

    #[test]
    fn rejects_missing_annotation() {
        assert!(matches!(parse_price("1500"), Err(ParseError::InvalidPrice { .. })));
    }

    #[test]
    fn rejects_garbage_prefix() {
        assert!(parse_price("abc,00 ₺").is_err());
        assert!(parse_price("1.500,00 ₺").is_err());
        assert!(parse_price("").is_err());
    }

    #[test]
    fn rejects_non_ascii_digits() {
        assert!(matches!(
            parse_price("١٥٠٠,٠٠ ₺"),
            Err(ParseError::InvalidPrice { .. })
        ));
    }

    #[test]
    fn rejects_fractional_amount() {
        assert!(parse_price("12,50 ₺").is_err());
    }

    #[test]
    fn rejects_overflow() {
        assert_eq!(parse_price("65535,00 ₺").unwrap(), u16::MAX);
        let err = parse_price("70000,00 ₺").unwrap_err();
        assert_eq!(
            err,
            ParseError::InvalidPrice {
                raw: "70000,00 ₺".to_string()
            }
        );
    }
}
