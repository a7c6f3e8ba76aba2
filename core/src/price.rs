//! Price input parsing.
//!
//! Prices arrive as free text from the driver. The only validation is that
//! the text is a whole number: surrounding whitespace is ignored, a leading
//! sign is accepted, and `_` may separate digit groups (`15_000`).

use thiserror::Error;

/// The price text could not be parsed as an integer.
///
/// Recoverable: nothing was written, and the caller may retry with
/// corrected input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("price must be a whole number, got '{input}'")]
pub struct InvalidPrice {
    /// The rejected input, verbatim.
    pub input: String,
}

/// Parses a price input string.
///
/// # Examples
///
/// ```
/// use madang_core::parse_price;
///
/// assert_eq!(parse_price("15000").unwrap(), 15000);
/// assert_eq!(parse_price(" 8_000 ").unwrap(), 8000);
/// assert!(parse_price("abc").is_err());
/// assert!(parse_price("12.5").is_err());
/// ```
pub fn parse_price(input: &str) -> Result<i64, InvalidPrice> {
    let invalid = || InvalidPrice {
        input: input.to_string(),
    };

    let digits = strip_group_separators(input.trim()).ok_or_else(invalid)?;
    digits.parse::<i64>().map_err(|_| invalid())
}

/// Removes `_` separators, rejecting any that are not between two digits.
fn strip_group_separators(text: &str) -> Option<String> {
    let bytes = text.as_bytes();
    for (i, byte) in bytes.iter().enumerate() {
        if *byte != b'_' {
            continue;
        }
        let before = i.checked_sub(1).and_then(|p| bytes.get(p));
        let after = bytes.get(i + 1);
        if !(before.is_some_and(u8::is_ascii_digit) && after.is_some_and(u8::is_ascii_digit)) {
            return None;
        }
    }
    Some(text.replace('_', ""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_integer() {
        assert_eq!(parse_price("0"), Ok(0));
        assert_eq!(parse_price("15000"), Ok(15000));
    }

    #[test]
    fn test_sign_and_whitespace() {
        assert_eq!(parse_price("  -300\n"), Ok(-300));
        assert_eq!(parse_price("+42"), Ok(42));
    }

    #[test]
    fn test_group_separators() {
        assert_eq!(parse_price("1_000_000"), Ok(1_000_000));
        assert!(parse_price("_100").is_err());
        assert!(parse_price("100_").is_err());
        assert!(parse_price("1__0").is_err());
    }

    #[test]
    fn test_rejects_non_integers() {
        for input in ["", "   ", "abc", "12.5", "1e3", "10원", "0x10"] {
            let err = parse_price(input).unwrap_err();
            assert_eq!(err.input, input);
        }
    }

    #[test]
    fn test_rejects_overflow() {
        assert!(parse_price("99999999999999999999").is_err());
    }

    #[test]
    fn test_error_message_quotes_input() {
        let err = parse_price("abc").unwrap_err();
        assert_eq!(err.to_string(), "price must be a whole number, got 'abc'");
    }
}
