use std::time::Duration;

use crate::error::FundPilotError;

pub const MAX_SEARCH_LENGTH: usize = 100;
pub const MAX_FUND_CODE_LENGTH: usize = 12;
pub const MAX_LIMIT: u32 = 100;

/// Shortest polling interval the CLI accepts.
pub const MIN_INTERVAL: Duration = Duration::from_secs(1);
/// Longest polling interval the CLI accepts: one day.
pub const MAX_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// Strip ASCII control characters (0x00-0x1F except space 0x20), trim whitespace,
/// and enforce a byte-length limit.
pub fn sanitize_text(input: &str, max_len: usize) -> Result<String, FundPilotError> {
    if input.len() > max_len {
        return Err(FundPilotError::InvalidInput(format!(
            "input exceeds maximum length of {} bytes",
            max_len
        )));
    }
    let sanitized: String = input
        .chars()
        .filter(|c| !c.is_ascii_control() || *c == ' ')
        .collect::<String>()
        .trim()
        .to_string();
    if sanitized.is_empty() {
        return Err(FundPilotError::InvalidInput(
            "input is empty after sanitization".to_string(),
        ));
    }
    Ok(sanitized)
}

/// Validate a search string: enforce length, strip control chars, trim.
pub fn validate_search(input: &str) -> Result<String, FundPilotError> {
    sanitize_text(input, MAX_SEARCH_LENGTH)
}

/// Validate a fund code. Codes are ASCII alphanumeric and end up in URL paths,
/// so anything else is rejected rather than escaped. Letters are uppercased.
pub fn validate_fund_code(input: &str) -> Result<String, FundPilotError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(FundPilotError::InvalidInput(
            "fund code must not be empty".to_string(),
        ));
    }
    if trimmed.len() > MAX_FUND_CODE_LENGTH {
        return Err(FundPilotError::InvalidInput(format!(
            "fund code '{}' exceeds {} characters",
            trimmed, MAX_FUND_CODE_LENGTH
        )));
    }
    if !trimmed.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(FundPilotError::InvalidInput(format!(
            "fund code '{}' must contain only letters and digits",
            trimmed
        )));
    }
    Ok(trimmed.to_ascii_uppercase())
}

/// Validate a result limit (must be 1..=100).
pub fn validate_limit(limit: u32) -> Result<u32, FundPilotError> {
    if !(1..=MAX_LIMIT).contains(&limit) {
        return Err(FundPilotError::InvalidInput(format!(
            "limit must be between 1 and {}",
            MAX_LIMIT
        )));
    }
    Ok(limit)
}

/// Validate a polling interval in seconds (1..=86400).
pub fn validate_interval_secs(secs: u64) -> Result<Duration, FundPilotError> {
    let interval = Duration::from_secs(secs);
    if !(MIN_INTERVAL..=MAX_INTERVAL).contains(&interval) {
        return Err(FundPilotError::InvalidInput(format!(
            "interval must be between {} and {} seconds",
            MIN_INTERVAL.as_secs(),
            MAX_INTERVAL.as_secs()
        )));
    }
    Ok(interval)
}

/// Validate a bearer token: no whitespace or control characters.
pub fn validate_token(input: &str) -> Result<String, FundPilotError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(FundPilotError::InvalidInput(
            "token must not be empty".to_string(),
        ));
    }
    if trimmed.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(FundPilotError::InvalidInput(
            "token must not contain whitespace or control characters".to_string(),
        ));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    // -- Fund codes --

    #[test]
    fn fund_code_valid_digits() {
        assert_eq!(validate_fund_code("110022").unwrap(), "110022");
    }

    #[test]
    fn fund_code_trims_and_uppercases() {
        assert_eq!(validate_fund_code("  abc ").unwrap(), "ABC");
    }

    #[test]
    fn fund_code_rejects_path_characters() {
        assert!(validate_fund_code("../admin").is_err());
        assert!(validate_fund_code("11 0022").is_err());
    }

    #[test]
    fn fund_code_empty() {
        assert!(validate_fund_code("   ").is_err());
    }

    #[test]
    fn fund_code_too_long() {
        assert!(validate_fund_code("1234567890123").is_err());
    }

    // -- Search --

    #[test]
    fn search_strips_control_chars() {
        assert_eq!(validate_search("白酒\x07 ").unwrap(), "白酒");
    }

    #[test]
    fn search_too_long() {
        let long = "a".repeat(MAX_SEARCH_LENGTH + 1);
        assert!(validate_search(&long).is_err());
    }

    #[test]
    fn search_only_whitespace() {
        assert!(validate_search(" \t ").is_err());
    }

    // -- Numeric bounds --

    #[test]
    fn limit_bounds() {
        assert!(validate_limit(0).is_err());
        assert_eq!(validate_limit(1).unwrap(), 1);
        assert_eq!(validate_limit(100).unwrap(), 100);
        assert!(validate_limit(101).is_err());
    }

    #[test]
    fn interval_bounds() {
        assert!(validate_interval_secs(0).is_err());
        assert_eq!(
            validate_interval_secs(300).unwrap(),
            Duration::from_secs(300)
        );
        assert_eq!(validate_interval_secs(86_400).unwrap(), MAX_INTERVAL);
        assert!(validate_interval_secs(86_401).is_err());
        assert!(validate_interval_secs(10_000_000_000_000).is_err());
    }

    // -- Tokens --

    #[test]
    fn token_valid() {
        assert_eq!(validate_token(" abc.def ").unwrap(), "abc.def");
    }

    #[test]
    fn token_with_space_rejected() {
        assert!(validate_token("abc def").is_err());
        assert!(validate_token("").is_err());
    }
}
