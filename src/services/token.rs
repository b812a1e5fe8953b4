//! Bearer token inspection
//!
//! The client never verifies signatures; it only reads the `exp` claim from
//! the token payload to know when the backend will stop accepting it.

use data_encoding::BASE64URL_NOPAD;
use serde_json::Value as JsonValue;

/// Error type for token inspection
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("Malformed token: {0}")]
    Malformed(String),
    #[error("Token has no usable expiry claim")]
    MissingExpiry,
}

/// Decode the payload segment of a JWT into JSON
pub fn decode_claims(token: &str) -> Result<JsonValue, TokenError> {
    let mut parts = token.trim().split('.');
    let payload = match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(_), Some(payload), Some(_), None) if !payload.is_empty() => payload,
        _ => return Err(TokenError::Malformed("expected three segments".into())),
    };

    let bytes = BASE64URL_NOPAD
        .decode(payload.trim_end_matches('=').as_bytes())
        .map_err(|e| TokenError::Malformed(format!("payload is not base64url: {e}")))?;

    serde_json::from_slice(&bytes)
        .map_err(|e| TokenError::Malformed(format!("payload is not JSON: {e}")))
}

/// Expiry of a JWT in epoch milliseconds, from its `exp` claim (seconds)
pub fn expiry_millis(token: &str) -> Result<i64, TokenError> {
    let claims = decode_claims(token)?;
    let exp = claims.get("exp").ok_or(TokenError::MissingExpiry)?;

    let seconds = exp
        .as_i64()
        .or_else(|| exp.as_f64().filter(|f| f.is_finite()).map(|f| f as i64))
        .filter(|s| *s > 0)
        .ok_or(TokenError::MissingExpiry)?;

    seconds.checked_mul(1000).ok_or(TokenError::MissingExpiry)
}

#[cfg(test)]
pub(crate) fn make_token(claims: &JsonValue) -> String {
    let header = BASE64URL_NOPAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = BASE64URL_NOPAD.encode(claims.to_string().as_bytes());
    format!("{header}.{payload}.signature")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_expiry_from_exp_claim() {
        let token = make_token(&json!({"sub": "1", "exp": 1_700_000_000}));
        assert_eq!(expiry_millis(&token).unwrap(), 1_700_000_000_000);
    }

    #[test]
    fn test_fractional_exp_is_truncated() {
        let token = make_token(&json!({"exp": 1_700_000_000.75}));
        assert_eq!(expiry_millis(&token).unwrap(), 1_700_000_000_000);
    }

    #[test]
    fn test_padded_payload_is_accepted() {
        let token = make_token(&json!({"exp": 42}));
        let mut parts: Vec<String> = token.split('.').map(String::from).collect();
        parts[1].push_str("==");
        assert_eq!(expiry_millis(&parts.join(".")).unwrap(), 42_000);
    }

    #[test]
    fn test_missing_exp_claim() {
        let token = make_token(&json!({"sub": "1"}));
        assert_eq!(expiry_millis(&token), Err(TokenError::MissingExpiry));

        let token = make_token(&json!({"exp": "tomorrow"}));
        assert_eq!(expiry_millis(&token), Err(TokenError::MissingExpiry));
    }

    #[test]
    fn test_malformed_tokens() {
        assert!(matches!(expiry_millis(""), Err(TokenError::Malformed(_))));
        assert!(matches!(expiry_millis("only.two"), Err(TokenError::Malformed(_))));
        assert!(matches!(expiry_millis("a.!!!.c"), Err(TokenError::Malformed(_))));
        assert!(matches!(expiry_millis("a.b.c.d"), Err(TokenError::Malformed(_))));

        let not_json = format!("h.{}.s", BASE64URL_NOPAD.encode(b"plain text"));
        assert!(matches!(expiry_millis(&not_json), Err(TokenError::Malformed(_))));
    }
}
