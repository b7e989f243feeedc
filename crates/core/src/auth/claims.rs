//! Unverified JWT payload decoding
//!
//! The client never holds the key that signed its access token, so it reads
//! claims without verifying them. They are only used for display and as an
//! expiry hint.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use groupvan_domain::TokenClaims;

/// Decode the payload segment of a compact JWT, `None` if it is not one
pub fn decode_unverified(token: &str) -> Option<TokenClaims> {
    let mut segments = token.split('.');
    let (_header, payload, _signature) = (segments.next()?, segments.next()?, segments.next()?);
    if segments.next().is_some() {
        return None;
    }

    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    serde_json::from_slice(&bytes).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(json: &str) -> String {
        format!("eyJhbGciOiJSUzI1NiJ9.{}.c2ln", URL_SAFE_NO_PAD.encode(json))
    }

    #[test]
    fn decodes_standard_claims() {
        let token = encode(r#"{"iss":"dev-1","aud":"groupvan","kid":"k1","iat":10,"exp":310}"#);
        let claims = decode_unverified(&token).unwrap();
        assert_eq!(claims.iss.as_deref(), Some("dev-1"));
        assert_eq!(claims.aud.as_deref(), Some("groupvan"));
        assert_eq!(claims.exp, Some(310));
    }

    #[test]
    fn opaque_tokens_yield_none() {
        assert!(decode_unverified("opaque-token").is_none());
        assert!(decode_unverified("a.b").is_none());
        assert!(decode_unverified("a.!!!.c").is_none());
        assert!(decode_unverified("a.b.c.d").is_none());
    }
}
