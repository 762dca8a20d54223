use base64::engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD};
use base64::Engine;
use serde_json::Value;

use super::claims::{ClaimSet, RawClaims};
use super::error::DecodeError;

/// Number of dot-separated segments in a bearer token
const TOKEN_SEGMENTS: usize = 3;

/// Header used by `encode_unsigned`
const UNSIGNED_HEADER: &str = r#"{"alg":"none","typ":"JWT"}"#;

/// Decode the payload segment of a bearer token into a `ClaimSet`.
///
/// The signature segment is not verified. Surrounding whitespace is ignored.
pub fn decode(token: &str) -> Result<ClaimSet, DecodeError> {
    let payload = payload_segment(token.trim())?;
    let bytes = decode_segment(payload)?;

    let value: Value = serde_json::from_slice(&bytes)
        .map_err(|e| DecodeError::malformed(format!("payload is not JSON: {}", e)))?;
    if !value.is_object() {
        return Err(DecodeError::malformed("payload is not a JSON object"));
    }

    let raw: RawClaims = serde_json::from_value(value)
        .map_err(|e| DecodeError::malformed(format!("unexpected claim type: {}", e)))?;
    raw.into_claim_set()
}

/// Build an unsigned token (`alg: none`, empty signature) carrying `claims`.
pub fn encode_unsigned(claims: &Value) -> String {
    format!(
        "{}.{}.",
        URL_SAFE_NO_PAD.encode(UNSIGNED_HEADER),
        URL_SAFE_NO_PAD.encode(claims.to_string())
    )
}

fn payload_segment(token: &str) -> Result<&str, DecodeError> {
    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != TOKEN_SEGMENTS {
        return Err(DecodeError::malformed(format!(
            "expected {} segments, found {}",
            TOKEN_SEGMENTS,
            segments.len()
        )));
    }
    match segments[1] {
        "" => Err(DecodeError::malformed("empty payload segment")),
        payload => Ok(payload),
    }
}

/// base64url without padding is canonical; padded and standard-alphabet
/// payloads are accepted too.
fn decode_segment(segment: &str) -> Result<Vec<u8>, DecodeError> {
    let trimmed = segment.trim_end_matches('=');
    URL_SAFE_NO_PAD
        .decode(trimmed)
        .or_else(|_| STANDARD_NO_PAD.decode(trimmed))
        .map_err(|e| DecodeError::malformed(format!("payload is not base64: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_single_role_token() {
        let token = encode_unsigned(&json!({"sub": "u1", "role": "TEAM_LEAD"}));
        let claims = decode(&token).unwrap();
        assert_eq!(claims.subject_id, "u1");
        assert!(claims.roles.contains("TEAM_LEAD"));
        assert_eq!(claims.roles.len(), 1);
        assert_eq!(claims.expires_at_epoch_seconds, None);
        assert_eq!(claims.display_name, None);
    }

    #[test]
    fn test_decode_roles_array_and_expiry() {
        let token = encode_unsigned(&json!({
            "sub": "u2",
            "roles": ["EMPLOYEE", "TEAM_LEAD"],
            "name": "Dana Reyes",
            "email": "dana@example.com",
            "exp": 1_900_000_000,
            "iat": 1_800_000_000
        }));
        let claims = decode(&token).unwrap();
        assert_eq!(claims.subject_id, "u2");
        assert_eq!(claims.roles.len(), 2);
        assert_eq!(claims.display_name.as_deref(), Some("Dana Reyes"));
        assert_eq!(claims.email.as_deref(), Some("dana@example.com"));
        assert_eq!(claims.expires_at_epoch_seconds, Some(1_900_000_000));
        assert_eq!(claims.issued_at_epoch_seconds, Some(1_800_000_000));
    }

    #[test]
    fn test_signature_is_ignored() {
        let unsigned = encode_unsigned(&json!({"sub": "u1"}));
        let signed = format!("{}not-a-real-signature", unsigned);
        assert_eq!(decode(&signed).unwrap().subject_id, "u1");
    }

    #[test]
    fn test_padded_and_standard_alphabet_payloads() {
        // "?>?" encodes with '/' in the standard alphabet and '_' in url-safe
        let payload = json!({"sub": "?>?"}).to_string();
        let header = URL_SAFE_NO_PAD.encode(UNSIGNED_HEADER);

        let standard = base64::engine::general_purpose::STANDARD.encode(&payload);
        let token = format!("{}.{}.sig", header, standard);
        assert_eq!(decode(&token).unwrap().subject_id, "?>?");

        let padded = base64::engine::general_purpose::URL_SAFE.encode(&payload);
        let token = format!("{}.{}.sig", header, padded);
        assert_eq!(decode(&token).unwrap().subject_id, "?>?");
    }

    #[test]
    fn test_surrounding_whitespace_is_ignored() {
        let token = format!("  {}\n", encode_unsigned(&json!({"sub": "u1"})));
        assert_eq!(decode(&token).unwrap().subject_id, "u1");
    }

    #[test]
    fn test_malformed_tokens() {
        let header = URL_SAFE_NO_PAD.encode(UNSIGNED_HEADER);
        let cases = vec![
            "not-a-valid-token".to_string(),
            "".to_string(),
            "a.b".to_string(),
            "a.b.c.d".to_string(),
            format!("{}..sig", header),
            format!("{}.!!!.sig", header),
            format!("{}.{}.sig", header, URL_SAFE_NO_PAD.encode("not json")),
            format!("{}.{}.sig", header, URL_SAFE_NO_PAD.encode("[1,2,3]")),
            format!("{}.{}.sig", header, URL_SAFE_NO_PAD.encode(r#"{"sub":42}"#)),
            format!("{}.{}.sig", header, URL_SAFE_NO_PAD.encode(r#"{"sub":"u","roles":[1]}"#)),
            format!("{}.{}.sig", header, URL_SAFE_NO_PAD.encode(r#"{"sub":"u","exp":"soon"}"#)),
        ];
        for token in cases {
            match decode(&token) {
                Err(DecodeError::Malformed(_)) => {}
                other => panic!("expected Malformed for {:?}, got {:?}", token, other),
            }
        }
    }

    #[test]
    fn test_missing_subject_is_rejected() {
        let token = encode_unsigned(&json!({"role": "ADMIN"}));
        assert_eq!(decode(&token), Err(DecodeError::MissingSubject));

        let token = encode_unsigned(&json!({"sub": null, "role": "ADMIN"}));
        assert_eq!(decode(&token), Err(DecodeError::MissingSubject));
    }
}
